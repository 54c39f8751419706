/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::borrow::Cow;

use time::{Duration, OffsetDateTime};

use crate::{
    codec::{self, WireDateTime},
    enums::{BodyType, XmlNamespace},
    json::JsonValue,
    schema_names::{EnumTable, WireEnum},
    wire::{WireNode, WireScalar, WireValue, WireWriter},
    DeserializationError, Error,
};

use super::PropertyKind;

/// A member of some enumeration, identified by the enumeration's name and the
/// member's symbolic name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumToken {
    pub enum_name: &'static str,
    pub symbol: &'static str,
    pub schema_name: &'static str,
}

impl EnumToken {
    pub fn of<E: WireEnum>(value: E) -> Self {
        EnumToken {
            enum_name: E::ENUM_NAME,
            symbol: value.symbolic_name(),
            schema_name: value.schema_name(),
        }
    }

    fn decode(table: &'static EnumTable, text: &str) -> Result<Self, DeserializationError> {
        let symbol = table.decode(text)?;

        Ok(EnumToken {
            enum_name: table.enum_name(),
            symbol,
            schema_name: table.schema_name(symbol).unwrap_or(symbol),
        })
    }

    /// Converts back to the typed member, if the token belongs to `E`.
    pub fn to_enum<E: WireEnum>(&self) -> Option<E> {
        if self.enum_name == E::ENUM_NAME {
            E::from_symbolic_name(self.symbol)
        } else {
            None
        }
    }
}

/// The identifier of an item or folder, along with the change key of the
/// version it was read at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceId {
    pub id: String,
    pub change_key: Option<String>,
}

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        ServiceId {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn with_change_key(id: impl Into<String>, change_key: impl Into<String>) -> Self {
        ServiceId {
            id: id.into(),
            change_key: Some(change_key.into()),
        }
    }

    /// Writes the identifier as an element carrying `Id` and `ChangeKey`
    /// attributes.
    pub(crate) fn write_to_wire<W: WireWriter>(
        &self,
        writer: &mut W,
        element_name: &str,
    ) -> Result<(), Error> {
        writer.start_element(XmlNamespace::Types, element_name)?;
        writer.set_type_name(element_name)?;
        writer.write_attribute("Id", WireScalar::Str(&self.id))?;
        if let Some(change_key) = &self.change_key {
            writer.write_attribute("ChangeKey", WireScalar::Str(change_key))?;
        }
        writer.end_element()
    }

    pub(crate) fn read_from_wire(node: WireNode<'_>) -> Result<Self, DeserializationError> {
        let id = node
            .attribute("Id")
            .ok_or_else(|| DeserializationError::MissingKey {
                key: "Id".to_string(),
            })?;

        Ok(ServiceId {
            id: id.into_owned(),
            change_key: node.attribute("ChangeKey").map(Cow::into_owned),
        })
    }
}

/// The body of an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyContent {
    pub body_type: BodyType,
    pub text: String,
}

impl BodyContent {
    pub fn html(text: impl Into<String>) -> Self {
        BodyContent {
            body_type: BodyType::Html,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        BodyContent {
            body_type: BodyType::Text,
            text: text.into(),
        }
    }
}

/// A dynamically typed property value.
///
/// `Null` marks a property known to have no value, as opposed to one which
/// is absent from a bag altogether.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    DateTime(WireDateTime),
    Duration(Duration),
    Enum(EnumToken),
    Id(ServiceId),
    StringList(Vec<String>),
    Body(BodyContent),
}

impl PropertyValue {
    pub fn from_enum<E: WireEnum>(value: E) -> Self {
        PropertyValue::Enum(EnumToken::of(value))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Double(_) => "double",
            PropertyValue::String(_) => "string",
            PropertyValue::DateTime(_) => "dateTime",
            PropertyValue::Duration(_) => "duration",
            PropertyValue::Enum(token) => token.enum_name,
            PropertyValue::Id(_) => "id",
            PropertyValue::StringList(_) => "stringList",
            PropertyValue::Body(_) => "body",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Writes the value as the element `name`. `Null` values write nothing.
    pub(crate) fn write_to_wire<W: WireWriter>(
        &self,
        writer: &mut W,
        name: &str,
    ) -> Result<(), Error> {
        let scalar = match self {
            PropertyValue::Null => return Ok(()),
            PropertyValue::Boolean(value) => WireScalar::Bool(*value),
            PropertyValue::Integer(value) => WireScalar::Integer(*value),
            PropertyValue::Double(value) => WireScalar::Double(*value),
            PropertyValue::String(value) => WireScalar::Str(value),
            PropertyValue::DateTime(value) => WireScalar::DateTime(value),
            PropertyValue::Duration(value) => WireScalar::Duration(*value),
            PropertyValue::Enum(token) => WireScalar::Enum(token.schema_name),
            PropertyValue::Id(id) => return id.write_to_wire(writer, name),
            PropertyValue::StringList(values) => {
                writer.start_array(XmlNamespace::Types, name)?;
                for value in values {
                    writer.write_element(XmlNamespace::Types, "String", WireScalar::Str(value))?;
                }
                return writer.end_array();
            }
            PropertyValue::Body(body) => {
                writer.start_element(XmlNamespace::Types, name)?;
                writer.write_attribute("BodyType", WireScalar::Enum(body.body_type.schema_name()))?;
                writer.write_text(WireScalar::Str(&body.text))?;
                return writer.end_element();
            }
        };

        writer.write_element(XmlNamespace::Types, name, scalar)
    }

    /// Decodes a value of the given kind from its wire form.
    pub(crate) fn read_from_wire(
        kind: &PropertyKind,
        name: &str,
        value: WireValue<'_>,
    ) -> Result<PropertyValue, DeserializationError> {
        if value.is_null() {
            return Ok(PropertyValue::Null);
        }

        let decoded = match kind {
            PropertyKind::Id => {
                let node = value.as_node().ok_or_else(|| unexpected(name, kind, &value))?;
                PropertyValue::Id(ServiceId::read_from_wire(node)?)
            }
            PropertyKind::StringList => PropertyValue::StringList(read_string_list(name, value)?),
            PropertyKind::Body => {
                let node = value.as_node().ok_or_else(|| unexpected(name, kind, &value))?;
                let body_type = match node.attribute("BodyType") {
                    Some(body_type) => codec::decode_enum(&body_type)?,
                    None => BodyType::Text,
                };
                let text = value.text().map(Cow::into_owned).unwrap_or_default();

                PropertyValue::Body(BodyContent { body_type, text })
            }
            _ => {
                let text = value.text().ok_or_else(|| unexpected(name, kind, &value))?;
                decode_scalar(kind, &text)?
            }
        };

        Ok(decoded)
    }
}

fn decode_scalar(kind: &PropertyKind, text: &str) -> Result<PropertyValue, DeserializationError> {
    Ok(match kind {
        PropertyKind::Boolean => PropertyValue::Boolean(codec::decode_bool(text)?),
        PropertyKind::Integer => PropertyValue::Integer(codec::decode_integer(text)?),
        PropertyKind::Double => PropertyValue::Double(codec::decode_double(text)?),
        PropertyKind::String => PropertyValue::String(text.to_owned()),
        PropertyKind::DateTime => PropertyValue::DateTime(codec::decode_date_time(text)?),
        PropertyKind::Duration => PropertyValue::Duration(codec::decode_duration(text)?),
        PropertyKind::Enum(table) => PropertyValue::Enum(EnumToken::decode(table(), text)?),
        PropertyKind::Id | PropertyKind::StringList | PropertyKind::Body => {
            return Err(DeserializationError::MalformedValue {
                kind: kind.name(),
                value: text.to_owned(),
            })
        }
    })
}

fn read_string_list(name: &str, value: WireValue<'_>) -> Result<Vec<String>, DeserializationError> {
    match value {
        WireValue::Xml(element) => Ok(element
            .children
            .iter()
            .map(|child| child.text.clone())
            .collect()),
        WireValue::Json(JsonValue::Array(elements)) => elements
            .iter()
            .map(|element| {
                element
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| DeserializationError::UnexpectedKind {
                        key: name.to_owned(),
                        expected: "string",
                        actual: element.kind_name(),
                    })
            })
            .collect(),
        other => Err(DeserializationError::UnexpectedKind {
            key: name.to_owned(),
            expected: "array",
            actual: other.kind_name(),
        }),
    }
}

fn unexpected(name: &str, kind: &PropertyKind, value: &WireValue<'_>) -> DeserializationError {
    DeserializationError::UnexpectedKind {
        key: name.to_owned(),
        expected: kind.name(),
        actual: value.kind_name(),
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<WireDateTime> for PropertyValue {
    fn from(value: WireDateTime) -> Self {
        PropertyValue::DateTime(value)
    }
}

impl From<OffsetDateTime> for PropertyValue {
    fn from(value: OffsetDateTime) -> Self {
        PropertyValue::DateTime(value.into())
    }
}

impl From<Duration> for PropertyValue {
    fn from(value: Duration) -> Self {
        PropertyValue::Duration(value)
    }
}

impl From<ServiceId> for PropertyValue {
    fn from(value: ServiceId) -> Self {
        PropertyValue::Id(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::StringList(value)
    }
}

impl From<BodyContent> for PropertyValue {
    fn from(value: BodyContent) -> Self {
        PropertyValue::Body(value)
    }
}

impl<T> From<Option<T>> for PropertyValue
where
    T: Into<PropertyValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        enums::Importance,
        json::JsonObject,
        test_utils::assert_serialized_xml,
        wire::XmlElement,
    };

    #[test]
    fn enum_tokens_convert_back() {
        let token = EnumToken::of(Importance::Low);
        assert_eq!(token.to_enum::<Importance>(), Some(Importance::Low));
        assert_eq!(token.to_enum::<BodyType>(), None);
    }

    #[test]
    fn write_compound_values() {
        assert_serialized_xml(
            |writer| {
                PropertyValue::from(ServiceId::with_change_key("AAA", "CK"))
                    .write_to_wire(writer, "ItemId")?;
                PropertyValue::from(vec!["Red".to_string(), "Blue".to_string()])
                    .write_to_wire(writer, "Categories")?;
                PropertyValue::from(BodyContent::html("<b>hi</b>")).write_to_wire(writer, "Body")?;
                PropertyValue::from_enum(crate::enums::BodyType::Html).write_to_wire(writer, "BodyType")?;
                PropertyValue::Null.write_to_wire(writer, "Ignored")
            },
            concat!(
                r#"<t:ItemId Id="AAA" ChangeKey="CK"/>"#,
                r#"<t:Categories><t:String>Red</t:String><t:String>Blue</t:String></t:Categories>"#,
                r#"<t:Body BodyType="HTML">&lt;b&gt;hi&lt;/b&gt;</t:Body>"#,
                r#"<t:BodyType>HTML</t:BodyType>"#,
            ),
        );
    }

    #[test]
    fn read_xml_values() {
        let element = XmlElement::parse(
            br#"<Message>
                <ItemId Id="AAA"/>
                <Categories><String>Red</String></Categories>
                <Body BodyType="Text">plain</Body>
                <Importance>High</Importance>
                <IsRead>true</IsRead>
            </Message>"#,
        )
        .unwrap();
        let node = WireNode::Xml(&element);
        let read = |name: &str, kind: PropertyKind| {
            PropertyValue::read_from_wire(&kind, name, node.field(name).unwrap())
        };

        assert_eq!(
            read("ItemId", PropertyKind::Id),
            Ok(PropertyValue::Id(ServiceId::new("AAA")))
        );
        assert_eq!(
            read("Categories", PropertyKind::StringList),
            Ok(PropertyValue::StringList(vec!["Red".to_string()]))
        );
        assert_eq!(
            read("Body", PropertyKind::Body),
            Ok(PropertyValue::Body(BodyContent::text("plain")))
        );
        assert_eq!(
            read("Importance", PropertyKind::Enum(Importance::table)),
            Ok(PropertyValue::from_enum(Importance::High))
        );
        assert_eq!(
            read("IsRead", PropertyKind::Boolean),
            Ok(PropertyValue::Boolean(true))
        );
        assert!(read("IsRead", PropertyKind::Integer).is_err());
    }

    #[test]
    fn read_json_values() {
        let object = JsonObject::from_json_value(json!({
            "ItemId": { "Id": "AAA", "ChangeKey": "CK" },
            "Categories": ["Red", "Blue"],
            "Body": { "BodyType": "HTML", "Value": "<p/>" },
            "Size": 12,
            "IsRead": false,
            "ReminderDueBy": null,
        }))
        .unwrap();
        let node = WireNode::Json(&object);
        let read = |name: &str, kind: PropertyKind| {
            PropertyValue::read_from_wire(&kind, name, node.field(name).unwrap())
        };

        assert_eq!(
            read("ItemId", PropertyKind::Id),
            Ok(PropertyValue::Id(ServiceId::with_change_key("AAA", "CK")))
        );
        assert_eq!(
            read("Categories", PropertyKind::StringList),
            Ok(PropertyValue::from(vec!["Red".to_string(), "Blue".to_string()]))
        );
        assert_eq!(
            read("Body", PropertyKind::Body),
            Ok(PropertyValue::Body(BodyContent::html("<p/>")))
        );
        assert_eq!(read("Size", PropertyKind::Integer), Ok(PropertyValue::Integer(12)));
        assert_eq!(read("IsRead", PropertyKind::Boolean), Ok(PropertyValue::Boolean(false)));
        assert_eq!(read("ReminderDueBy", PropertyKind::DateTime), Ok(PropertyValue::Null));
        assert!(read("Categories", PropertyKind::String).is_err());
    }
}
