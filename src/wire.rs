/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The format-neutral surface that property bags and requests are written to
//! and read from.
//!
//! Writing goes through the [`WireWriter`] trait, implemented for XML by
//! [`xml::XmlWireWriter`] and for JSON by [`json::JsonWireWriter`]. Reading
//! goes through [`WireNode`], a borrowed view over either a parsed
//! [`xml::XmlElement`] tree or a [`JsonObject`].

use std::borrow::Cow;

use time::Duration;

use crate::{
    codec::{self, WireDateTime},
    enums::XmlNamespace,
    json::{JsonObject, JsonValue},
    DeserializationError, Error,
};

pub mod json;
pub mod xml;

pub use self::{
    json::JsonWireWriter,
    xml::{XmlElement, XmlWireWriter},
};

/// A scalar written as element content or as an attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WireScalar<'a> {
    Bool(bool),
    Integer(i64),
    Double(f64),
    Str(&'a str),
    DateTime(&'a WireDateTime),
    Duration(Duration),
    /// The wire spelling of an enumeration member.
    Enum(&'a str),
}

impl WireScalar<'_> {
    /// The canonical text form, as used by the XML representation.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            WireScalar::Bool(value) => Cow::Borrowed(codec::encode_bool(*value)),
            WireScalar::Integer(value) => Cow::Owned(value.to_string()),
            WireScalar::Double(value) => Cow::Owned(value.to_string()),
            WireScalar::Str(value) | WireScalar::Enum(value) => Cow::Borrowed(value),
            WireScalar::DateTime(value) => Cow::Owned(codec::encode_date_time(value)),
            WireScalar::Duration(value) => Cow::Owned(codec::encode_duration(*value)),
        }
    }

    /// The typed form, as used by the JSON representation.
    pub fn to_json(&self) -> JsonValue {
        match self {
            WireScalar::Bool(value) => JsonValue::Bool(*value),
            WireScalar::Integer(value) => JsonValue::Integer(*value),
            WireScalar::Double(value) => JsonValue::Double(*value),
            WireScalar::Str(value) => JsonValue::String((*value).to_owned()),
            WireScalar::DateTime(value) => JsonValue::DateTime(**value),
            WireScalar::Duration(value) => JsonValue::String(codec::encode_duration(*value)),
            WireScalar::Enum(value) => JsonValue::Enum((*value).to_owned()),
        }
    }
}

/// A sink for a structured document.
///
/// Elements nest through `start_element`/`end_element`. An element's
/// attributes must be written before any of its content. Collections are
/// bracketed with `start_array`/`end_array`, which XML renders as an ordinary
/// container element and JSON as an array.
pub trait WireWriter {
    fn start_element(&mut self, namespace: XmlNamespace, name: &str) -> Result<(), Error>;

    fn end_element(&mut self) -> Result<(), Error>;

    fn start_array(&mut self, namespace: XmlNamespace, name: &str) -> Result<(), Error>;

    fn end_array(&mut self) -> Result<(), Error>;

    /// Annotates the current element with a polymorphic type name. Only
    /// representations without element names make use of it.
    fn set_type_name(&mut self, type_name: &str) -> Result<(), Error>;

    fn write_attribute(&mut self, name: &str, value: WireScalar<'_>) -> Result<(), Error>;

    /// Writes a complete element holding a single scalar.
    fn write_element(
        &mut self,
        namespace: XmlNamespace,
        name: &str,
        value: WireScalar<'_>,
    ) -> Result<(), Error>;

    /// Writes scalar content for the current element.
    fn write_text(&mut self, value: WireScalar<'_>) -> Result<(), Error>;
}

/// A borrowed view over an object-like node of a received document.
#[derive(Clone, Copy, Debug)]
pub enum WireNode<'a> {
    Xml(&'a XmlElement),
    Json(&'a JsonObject),
}

/// A named value contained in a [`WireNode`].
#[derive(Clone, Copy, Debug)]
pub struct WireField<'a> {
    pub name: &'a str,
    pub value: WireValue<'a>,
}

#[derive(Clone, Copy, Debug)]
pub enum WireValue<'a> {
    Xml(&'a XmlElement),
    Json(&'a JsonValue),
}

impl<'a> WireNode<'a> {
    /// The type of the object the node describes: the element name in XML,
    /// the `__type` annotation in JSON.
    pub fn type_name(&self) -> Option<&'a str> {
        match self {
            WireNode::Xml(element) => Some(&element.name),
            WireNode::Json(object) => object.type_name(),
        }
    }

    /// The node's child values, in document order.
    pub fn fields(&self) -> Vec<WireField<'a>> {
        match self {
            WireNode::Xml(element) => element
                .children
                .iter()
                .map(|child| WireField {
                    name: &child.name,
                    value: WireValue::Xml(child),
                })
                .collect(),
            WireNode::Json(object) => object
                .iter()
                .map(|(name, value)| WireField {
                    name,
                    value: WireValue::Json(value),
                })
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<WireValue<'a>> {
        match self {
            WireNode::Xml(element) => element.child(name).map(WireValue::Xml),
            WireNode::Json(object) => object.get(name).map(WireValue::Json),
        }
    }

    /// An object-valued child.
    pub fn child(&self, name: &str) -> Option<WireNode<'a>> {
        self.field(name).and_then(|value| value.as_node())
    }

    /// A scalar attached to the node itself: an XML attribute, or a scalar
    /// entry of a JSON object.
    pub fn attribute(&self, name: &str) -> Option<Cow<'a, str>> {
        match self {
            WireNode::Xml(element) => element.attribute(name).map(Cow::Borrowed),
            WireNode::Json(object) => object.get(name).and_then(json_scalar_text),
        }
    }

    /// The text of a scalar child.
    pub fn child_text(&self, name: &str) -> Option<Cow<'a, str>> {
        self.field(name).and_then(|value| value.text())
    }

    /// The entries of a collection child. A missing collection is empty.
    ///
    /// In XML the entries are the child elements of the element `name`, in
    /// JSON they are the objects of the array under the key `name`.
    pub fn array(&self, name: &str) -> Result<Vec<WireNode<'a>>, DeserializationError> {
        match self {
            WireNode::Xml(element) => Ok(element
                .child(name)
                .map(|container| container.children.iter().map(WireNode::Xml).collect())
                .unwrap_or_default()),
            WireNode::Json(object) => Ok(object
                .read_as_object_array(name)?
                .into_iter()
                .map(WireNode::Json)
                .collect()),
        }
    }
}

impl<'a> WireValue<'a> {
    pub fn as_node(&self) -> Option<WireNode<'a>> {
        match self {
            WireValue::Xml(element) => Some(WireNode::Xml(element)),
            WireValue::Json(JsonValue::Object(object)) => Some(WireNode::Json(object)),
            WireValue::Json(_) => None,
        }
    }

    /// The value's scalar content in its text form.
    ///
    /// For XML this is the element text. For JSON, scalars are converted to
    /// their canonical text and objects yield their `Value` entry.
    pub fn text(&self) -> Option<Cow<'a, str>> {
        match self {
            WireValue::Xml(element) => Some(Cow::Borrowed(&element.text)),
            WireValue::Json(JsonValue::Object(object)) => {
                object.get("Value").and_then(json_scalar_text)
            }
            WireValue::Json(value) => json_scalar_text(value),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Json(JsonValue::Null))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            WireValue::Xml(_) => "element",
            WireValue::Json(value) => value.kind_name(),
        }
    }
}

fn json_scalar_text(value: &JsonValue) -> Option<Cow<'_, str>> {
    match value {
        JsonValue::String(value) | JsonValue::Enum(value) => Some(Cow::Borrowed(value)),
        JsonValue::Bool(value) => Some(Cow::Borrowed(codec::encode_bool(*value))),
        JsonValue::Integer(value) => Some(Cow::Owned(value.to_string())),
        JsonValue::Double(value) => Some(Cow::Owned(value.to_string())),
        JsonValue::DateTime(value) => Some(Cow::Owned(codec::encode_date_time(value))),
        JsonValue::Null | JsonValue::Object(_) | JsonValue::Array(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const MESSAGE_XML: &str = r#"<t:Message xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
        <t:ItemId Id="AAA" ChangeKey="CK"/>
        <t:Subject>Lunch</t:Subject>
        <t:Categories><t:String>Red</t:String><t:String>Blue</t:String></t:Categories>
    </t:Message>"#;

    #[test]
    fn xml_nodes() {
        let element = XmlElement::parse(MESSAGE_XML.as_bytes()).unwrap();
        let node = WireNode::Xml(&element);

        assert_eq!(node.type_name(), Some("Message"));

        let names: Vec<_> = node.fields().iter().map(|field| field.name).collect();
        assert_eq!(names, vec!["ItemId", "Subject", "Categories"]);

        assert_eq!(node.child_text("Subject").as_deref(), Some("Lunch"));
        assert_eq!(
            node.child("ItemId").and_then(|id| id.attribute("ChangeKey")).as_deref(),
            Some("CK")
        );
        assert_eq!(node.array("Categories").unwrap().len(), 2);
        assert!(node.array("Attachments").unwrap().is_empty());
    }

    #[test]
    fn json_nodes() {
        let object = JsonObject::from_json_value(json!({
            "__type": "Message:#Exchange",
            "ItemId": { "Id": "AAA", "ChangeKey": "CK" },
            "Subject": "Lunch",
            "Size": 42,
            "Items": [ { "Subject": "a" }, { "Subject": "b" } ],
        }))
        .unwrap();
        let node = WireNode::Json(&object);

        assert_eq!(node.type_name(), Some("Message"));
        assert_eq!(node.child_text("Size").as_deref(), Some("42"));
        assert_eq!(
            node.child("ItemId").and_then(|id| id.attribute("Id")).as_deref(),
            Some("AAA")
        );
        assert_eq!(node.array("Items").unwrap().len(), 2);
        assert!(node.array("Subject").is_err());
    }
}
