/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::{HashMap, HashSet};

use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    enums::XmlNamespace,
    json::JsonValue,
    schema::ServiceObjectSchema,
    schema_names::WireEnum,
    version::ExchangeVersion,
    wire::{WireNode, WireScalar, WireValue, WireWriter, XmlElement},
    DeserializationError, Error, PropertyError,
};

use super::{BodyContent, PropertyDefinition, PropertySet, PropertyValue, ServiceId};

type Definition = &'static PropertyDefinition;

/// A value received for an element the object's schema does not define.
///
/// These are retained as received so that data from newer servers is not
/// silently lost.
#[derive(Clone, Debug, PartialEq)]
pub enum UnknownProperty {
    Xml(XmlElement),
    Json { name: String, value: JsonValue },
}

impl UnknownProperty {
    pub fn name(&self) -> &str {
        match self {
            UnknownProperty::Xml(element) => &element.name,
            UnknownProperty::Json { name, .. } => name,
        }
    }
}

/// The sparse, version-aware store of property values for one object.
///
/// A bag knows which properties were loaded from the server, which have been
/// changed locally since and what their values were when loaded, so that only
/// changes need to be sent back.
#[derive(Clone, Debug)]
pub struct PropertyBag {
    schema: &'static ServiceObjectSchema,
    version: ExchangeVersion,
    reference_zone: UtcOffset,
    is_new: bool,

    values: HashMap<Definition, PropertyValue>,

    /// The values as last loaded from or committed to the server.
    original: HashMap<Definition, PropertyValue>,

    dirty: HashSet<Definition>,

    /// The property sets requested by loads since the bag was last cleared.
    requested: Vec<PropertySet>,

    unknown: Vec<UnknownProperty>,
}

impl PropertyBag {
    /// Creates an empty bag for objects of the given schema.
    ///
    /// Floating timestamps read through [`Self::get_date_time`] are
    /// interpreted relative to `reference_zone`.
    pub fn new(
        schema: &'static ServiceObjectSchema,
        version: ExchangeVersion,
        reference_zone: UtcOffset,
        is_new: bool,
    ) -> Self {
        PropertyBag {
            schema,
            version,
            reference_zone,
            is_new,
            values: HashMap::new(),
            original: HashMap::new(),
            dirty: HashSet::new(),
            requested: Vec::new(),
            unknown: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static ServiceObjectSchema {
        self.schema
    }

    pub fn version(&self) -> ExchangeVersion {
        self.version
    }

    pub fn reference_zone(&self) -> UtcOffset {
        self.reference_zone
    }

    /// Whether the object has never been saved to the server.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    fn check_applicable(&self, definition: Definition) -> Result<(), PropertyError> {
        if !self.schema.contains(definition) {
            return Err(PropertyError::NotInSchema {
                property: definition.xml_name,
                type_name: self.schema.name,
            });
        }

        definition.check_version(self.version)
    }

    /// Returns the value of a property, or `None` if it has no value.
    ///
    /// Fails if the property is not part of the object's schema or not
    /// supported by the version the object is bound to, and if the property
    /// was neither loaded, requested nor can be defaulted because the object
    /// is new.
    pub fn get(&self, definition: Definition) -> Result<Option<PropertyValue>, PropertyError> {
        self.check_applicable(definition)?;

        if let Some(value) = self.values.get(definition) {
            return Ok(Some(value.clone()).filter(|value| !value.is_null()));
        }

        // A requested property missing from the response has no value on
        // the server.
        if self
            .requested
            .iter()
            .any(|requested| requested.contains(definition, self.schema))
        {
            return Ok(None);
        }

        if self.is_new {
            return Ok(definition
                .default
                .map(|default| default())
                .filter(|value| !value.is_null()));
        }

        Err(PropertyError::NotLoaded {
            property: definition.xml_name,
        })
    }

    /// Whether a value (including `Null`) is present for the property.
    pub fn contains(&self, definition: Definition) -> bool {
        self.values.contains_key(definition)
    }

    /// Sets a property. Setting [`PropertyValue::Null`] removes the value,
    /// which on a saved object requires the property to be deletable.
    ///
    /// Setting a property to the value it already holds has no effect and
    /// does not mark it as changed.
    pub fn set(
        &mut self,
        definition: Definition,
        value: impl Into<PropertyValue>,
    ) -> Result<(), PropertyError> {
        let value = value.into();

        self.check_applicable(definition)?;

        if definition.is_read_only() {
            return Err(PropertyError::ReadOnly {
                property: definition.xml_name,
            });
        }
        if definition.is_create_only() && !self.is_new {
            return Err(PropertyError::CreateOnly {
                property: definition.xml_name,
            });
        }
        if !definition.kind.accepts(&value) {
            return Err(PropertyError::KindMismatch {
                property: definition.xml_name,
                expected: definition.kind.name(),
                actual: value.kind_name(),
            });
        }
        if value.is_null() && !self.is_new && !definition.can_delete() {
            return Err(PropertyError::NotDeletable {
                property: definition.xml_name,
            });
        }

        if self.values.get(definition) == Some(&value) {
            return Ok(());
        }

        // A new object has nothing on the server to delete.
        if value.is_null() && self.is_new {
            self.values.remove(definition);
            self.dirty.remove(definition);
            return Ok(());
        }

        self.values.insert(definition, value);
        self.dirty.insert(definition);

        Ok(())
    }

    /// Removes the value of a property. Equivalent to setting it to `Null`.
    pub fn delete(&mut self, definition: Definition) -> Result<(), PropertyError> {
        self.set(definition, PropertyValue::Null)
    }

    fn get_as<T>(
        &self,
        definition: Definition,
        expected: &'static str,
        extract: impl FnOnce(PropertyValue) -> Result<T, PropertyValue>,
    ) -> Result<Option<T>, PropertyError> {
        match self.get(definition)? {
            Some(value) => extract(value)
                .map(Some)
                .map_err(|value| PropertyError::KindMismatch {
                    property: definition.xml_name,
                    expected,
                    actual: value.kind_name(),
                }),
            None => Ok(None),
        }
    }

    pub fn get_bool(&self, definition: Definition) -> Result<Option<bool>, PropertyError> {
        self.get_as(definition, "boolean", |value| match value {
            PropertyValue::Boolean(value) => Ok(value),
            other => Err(other),
        })
    }

    pub fn get_i64(&self, definition: Definition) -> Result<Option<i64>, PropertyError> {
        self.get_as(definition, "integer", |value| match value {
            PropertyValue::Integer(value) => Ok(value),
            other => Err(other),
        })
    }

    pub fn get_f64(&self, definition: Definition) -> Result<Option<f64>, PropertyError> {
        self.get_as(definition, "double", |value| match value {
            PropertyValue::Double(value) => Ok(value),
            PropertyValue::Integer(value) => Ok(value as f64),
            other => Err(other),
        })
    }

    pub fn get_string(&self, definition: Definition) -> Result<Option<String>, PropertyError> {
        self.get_as(definition, "string", |value| match value {
            PropertyValue::String(value) => Ok(value),
            other => Err(other),
        })
    }

    /// Returns a timestamp as an instant, interpreting floating values in the
    /// bag's reference zone.
    pub fn get_date_time(
        &self,
        definition: Definition,
    ) -> Result<Option<OffsetDateTime>, PropertyError> {
        let zone = self.reference_zone;
        self.get_as(definition, "dateTime", |value| match value {
            PropertyValue::DateTime(value) => Ok(value.resolve(zone)),
            other => Err(other),
        })
    }

    pub fn get_duration(&self, definition: Definition) -> Result<Option<Duration>, PropertyError> {
        self.get_as(definition, "duration", |value| match value {
            PropertyValue::Duration(value) => Ok(value),
            other => Err(other),
        })
    }

    pub fn get_enum<E: WireEnum>(&self, definition: Definition) -> Result<Option<E>, PropertyError> {
        self.get_as(definition, E::ENUM_NAME, |value| match value {
            PropertyValue::Enum(token) => token.to_enum().ok_or(PropertyValue::Enum(token)),
            other => Err(other),
        })
    }

    pub fn get_id(&self, definition: Definition) -> Result<Option<ServiceId>, PropertyError> {
        self.get_as(definition, "id", |value| match value {
            PropertyValue::Id(value) => Ok(value),
            other => Err(other),
        })
    }

    pub fn get_string_list(
        &self,
        definition: Definition,
    ) -> Result<Option<Vec<String>>, PropertyError> {
        self.get_as(definition, "stringList", |value| match value {
            PropertyValue::StringList(value) => Ok(value),
            other => Err(other),
        })
    }

    pub fn get_body(&self, definition: Definition) -> Result<Option<BodyContent>, PropertyError> {
        self.get_as(definition, "body", |value| match value {
            PropertyValue::Body(value) => Ok(value),
            other => Err(other),
        })
    }

    /// The value of a property as last loaded from or saved to the server.
    pub fn original_value(&self, definition: Definition) -> Option<&PropertyValue> {
        self.original.get(definition)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_property_dirty(&self, definition: Definition) -> bool {
        self.dirty.contains(definition)
    }

    /// Changed properties, in schema order.
    pub fn dirty_properties(&self) -> impl Iterator<Item = Definition> + '_ {
        self.schema
            .properties()
            .filter(|definition| self.dirty.contains(definition))
    }

    pub fn unknown_properties(&self) -> &[UnknownProperty] {
        &self.unknown
    }

    /// Populates the bag from a received object.
    ///
    /// The node must describe an object of the bag's schema. Values received
    /// from the server replace local values and clear their changed state.
    /// With `clear`, everything previously held is discarded first. Nothing
    /// is modified if any value fails to decode.
    pub fn load_from_wire(
        &mut self,
        node: WireNode<'_>,
        requested: &PropertySet,
        clear: bool,
    ) -> Result<(), Error> {
        if let Some(type_name) = node.type_name() {
            if type_name != self.schema.name {
                return Err(DeserializationError::SchemaMismatch {
                    expected: self.schema.name,
                    actual: type_name.to_owned(),
                }
                .into());
            }
        }

        let mut loaded = Vec::new();
        let mut unknown = Vec::new();
        for field in node.fields() {
            match self.schema.find_by_xml_name(field.name) {
                Some(definition) => {
                    let value = PropertyValue::read_from_wire(
                        &definition.kind,
                        definition.xml_name,
                        field.value,
                    )?;
                    loaded.push((definition, value));
                }
                None => {
                    log::debug!(
                        "retaining unknown element `{}` on {}",
                        field.name,
                        self.schema.name
                    );

                    unknown.push(match field.value {
                        WireValue::Xml(element) => UnknownProperty::Xml(element.clone()),
                        WireValue::Json(value) => UnknownProperty::Json {
                            name: field.name.to_owned(),
                            value: value.clone(),
                        },
                    });
                }
            }
        }

        if clear {
            self.values.clear();
            self.original.clear();
            self.dirty.clear();
            self.requested.clear();
            self.unknown.clear();
        }

        for (definition, value) in loaded {
            self.original.insert(definition, value.clone());
            self.values.insert(definition, value);
            self.dirty.remove(definition);
        }

        for property in unknown {
            self.unknown
                .retain(|existing| existing.name() != property.name());
            self.unknown.push(property);
        }

        if !self.requested.contains(requested) {
            self.requested.push(requested.clone());
        }
        self.is_new = false;

        Ok(())
    }

    /// Writes property values in schema order as children of the current
    /// element, either all of them or only those changed since the last load.
    ///
    /// Read-only properties are never written.
    pub fn write_to_wire<W: WireWriter>(&self, writer: &mut W, only_dirty: bool) -> Result<(), Error> {
        for definition in self.schema.properties() {
            if definition.is_read_only() || (only_dirty && !self.dirty.contains(definition)) {
                continue;
            }

            if let Some(value) = self.values.get(definition) {
                value.write_to_wire(writer, definition.xml_name)?;
            }
        }

        Ok(())
    }

    /// Writes the changes made since the last load as update descriptions:
    /// a set-field element for each changed value and a delete-field element
    /// for each removed one.
    ///
    /// `field_suffix` is the object category, e.g. `Item` for
    /// `SetItemField`/`DeleteItemField`, and `element_name` names the
    /// element wrapping each new value.
    pub fn write_updates<W: WireWriter>(
        &self,
        writer: &mut W,
        field_suffix: &str,
        element_name: &str,
    ) -> Result<(), Error> {
        let set_field = format!("Set{field_suffix}Field");
        let delete_field = format!("Delete{field_suffix}Field");

        for definition in self.dirty_properties() {
            let value = match self.values.get(definition) {
                Some(value) => value,
                None => continue,
            };

            let update_name = if value.is_null() {
                &delete_field
            } else {
                &set_field
            };

            writer.start_element(XmlNamespace::Types, update_name)?;
            writer.set_type_name(update_name)?;

            writer.start_element(XmlNamespace::Types, "FieldURI")?;
            writer.set_type_name("PropertyUri")?;
            writer.write_attribute("FieldURI", WireScalar::Str(definition.uri))?;
            writer.end_element()?;

            if !value.is_null() {
                writer.start_element(XmlNamespace::Types, element_name)?;
                writer.set_type_name(element_name)?;
                value.write_to_wire(writer, definition.xml_name)?;
                writer.end_element()?;
            }

            writer.end_element()?;
        }

        Ok(())
    }

    /// Records a value assigned by the server, such as the identifier of a
    /// newly created object. Read-only properties may be merged.
    pub(crate) fn merge_server_value(&mut self, definition: Definition, value: PropertyValue) {
        self.original.insert(definition, value.clone());
        self.values.insert(definition, value);
        self.dirty.remove(definition);
    }

    /// Marks the current state as saved to the server.
    pub fn commit(&mut self) {
        self.dirty.clear();
        self.original = self.values.clone();
        self.is_new = false;
    }
}
