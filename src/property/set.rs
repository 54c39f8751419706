/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{
    enums::{BasePropertySet, BodyType, XmlNamespace},
    schema::ServiceObjectSchema,
    schema_names::WireEnum,
    validate,
    version::ExchangeVersion,
    wire::{WireScalar, WireWriter},
    Error,
};

use super::PropertyDefinition;

/// The set of properties to request for an object: a base set plus any
/// number of explicitly named properties.
///
/// Sets are immutable; the builder methods return a new set.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySet {
    base: BasePropertySet,
    additional: Vec<&'static PropertyDefinition>,
    body_type: Option<BodyType>,
}

impl Default for PropertySet {
    fn default() -> Self {
        PropertySet::first_class_properties()
    }
}

impl PropertySet {
    pub fn new(
        base: BasePropertySet,
        additional: impl IntoIterator<Item = &'static PropertyDefinition>,
    ) -> Self {
        PropertySet {
            base,
            additional: Vec::new(),
            body_type: None,
        }
        .with_additional(additional)
    }

    pub fn id_only() -> Self {
        PropertySet::new(BasePropertySet::IdOnly, [])
    }

    pub fn first_class_properties() -> Self {
        PropertySet::new(BasePropertySet::FirstClassProperties, [])
    }

    /// Returns a set which also requests `additional`. Properties already in
    /// the set are not repeated.
    pub fn with_additional(
        mut self,
        additional: impl IntoIterator<Item = &'static PropertyDefinition>,
    ) -> Self {
        for definition in additional {
            if !self.additional.contains(&definition) {
                self.additional.push(definition);
            }
        }
        self
    }

    /// Returns a set requesting bodies in the given format.
    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = Some(body_type);
        self
    }

    pub fn base(&self) -> BasePropertySet {
        self.base
    }

    pub fn additional(&self) -> &[&'static PropertyDefinition] {
        &self.additional
    }

    pub fn body_type(&self) -> Option<BodyType> {
        self.body_type
    }

    /// Whether a response to a request for this set would include
    /// `definition` for objects of the given schema, were it set.
    pub fn contains(&self, definition: &PropertyDefinition, schema: &ServiceObjectSchema) -> bool {
        if self.additional.iter().any(|additional| *additional == definition) {
            return true;
        }

        match self.base {
            BasePropertySet::IdOnly => schema
                .id_property()
                .is_some_and(|id_property| id_property == definition),
            BasePropertySet::Default | BasePropertySet::FirstClassProperties => {
                schema.contains(definition) && !definition.must_be_explicitly_loaded()
            }
        }
    }

    /// Checks that every part of the set is understood by `version`.
    pub fn validate_for(&self, version: ExchangeVersion) -> Result<(), Error> {
        validate::validate_enum_version(self.base, version)?;
        if let Some(body_type) = self.body_type {
            validate::validate_enum_version(body_type, version)?;
        }
        for definition in &self.additional {
            definition.check_version(version)?;
        }

        Ok(())
    }

    /// Writes the set as a response shape element, e.g. `ItemShape`.
    pub(crate) fn write_to_wire<W: WireWriter>(
        &self,
        writer: &mut W,
        shape_name: &str,
        shape_type_name: &str,
    ) -> Result<(), Error> {
        writer.start_element(XmlNamespace::Messages, shape_name)?;
        writer.set_type_name(shape_type_name)?;

        writer.write_element(
            XmlNamespace::Types,
            "BaseShape",
            WireScalar::Enum(self.base.schema_name()),
        )?;

        if let Some(body_type) = self.body_type {
            writer.write_element(
                XmlNamespace::Types,
                "BodyType",
                WireScalar::Enum(body_type.schema_name()),
            )?;
        }

        if !self.additional.is_empty() {
            writer.start_array(XmlNamespace::Types, "AdditionalProperties")?;
            for definition in &self.additional {
                writer.start_element(XmlNamespace::Types, "FieldURI")?;
                writer.set_type_name("PropertyUri")?;
                writer.write_attribute("FieldURI", WireScalar::Str(definition.uri))?;
                writer.end_element()?;
            }
            writer.end_array()?;
        }

        writer.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema, test_utils::assert_serialized_xml, PropertyError, ValidationError};

    #[test]
    fn base_sets_and_explicit_properties() {
        let first_class = PropertySet::first_class_properties();
        assert!(first_class.contains(&schema::SUBJECT, &schema::MESSAGE_SCHEMA));
        assert!(!first_class.contains(&schema::UNIQUE_BODY, &schema::MESSAGE_SCHEMA));

        let with_unique_body = first_class.clone().with_additional([&schema::UNIQUE_BODY]);
        assert!(with_unique_body.contains(&schema::UNIQUE_BODY, &schema::MESSAGE_SCHEMA));

        // The original set is unaffected.
        assert!(!first_class.contains(&schema::UNIQUE_BODY, &schema::MESSAGE_SCHEMA));

        let id_only = PropertySet::id_only();
        assert!(id_only.contains(&schema::ITEM_ID, &schema::MESSAGE_SCHEMA));
        assert!(!id_only.contains(&schema::SUBJECT, &schema::MESSAGE_SCHEMA));
    }

    #[test]
    fn additional_properties_are_not_repeated() {
        let set = PropertySet::id_only()
            .with_additional([&schema::SUBJECT, &schema::IMPORTANCE])
            .with_additional([&schema::SUBJECT]);
        assert_eq!(set.additional().len(), 2);
    }

    #[test]
    fn version_validation() {
        let set = PropertySet::id_only().with_additional([&schema::UNIQUE_BODY]);
        assert!(matches!(
            set.validate_for(ExchangeVersion::Exchange2007_SP1),
            Err(Error::Property(PropertyError::VersionIncompatible { .. }))
        ));
        assert!(set.validate_for(ExchangeVersion::Exchange2010).is_ok());

        let set = PropertySet::first_class_properties().with_body_type(BodyType::Best);
        assert!(matches!(
            set.validate_for(ExchangeVersion::Exchange2010_SP2),
            Err(Error::Validation(ValidationError::EnumValueVersion { .. }))
        ));
    }

    #[test]
    fn shape_serialization() {
        let set = PropertySet::first_class_properties()
            .with_body_type(BodyType::Text)
            .with_additional([&schema::UNIQUE_BODY]);

        assert_serialized_xml(
            |writer| set.write_to_wire(writer, "ItemShape", "ItemResponseShape"),
            concat!(
                "<m:ItemShape>",
                "<t:BaseShape>AllProperties</t:BaseShape>",
                "<t:BodyType>Text</t:BodyType>",
                r#"<t:AdditionalProperties><t:FieldURI FieldURI="item:UniqueBody"/></t:AdditionalProperties>"#,
                "</m:ItemShape>",
            ),
        );
    }
}
