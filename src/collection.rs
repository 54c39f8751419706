/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Reading polymorphic collections of service objects.

use crate::{
    object::{ObjectCategory, ServiceObject},
    property::PropertySet,
    registry::{BindingContext, TypeRegistry},
    wire::WireNode,
    DeserializationError, Error,
};

/// How a collection read treats entries of unregistered types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Entries of unknown types are skipped, so that types introduced by
    /// newer servers do not break reading.
    #[default]
    Lenient,

    /// Entries of unknown types fail the read.
    Strict,
}

/// Instantiates and loads the entries of a wire collection.
#[derive(Clone, Copy, Debug)]
pub struct CollectionReader<'a> {
    registry: &'a TypeRegistry,
    binding: BindingContext<'a>,
    property_set: &'a PropertySet,
    expected: Option<ObjectCategory>,
    mode: ReadMode,
}

impl<'a> CollectionReader<'a> {
    pub fn new(binding: BindingContext<'a>, property_set: &'a PropertySet) -> Self {
        CollectionReader {
            registry: TypeRegistry::global(),
            binding,
            property_set,
            expected: None,
            mode: ReadMode::default(),
        }
    }

    pub fn with_registry(mut self, registry: &'a TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Requires every entry to be of the given category.
    pub fn expecting(mut self, category: ObjectCategory) -> Self {
        self.expected = Some(category);
        self
    }

    pub fn with_mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reads every entry, in order.
    pub fn read<'n>(
        &self,
        nodes: impl IntoIterator<Item = WireNode<'n>>,
    ) -> Result<Vec<ServiceObject>, Error> {
        let mut objects = Vec::new();
        for node in nodes {
            if let Some(object) = self.read_entry(node)? {
                objects.push(object);
            }
        }

        Ok(objects)
    }

    /// Reads every entry as a typed wrapper, e.g. [`crate::Item`].
    pub fn read_as<'n, T>(
        &self,
        nodes: impl IntoIterator<Item = WireNode<'n>>,
    ) -> Result<Vec<T>, Error>
    where
        T: TryFrom<ServiceObject, Error = Error>,
    {
        self.read(nodes)?.into_iter().map(T::try_from).collect()
    }

    fn read_entry(&self, node: WireNode<'_>) -> Result<Option<ServiceObject>, Error> {
        let type_name = node
            .type_name()
            .ok_or_else(|| DeserializationError::MissingKey {
                key: crate::json::TYPE_KEY.to_string(),
            })?;

        let Some(mut object) = self.registry.create(type_name, self.binding)? else {
            return match self.mode {
                ReadMode::Lenient => {
                    log::warn!("skipping collection entry of unknown type `{type_name}`");
                    Ok(None)
                }
                ReadMode::Strict => Err(DeserializationError::UnknownObjectType {
                    type_name: type_name.to_owned(),
                }
                .into()),
            };
        };

        if object.type_name() != type_name
            || self
                .expected
                .is_some_and(|expected| expected != object.category())
        {
            return Err(DeserializationError::TypeMismatch {
                declared: type_name.to_owned(),
                resolved: object.type_name(),
            }
            .into());
        }

        object.load_from_wire(node, self.property_set, true)?;

        Ok(Some(object))
    }
}

/// Reads the collection found under `name` in `parent`, skipping entries of
/// unknown types.
pub fn read_collection(
    parent: WireNode<'_>,
    name: &str,
    binding: BindingContext<'_>,
    property_set: &PropertySet,
    expected: ObjectCategory,
) -> Result<Vec<ServiceObject>, Error> {
    let nodes = parent.array(name)?;
    CollectionReader::new(binding, property_set)
        .expecting(expected)
        .read(nodes)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::UtcOffset;

    use super::*;
    use crate::{
        object::{Item, ServiceContext, MESSAGE},
        registry::RegistryEntry,
        schema,
        wire::XmlElement,
        ExchangeVersion, JsonObject, PropertyValue,
    };

    fn context() -> ServiceContext {
        ServiceContext {
            version: ExchangeVersion::Exchange2013,
            time_zone: UtcOffset::UTC,
        }
    }

    const ITEMS: &str = r#"<Items>
        <Message><ItemId Id="A"/><Subject>First</Subject></Message>
        <Hologram><ItemId Id="B"/></Hologram>
        <CalendarItem><ItemId Id="C"/><Subject>Standup</Subject></CalendarItem>
    </Items>"#;

    #[test]
    fn unknown_entries_are_skipped_in_lenient_mode() {
        let element = XmlElement::parse(ITEMS.as_bytes()).unwrap();
        let context = context();
        let property_set = PropertySet::default();

        let objects = CollectionReader::new(BindingContext::Service(&context), &property_set)
            .read(element.children.iter().map(WireNode::Xml))
            .unwrap();

        assert_eq!(objects.len(), 2, "the unknown entry should be skipped");
        assert_eq!(objects[0].type_name(), "Message");
        assert_eq!(objects[1].type_name(), "CalendarItem");
        assert_eq!(
            objects[1].get(&schema::SUBJECT),
            Ok(Some(PropertyValue::from("Standup")))
        );
        assert!(!objects[0].is_new());
        assert!(!objects[0].is_dirty());
    }

    #[test]
    fn unknown_entries_fail_strict_reads() {
        let element = XmlElement::parse(ITEMS.as_bytes()).unwrap();
        let context = context();
        let property_set = PropertySet::default();

        let result = CollectionReader::new(BindingContext::Service(&context), &property_set)
            .with_mode(ReadMode::Strict)
            .read(element.children.iter().map(WireNode::Xml));

        assert!(matches!(
            result,
            Err(Error::Deserialization(DeserializationError::UnknownObjectType { type_name }))
                if type_name == "Hologram"
        ));
    }

    #[test]
    fn entries_of_the_wrong_category_are_rejected() {
        let element = XmlElement::parse(
            br#"<RootFolder><Folders><Message><ItemId Id="A"/></Message></Folders></RootFolder>"#,
        )
        .unwrap();
        let context = context();
        let property_set = PropertySet::default();

        let result = read_collection(
            WireNode::Xml(&element),
            "Folders",
            BindingContext::Service(&context),
            &property_set,
            ObjectCategory::Folder,
        );
        assert!(matches!(
            result,
            Err(Error::Deserialization(DeserializationError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn constructor_must_produce_the_declared_type() {
        // A registry which maps `Message` to a constructor of plain items.
        let registry = TypeRegistry::new([RegistryEntry {
            kind: &MESSAGE,
            for_service: |context: &ServiceContext| {
                ServiceObject::new_for_service(&crate::object::ITEM, context)
            },
            for_attachment: None,
        }]);
        let element = XmlElement::parse(br#"<Message><ItemId Id="A"/></Message>"#).unwrap();
        let context = context();
        let property_set = PropertySet::default();

        let result = CollectionReader::new(BindingContext::Service(&context), &property_set)
            .with_registry(&registry)
            .read([WireNode::Xml(&element)]);

        assert!(matches!(
            result,
            Err(Error::Deserialization(DeserializationError::TypeMismatch { declared, resolved }))
                if declared == "Message" && resolved == "Item"
        ));
    }

    #[test]
    fn typed_json_collection() {
        let response = JsonObject::from_json_value(json!({
            "Items": [
                { "__type": "Message:#Exchange", "ItemId": { "Id": "A" }, "Subject": "Hi" },
                { "__type": "Sticker:#Exchange", "ItemId": { "Id": "B" } },
            ]
        }))
        .unwrap();
        let context = context();
        let property_set = PropertySet::default();

        let nodes = WireNode::Json(&response).array("Items").unwrap();
        let items: Vec<Item> = CollectionReader::new(BindingContext::Service(&context), &property_set)
            .read_as(nodes)
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].subject(), Ok(Some("Hi".to_string())));
        assert_eq!(items[0].id().map(|id| id.id), Some("A".to_string()));
    }

    #[test]
    fn untyped_json_entries_are_rejected() {
        let response = JsonObject::from_json_value(json!({
            "Items": [{ "Subject": "Hi" }]
        }))
        .unwrap();
        let context = context();
        let property_set = PropertySet::default();

        let result = read_collection(
            WireNode::Json(&response),
            "Items",
            BindingContext::Service(&context),
            &property_set,
            ObjectCategory::Item,
        );
        assert!(matches!(
            result,
            Err(Error::Deserialization(DeserializationError::MissingKey { .. }))
        ));
    }
}
