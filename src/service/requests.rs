/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The operations supported by [`super::ExchangeService`], each knowing how
//! to validate itself, write its body and read the payload of one of its
//! response messages.

use crate::{
    collection::{CollectionReader, ReadMode},
    enums::{
        ConflictResolutionMode, DeleteMode, MessageDisposition, WellKnownFolderName, XmlNamespace,
    },
    object::{ObjectBinding, ObjectCategory, ServiceContext, ServiceObject},
    property::ServiceId,
    registry::{BindingContext, TypeRegistry},
    schema_names::WireEnum,
    validate::{self, SelfValidating},
    version::ExchangeVersion,
    wire::{WireNode, WireScalar, WireWriter},
    DeserializationError, Error, Folder, Item, PropertySet, ValidationError,
};

/// An EWS operation over a batch of elements, answered with one response
/// message per element.
pub(crate) trait ServiceRequest {
    /// What a successful response message carries.
    type Output;

    /// The operation's name, which is also the name of its request element.
    const NAME: &'static str;

    const MIN_VERSION: ExchangeVersion = ExchangeVersion::Exchange2007_SP1;

    /// The number of response messages the server answers with.
    fn expected_responses(&self) -> usize;

    /// Checks the request's parameters against the targeted version.
    fn validate(&self, version: ExchangeVersion) -> Result<(), Error>;

    /// Writes the content of the request element.
    fn write_body<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error>;

    fn read_payload(
        &self,
        message: WireNode<'_>,
        context: &ServiceContext,
        registry: &TypeRegistry,
    ) -> Result<Self::Output, Error>;
}

/// A folder addressed either by its identifier or by its well-known name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FolderTarget {
    Id(ServiceId),
    WellKnown(WellKnownFolderName),
}

impl FolderTarget {
    fn write_to_wire<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        match self {
            FolderTarget::Id(id) => id.write_to_wire(writer, "FolderId"),
            FolderTarget::WellKnown(name) => {
                writer.start_element(XmlNamespace::Types, "DistinguishedFolderId")?;
                writer.set_type_name("DistinguishedFolderId")?;
                writer.write_attribute("Id", WireScalar::Enum(name.schema_name()))?;
                writer.end_element()
            }
        }
    }

    fn validate_version(&self, version: ExchangeVersion) -> Result<(), ValidationError> {
        match self {
            FolderTarget::Id(_) => Ok(()),
            FolderTarget::WellKnown(name) => validate::validate_enum_version(*name, version),
        }
    }
}

impl SelfValidating for FolderTarget {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            FolderTarget::Id(id) => id.validate(),
            FolderTarget::WellKnown(_) => Ok(()),
        }
    }
}

impl From<ServiceId> for FolderTarget {
    fn from(id: ServiceId) -> Self {
        FolderTarget::Id(id)
    }
}

impl From<WellKnownFolderName> for FolderTarget {
    fn from(name: WellKnownFolderName) -> Self {
        FolderTarget::WellKnown(name)
    }
}

fn write_ids<W: WireWriter>(
    writer: &mut W,
    array_name: &str,
    element_name: &str,
    ids: &[ServiceId],
) -> Result<(), Error> {
    writer.start_array(XmlNamespace::Messages, array_name)?;
    for id in ids {
        id.write_to_wire(writer, element_name)?;
    }
    writer.end_array()
}

/// Reads the single object of a collection holding one entry per requested
/// identifier.
fn read_single_object<T>(
    message: WireNode<'_>,
    collection_name: &str,
    category: ObjectCategory,
    property_set: &PropertySet,
    context: &ServiceContext,
    registry: &TypeRegistry,
) -> Result<T, Error>
where
    T: TryFrom<ServiceObject, Error = Error>,
{
    let nodes = message.array(collection_name)?;
    let mut objects: Vec<T> = CollectionReader::new(BindingContext::Service(context), property_set)
        .with_registry(registry)
        .expecting(category)
        .with_mode(ReadMode::Strict)
        .read_as(nodes)?;

    if objects.len() != 1 {
        return Err(DeserializationError::UnexpectedElement {
            expected: "exactly one object",
            found: format!("{} objects", objects.len()),
        }
        .into());
    }

    Ok(objects.remove(0))
}

/// Reads the identifier of the object returned by a create or update, if the
/// server returned one.
fn read_returned_id(
    message: WireNode<'_>,
    collection_name: &str,
    id_name: &str,
) -> Result<Option<ServiceId>, Error> {
    let Some(object) = message.array(collection_name)?.into_iter().next() else {
        return Ok(None);
    };

    let id = object
        .child(id_name)
        .map(ServiceId::read_from_wire)
        .transpose()?;

    Ok(id)
}

/// Fetches items by identifier.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getitem>
#[derive(Debug)]
pub(crate) struct GetItem<'a> {
    pub item_ids: &'a [ServiceId],
    pub property_set: &'a PropertySet,
}

impl ServiceRequest for GetItem<'_> {
    type Output = Item;

    const NAME: &'static str = "GetItem";

    fn expected_responses(&self) -> usize {
        self.item_ids.len()
    }

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        validate::validate_collection_not_empty(self.item_ids, "item_ids")?;
        validate::validate_each(self.item_ids)?;
        self.property_set.validate_for(version)
    }

    fn write_body<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        self.property_set
            .write_to_wire(writer, "ItemShape", "ItemResponseShape")?;
        write_ids(writer, "ItemIds", "ItemId", self.item_ids)
    }

    fn read_payload(
        &self,
        message: WireNode<'_>,
        context: &ServiceContext,
        registry: &TypeRegistry,
    ) -> Result<Item, Error> {
        read_single_object(
            message,
            "Items",
            ObjectCategory::Item,
            self.property_set,
            context,
            registry,
        )
    }
}

/// Fetches folders by identifier or well-known name.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getfolder>
#[derive(Debug)]
pub(crate) struct GetFolder<'a> {
    pub folders: &'a [FolderTarget],
    pub property_set: &'a PropertySet,
}

impl ServiceRequest for GetFolder<'_> {
    type Output = Folder;

    const NAME: &'static str = "GetFolder";

    fn expected_responses(&self) -> usize {
        self.folders.len()
    }

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        validate::validate_collection_not_empty(self.folders, "folder_ids")?;
        validate::validate_each(self.folders)?;
        for folder in self.folders {
            folder.validate_version(version)?;
        }
        self.property_set.validate_for(version)
    }

    fn write_body<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        self.property_set
            .write_to_wire(writer, "FolderShape", "FolderResponseShape")?;

        writer.start_array(XmlNamespace::Messages, "FolderIds")?;
        for folder in self.folders {
            folder.write_to_wire(writer)?;
        }
        writer.end_array()
    }

    fn read_payload(
        &self,
        message: WireNode<'_>,
        context: &ServiceContext,
        registry: &TypeRegistry,
    ) -> Result<Folder, Error> {
        read_single_object(
            message,
            "Folders",
            ObjectCategory::Folder,
            self.property_set,
            context,
            registry,
        )
    }
}

/// Saves new items, and optionally sends them if they are messages.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/createitem>
#[derive(Debug)]
pub(crate) struct CreateItem<'a> {
    pub items: &'a [ServiceObject],
    pub saved_item_folder: Option<&'a FolderTarget>,
    pub message_disposition: MessageDisposition,
}

impl ServiceRequest for CreateItem<'_> {
    /// The identifier the server assigned, unless the item was only sent.
    type Output = Option<ServiceId>;

    const NAME: &'static str = "CreateItem";

    fn expected_responses(&self) -> usize {
        self.items.len()
    }

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        validate::validate_collection_not_empty(self.items, "items")?;
        validate::validate_enum_version(self.message_disposition, version)?;

        if let Some(folder) = self.saved_item_folder {
            folder.validate()?;
            folder.validate_version(version)?;
        }

        for item in self.items {
            if item.category() != ObjectCategory::Item {
                return Err(ValidationError::InvalidArgument {
                    name: "items",
                    reason: format!("`{}` is not an item", item.type_name()),
                }
                .into());
            }
            if !item.is_new() || *item.binding() != ObjectBinding::Service {
                return Err(ValidationError::InvalidArgument {
                    name: "items",
                    reason: "only new items can be created".to_string(),
                }
                .into());
            }
            validate::validate_object_kind_version(item.kind(), version)?;
        }

        Ok(())
    }

    fn write_body<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_attribute(
            "MessageDisposition",
            WireScalar::Enum(self.message_disposition.schema_name()),
        )?;

        if let Some(folder) = self.saved_item_folder {
            writer.start_element(XmlNamespace::Messages, "SavedItemFolderId")?;
            writer.set_type_name("TargetFolderId")?;
            folder.write_to_wire(writer)?;
            writer.end_element()?;
        }

        writer.start_array(XmlNamespace::Messages, "Items")?;
        for item in self.items {
            item.write_to_wire(writer, false)?;
        }
        writer.end_array()
    }

    fn read_payload(
        &self,
        message: WireNode<'_>,
        _context: &ServiceContext,
        _registry: &TypeRegistry,
    ) -> Result<Option<ServiceId>, Error> {
        read_returned_id(message, "Items", "ItemId")
    }
}

/// Saves the pending changes of existing items.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/updateitem>
#[derive(Debug)]
pub(crate) struct UpdateItem<'a> {
    pub items: &'a [ServiceObject],
    pub conflict_resolution: ConflictResolutionMode,
}

impl ServiceRequest for UpdateItem<'_> {
    /// The item's identifier with its new change key.
    type Output = Option<ServiceId>;

    const NAME: &'static str = "UpdateItem";

    fn expected_responses(&self) -> usize {
        self.items.len()
    }

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        validate::validate_collection_not_empty(self.items, "items")?;
        validate::validate_enum_version(self.conflict_resolution, version)?;

        for item in self.items {
            if item.category() != ObjectCategory::Item {
                return Err(ValidationError::InvalidArgument {
                    name: "items",
                    reason: format!("`{}` is not an item", item.type_name()),
                }
                .into());
            }
            if item.is_new() {
                return Err(ValidationError::InvalidArgument {
                    name: "items",
                    reason: "new items must be created before they can be updated".to_string(),
                }
                .into());
            }
            let id = validate::validate_param(item.id(), "ItemId")?;
            id.validate()?;
            if !item.is_dirty() {
                return Err(ValidationError::InvalidArgument {
                    name: "items",
                    reason: format!("item `{}` has no changes to save", id.id),
                }
                .into());
            }
        }

        Ok(())
    }

    fn write_body<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_attribute(
            "ConflictResolution",
            WireScalar::Enum(self.conflict_resolution.schema_name()),
        )?;
        writer.write_attribute(
            "MessageDisposition",
            WireScalar::Enum(MessageDisposition::SaveOnly.schema_name()),
        )?;

        writer.start_array(XmlNamespace::Messages, "ItemChanges")?;
        for item in self.items {
            item.write_changes(writer)?;
        }
        writer.end_array()
    }

    fn read_payload(
        &self,
        message: WireNode<'_>,
        _context: &ServiceContext,
        _registry: &TypeRegistry,
    ) -> Result<Option<ServiceId>, Error> {
        read_returned_id(message, "Items", "ItemId")
    }
}

/// Deletes items by identifier.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/deleteitem>
#[derive(Debug)]
pub(crate) struct DeleteItem<'a> {
    pub item_ids: &'a [ServiceId],
    pub delete_type: DeleteMode,
}

impl ServiceRequest for DeleteItem<'_> {
    type Output = ();

    const NAME: &'static str = "DeleteItem";

    fn expected_responses(&self) -> usize {
        self.item_ids.len()
    }

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        validate::validate_collection_not_empty(self.item_ids, "item_ids")?;
        validate::validate_each(self.item_ids)?;
        Ok(validate::validate_enum_version(self.delete_type, version)?)
    }

    fn write_body<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_attribute("DeleteType", WireScalar::Enum(self.delete_type.schema_name()))?;
        write_ids(writer, "ItemIds", "ItemId", self.item_ids)
    }

    fn read_payload(
        &self,
        _message: WireNode<'_>,
        _context: &ServiceContext,
        _registry: &TypeRegistry,
    ) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;

    use super::*;
    use crate::{
        object::{FOLDER, MESSAGE},
        test_utils::assert_serialized_xml,
        wire::XmlElement,
        BasePropertySet, PropertyValue,
    };

    fn context() -> ServiceContext {
        ServiceContext {
            version: ExchangeVersion::Exchange2013,
            time_zone: UtcOffset::UTC,
        }
    }

    #[test]
    fn folder_targets() {
        assert_serialized_xml(
            |writer| FolderTarget::WellKnown(WellKnownFolderName::Inbox).write_to_wire(writer),
            r#"<t:DistinguishedFolderId Id="inbox"/>"#,
        );
        assert_serialized_xml(
            |writer| FolderTarget::Id(ServiceId::new("AQMk")).write_to_wire(writer),
            r#"<t:FolderId Id="AQMk"/>"#,
        );

        assert!(FolderTarget::WellKnown(WellKnownFolderName::ToDoSearch)
            .validate_version(ExchangeVersion::Exchange2010)
            .is_err());
        assert_eq!(
            FolderTarget::Id(ServiceId::new("")).validate(),
            Err(ValidationError::EmptyParameter { name: "Id" })
        );
    }

    #[test]
    fn delete_item_body() {
        let ids = [ServiceId::new("AAA"), ServiceId::with_change_key("BBB", "CK")];
        let request = DeleteItem {
            item_ids: &ids,
            delete_type: DeleteMode::MoveToDeletedItems,
        };

        assert_eq!(request.expected_responses(), 2);
        assert_serialized_xml(
            |writer| {
                writer.start_element(XmlNamespace::Messages, DeleteItem::NAME)?;
                request.write_body(writer)?;
                writer.end_element()
            },
            r#"<m:DeleteItem DeleteType="MoveToDeletedItems"><m:ItemIds><t:ItemId Id="AAA"/><t:ItemId Id="BBB" ChangeKey="CK"/></m:ItemIds></m:DeleteItem>"#,
        );

        let empty = DeleteItem {
            item_ids: &[],
            delete_type: DeleteMode::HardDelete,
        };
        assert!(matches!(
            empty.validate(ExchangeVersion::Exchange2013),
            Err(Error::Validation(ValidationError::EmptyCollection { name: "item_ids" }))
        ));
    }

    #[test]
    fn create_item_validation() {
        let context = context();

        let folder = ServiceObject::new_for_service(&FOLDER, &context);
        let request = CreateItem {
            items: std::slice::from_ref(&folder),
            saved_item_folder: None,
            message_disposition: MessageDisposition::SaveOnly,
        };
        assert!(matches!(
            request.validate(ExchangeVersion::Exchange2013),
            Err(Error::Validation(ValidationError::InvalidArgument { name: "items", .. }))
        ));

        let mut saved = ServiceObject::new_for_service(&MESSAGE, &context);
        saved.merge_server_id(ServiceId::new("AAA"));
        saved.commit();
        let saved = ServiceObject::new_for_attachment(
            &MESSAGE,
            &crate::object::AttachmentContext {
                version: context.version,
                time_zone: context.time_zone,
                parent_item_id: saved.id(),
                attachment_id: None,
            },
        );
        let request = CreateItem {
            items: std::slice::from_ref(&saved),
            saved_item_folder: None,
            message_disposition: MessageDisposition::SaveOnly,
        };
        assert!(request.validate(ExchangeVersion::Exchange2013).is_err());
    }

    #[test]
    fn create_item_body() {
        let mut message = ServiceObject::new_for_service(&MESSAGE, &context());
        message
            .set(&crate::schema::SUBJECT, PropertyValue::from("Hello"))
            .unwrap();

        let folder = FolderTarget::WellKnown(WellKnownFolderName::Drafts);
        let request = CreateItem {
            items: std::slice::from_ref(&message),
            saved_item_folder: Some(&folder),
            message_disposition: MessageDisposition::SaveOnly,
        };
        assert!(request.validate(ExchangeVersion::Exchange2013).is_ok());

        assert_serialized_xml(
            |writer| {
                writer.start_element(XmlNamespace::Messages, CreateItem::NAME)?;
                request.write_body(writer)?;
                writer.end_element()
            },
            r#"<m:CreateItem MessageDisposition="SaveOnly"><m:SavedItemFolderId><t:DistinguishedFolderId Id="drafts"/></m:SavedItemFolderId><m:Items><t:Message><t:Subject>Hello</t:Subject></t:Message></m:Items></m:CreateItem>"#,
        );
    }

    #[test]
    fn update_requires_saved_items() {
        let message = ServiceObject::new_for_service(&MESSAGE, &context());
        let request = UpdateItem {
            items: std::slice::from_ref(&message),
            conflict_resolution: ConflictResolutionMode::AutoResolve,
        };

        assert!(matches!(
            request.validate(ExchangeVersion::Exchange2013),
            Err(Error::Validation(ValidationError::InvalidArgument { name: "items", .. }))
        ));
    }

    #[test]
    fn update_requires_changes() {
        let element = XmlElement::parse(
            br#"<Message><ItemId Id="AAA" ChangeKey="CK"/><Subject>Old</Subject></Message>"#,
        )
        .unwrap();
        let mut message = ServiceObject::new_for_service(&MESSAGE, &context());
        message
            .load_from_wire(WireNode::Xml(&element), &PropertySet::first_class_properties(), true)
            .unwrap();

        let validate = |message: &ServiceObject| {
            UpdateItem {
                items: std::slice::from_ref(message),
                conflict_resolution: ConflictResolutionMode::AutoResolve,
            }
            .validate(ExchangeVersion::Exchange2013)
        };

        match validate(&message) {
            Err(Error::Validation(ValidationError::InvalidArgument { name, reason })) => {
                assert_eq!(name, "items");
                assert!(reason.contains("AAA"), "{reason}");
            }
            other => panic!("expected an invalid argument, got {other:?}"),
        }

        message.set(&crate::schema::SUBJECT, "New").unwrap();
        assert!(validate(&message).is_ok());
    }

    #[test]
    fn get_item_payload() {
        let xml = r#"<m:GetItemResponseMessage xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" ResponseClass="Success">
            <m:ResponseCode>NoError</m:ResponseCode>
            <m:Items>
                <t:Message>
                    <t:ItemId Id="AAA" ChangeKey="CK"/>
                    <t:Subject>Quarterly report</t:Subject>
                </t:Message>
            </m:Items>
        </m:GetItemResponseMessage>"#;
        let message = XmlElement::parse(xml.as_bytes()).unwrap();

        let ids = [ServiceId::new("AAA")];
        let property_set = PropertySet::new(BasePropertySet::IdOnly, [&crate::schema::SUBJECT]);
        let request = GetItem {
            item_ids: &ids,
            property_set: &property_set,
        };

        let item = request
            .read_payload(WireNode::Xml(&message), &context(), TypeRegistry::global())
            .unwrap();
        assert_eq!(item.id(), Some(ServiceId::with_change_key("AAA", "CK")));
        assert_eq!(item.subject().unwrap().as_deref(), Some("Quarterly report"));
    }

    #[test]
    fn returned_ids() {
        let xml = r#"<m:CreateItemResponseMessage xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" ResponseClass="Success">
            <m:ResponseCode>NoError</m:ResponseCode>
            <m:Items><t:Message><t:ItemId Id="NEW" ChangeKey="CK1"/></t:Message></m:Items>
        </m:CreateItemResponseMessage>"#;
        let message = XmlElement::parse(xml.as_bytes()).unwrap();
        assert_eq!(
            read_returned_id(WireNode::Xml(&message), "Items", "ItemId").unwrap(),
            Some(ServiceId::with_change_key("NEW", "CK1"))
        );

        let sent_only = XmlElement::parse(
            br#"<m:CreateItemResponseMessage xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Items/></m:CreateItemResponseMessage>"#,
        )
        .unwrap();
        assert_eq!(
            read_returned_id(WireNode::Xml(&sent_only), "Items", "ItemId").unwrap(),
            None
        );
    }
}
