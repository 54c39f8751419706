/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Service objects and the kinds they can be instantiated as.

use time::UtcOffset;

use crate::{
    enums::{BodyType, Importance, XmlNamespace},
    property::{BodyContent, PropertyBag, PropertySet, PropertyValue, ServiceId},
    schema::{self, ServiceObjectSchema},
    version::ExchangeVersion,
    wire::{WireNode, WireWriter},
    DeserializationError, Error, PropertyDefinition, PropertyError,
};

/// The broad family an object type belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    Item,
    Folder,
    Persona,
}

impl ObjectCategory {
    pub fn name(self) -> &'static str {
        match self {
            ObjectCategory::Item => "Item",
            ObjectCategory::Folder => "Folder",
            ObjectCategory::Persona => "Persona",
        }
    }
}

/// A concrete type of service object: its wire name, family, schema and the
/// oldest server version which supports it.
#[derive(Debug)]
pub struct ServiceObjectKind {
    pub type_name: &'static str,
    pub category: ObjectCategory,
    pub schema: &'static ServiceObjectSchema,
    pub min_version: ExchangeVersion,
}

impl PartialEq for ServiceObjectKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for ServiceObjectKind {}

pub static ITEM: ServiceObjectKind = ServiceObjectKind {
    type_name: "Item",
    category: ObjectCategory::Item,
    schema: &schema::ITEM_SCHEMA,
    min_version: ExchangeVersion::Exchange2007_SP1,
};

pub static MESSAGE: ServiceObjectKind = ServiceObjectKind {
    type_name: "Message",
    category: ObjectCategory::Item,
    schema: &schema::MESSAGE_SCHEMA,
    min_version: ExchangeVersion::Exchange2007_SP1,
};

pub static CALENDAR_ITEM: ServiceObjectKind = ServiceObjectKind {
    type_name: "CalendarItem",
    category: ObjectCategory::Item,
    schema: &schema::CALENDAR_ITEM_SCHEMA,
    min_version: ExchangeVersion::Exchange2007_SP1,
};

pub static FOLDER: ServiceObjectKind = ServiceObjectKind {
    type_name: "Folder",
    category: ObjectCategory::Folder,
    schema: &schema::FOLDER_SCHEMA,
    min_version: ExchangeVersion::Exchange2007_SP1,
};

pub static CALENDAR_FOLDER: ServiceObjectKind = ServiceObjectKind {
    type_name: "CalendarFolder",
    category: ObjectCategory::Folder,
    schema: &schema::CALENDAR_FOLDER_SCHEMA,
    min_version: ExchangeVersion::Exchange2007_SP1,
};

pub static CONTACTS_FOLDER: ServiceObjectKind = ServiceObjectKind {
    type_name: "ContactsFolder",
    category: ObjectCategory::Folder,
    schema: &schema::CONTACTS_FOLDER_SCHEMA,
    min_version: ExchangeVersion::Exchange2007_SP1,
};

pub static PERSONA: ServiceObjectKind = ServiceObjectKind {
    type_name: "Persona",
    category: ObjectCategory::Persona,
    schema: &schema::PERSONA_SCHEMA,
    min_version: ExchangeVersion::Exchange2013,
};

/// What an object is bound to when it is created through a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceContext {
    pub version: ExchangeVersion,

    /// The zone floating timestamps are interpreted in.
    pub time_zone: UtcOffset,
}

/// What an object is bound to when it is received as an attachment of
/// another item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentContext {
    pub version: ExchangeVersion,
    pub time_zone: UtcOffset,
    pub parent_item_id: Option<ServiceId>,
    pub attachment_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectBinding {
    Service,
    ParentAttachment {
        parent_item_id: Option<ServiceId>,
        attachment_id: Option<String>,
    },
}

/// A remote mailbox object: its kind, its property values and what it is
/// bound to.
#[derive(Clone, Debug)]
pub struct ServiceObject {
    kind: &'static ServiceObjectKind,
    bag: PropertyBag,
    binding: ObjectBinding,
}

impl ServiceObject {
    /// Creates a new, unsaved object.
    pub fn new_for_service(kind: &'static ServiceObjectKind, context: &ServiceContext) -> Self {
        ServiceObject {
            kind,
            bag: PropertyBag::new(kind.schema, context.version, context.time_zone, true),
            binding: ObjectBinding::Service,
        }
    }

    /// Creates an object embedded in an item attachment. Such objects are
    /// never saved on their own.
    pub fn new_for_attachment(kind: &'static ServiceObjectKind, context: &AttachmentContext) -> Self {
        ServiceObject {
            kind,
            bag: PropertyBag::new(kind.schema, context.version, context.time_zone, false),
            binding: ObjectBinding::ParentAttachment {
                parent_item_id: context.parent_item_id.clone(),
                attachment_id: context.attachment_id.clone(),
            },
        }
    }

    pub fn kind(&self) -> &'static ServiceObjectKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name
    }

    pub fn category(&self) -> ObjectCategory {
        self.kind.category
    }

    pub fn binding(&self) -> &ObjectBinding {
        &self.binding
    }

    pub fn bag(&self) -> &PropertyBag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    pub fn version(&self) -> ExchangeVersion {
        self.bag.version()
    }

    pub fn is_new(&self) -> bool {
        self.bag.is_new()
    }

    pub fn is_dirty(&self) -> bool {
        self.bag.is_dirty()
    }

    pub fn get(
        &self,
        definition: &'static PropertyDefinition,
    ) -> Result<Option<PropertyValue>, PropertyError> {
        self.bag.get(definition)
    }

    pub fn set(
        &mut self,
        definition: &'static PropertyDefinition,
        value: impl Into<PropertyValue>,
    ) -> Result<(), PropertyError> {
        self.bag.set(definition, value)
    }

    /// The object's identifier, if it has been loaded.
    pub fn id(&self) -> Option<ServiceId> {
        let id_property = self.kind.schema.id_property()?;
        self.bag.get_id(id_property).ok().flatten()
    }

    pub fn load_from_wire(
        &mut self,
        node: WireNode<'_>,
        requested: &PropertySet,
        clear: bool,
    ) -> Result<(), Error> {
        self.bag.load_from_wire(node, requested, clear)
    }

    /// Writes the object as an element named after its type.
    pub fn write_to_wire<W: WireWriter>(&self, writer: &mut W, only_dirty: bool) -> Result<(), Error> {
        writer.start_element(XmlNamespace::Types, self.kind.type_name)?;
        writer.set_type_name(self.kind.type_name)?;
        self.bag.write_to_wire(writer, only_dirty)?;
        writer.end_element()
    }

    /// Writes the object's identifier and its pending changes as an
    /// `ItemChange`/`FolderChange` element.
    pub fn write_changes<W: WireWriter>(&self, writer: &mut W) -> Result<(), Error> {
        let (change_name, id_name) = match self.kind.category {
            ObjectCategory::Item => ("ItemChange", "ItemId"),
            ObjectCategory::Folder => ("FolderChange", "FolderId"),
            ObjectCategory::Persona => {
                return Err(Error::InvalidWriterState("personas cannot be updated"))
            }
        };

        let id = self.id().ok_or(PropertyError::NotLoaded {
            property: id_name,
        })?;

        writer.start_element(XmlNamespace::Types, change_name)?;
        writer.set_type_name(change_name)?;
        id.write_to_wire(writer, id_name)?;
        writer.start_array(XmlNamespace::Types, "Updates")?;
        self.bag
            .write_updates(writer, self.kind.category.name(), self.kind.type_name)?;
        writer.end_array()?;
        writer.end_element()
    }

    /// Records the identifier the server assigned to the object.
    pub(crate) fn merge_server_id(&mut self, id: ServiceId) {
        if let Some(id_property) = self.kind.schema.id_property() {
            self.bag.merge_server_value(id_property, PropertyValue::Id(id));
        }
    }

    /// Marks the object's current state as saved.
    pub fn commit(&mut self) {
        self.bag.commit();
    }
}

/// A [`ServiceObject`] known to be an item.
#[derive(Clone, Debug)]
pub struct Item(ServiceObject);

impl Item {
    pub fn new(kind: &'static ServiceObjectKind, context: &ServiceContext) -> Result<Self, Error> {
        Item::try_from(ServiceObject::new_for_service(kind, context))
    }

    pub fn as_object(&self) -> &ServiceObject {
        &self.0
    }

    pub fn as_object_mut(&mut self) -> &mut ServiceObject {
        &mut self.0
    }

    pub fn into_object(self) -> ServiceObject {
        self.0
    }

    pub fn id(&self) -> Option<ServiceId> {
        self.0.id()
    }

    pub fn subject(&self) -> Result<Option<String>, PropertyError> {
        self.0.bag.get_string(&schema::SUBJECT)
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<(), PropertyError> {
        self.0.set(&schema::SUBJECT, subject.into())
    }

    pub fn body(&self) -> Result<Option<BodyContent>, PropertyError> {
        self.0.bag.get_body(&schema::BODY)
    }

    pub fn set_body(&mut self, body_type: BodyType, text: impl Into<String>) -> Result<(), PropertyError> {
        self.0.set(
            &schema::BODY,
            BodyContent {
                body_type,
                text: text.into(),
            },
        )
    }

    pub fn importance(&self) -> Result<Option<Importance>, PropertyError> {
        self.0.bag.get_enum(&schema::IMPORTANCE)
    }

    pub fn set_importance(&mut self, importance: Importance) -> Result<(), PropertyError> {
        self.0.set(&schema::IMPORTANCE, PropertyValue::from_enum(importance))
    }

    pub fn categories(&self) -> Result<Vec<String>, PropertyError> {
        Ok(self.0.bag.get_string_list(&schema::CATEGORIES)?.unwrap_or_default())
    }

    pub fn set_categories(&mut self, categories: Vec<String>) -> Result<(), PropertyError> {
        self.0.set(&schema::CATEGORIES, categories)
    }
}

impl TryFrom<ServiceObject> for Item {
    type Error = Error;

    fn try_from(object: ServiceObject) -> Result<Self, Self::Error> {
        match object.category() {
            ObjectCategory::Item => Ok(Item(object)),
            _ => Err(DeserializationError::TypeMismatch {
                declared: ObjectCategory::Item.name().to_owned(),
                resolved: object.type_name(),
            }
            .into()),
        }
    }
}

impl From<Item> for ServiceObject {
    fn from(item: Item) -> Self {
        item.0
    }
}

/// A [`ServiceObject`] known to be a folder.
#[derive(Clone, Debug)]
pub struct Folder(ServiceObject);

impl Folder {
    pub fn new(kind: &'static ServiceObjectKind, context: &ServiceContext) -> Result<Self, Error> {
        Folder::try_from(ServiceObject::new_for_service(kind, context))
    }

    pub fn as_object(&self) -> &ServiceObject {
        &self.0
    }

    pub fn as_object_mut(&mut self) -> &mut ServiceObject {
        &mut self.0
    }

    pub fn into_object(self) -> ServiceObject {
        self.0
    }

    pub fn id(&self) -> Option<ServiceId> {
        self.0.id()
    }

    pub fn display_name(&self) -> Result<Option<String>, PropertyError> {
        self.0.bag.get_string(&schema::DISPLAY_NAME)
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) -> Result<(), PropertyError> {
        self.0.set(&schema::DISPLAY_NAME, display_name.into())
    }

    pub fn total_count(&self) -> Result<Option<i64>, PropertyError> {
        self.0.bag.get_i64(&schema::TOTAL_COUNT)
    }

    pub fn child_folder_count(&self) -> Result<Option<i64>, PropertyError> {
        self.0.bag.get_i64(&schema::CHILD_FOLDER_COUNT)
    }

    /// The number of unread items. Only plain folders track this.
    pub fn unread_count(&self) -> Result<Option<i64>, PropertyError> {
        if !self.0.kind.schema.contains(&schema::UNREAD_COUNT) {
            return Ok(None);
        }
        self.0.bag.get_i64(&schema::UNREAD_COUNT)
    }
}

impl TryFrom<ServiceObject> for Folder {
    type Error = Error;

    fn try_from(object: ServiceObject) -> Result<Self, Self::Error> {
        match object.category() {
            ObjectCategory::Folder => Ok(Folder(object)),
            _ => Err(DeserializationError::TypeMismatch {
                declared: ObjectCategory::Folder.name().to_owned(),
                resolved: object.type_name(),
            }
            .into()),
        }
    }
}

impl From<Folder> for ServiceObject {
    fn from(folder: Folder) -> Self {
        folder.0
    }
}
