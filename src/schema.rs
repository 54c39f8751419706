/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Property definitions and the schemas grouping them per object type.
//!
//! Schemas list their properties in the order the server expects them to be
//! written in; the properties of a base type come before those of the types
//! deriving from it.

use crate::{
    enums::{Importance, LegacyFreeBusyStatus, Sensitivity, WellKnownFolderName},
    property::{PropertyDefinition, PropertyDefinitionFlags as Flags, PropertyKind, PropertyValue},
    schema_names::WireEnum,
    version::ExchangeVersion,
};

use ExchangeVersion::*;

/// The set of properties defined for one type of object.
#[derive(Debug)]
pub struct ServiceObjectSchema {
    /// The name of the object type the schema describes, as used for its
    /// element name and JSON type annotation.
    pub name: &'static str,
    properties: &'static [&'static PropertyDefinition],
    id_property: Option<&'static PropertyDefinition>,
}

impl ServiceObjectSchema {
    pub const fn new(
        name: &'static str,
        properties: &'static [&'static PropertyDefinition],
        id_property: Option<&'static PropertyDefinition>,
    ) -> Self {
        ServiceObjectSchema {
            name,
            properties,
            id_property,
        }
    }

    /// All properties, in wire order.
    pub fn properties(&self) -> impl Iterator<Item = &'static PropertyDefinition> {
        self.properties.iter().copied()
    }

    pub fn contains(&self, definition: &PropertyDefinition) -> bool {
        self.properties.iter().any(|candidate| *candidate == definition)
    }

    /// Finds the property written under the given element name.
    pub fn find_by_xml_name(&self, xml_name: &str) -> Option<&'static PropertyDefinition> {
        self.properties()
            .find(|definition| definition.xml_name == xml_name)
    }

    pub fn find_by_uri(&self, uri: &str) -> Option<&'static PropertyDefinition> {
        self.properties().find(|definition| definition.uri == uri)
    }

    /// The property holding the object's identifier.
    pub fn id_property(&self) -> Option<&'static PropertyDefinition> {
        self.id_property
    }
}

const READ_ONLY: Flags = Flags::CAN_FIND;
const CREATE_ONLY: Flags = Flags::CAN_SET.union(Flags::CAN_FIND);

fn false_value() -> PropertyValue {
    PropertyValue::Boolean(false)
}

fn normal_importance() -> PropertyValue {
    PropertyValue::from_enum(Importance::Normal)
}

fn normal_sensitivity() -> PropertyValue {
    PropertyValue::from_enum(Sensitivity::Normal)
}

fn busy_status() -> PropertyValue {
    PropertyValue::from_enum(LegacyFreeBusyStatus::Busy)
}

macro_rules! property {
    ($name:ident, $xml_name:literal, $uri:literal, $kind:expr, $flags:expr) => {
        property!($name, $xml_name, $uri, $kind, $flags, Exchange2007_SP1);
    };
    ($name:ident, $xml_name:literal, $uri:literal, $kind:expr, $flags:expr, $version:ident) => {
        pub static $name: PropertyDefinition =
            PropertyDefinition::new($xml_name, $uri, $kind, $flags, $version);
    };
}

// Item.
property!(ITEM_ID, "ItemId", "item:ItemId", PropertyKind::Id, READ_ONLY);
property!(ITEM_PARENT_FOLDER_ID, "ParentFolderId", "item:ParentFolderId", PropertyKind::Id, READ_ONLY);
property!(ITEM_CLASS, "ItemClass", "item:ItemClass", PropertyKind::String, Flags::UPDATABLE);
property!(SUBJECT, "Subject", "item:Subject", PropertyKind::String, Flags::UPDATABLE);
pub static SENSITIVITY: PropertyDefinition = PropertyDefinition::new(
    "Sensitivity",
    "item:Sensitivity",
    PropertyKind::Enum(Sensitivity::table),
    Flags::UPDATABLE,
    Exchange2007_SP1,
)
.with_default(normal_sensitivity);
property!(BODY, "Body", "item:Body", PropertyKind::Body, Flags::UPDATABLE);
property!(DATE_TIME_RECEIVED, "DateTimeReceived", "item:DateTimeReceived", PropertyKind::DateTime, READ_ONLY);
property!(SIZE, "Size", "item:Size", PropertyKind::Integer, READ_ONLY);
property!(CATEGORIES, "Categories", "item:Categories", PropertyKind::StringList, Flags::UPDATABLE);
pub static IMPORTANCE: PropertyDefinition = PropertyDefinition::new(
    "Importance",
    "item:Importance",
    PropertyKind::Enum(Importance::table),
    Flags::UPDATABLE,
    Exchange2007_SP1,
)
.with_default(normal_importance);
property!(IS_DRAFT, "IsDraft", "item:IsDraft", PropertyKind::Boolean, READ_ONLY);
property!(DATE_TIME_SENT, "DateTimeSent", "item:DateTimeSent", PropertyKind::DateTime, READ_ONLY);
property!(DATE_TIME_CREATED, "DateTimeCreated", "item:DateTimeCreated", PropertyKind::DateTime, READ_ONLY);
property!(REMINDER_DUE_BY, "ReminderDueBy", "item:ReminderDueBy", PropertyKind::DateTime, Flags::UPDATABLE);
property!(REMINDER_IS_SET, "ReminderIsSet", "item:ReminderIsSet", PropertyKind::Boolean, Flags::UPDATABLE);
property!(
    REMINDER_MINUTES_BEFORE_START,
    "ReminderMinutesBeforeStart",
    "item:ReminderMinutesBeforeStart",
    PropertyKind::Integer,
    Flags::UPDATABLE
);
property!(DISPLAY_TO, "DisplayTo", "item:DisplayTo", PropertyKind::String, READ_ONLY);
property!(HAS_ATTACHMENTS, "HasAttachments", "item:HasAttachments", PropertyKind::Boolean, READ_ONLY);
property!(CULTURE, "Culture", "item:Culture", PropertyKind::String, Flags::UPDATABLE);
property!(
    LAST_MODIFIED_TIME,
    "LastModifiedTime",
    "item:LastModifiedTime",
    PropertyKind::DateTime,
    READ_ONLY,
    Exchange2010
);
property!(IS_ASSOCIATED, "IsAssociated", "item:IsAssociated", PropertyKind::Boolean, CREATE_ONLY, Exchange2010);
property!(
    UNIQUE_BODY,
    "UniqueBody",
    "item:UniqueBody",
    PropertyKind::Body,
    READ_ONLY.union(Flags::MUST_BE_EXPLICITLY_LOADED),
    Exchange2010
);
property!(
    TEXT_BODY,
    "TextBody",
    "item:TextBody",
    PropertyKind::Body,
    READ_ONLY.union(Flags::MUST_BE_EXPLICITLY_LOADED),
    Exchange2013
);

// Message.
property!(
    IS_READ_RECEIPT_REQUESTED,
    "IsReadReceiptRequested",
    "message:IsReadReceiptRequested",
    PropertyKind::Boolean,
    Flags::UPDATABLE
);
property!(
    IS_DELIVERY_RECEIPT_REQUESTED,
    "IsDeliveryReceiptRequested",
    "message:IsDeliveryReceiptRequested",
    PropertyKind::Boolean,
    Flags::UPDATABLE
);
property!(CONVERSATION_TOPIC, "ConversationTopic", "message:ConversationTopic", PropertyKind::String, READ_ONLY);
property!(INTERNET_MESSAGE_ID, "InternetMessageId", "message:InternetMessageId", PropertyKind::String, READ_ONLY);
pub static IS_READ: PropertyDefinition = PropertyDefinition::new(
    "IsRead",
    "message:IsRead",
    PropertyKind::Boolean,
    Flags::UPDATABLE,
    Exchange2007_SP1,
)
.with_default(false_value);
property!(
    IS_RESPONSE_REQUESTED,
    "IsResponseRequested",
    "message:IsResponseRequested",
    PropertyKind::Boolean,
    Flags::UPDATABLE
);
property!(REFERENCES, "References", "message:References", PropertyKind::String, Flags::UPDATABLE);

// Calendar item.
property!(UID, "UID", "calendar:UID", PropertyKind::String, Flags::UPDATABLE);
property!(START, "Start", "calendar:Start", PropertyKind::DateTime, Flags::UPDATABLE);
property!(END, "End", "calendar:End", PropertyKind::DateTime, Flags::UPDATABLE);
pub static IS_ALL_DAY_EVENT: PropertyDefinition = PropertyDefinition::new(
    "IsAllDayEvent",
    "calendar:IsAllDayEvent",
    PropertyKind::Boolean,
    Flags::UPDATABLE,
    Exchange2007_SP1,
)
.with_default(false_value);
pub static LEGACY_FREE_BUSY_STATUS: PropertyDefinition = PropertyDefinition::new(
    "LegacyFreeBusyStatus",
    "calendar:LegacyFreeBusyStatus",
    PropertyKind::Enum(LegacyFreeBusyStatus::table),
    Flags::UPDATABLE,
    Exchange2007_SP1,
)
.with_default(busy_status);
property!(LOCATION, "Location", "calendar:Location", PropertyKind::String, Flags::UPDATABLE);
property!(IS_MEETING, "IsMeeting", "calendar:IsMeeting", PropertyKind::Boolean, READ_ONLY);
property!(IS_CANCELLED, "IsCancelled", "calendar:IsCancelled", PropertyKind::Boolean, READ_ONLY);
property!(DURATION, "Duration", "calendar:Duration", PropertyKind::Duration, READ_ONLY);

// Folder.
property!(FOLDER_ID, "FolderId", "folder:FolderId", PropertyKind::Id, READ_ONLY);
property!(FOLDER_PARENT_FOLDER_ID, "ParentFolderId", "folder:ParentFolderId", PropertyKind::Id, READ_ONLY);
property!(FOLDER_CLASS, "FolderClass", "folder:FolderClass", PropertyKind::String, Flags::UPDATABLE);
property!(DISPLAY_NAME, "DisplayName", "folder:DisplayName", PropertyKind::String, Flags::UPDATABLE);
property!(TOTAL_COUNT, "TotalCount", "folder:TotalCount", PropertyKind::Integer, READ_ONLY);
property!(CHILD_FOLDER_COUNT, "ChildFolderCount", "folder:ChildFolderCount", PropertyKind::Integer, READ_ONLY);
property!(
    WELL_KNOWN_FOLDER_NAME,
    "DistinguishedFolderId",
    "folder:DistinguishedFolderId",
    PropertyKind::Enum(WellKnownFolderName::table),
    READ_ONLY,
    Exchange2013
);
property!(UNREAD_COUNT, "UnreadCount", "folder:UnreadCount", PropertyKind::Integer, READ_ONLY);

// Persona.
property!(PERSONA_ID, "PersonaId", "persona:PersonaId", PropertyKind::Id, READ_ONLY, Exchange2013);
property!(PERSONA_TYPE, "PersonaType", "persona:PersonaType", PropertyKind::String, READ_ONLY, Exchange2013);
property!(CREATION_TIME, "CreationTime", "persona:CreationTime", PropertyKind::DateTime, READ_ONLY, Exchange2013);
property!(PERSONA_DISPLAY_NAME, "DisplayName", "persona:DisplayName", PropertyKind::String, READ_ONLY, Exchange2013);
property!(GIVEN_NAME, "GivenName", "persona:GivenName", PropertyKind::String, READ_ONLY, Exchange2013);
property!(SURNAME, "Surname", "persona:Surname", PropertyKind::String, READ_ONLY, Exchange2013);
property!(COMPANY_NAME, "CompanyName", "persona:CompanyName", PropertyKind::String, READ_ONLY, Exchange2013);
property!(
    EMAIL_ADDRESS,
    "EmailAddress",
    "persona:EmailAddress",
    PropertyKind::String,
    READ_ONLY,
    Exchange2013
);
property!(
    PERSONA_UNREAD_COUNT,
    "UnreadCount",
    "persona:UnreadCount",
    PropertyKind::Integer,
    READ_ONLY,
    Exchange2013
);

macro_rules! item_properties {
    ($($extra:ident),* $(,)?) => {
        [
            &ITEM_ID,
            &ITEM_PARENT_FOLDER_ID,
            &ITEM_CLASS,
            &SUBJECT,
            &SENSITIVITY,
            &BODY,
            &DATE_TIME_RECEIVED,
            &SIZE,
            &CATEGORIES,
            &IMPORTANCE,
            &IS_DRAFT,
            &DATE_TIME_SENT,
            &DATE_TIME_CREATED,
            &REMINDER_DUE_BY,
            &REMINDER_IS_SET,
            &REMINDER_MINUTES_BEFORE_START,
            &DISPLAY_TO,
            &HAS_ATTACHMENTS,
            &CULTURE,
            &LAST_MODIFIED_TIME,
            &IS_ASSOCIATED,
            &UNIQUE_BODY,
            &TEXT_BODY,
            $(&$extra,)*
        ]
    };
}

macro_rules! folder_properties {
    ($($extra:ident),* $(,)?) => {
        [
            &FOLDER_ID,
            &FOLDER_PARENT_FOLDER_ID,
            &FOLDER_CLASS,
            &DISPLAY_NAME,
            &TOTAL_COUNT,
            &CHILD_FOLDER_COUNT,
            &WELL_KNOWN_FOLDER_NAME,
            $(&$extra,)*
        ]
    };
}

pub static ITEM_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "Item",
    properties: &item_properties!(),
    id_property: Some(&ITEM_ID),
};

pub static MESSAGE_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "Message",
    properties: &item_properties!(
        IS_READ_RECEIPT_REQUESTED,
        IS_DELIVERY_RECEIPT_REQUESTED,
        CONVERSATION_TOPIC,
        INTERNET_MESSAGE_ID,
        IS_READ,
        IS_RESPONSE_REQUESTED,
        REFERENCES,
    ),
    id_property: Some(&ITEM_ID),
};

pub static CALENDAR_ITEM_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "CalendarItem",
    properties: &item_properties!(
        UID,
        START,
        END,
        IS_ALL_DAY_EVENT,
        LEGACY_FREE_BUSY_STATUS,
        LOCATION,
        IS_MEETING,
        IS_CANCELLED,
        DURATION,
    ),
    id_property: Some(&ITEM_ID),
};

pub static FOLDER_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "Folder",
    properties: &folder_properties!(UNREAD_COUNT),
    id_property: Some(&FOLDER_ID),
};

pub static CALENDAR_FOLDER_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "CalendarFolder",
    properties: &folder_properties!(),
    id_property: Some(&FOLDER_ID),
};

pub static CONTACTS_FOLDER_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "ContactsFolder",
    properties: &folder_properties!(),
    id_property: Some(&FOLDER_ID),
};

pub static PERSONA_SCHEMA: ServiceObjectSchema = ServiceObjectSchema {
    name: "Persona",
    properties: &[
        &PERSONA_ID,
        &PERSONA_TYPE,
        &CREATION_TIME,
        &PERSONA_DISPLAY_NAME,
        &GIVEN_NAME,
        &SURNAME,
        &COMPANY_NAME,
        &EMAIL_ADDRESS,
        &PERSONA_UNREAD_COUNT,
    ],
    id_property: Some(&PERSONA_ID),
};
