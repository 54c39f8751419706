/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::hash::{Hash, Hasher};

use bitflags::bitflags;

use crate::{schema_names::EnumTable, version::ExchangeVersion, PropertyError};

use super::PropertyValue;

bitflags! {
    /// Behaviors of a property.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyDefinitionFlags: u16 {
        /// The property can be written when creating an object.
        const CAN_SET = 1 << 0;

        /// The property can be written on an existing object.
        const CAN_UPDATE = 1 << 1;

        /// The property can be removed from an existing object.
        const CAN_DELETE = 1 << 2;

        /// The property can be used in search restrictions.
        const CAN_FIND = 1 << 3;

        /// The property is not part of the first-class property set and must
        /// be requested by name.
        const MUST_BE_EXPLICITLY_LOADED = 1 << 4;

        const UPDATABLE = Self::CAN_SET.bits()
            | Self::CAN_UPDATE.bits()
            | Self::CAN_DELETE.bits()
            | Self::CAN_FIND.bits();
    }
}

/// The kind of value a property holds.
#[derive(Clone, Copy, Debug)]
pub enum PropertyKind {
    Boolean,
    Integer,
    Double,
    String,
    DateTime,
    Duration,
    /// A member of the enumeration whose table is returned by the function.
    Enum(fn() -> &'static EnumTable),
    /// An item or folder identifier.
    Id,
    StringList,
    Body,
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKind::Boolean => "boolean",
            PropertyKind::Integer => "integer",
            PropertyKind::Double => "double",
            PropertyKind::String => "string",
            PropertyKind::DateTime => "dateTime",
            PropertyKind::Duration => "duration",
            PropertyKind::Enum(table) => table().enum_name(),
            PropertyKind::Id => "id",
            PropertyKind::StringList => "stringList",
            PropertyKind::Body => "body",
        }
    }

    /// Whether `value` may be stored under a property of this kind. `Null`
    /// is accepted by every kind.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (_, PropertyValue::Null)
            | (PropertyKind::Boolean, PropertyValue::Boolean(_))
            | (PropertyKind::Integer, PropertyValue::Integer(_))
            | (PropertyKind::Double, PropertyValue::Double(_))
            | (PropertyKind::String, PropertyValue::String(_))
            | (PropertyKind::DateTime, PropertyValue::DateTime(_))
            | (PropertyKind::Duration, PropertyValue::Duration(_))
            | (PropertyKind::Id, PropertyValue::Id(_))
            | (PropertyKind::StringList, PropertyValue::StringList(_))
            | (PropertyKind::Body, PropertyValue::Body(_)) => true,
            (PropertyKind::Enum(table), PropertyValue::Enum(token)) => {
                let table = table();
                table.enum_name() == token.enum_name && table.contains_symbol(token.symbol)
            }
            _ => false,
        }
    }
}

/// The static description of a property: its wire names, value kind,
/// behaviors and the server version which introduced it.
///
/// Definitions are declared as `static`s and are compared by their URI.
#[derive(Debug)]
pub struct PropertyDefinition {
    /// The element name used for the property on the wire.
    pub xml_name: &'static str,

    /// The `FieldURI` identifying the property in shapes and updates, e.g.
    /// `item:Subject`.
    pub uri: &'static str,

    pub kind: PropertyKind,
    pub flags: PropertyDefinitionFlags,
    pub version: ExchangeVersion,

    /// The value reported for a new object on which the property was never
    /// set.
    pub default: Option<fn() -> PropertyValue>,
}

impl PropertyDefinition {
    pub const fn new(
        xml_name: &'static str,
        uri: &'static str,
        kind: PropertyKind,
        flags: PropertyDefinitionFlags,
        version: ExchangeVersion,
    ) -> Self {
        PropertyDefinition {
            xml_name,
            uri,
            kind,
            flags,
            version,
            default: None,
        }
    }

    pub const fn with_default(mut self, default: fn() -> PropertyValue) -> Self {
        self.default = Some(default);
        self
    }

    /// The property can never be written by clients.
    pub fn is_read_only(&self) -> bool {
        !self
            .flags
            .intersects(PropertyDefinitionFlags::CAN_SET.union(PropertyDefinitionFlags::CAN_UPDATE))
    }

    /// The property can be written only before the object is first saved.
    pub fn is_create_only(&self) -> bool {
        self.flags.contains(PropertyDefinitionFlags::CAN_SET)
            && !self.flags.contains(PropertyDefinitionFlags::CAN_UPDATE)
    }

    pub fn can_delete(&self) -> bool {
        self.flags.contains(PropertyDefinitionFlags::CAN_DELETE)
    }

    pub fn must_be_explicitly_loaded(&self) -> bool {
        self.flags
            .contains(PropertyDefinitionFlags::MUST_BE_EXPLICITLY_LOADED)
    }

    pub fn is_supported_by(&self, version: ExchangeVersion) -> bool {
        version >= self.version
    }

    /// Fails if the property is not understood by servers of `version`.
    pub fn check_version(&self, version: ExchangeVersion) -> Result<(), PropertyError> {
        if self.is_supported_by(version) {
            Ok(())
        } else {
            Err(PropertyError::VersionIncompatible {
                property: self.xml_name,
                required: self.version,
                current: version,
            })
        }
    }
}

impl PartialEq for PropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for PropertyDefinition {}

impl Hash for PropertyDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        enums::{Importance, Sensitivity},
        property::EnumToken,
        schema_names::WireEnum,
    };

    static NOTES: PropertyDefinition = PropertyDefinition::new(
        "Notes",
        "test:Notes",
        PropertyKind::String,
        PropertyDefinitionFlags::UPDATABLE,
        ExchangeVersion::Exchange2010,
    );

    static STAMP: PropertyDefinition = PropertyDefinition::new(
        "Stamp",
        "test:Stamp",
        PropertyKind::String,
        PropertyDefinitionFlags::CAN_SET,
        ExchangeVersion::Exchange2007_SP1,
    );

    static SERIAL: PropertyDefinition = PropertyDefinition::new(
        "Serial",
        "test:Serial",
        PropertyKind::Integer,
        PropertyDefinitionFlags::CAN_FIND,
        ExchangeVersion::Exchange2007_SP1,
    );

    #[test]
    fn behaviors_follow_flags() {
        assert!(!NOTES.is_read_only());
        assert!(!NOTES.is_create_only());

        assert!(STAMP.is_create_only());
        assert!(!STAMP.is_read_only());

        assert!(SERIAL.is_read_only());
        assert!(!SERIAL.can_delete());
    }

    #[test]
    fn version_check() {
        assert_eq!(
            NOTES.check_version(ExchangeVersion::Exchange2007_SP1),
            Err(PropertyError::VersionIncompatible {
                property: "Notes",
                required: ExchangeVersion::Exchange2010,
                current: ExchangeVersion::Exchange2007_SP1,
            })
        );
        assert!(NOTES.check_version(ExchangeVersion::Exchange2013).is_ok());
    }

    #[test]
    fn enum_kind_only_accepts_its_own_members() {
        let kind = PropertyKind::Enum(Importance::table);

        assert!(kind.accepts(&PropertyValue::Enum(EnumToken::of(Importance::High))));
        assert!(!kind.accepts(&PropertyValue::Enum(EnumToken::of(Sensitivity::Normal))));
        assert!(!kind.accepts(&PropertyValue::from("High")));
        assert!(kind.accepts(&PropertyValue::Null));
        assert_eq!(kind.name(), "Importance");
    }
}
