/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The mapping from wire type names to the constructors of the
//! corresponding service objects.

use std::{collections::HashMap, fmt, sync::OnceLock};

use crate::{
    object::{
        AttachmentContext, ServiceContext, ServiceObject, ServiceObjectKind, CALENDAR_FOLDER,
        CALENDAR_ITEM, CONTACTS_FOLDER, FOLDER, ITEM, MESSAGE, PERSONA,
    },
    DeserializationError,
};

type ServiceConstructor = fn(&ServiceContext) -> ServiceObject;
type AttachmentConstructor = fn(&AttachmentContext) -> ServiceObject;

/// How to construct objects of one wire type.
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub kind: &'static ServiceObjectKind,
    pub for_service: ServiceConstructor,

    /// Only items can be embedded in an attachment.
    pub for_attachment: Option<AttachmentConstructor>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("type_name", &self.kind.type_name)
            .field("attachable", &self.for_attachment.is_some())
            .finish()
    }
}

/// The context a new object is to be bound to.
#[derive(Clone, Copy, Debug)]
pub enum BindingContext<'a> {
    Service(&'a ServiceContext),
    Attachment(&'a AttachmentContext),
}

/// Declares registry entries for static object kinds.
macro_rules! entries {
    ($($kind:ident $(+ $attachable:ident)?),* $(,)?) => {
        [$(
            RegistryEntry {
                kind: &$kind,
                for_service: |context: &ServiceContext| ServiceObject::new_for_service(&$kind, context),
                for_attachment: entries!(@attachment $kind $($attachable)?),
            }
        ),*]
    };

    (@attachment $kind:ident) => { None };
    (@attachment $kind:ident attachable) => {
        Some(|context: &AttachmentContext| ServiceObject::new_for_attachment(&$kind, context))
    };
}

fn known_entries() -> [RegistryEntry; 7] {
    entries![
        ITEM + attachable,
        MESSAGE + attachable,
        CALENDAR_ITEM + attachable,
        FOLDER,
        CALENDAR_FOLDER,
        CONTACTS_FOLDER,
        PERSONA,
    ]
}

/// A lookup table from wire type name to object constructors.
///
/// The table is immutable once built. [`TypeRegistry::global`] holds every
/// type known to this crate; other registries can be built for tests.
#[derive(Debug)]
pub struct TypeRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
}

impl TypeRegistry {
    pub fn new(entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
        TypeRegistry {
            entries: entries
                .into_iter()
                .map(|entry| (entry.kind.type_name, entry))
                .collect(),
        }
    }

    /// The registry of all known object types, built on first use.
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

        GLOBAL.get_or_init(|| {
            let registry = TypeRegistry::new(known_entries());
            log::debug!("built object type registry with {} entries", registry.entries.len());
            registry
        })
    }

    pub fn lookup(&self, type_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Instantiates an object of the named type bound to `context`.
    ///
    /// Returns `Ok(None)` if the type is not registered, and an error if the
    /// type cannot be bound to an attachment.
    pub fn create(
        &self,
        type_name: &str,
        context: BindingContext<'_>,
    ) -> Result<Option<ServiceObject>, DeserializationError> {
        let Some(entry) = self.lookup(type_name) else {
            return Ok(None);
        };

        match context {
            BindingContext::Service(context) => Ok(Some((entry.for_service)(context))),
            BindingContext::Attachment(context) => match entry.for_attachment {
                Some(constructor) => Ok(Some(constructor(context))),
                None => Err(DeserializationError::UnexpectedElement {
                    expected: "an item type inside an attachment",
                    found: type_name.to_owned(),
                }),
            },
        }
    }
}
