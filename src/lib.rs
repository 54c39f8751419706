/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The typed property, versioning and wire-serialization engine underlying
//! an Exchange Web Services client.
//!
//! Remote mailbox objects (items, folders, personas, ...) are represented by
//! a [`ServiceObject`] which owns a sparse, version-aware, dirty-tracking
//! [`PropertyBag`]. Bags are populated from and written to either an XML
//! element tree or a [`JsonObject`] graph through the same traversal, and
//! batched calls are reconciled with their per-item outcomes according to an
//! [`ErrorHandling`] policy.
//!
//! ```rust,ignore
//! let service = ExchangeService::new(config, transport);
//!
//! let mut message = ServiceObject::new_for_service(&MESSAGE, &service.context());
//! message.set(&schema::SUBJECT, PropertyValue::from("Quarterly report"))?;
//!
//! let mut items = [message];
//! let created = service
//!     .create_items(&mut items, None, MessageDisposition::SaveOnly, ErrorHandling::ThrowOnError)
//!     .await?;
//! ```

mod error;

pub mod codec;
pub mod collection;
pub mod config;
pub mod enums;
pub mod json;
pub mod object;
pub mod property;
pub mod registry;
pub mod response;
pub mod schema;
pub mod schema_names;
pub mod service;
pub mod transport;
pub mod validate;
pub mod version;
pub mod wire;

#[cfg(test)]
mod test_utils;

pub use error::{DeserializationError, Error, PropertyError, ValidationError};

pub use codec::WireDateTime;
pub use collection::{CollectionReader, ReadMode};
pub use config::{ServiceConfig, WireFormat};
pub use enums::*;
pub use json::{JsonObject, JsonValue};
pub use object::{Folder, Item, ObjectBinding, ObjectCategory, ServiceObject, ServiceObjectKind};
pub use property::{
    BodyContent, PropertyBag, PropertyDefinition, PropertyDefinitionFlags, PropertyKind,
    PropertySet, PropertyValue, ServiceId,
};
pub use registry::TypeRegistry;
pub use response::{
    ErrorHandling, RemoteError, ResponseClass, ResponseCode, ServiceResponse,
    ServiceResponseCollection,
};
pub use schema_names::WireEnum;
pub use service::{ExchangeService, Fault, FolderTarget};
pub use transport::{IncomingMessage, OutgoingMessage, Transport, TransportError};
pub use version::{ExchangeVersion, ServerVersionInfo};

pub(crate) const MESSAGES_NS_URI: &str =
    "http://schemas.microsoft.com/exchange/services/2006/messages";
pub(crate) const SOAP_NS_URI: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub(crate) const TYPES_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
pub(crate) const ERRORS_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/errors";
