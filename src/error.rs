/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Error values.
//!
//! Local validation, property access, deserialization, remote and transport
//! failures are kept as distinct kinds so that callers can tell a request
//! which was never sent apart from one the server rejected.

use thiserror::Error;

use crate::{
    response::RemoteError, service::Fault, transport::TransportError, version::ExchangeVersion,
};

/// Error types for all fallible operations of this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    /// A value handed to the JSON object model has a kind which cannot be
    /// represented on the wire.
    #[error("value for key `{key}` is not JSON serializable: {reason}")]
    NotJsonSerializable { key: String, reason: String },

    /// A sub-response reported a failure and the active policy promoted it.
    #[error("request resulted in an error: {0}")]
    Remote(#[from] RemoteError),

    /// The server rejected the request as a whole.
    #[error("request resulted in a SOAP fault: {}", .0.faultstring)]
    RequestFault(Box<Fault>),

    #[error("an error occurred during HTTP transport")]
    Transport(#[from] TransportError),

    #[error(
        "response contained an unexpected number of response messages: expected {expected}, got {actual}"
    )]
    UnexpectedResponseMessageCount { expected: usize, actual: usize },

    /// A wire writer was driven out of order, e.g. an attribute written
    /// after element content.
    #[error("invalid wire writer state: {0}")]
    InvalidWriterState(&'static str),

    #[error("error manipulating XML data")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to write serialized data")]
    Io(#[from] std::io::Error),

    #[error("an error occurred while (de)serializing JSON")]
    Json(#[from] serde_json::Error),
}

/// Errors raised when reading or writing a property bag.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    /// The property was neither loaded nor is the owning object new.
    #[error("property `{property}` has not been loaded")]
    NotLoaded { property: &'static str },

    #[error("property `{property}` is read-only")]
    ReadOnly { property: &'static str },

    /// The property cannot be removed once the object has been saved.
    #[error("property `{property}` cannot be deleted")]
    NotDeletable { property: &'static str },

    /// The property may only be set before the object is first saved.
    #[error("property `{property}` can only be set on a new object")]
    CreateOnly { property: &'static str },

    #[error(
        "property `{property}` requires server version {required} or later, but the object is bound to {current}"
    )]
    VersionIncompatible {
        property: &'static str,
        required: ExchangeVersion,
        current: ExchangeVersion,
    },

    #[error("property `{property}` holds values of kind {expected}, got {actual}")]
    KindMismatch {
        property: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("property `{property}` is not defined for objects of type {type_name}")]
    NotInSchema {
        property: &'static str,
        type_name: &'static str,
    },
}

/// Errors raised while decoding a payload received from the server.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeserializationError {
    #[error("required key `{key}` is missing")]
    MissingKey { key: String },

    #[error("value for `{key}` has kind {actual}, expected {expected}")]
    UnexpectedKind {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("malformed {kind} value: `{value}`")]
    MalformedValue { kind: &'static str, value: String },

    #[error("`{value}` is not a recognized value for {enum_name}")]
    UnrecognizedEnumValue {
        enum_name: &'static str,
        value: String,
    },

    /// A wire node declared a different type than the object being loaded.
    #[error("wire node of type `{actual}` cannot be loaded into `{expected}`")]
    SchemaMismatch {
        expected: &'static str,
        actual: String,
    },

    /// The registered constructor for a wire type produced a different kind of
    /// object than the wire entry declared.
    #[error("wire entry declared type `{declared}` but resolved to `{resolved}`")]
    TypeMismatch {
        declared: String,
        resolved: &'static str,
    },

    #[error("unknown object type `{type_name}`")]
    UnknownObjectType { type_name: String },

    #[error("unexpected element `{found}`, expected {expected}")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },

    #[error("malformed XML: {0}")]
    MalformedXml(String),
}

/// Errors raised client-side before a request is built, i.e. conditions the
/// server would reject.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required parameter `{name}` is missing")]
    MissingParameter { name: &'static str },

    #[error("parameter `{name}` must not be empty")]
    EmptyParameter { name: &'static str },

    #[error("collection `{name}` must contain at least one element")]
    EmptyCollection { name: &'static str },

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("{enum_name}::{value} requires server version {required} or later, targeting {current}")]
    EnumValueVersion {
        enum_name: &'static str,
        value: &'static str,
        required: ExchangeVersion,
        current: ExchangeVersion,
    },

    #[error("method {method} requires server version {required} or later, targeting {current}")]
    MethodVersion {
        method: &'static str,
        required: ExchangeVersion,
        current: ExchangeVersion,
    },

    #[error("object type {type_name} requires server version {required} or later, targeting {current}")]
    ObjectTypeVersion {
        type_name: &'static str,
        required: ExchangeVersion,
        current: ExchangeVersion,
    },
}
