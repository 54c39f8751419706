/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! An ordered, typed JSON object graph.
//!
//! The JSON form of EWS annotates polymorphic objects with a `__type` key of
//! the form `TypeName:#Namespace`, which must be the first key of the object.
//! [`JsonObject`] keeps that annotation apart from its ordinary entries and
//! only accepts values which can actually be represented on the wire.

use indexmap::IndexMap;
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value;

use crate::{
    codec::{self, WireDateTime},
    schema_names::WireEnum,
    DeserializationError, Error,
};

/// The reserved key carrying an object's type annotation.
pub const TYPE_KEY: &str = "__type";

/// The namespace of EWS types in JSON type annotations.
pub const EXCHANGE_NAMESPACE: &str = "Exchange";

#[derive(Clone, Debug, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Written using the canonical timestamp format.
    DateTime(WireDateTime),
    /// The wire spelling of an enumeration member.
    Enum(String),
    Object(JsonObject),
    Array(Vec<JsonValue>),
}

impl JsonValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Integer(_) => "integer",
            JsonValue::Double(_) => "double",
            JsonValue::String(_) => "string",
            JsonValue::DateTime(_) => "dateTime",
            JsonValue::Enum(_) => "enum",
            JsonValue::Object(_) => "object",
            JsonValue::Array(_) => "array",
        }
    }

    pub fn enum_value<E: WireEnum>(value: E) -> JsonValue {
        JsonValue::Enum(value.schema_name().to_owned())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(value) | JsonValue::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(value) => Some(value),
            _ => None,
        }
    }

    /// Checks that the value can be represented on the wire.
    fn check_serializable(&self) -> Result<(), String> {
        match self {
            JsonValue::Double(value) if !value.is_finite() => {
                Err(format!("{value} is not a finite number"))
            }
            JsonValue::Array(elements) => {
                let mut element_kind = None;
                for element in elements {
                    if let JsonValue::Array(_) = element {
                        return Err("arrays may not directly contain arrays".to_string());
                    }

                    let kind = element.kind_name();
                    match element_kind {
                        None => element_kind = Some(kind),
                        Some(expected) if expected != kind => {
                            return Err(format!(
                                "array elements must share a kind, found {expected} and {kind}"
                            ));
                        }
                        _ => {}
                    }

                    element.check_serializable()?;
                }

                Ok(())
            }

            // Objects only ever hold checked values.
            _ => Ok(()),
        }
    }

    fn from_json(key: &str, value: Value) -> Result<JsonValue, DeserializationError> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(value) => JsonValue::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(value) => JsonValue::Integer(value),
                None => number
                    .as_f64()
                    .map(JsonValue::Double)
                    .ok_or_else(|| DeserializationError::MalformedValue {
                        kind: "number",
                        value: number.to_string(),
                    })?,
            },
            Value::String(value) => JsonValue::String(value),
            Value::Array(elements) => JsonValue::Array(
                elements
                    .into_iter()
                    .map(|element| JsonValue::from_json(key, element))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => JsonValue::Object(JsonObject::from_map(map)?),
        })
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Bool(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        JsonValue::Integer(value)
    }
}

impl From<i32> for JsonValue {
    fn from(value: i32) -> Self {
        JsonValue::Integer(value.into())
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Double(value)
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<WireDateTime> for JsonValue {
    fn from(value: WireDateTime) -> Self {
        JsonValue::DateTime(value)
    }
}

impl From<JsonObject> for JsonValue {
    fn from(value: JsonObject) -> Self {
        JsonValue::Object(value)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(value: Vec<JsonValue>) -> Self {
        JsonValue::Array(value)
    }
}

impl Serialize for JsonValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            JsonValue::Null => serializer.serialize_unit(),
            JsonValue::Bool(value) => serializer.serialize_bool(*value),
            JsonValue::Integer(value) => serializer.serialize_i64(*value),
            JsonValue::Double(value) => serializer.serialize_f64(*value),
            JsonValue::String(value) | JsonValue::Enum(value) => serializer.serialize_str(value),
            JsonValue::DateTime(value) => {
                serializer.serialize_str(&codec::encode_date_time(value))
            }
            JsonValue::Object(value) => value.serialize(serializer),
            JsonValue::Array(elements) => serializer.collect_seq(elements),
        }
    }
}

/// An ordered map of string keys to [`JsonValue`]s with an optional type
/// annotation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonObject {
    type_tag: Option<String>,
    entries: IndexMap<String, JsonValue>,
}

impl JsonObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object annotated as `{type_name}:#Exchange`.
    pub fn with_type_name(type_name: &str) -> Self {
        let mut object = Self::new();
        object.set_type_name(type_name, EXCHANGE_NAMESPACE);
        object
    }

    pub fn set_type_name(&mut self, type_name: &str, namespace: &str) {
        self.type_tag = Some(format!("{type_name}:#{namespace}"));
    }

    /// The full `__type` annotation, if any.
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// The type name part of the annotation.
    pub fn type_name(&self) -> Option<&str> {
        self.type_tag
            .as_deref()
            .map(|tag| tag.split_once(":#").map_or(tag, |(name, _)| name))
    }

    /// Adds an entry, replacing any previous value for the key.
    ///
    /// The value is checked in full before the object is touched: values which
    /// cannot be represented on the wire (non-finite numbers, arrays mixing
    /// element kinds or nesting arrays) are rejected with
    /// [`Error::NotJsonSerializable`] and leave the object unchanged.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Result<(), Error> {
        let key = key.into();
        let value = value.into();

        if key == TYPE_KEY {
            return match value {
                JsonValue::String(tag) if tag.contains(":#") => {
                    self.type_tag = Some(tag);
                    Ok(())
                }
                other => Err(Error::NotJsonSerializable {
                    key,
                    reason: format!(
                        "type annotation must be a `Name:#Namespace` string, got {}",
                        other.kind_name()
                    ),
                }),
            };
        }

        value
            .check_serializable()
            .map_err(|reason| Error::NotJsonSerializable {
                key: key.clone(),
                reason,
            })?;

        self.entries.insert(key, value);
        Ok(())
    }

    pub fn add_enum<E: WireEnum>(&mut self, key: impl Into<String>, value: E) -> Result<(), Error> {
        self.add(key, JsonValue::enum_value(value))
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.entries.shift_remove(key)
    }

    /// Entries in insertion order. The type annotation is not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require(&self, key: &str) -> Result<&JsonValue, DeserializationError> {
        self.entries
            .get(key)
            .ok_or_else(|| DeserializationError::MissingKey {
                key: key.to_owned(),
            })
    }

    pub fn read_as_string(&self, key: &str) -> Result<&str, DeserializationError> {
        match self.require(key)? {
            JsonValue::String(value) => Ok(value),
            other => Err(unexpected_kind(key, "string", other)),
        }
    }

    pub fn read_as_bool(&self, key: &str) -> Result<bool, DeserializationError> {
        match self.require(key)? {
            JsonValue::Bool(value) => Ok(*value),
            other => Err(unexpected_kind(key, "boolean", other)),
        }
    }

    pub fn read_as_i64(&self, key: &str) -> Result<i64, DeserializationError> {
        match self.require(key)? {
            JsonValue::Integer(value) => Ok(*value),
            other => Err(unexpected_kind(key, "integer", other)),
        }
    }

    pub fn read_as_f64(&self, key: &str) -> Result<f64, DeserializationError> {
        match self.require(key)? {
            JsonValue::Double(value) => Ok(*value),
            other => Err(unexpected_kind(key, "double", other)),
        }
    }

    /// JSON has no date-time kind, so date-times received from the server
    /// are strings in the wire format.
    pub fn read_as_date_time(&self, key: &str) -> Result<WireDateTime, DeserializationError> {
        match self.require(key)? {
            JsonValue::DateTime(value) => Ok(*value),
            JsonValue::String(value) => codec::decode_date_time(value),
            other => Err(unexpected_kind(key, "dateTime", other)),
        }
    }

    pub fn read_as_enum<E: WireEnum>(&self, key: &str) -> Result<E, DeserializationError> {
        match self.require(key)? {
            JsonValue::String(value) | JsonValue::Enum(value) => codec::decode_enum(value),
            other => Err(unexpected_kind(key, "enum", other)),
        }
    }

    pub fn read_as_object(&self, key: &str) -> Result<&JsonObject, DeserializationError> {
        match self.require(key)? {
            JsonValue::Object(value) => Ok(value),
            other => Err(unexpected_kind(key, "object", other)),
        }
    }

    /// Reads an array. A missing key reads as an empty array.
    pub fn read_as_array(&self, key: &str) -> Result<&[JsonValue], DeserializationError> {
        match self.entries.get(key) {
            None | Some(JsonValue::Null) => Ok(&[]),
            Some(JsonValue::Array(elements)) => Ok(elements),
            Some(other) => Err(unexpected_kind(key, "array", other)),
        }
    }

    /// Reads an array whose elements must all be objects.
    pub fn read_as_object_array(
        &self,
        key: &str,
    ) -> Result<Vec<&JsonObject>, DeserializationError> {
        self.read_as_array(key)?
            .iter()
            .map(|element| match element {
                JsonValue::Object(object) => Ok(object),
                other => Err(unexpected_kind(key, "object", other)),
            })
            .collect()
    }

    /// Builds an object graph from a parsed JSON document.
    pub fn from_json_value(value: Value) -> Result<JsonObject, DeserializationError> {
        match value {
            Value::Object(map) => JsonObject::from_map(map),
            other => Err(DeserializationError::UnexpectedKind {
                key: String::new(),
                expected: "object",
                actual: json_kind_name(&other),
            }),
        }
    }

    /// Parses a JSON document whose root must be an object.
    pub fn from_slice(document: &[u8]) -> Result<JsonObject, Error> {
        let deserializer = &mut serde_json::Deserializer::from_slice(document);
        let value: Value = serde_path_to_error::deserialize(deserializer).map_err(|err| {
            log::error!("failed to parse JSON document at {}", err.path());
            Error::Json(err.into_inner())
        })?;

        Ok(JsonObject::from_json_value(value)?)
    }

    fn from_map(map: serde_json::Map<String, Value>) -> Result<JsonObject, DeserializationError> {
        let mut object = JsonObject::new();

        for (key, value) in map {
            if key == TYPE_KEY {
                match value {
                    Value::String(tag) => object.type_tag = Some(tag),
                    other => {
                        return Err(DeserializationError::UnexpectedKind {
                            key,
                            expected: "string",
                            actual: json_kind_name(&other),
                        })
                    }
                }
                continue;
            }

            let value = JsonValue::from_json(&key, value)?;
            object.entries.insert(key, value);
        }

        Ok(object)
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for JsonObject {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = self.entries.len() + usize::from(self.type_tag.is_some());
        let mut map = serializer.serialize_map(Some(len))?;

        // The type annotation must precede every other key.
        if let Some(tag) = &self.type_tag {
            map.serialize_entry(TYPE_KEY, tag)?;
        }
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

fn unexpected_kind(key: &str, expected: &'static str, actual: &JsonValue) -> DeserializationError {
    DeserializationError::UnexpectedKind {
        key: key.to_owned(),
        expected,
        actual: actual.kind_name(),
    }
}

fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
