/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{
    enums::XmlNamespace,
    json::{JsonObject, JsonValue, EXCHANGE_NAMESPACE},
    Error,
};

use super::{WireScalar, WireWriter};

/// The key holding an element's scalar content.
pub const CONTENT_KEY: &str = "Value";

enum Frame {
    Object {
        key: Option<String>,
        object: JsonObject,
    },
    Array {
        key: String,
        elements: Vec<JsonValue>,
    },
}

/// A [`WireWriter`] building a [`JsonObject`] graph.
///
/// Elements become objects keyed by their name in the enclosing object, or
/// anonymous entries when written inside an array. Attributes become scalar
/// entries and element text is stored under the `Value` key.
pub struct JsonWireWriter {
    stack: Vec<Frame>,
}

impl Default for JsonWireWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWireWriter {
    pub fn new() -> Self {
        JsonWireWriter {
            stack: vec![Frame::Object {
                key: None,
                object: JsonObject::new(),
            }],
        }
    }

    /// Returns the root object once every element has been closed.
    pub fn finish(mut self) -> Result<JsonObject, Error> {
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(Frame::Object { object, .. }), true) => Ok(object),
            _ => Err(Error::InvalidWriterState("unclosed elements remain")),
        }
    }

    fn current_object(&mut self) -> Result<&mut JsonObject, Error> {
        match self.stack.last_mut() {
            Some(Frame::Object { object, .. }) => Ok(object),
            _ => Err(Error::InvalidWriterState(
                "scalar entries cannot be written directly into an array",
            )),
        }
    }

    /// Adds a finished value to the enclosing frame.
    fn append(&mut self, key: Option<String>, value: JsonValue) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Array { elements, .. }) => {
                elements.push(value);
                Ok(())
            }
            Some(Frame::Object { object, .. }) => {
                let key = key.ok_or(Error::InvalidWriterState("object entry has no name"))?;
                object.add(key, value)
            }
            None => Err(Error::InvalidWriterState("no enclosing element")),
        }
    }
}

impl WireWriter for JsonWireWriter {
    fn start_element(&mut self, _namespace: XmlNamespace, name: &str) -> Result<(), Error> {
        let key = match self.stack.last() {
            Some(Frame::Array { .. }) => None,
            _ => Some(name.to_owned()),
        };

        self.stack.push(Frame::Object {
            key,
            object: JsonObject::new(),
        });

        Ok(())
    }

    fn end_element(&mut self) -> Result<(), Error> {
        // The root frame is never closed by an element.
        if self.stack.len() < 2 {
            return Err(Error::InvalidWriterState("no element is open"));
        }

        match self.stack.pop() {
            Some(Frame::Object { key, object }) => self.append(key, JsonValue::Object(object)),
            _ => Err(Error::InvalidWriterState("element closed while an array is open")),
        }
    }

    fn start_array(&mut self, _namespace: XmlNamespace, name: &str) -> Result<(), Error> {
        self.stack.push(Frame::Array {
            key: name.to_owned(),
            elements: Vec::new(),
        });

        Ok(())
    }

    fn end_array(&mut self) -> Result<(), Error> {
        match self.stack.pop() {
            Some(Frame::Array { key, elements }) => self.append(Some(key), JsonValue::Array(elements)),
            _ => Err(Error::InvalidWriterState("array closed while an element is open")),
        }
    }

    fn set_type_name(&mut self, type_name: &str) -> Result<(), Error> {
        self.current_object()?
            .set_type_name(type_name, EXCHANGE_NAMESPACE);
        Ok(())
    }

    fn write_attribute(&mut self, name: &str, value: WireScalar<'_>) -> Result<(), Error> {
        self.current_object()?.add(name, value.to_json())
    }

    fn write_element(
        &mut self,
        _namespace: XmlNamespace,
        name: &str,
        value: WireScalar<'_>,
    ) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Array { elements, .. }) => {
                elements.push(value.to_json());
                Ok(())
            }
            Some(Frame::Object { object, .. }) => object.add(name, value.to_json()),
            None => Err(Error::InvalidWriterState("no enclosing element")),
        }
    }

    fn write_text(&mut self, value: WireScalar<'_>) -> Result<(), Error> {
        self.current_object()?.add(CONTENT_KEY, value.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireNode;

    #[test]
    fn elements_become_nested_objects() {
        let mut writer = JsonWireWriter::new();
        writer.set_type_name("GetItemRequest").unwrap();
        writer.start_element(XmlNamespace::Messages, "ItemShape").unwrap();
        writer
            .write_element(XmlNamespace::Types, "BaseShape", WireScalar::Enum("IdOnly"))
            .unwrap();
        writer.end_element().unwrap();
        writer.start_array(XmlNamespace::Messages, "ItemIds").unwrap();
        writer.start_element(XmlNamespace::Types, "ItemId").unwrap();
        writer.set_type_name("ItemId").unwrap();
        writer.write_attribute("Id", WireScalar::Str("AAA")).unwrap();
        writer.end_element().unwrap();
        writer.end_array().unwrap();

        let object = writer.finish().unwrap();
        assert_eq!(
            object.to_json_string().unwrap(),
            r#"{"__type":"GetItemRequest:#Exchange","ItemShape":{"BaseShape":"IdOnly"},"ItemIds":[{"__type":"ItemId:#Exchange","Id":"AAA"}]}"#
        );
    }

    #[test]
    fn scalar_arrays_and_text() {
        let mut writer = JsonWireWriter::new();
        writer.start_array(XmlNamespace::Types, "Categories").unwrap();
        writer
            .write_element(XmlNamespace::Types, "String", WireScalar::Str("Red"))
            .unwrap();
        writer
            .write_element(XmlNamespace::Types, "String", WireScalar::Str("Blue"))
            .unwrap();
        writer.end_array().unwrap();
        writer.start_element(XmlNamespace::Types, "Body").unwrap();
        writer.write_attribute("BodyType", WireScalar::Enum("HTML")).unwrap();
        writer.write_text(WireScalar::Str("<p>hi</p>")).unwrap();
        writer.end_element().unwrap();

        let object = writer.finish().unwrap();
        let node = WireNode::Json(&object);
        assert_eq!(
            node.child("Body").and_then(|body| body.attribute("Value")).as_deref(),
            Some("<p>hi</p>")
        );
        assert_eq!(object.read_as_array("Categories").map(|a| a.len()), Ok(2));
    }

    #[test]
    fn unbalanced_writes_fail() {
        let mut writer = JsonWireWriter::new();
        assert!(writer.end_element().is_err());

        let mut writer = JsonWireWriter::new();
        writer.start_element(XmlNamespace::Types, "Open").unwrap();
        assert!(writer.finish().is_err());
    }
}
