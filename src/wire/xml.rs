/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::io::Write;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::{enums::XmlNamespace, DeserializationError, Error};

use super::{WireScalar, WireWriter};

/// A [`WireWriter`] producing XML through a [`quick_xml::Writer`].
///
/// The start tag of the most recently opened element is held back until its
/// first child or text is written, so that attributes can still be added to
/// it and so that elements without content are written as empty tags.
pub struct XmlWireWriter<W: Write> {
    writer: Writer<W>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
}

impl<W: Write> XmlWireWriter<W> {
    pub fn new(inner: W) -> Self {
        XmlWireWriter {
            writer: Writer::new(inner),
            pending: None,
            open: Vec::new(),
        }
    }

    /// Gives access to the underlying writer for writing events directly, e.g.
    /// an XML declaration.
    pub fn writer_mut(&mut self) -> Result<&mut Writer<W>, Error> {
        self.flush_pending()?;
        Ok(&mut self.writer)
    }

    /// Opens an element with the given namespace declarations.
    pub fn start_element_with_namespaces(
        &mut self,
        namespace: XmlNamespace,
        name: &str,
        declared: &[XmlNamespace],
    ) -> Result<(), Error> {
        self.start_element(namespace, name)?;

        if let Some(start) = self.pending.as_mut() {
            for declared in declared {
                let attribute = format!("xmlns:{}", declared.prefix());
                start.push_attribute((attribute.as_str(), declared.uri()));
            }
        }

        Ok(())
    }

    /// Finishes writing and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W, Error> {
        if !self.open.is_empty() {
            return Err(Error::InvalidWriterState("unclosed elements remain"));
        }
        self.flush_pending()?;
        Ok(self.writer.into_inner())
    }

    fn flush_pending(&mut self) -> Result<(), Error> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}

fn qualified_name(namespace: XmlNamespace, name: &str) -> String {
    match namespace.prefix() {
        "" => name.to_owned(),
        prefix => format!("{prefix}:{name}"),
    }
}

impl<W: Write> WireWriter for XmlWireWriter<W> {
    fn start_element(&mut self, namespace: XmlNamespace, name: &str) -> Result<(), Error> {
        self.flush_pending()?;

        let name = qualified_name(namespace, name);
        self.pending = Some(BytesStart::new(name.clone()));
        self.open.push(name);

        Ok(())
    }

    fn end_element(&mut self) -> Result<(), Error> {
        let name = self
            .open
            .pop()
            .ok_or(Error::InvalidWriterState("no element is open"))?;

        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Empty(start))?,
            None => self.writer.write_event(Event::End(BytesEnd::new(name)))?,
        }

        Ok(())
    }

    fn start_array(&mut self, namespace: XmlNamespace, name: &str) -> Result<(), Error> {
        self.start_element(namespace, name)
    }

    fn end_array(&mut self) -> Result<(), Error> {
        self.end_element()
    }

    fn set_type_name(&mut self, _type_name: &str) -> Result<(), Error> {
        // The element name already identifies the type.
        Ok(())
    }

    fn write_attribute(&mut self, name: &str, value: WireScalar<'_>) -> Result<(), Error> {
        let start = self.pending.as_mut().ok_or(Error::InvalidWriterState(
            "attributes must precede element content",
        ))?;
        start.push_attribute((name, value.to_text().as_ref()));

        Ok(())
    }

    fn write_element(
        &mut self,
        namespace: XmlNamespace,
        name: &str,
        value: WireScalar<'_>,
    ) -> Result<(), Error> {
        self.flush_pending()?;

        let name = qualified_name(namespace, name);
        self.writer
            .write_event(Event::Start(BytesStart::new(name.as_str())))?;
        self.writer
            .write_event(Event::Text(BytesText::new(value.to_text().as_ref())))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;

        Ok(())
    }

    fn write_text(&mut self, value: WireScalar<'_>) -> Result<(), Error> {
        if self.open.is_empty() {
            return Err(Error::InvalidWriterState("text must be inside an element"));
        }
        self.flush_pending()?;

        self.writer
            .write_event(Event::Text(BytesText::new(value.to_text().as_ref())))?;

        Ok(())
    }
}

/// A parsed XML element, with namespace prefixes stripped from element and
/// attribute names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    /// Parses a document into a tree, returning its root element.
    pub fn parse(document: &[u8]) -> Result<XmlElement, Error> {
        let document = std::str::from_utf8(document).map_err(malformed)?;

        let mut reader = Reader::from_str(document);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
                Event::Empty(start) => {
                    let element = XmlElement::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack.pop().ok_or_else(|| {
                        DeserializationError::MalformedXml("unbalanced end tag".to_string())
                    })?;

                    // Whitespace between child elements is indentation. Text
                    // of a leaf element is kept verbatim.
                    if !element.children.is_empty() && element.text.trim().is_empty() {
                        element.text.clear();
                    }

                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape().map_err(malformed)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DeserializationError::MalformedXml("unclosed element".to_string()).into());
        }

        root.ok_or_else(|| {
            DeserializationError::MalformedXml("document has no root element".to_string()).into()
        })
    }

    fn from_start(start: &BytesStart<'_>) -> Result<XmlElement, Error> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(malformed)?;

            // Namespace declarations are not data.
            if attribute.key.as_namespace_binding().is_some() {
                continue;
            }

            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }

        Ok(XmlElement {
            name,
            attributes,
            ..Default::default()
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(
                DeserializationError::MalformedXml("multiple root elements".to_string()).into(),
            )
        }
    }

    Ok(())
}

fn malformed(err: impl std::fmt::Display) -> DeserializationError {
    DeserializationError::MalformedXml(err.to_string())
}
