/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Wrapping requests in and unwrapping responses from their SOAP or JSON
//! envelopes.

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, Event};

use crate::{
    codec,
    config::WireFormat,
    enums::XmlNamespace,
    json::{JsonObject, JsonValue},
    response::{ResponseClass, ResponseCode, ServiceResponse},
    version::{ExchangeVersion, ServerVersionInfo},
    wire::{JsonWireWriter, WireNode, WireScalar, WireWriter, XmlElement, XmlWireWriter},
    DeserializationError, Error,
};

use super::requests::ServiceRequest;

/// A structured representation of a SOAP fault, indicating an error in an EWS
/// request.
///
/// See <https://www.w3.org/TR/2000/NOTE-SOAP-20000508/#_Toc478383507>
#[derive(Clone, Debug, PartialEq)]
pub struct Fault {
    /// An error code indicating the fault in the original request.
    pub faultcode: String,

    /// A human-readable description of the error.
    pub faultstring: String,

    /// A URI indicating the SOAP actor responsible for the error.
    pub faultactor: Option<String>,

    /// Clarifying information about EWS-specific errors.
    pub detail: Option<FaultDetail>,
}

impl Fault {
    /// The delay the server asked for before retrying, if the fault is due
    /// to throttling.
    pub fn back_off_milliseconds(&self) -> Option<u64> {
        self.detail
            .as_ref()
            .and_then(|detail| detail.back_off_milliseconds)
    }

    fn from_xml(fault: &XmlElement) -> Self {
        let text = |element: &XmlElement, name: &str| {
            element.child(name).map(|child| child.text.clone())
        };

        let detail = fault.child("detail").map(|detail| {
            let message_xml = detail
                .child("MessageXml")
                .map(|message_xml| MessageXml::read(WireNode::Xml(message_xml)))
                .unwrap_or_default();

            FaultDetail {
                response_code: text(detail, "ResponseCode")
                    .map(|code| ResponseCode::from_wire(&code)),
                message: text(detail, "Message"),
                back_off_milliseconds: message_xml.back_off_milliseconds,
            }
        });

        Fault {
            faultcode: text(fault, "faultcode").unwrap_or_default(),
            faultstring: text(fault, "faultstring").unwrap_or_default(),
            faultactor: text(fault, "faultactor"),
            detail,
        }
    }
}

/// EWS-specific details regarding a SOAP fault.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct FaultDetail {
    /// An error code indicating the nature of the issue.
    pub response_code: Option<ResponseCode>,

    /// A human-readable description of the error.
    pub message: Option<String>,

    pub back_off_milliseconds: Option<u64>,
}

/// The parts of a `MessageXml` element we make use of.
#[derive(Debug, Default)]
struct MessageXml {
    affected_properties: Vec<String>,
    back_off_milliseconds: Option<u64>,
}

impl MessageXml {
    fn read(node: WireNode<'_>) -> Self {
        let mut message_xml = MessageXml::default();

        for field in node.fields() {
            let Some(entry) = field.value.as_node() else {
                continue;
            };

            match field.name {
                "FieldURI" => {
                    if let Some(uri) = entry.attribute("FieldURI") {
                        message_xml.affected_properties.push(uri.into_owned());
                    }
                }
                "Value" if entry.attribute("Name").as_deref() == Some("BackOffMilliseconds") => {
                    message_xml.back_off_milliseconds = field
                        .value
                        .text()
                        .and_then(|value| value.trim().parse().ok());
                }
                _ => {}
            }
        }

        message_xml
    }
}

/// Serializes a request as a complete document in the given format.
pub(crate) fn write_request<R: ServiceRequest>(
    request: &R,
    version: ExchangeVersion,
    format: WireFormat,
) -> Result<Vec<u8>, Error> {
    match format {
        WireFormat::Xml => write_xml_request(request, version),
        WireFormat::Json => write_json_request(request, version),
    }
}

fn write_xml_request<R: ServiceRequest>(
    request: &R,
    version: ExchangeVersion,
) -> Result<Vec<u8>, Error> {
    let mut writer = XmlWireWriter::new(Vec::new());

    // All EWS examples use XML 1.0 with UTF-8, so stick to that for now.
    writer
        .writer_mut()?
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    writer.start_element_with_namespaces(
        XmlNamespace::Soap,
        "Envelope",
        &[XmlNamespace::Soap, XmlNamespace::Types, XmlNamespace::Messages],
    )?;

    writer.start_element(XmlNamespace::Soap, "Header")?;
    writer.start_element(XmlNamespace::Types, "RequestServerVersion")?;
    writer.write_attribute("Version", WireScalar::Enum(version.as_str()))?;
    writer.end_element()?;
    writer.end_element()?;

    writer.start_element(XmlNamespace::Soap, "Body")?;
    writer.start_element(XmlNamespace::Messages, R::NAME)?;
    request.write_body(&mut writer)?;
    writer.end_element()?;
    writer.end_element()?;

    writer.end_element()?;

    writer.into_inner()
}

fn write_json_request<R: ServiceRequest>(
    request: &R,
    version: ExchangeVersion,
) -> Result<Vec<u8>, Error> {
    let mut writer = JsonWireWriter::new();
    writer.set_type_name(&format!("{}JsonRequest", R::NAME))?;

    writer.start_element(XmlNamespace::Soap, "Header")?;
    writer.set_type_name("JsonRequestHeaders")?;
    writer.write_element(
        XmlNamespace::Types,
        "RequestServerVersion",
        WireScalar::Enum(version.as_str()),
    )?;
    writer.end_element()?;

    writer.start_element(XmlNamespace::Soap, "Body")?;
    writer.set_type_name(&format!("{}Request", R::NAME))?;
    request.write_body(&mut writer)?;
    writer.end_element()?;

    writer.finish()?.to_json_vec()
}

/// The useful content of a response envelope.
#[derive(Debug)]
pub(crate) struct ResponseEnvelope<'a> {
    pub server_version: Option<ServerVersionInfo>,

    /// One node per element of the request's batch, in order.
    pub messages: Vec<WireNode<'a>>,
}

/// Unwraps a SOAP response to `operation`.
///
/// A SOAP fault in the body is returned as [`Error::RequestFault`].
pub(crate) fn open_xml_response<'a>(
    envelope: &'a XmlElement,
    operation: &str,
) -> Result<ResponseEnvelope<'a>, Error> {
    if envelope.name != "Envelope" {
        return Err(DeserializationError::UnexpectedElement {
            expected: "Envelope",
            found: envelope.name.clone(),
        }
        .into());
    }

    let body = envelope
        .child("Body")
        .ok_or_else(|| missing_key("Body"))?;

    if let Some(fault) = body.child("Fault") {
        return Err(Error::RequestFault(Box::new(Fault::from_xml(fault))));
    }

    let server_version = envelope
        .child("Header")
        .and_then(|header| header.child("ServerVersionInfo"))
        .map(|info| ServerVersionInfo::from_wire(WireNode::Xml(info)));

    let response = body
        .children
        .first()
        .ok_or_else(|| missing_key(&format!("{operation}Response")))?;
    if response.name != format!("{operation}Response") {
        return Err(DeserializationError::UnexpectedElement {
            expected: "the operation's response element",
            found: response.name.clone(),
        }
        .into());
    }

    let messages = response
        .child("ResponseMessages")
        .ok_or_else(|| missing_key("ResponseMessages"))?
        .children
        .iter()
        .map(WireNode::Xml)
        .collect();

    Ok(ResponseEnvelope {
        server_version,
        messages,
    })
}

/// Unwraps a JSON response to `operation`.
pub(crate) fn open_json_response<'a>(
    envelope: &'a JsonObject,
    operation: &str,
) -> Result<ResponseEnvelope<'a>, Error> {
    let body = envelope.read_as_object("Body")?;

    if let Some(type_name) = body.type_name() {
        if type_name != format!("{operation}Response") {
            return Err(DeserializationError::UnexpectedElement {
                expected: "the operation's response element",
                found: type_name.to_owned(),
            }
            .into());
        }
    }

    let server_version = envelope
        .get("Header")
        .and_then(JsonValue::as_object)
        .and_then(|header| header.get("ServerVersionInfo"))
        .and_then(JsonValue::as_object)
        .map(|info| ServerVersionInfo::from_wire(WireNode::Json(info)));

    let messages = body
        .read_as_object("ResponseMessages")?
        .read_as_object_array("Items")?
        .into_iter()
        .map(WireNode::Json)
        .collect();

    Ok(ResponseEnvelope {
        server_version,
        messages,
    })
}

/// Reads the status of a response message, and its payload unless it
/// reports an error.
pub(crate) fn read_response_message<'a, T>(
    message: WireNode<'a>,
    read_payload: impl FnOnce(WireNode<'a>) -> Result<T, Error>,
) -> Result<ServiceResponse<T>, Error> {
    let class = message
        .attribute("ResponseClass")
        .ok_or_else(|| missing_key("ResponseClass"))?;
    let class: ResponseClass = codec::decode_enum(&class)?;

    let code = message
        .child_text("ResponseCode")
        .map(|code| ResponseCode::from_wire(code.trim()))
        .unwrap_or(ResponseCode::NoError);

    let message_xml = message
        .child("MessageXml")
        .map(MessageXml::read)
        .unwrap_or_default();

    let payload = match class {
        ResponseClass::Error => None,
        ResponseClass::Success | ResponseClass::Warning => Some(read_payload(message)?),
    };

    Ok(ServiceResponse {
        class,
        code,
        message_text: message.child_text("MessageText").map(Cow::into_owned),
        affected_properties: message_xml.affected_properties,
        back_off_milliseconds: message_xml.back_off_milliseconds,
        payload,
    })
}

fn missing_key(key: &str) -> DeserializationError {
    DeserializationError::MissingKey {
        key: key.to_owned(),
    }
}
