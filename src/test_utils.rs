/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{
    collections::VecDeque,
    future::{ready, Future},
    sync::Mutex,
};

use http::StatusCode;

use crate::{
    transport::{IncomingMessage, OutgoingMessage, Transport, TransportError},
    wire::XmlWireWriter,
    Error,
};

/// Assert the expected result of driving an XML wire writer.
pub fn assert_serialized_xml(
    write: impl FnOnce(&mut XmlWireWriter<Vec<u8>>) -> Result<(), Error>,
    expected_xml_content: &str,
) {
    let mut writer = XmlWireWriter::new(Vec::new());
    write(&mut writer).unwrap();

    let buf = writer.into_inner().unwrap();
    let actual_xml_content = std::str::from_utf8(buf.as_slice()).unwrap();

    assert_eq!(actual_xml_content, expected_xml_content);
}

/// A [`Transport`] replaying canned responses in order and recording every
/// message sent through it.
#[derive(Default)]
pub struct CannedTransport {
    responses: Mutex<VecDeque<Result<IncomingMessage, TransportError>>>,
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and body.
    pub fn respond(self, status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(IncomingMessage {
            status,
            body: body.into(),
        }));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// The body of the only message sent so far, as text.
    pub fn sent_body(&self) -> String {
        let sent = self.sent.lock().unwrap();
        assert_eq!(sent.len(), 1, "expected exactly one message to have been sent");
        String::from_utf8(sent[0].body.clone()).unwrap()
    }
}

impl Transport for CannedTransport {
    fn send(
        &self,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<IncomingMessage, TransportError>> {
        self.sent.lock().unwrap().push(message);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no canned response left".into())));

        ready(response)
    }
}
