/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The boundary to the HTTP layer, which is supplied by the embedder.

use std::future::Future;

use http::StatusCode;
use thiserror::Error;
use url::Url;

/// A fully serialized request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub endpoint: Url,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// The raw response to an [`OutgoingMessage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl IncomingMessage {
    /// Returns an error if the server responded with either a client or
    /// server error (i.e. if the status code is between 400 and 599).
    ///
    /// SOAP faults are delivered with status 500, so callers expecting a
    /// fault should inspect the body first.
    pub fn error_from_status(self) -> Result<Self, TransportError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            return Err(TransportError::StatusCode {
                status: self.status,
                body: self.body,
            });
        }

        Ok(self)
    }
}

/// An error that happened when sending a request or reading its response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The status of the response is either a client error or a server error.
    #[error("HTTP error ({status})")]
    StatusCode { status: StatusCode, body: Vec<u8> },

    /// The request could not be delivered.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out")]
    TimedOut,
}

/// Sends requests to the server.
///
/// Timeouts, retries, redirects and authentication are the
/// implementation's concern.
pub trait Transport {
    fn send(
        &self,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<IncomingMessage, TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        let ok = IncomingMessage {
            status: StatusCode::OK,
            body: b"<ok/>".to_vec(),
        };
        assert!(ok.error_from_status().is_ok());

        let unauthorized = IncomingMessage {
            status: StatusCode::UNAUTHORIZED,
            body: Vec::new(),
        };
        match unauthorized.error_from_status() {
            Err(TransportError::StatusCode { status, .. }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED)
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }
}
