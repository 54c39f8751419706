/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Per-item outcomes of batched calls and their reconciliation with the
//! caller's error handling policy.

use std::fmt;

use strum::{EnumString, IntoStaticStr};
use thiserror::Error;

use crate::{schema_names::wire_enum, Error};

wire_enum! {
    /// The outcome class of a single response message.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/responseclass>
    pub enum ResponseClass {
        Success,
        Warning,
        Error,
    }
}

/// A status code reported by the server for one response message.
///
/// Codes this crate has no use for are kept verbatim in
/// [`ResponseCode::Other`].
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/responsecode>
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[non_exhaustive]
pub enum ResponseCode {
    NoError,
    ErrorAccessDenied,
    ErrorCannotDeleteObject,
    ErrorChangeKeyRequiredForWriteOperations,
    ErrorExceededConnectionCount,
    ErrorFolderNotFound,
    ErrorInternalServerError,
    ErrorInvalidChangeKey,
    ErrorInvalidIdMalformed,
    ErrorInvalidOperation,
    ErrorInvalidPropertySet,
    ErrorInvalidRequest,
    ErrorInvalidServerVersion,
    ErrorIrresolvableConflict,
    ErrorItemNotFound,
    ErrorMailboxStoreUnavailable,
    ErrorQuotaExceeded,
    ErrorSchemaValidation,
    ErrorServerBusy,
    ErrorStaleObject,
    ErrorTimeoutExpired,

    #[strum(default)]
    Other(String),
}

impl ResponseCode {
    /// Parses a code as written on the wire. Unknown codes are preserved.
    pub fn from_wire(code: &str) -> Self {
        code.parse()
            .unwrap_or_else(|_| ResponseCode::Other(code.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResponseCode::Other(code) => code,
            known => {
                let name: &'static str = known.into();
                name
            }
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the server for one element of a batch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ResponseCode,
    pub message: String,

    /// The field URIs of the properties the failure relates to.
    pub affected_properties: Vec<String>,

    /// How long the server asked us to wait before retrying, for throttling
    /// errors.
    pub back_off_milliseconds: Option<u64>,

    /// The position of the failing element within its batch, if the error
    /// was raised for a batch.
    pub index: Option<usize>,
}

/// The outcome of one element of a batched call.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceResponse<T> {
    pub class: ResponseClass,
    pub code: ResponseCode,
    pub message_text: Option<String>,
    pub affected_properties: Vec<String>,
    pub back_off_milliseconds: Option<u64>,

    /// What the call produced for this element. Always `None` for errors.
    pub payload: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn success(payload: T) -> Self {
        ServiceResponse {
            class: ResponseClass::Success,
            code: ResponseCode::NoError,
            message_text: None,
            affected_properties: Vec::new(),
            back_off_milliseconds: None,
            payload: Some(payload),
        }
    }

    pub fn error(code: ResponseCode, message_text: impl Into<String>) -> Self {
        ServiceResponse {
            class: ResponseClass::Error,
            code,
            message_text: Some(message_text.into()),
            affected_properties: Vec::new(),
            back_off_milliseconds: None,
            payload: None,
        }
    }

    /// Successes and warnings both count as success.
    pub fn is_success(&self) -> bool {
        self.class != ResponseClass::Error
    }

    /// Describes the failure, if this is an error response.
    pub fn remote_error(&self, index: Option<usize>) -> Option<RemoteError> {
        if self.is_success() {
            return None;
        }

        Some(RemoteError {
            code: self.code.clone(),
            message: self.message_text.clone().unwrap_or_default(),
            affected_properties: self.affected_properties.clone(),
            back_off_milliseconds: self.back_off_milliseconds,
            index,
        })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResponse<U> {
        ServiceResponse {
            class: self.class,
            code: self.code,
            message_text: self.message_text,
            affected_properties: self.affected_properties,
            back_off_milliseconds: self.back_off_milliseconds,
            payload: self.payload.map(f),
        }
    }
}

/// How failures of individual elements of a batched call are reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ErrorHandling {
    /// The first failing element fails the whole call.
    #[default]
    ThrowOnError,

    /// Every element's outcome is returned for the caller to inspect.
    ReturnErrors,

    /// As [`ErrorHandling::ThrowOnError`], except that failures with one of
    /// the tolerated codes are downgraded to warnings.
    ContinueOnError { tolerated: Vec<ResponseCode> },
}

/// The outcomes of a batched call, in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceResponseCollection<T> {
    responses: Vec<ServiceResponse<T>>,
}

impl<T> ServiceResponseCollection<T> {
    /// The most severe class among the responses.
    pub fn overall_class(&self) -> ResponseClass {
        let classes = self.responses.iter().map(|response| response.class);
        if classes.clone().any(|class| class == ResponseClass::Error) {
            ResponseClass::Error
        } else if classes.clone().any(|class| class == ResponseClass::Warning) {
            ResponseClass::Warning
        } else {
            ResponseClass::Success
        }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ServiceResponse<T>> {
        self.responses.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceResponse<T>> {
        self.responses.iter()
    }

    /// The payloads of the successful responses.
    pub fn into_payloads(self) -> Vec<T> {
        self.responses
            .into_iter()
            .filter_map(|response| response.payload)
            .collect()
    }
}

impl<T> IntoIterator for ServiceResponseCollection<T> {
    type Item = ServiceResponse<T>;
    type IntoIter = std::vec::IntoIter<ServiceResponse<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

/// A batched call which has been validated but not yet sent.
#[derive(Debug)]
pub struct UnsentCall {
    operation: &'static str,
    expected: usize,
    policy: ErrorHandling,
}

/// A batched call awaiting its per-element outcomes.
#[derive(Debug)]
pub struct SentCall {
    operation: &'static str,
    expected: usize,
    policy: ErrorHandling,
}

impl UnsentCall {
    /// Prepares a call of `operation` over a batch of `expected` elements.
    pub fn new(operation: &'static str, expected: usize, policy: ErrorHandling) -> Self {
        UnsentCall {
            operation,
            expected,
            policy,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn sent(self) -> SentCall {
        SentCall {
            operation: self.operation,
            expected: self.expected,
            policy: self.policy,
        }
    }
}

impl SentCall {
    /// Reconciles the received outcomes with the call's policy.
    ///
    /// The number of outcomes must match the size of the batch regardless of
    /// policy.
    pub fn complete<T>(
        self,
        responses: Vec<ServiceResponse<T>>,
    ) -> Result<ServiceResponseCollection<T>, Error> {
        self.complete_read(responses.into_iter().map(Ok).collect())
    }

    /// Like [`Self::complete`], for outcomes some of which could not be read.
    ///
    /// The policy is applied to every outcome that was read before a read
    /// failure is reported, so a remote error it promotes is never masked by
    /// a payload which failed to decode.
    pub fn complete_read<T>(
        self,
        results: Vec<Result<ServiceResponse<T>, Error>>,
    ) -> Result<ServiceResponseCollection<T>, Error> {
        if results.len() != self.expected {
            return Err(Error::UnexpectedResponseMessageCount {
                expected: self.expected,
                actual: results.len(),
            });
        }

        let mut responses = Vec::with_capacity(results.len());
        let mut read_failure = None;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(mut response) => {
                    self.apply_policy(index, &mut response)?;
                    responses.push(response);
                }
                Err(err) => {
                    log::error!(
                        "{} operation failed to read response for element {index}: {err}",
                        self.operation
                    );
                    read_failure.get_or_insert(err);
                }
            }
        }

        match read_failure {
            Some(err) => Err(err),
            None => Ok(ServiceResponseCollection { responses }),
        }
    }

    fn apply_policy<T>(&self, index: usize, response: &mut ServiceResponse<T>) -> Result<(), Error> {
        let operation = self.operation;
        match response.class {
            ResponseClass::Success => {}
            ResponseClass::Warning => {
                log::warn!(
                    "{operation} operation encountered warning {} for element {index}: {}",
                    response.code,
                    response.message_text.as_deref().unwrap_or_default()
                );
            }
            ResponseClass::Error => match &self.policy {
                ErrorHandling::ReturnErrors => {
                    log::debug!(
                        "{operation} operation returned error {} for element {index}",
                        response.code
                    );
                }
                ErrorHandling::ContinueOnError { tolerated }
                    if tolerated.contains(&response.code) =>
                {
                    log::warn!(
                        "{operation} operation tolerated error {} for element {index}",
                        response.code
                    );
                    response.class = ResponseClass::Warning;
                }
                ErrorHandling::ThrowOnError | ErrorHandling::ContinueOnError { .. } => {
                    if let Some(error) = response.remote_error(Some(index)) {
                        return Err(error.into());
                    }
                }
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Vec<ServiceResponse<&'static str>> {
        vec![
            ServiceResponse::success("first"),
            ServiceResponse::error(ResponseCode::ErrorItemNotFound, "The item was not found."),
            ServiceResponse::success("third"),
        ]
    }

    #[test]
    fn return_errors_keeps_every_outcome() {
        let collection = UnsentCall::new("GetItem", 3, ErrorHandling::ReturnErrors)
            .sent()
            .complete(batch())
            .unwrap();

        assert_eq!(collection.len(), 3);
        assert!(collection.get(0).unwrap().is_success());
        assert!(!collection.get(1).unwrap().is_success());
        assert!(collection.get(2).unwrap().is_success());
        assert_eq!(collection.overall_class(), ResponseClass::Error);
        assert_eq!(collection.into_payloads(), vec!["first", "third"]);
    }

    #[test]
    fn throw_on_error_fails_the_call() {
        let result = UnsentCall::new("GetItem", 3, ErrorHandling::ThrowOnError)
            .sent()
            .complete(batch());

        match result {
            Err(Error::Remote(error)) => {
                assert_eq!(error.code, ResponseCode::ErrorItemNotFound);
                assert_eq!(error.message, "The item was not found.");
                assert_eq!(error.index, Some(1));
            }
            other => panic!("expected a remote error, got {other:?}"),
        }
    }

    #[test]
    fn continue_on_error_tolerates_listed_codes() {
        let policy = ErrorHandling::ContinueOnError {
            tolerated: vec![ResponseCode::ErrorItemNotFound],
        };
        let collection = UnsentCall::new("DeleteItem", 3, policy)
            .sent()
            .complete(batch())
            .unwrap();
        assert_eq!(collection.overall_class(), ResponseClass::Warning);

        let policy = ErrorHandling::ContinueOnError {
            tolerated: vec![ResponseCode::ErrorAccessDenied],
        };
        let result = UnsentCall::new("DeleteItem", 3, policy)
            .sent()
            .complete(batch());
        assert!(matches!(result, Err(Error::Remote(_))));
    }

    #[test]
    fn warnings_count_as_success() {
        let mut warning = ServiceResponse::success("only");
        warning.class = ResponseClass::Warning;
        warning.code = ResponseCode::ErrorInvalidPropertySet;
        warning.affected_properties = vec!["item:Subject".to_string()];

        let collection = UnsentCall::new("UpdateItem", 1, ErrorHandling::ThrowOnError)
            .sent()
            .complete(vec![warning])
            .unwrap();

        let response = collection.get(0).unwrap();
        assert!(response.is_success());
        assert_eq!(response.affected_properties, vec!["item:Subject".to_string()]);
        assert_eq!(response.payload, Some("only"));
    }

    #[test]
    fn remote_errors_are_reported_before_read_failures() {
        let results = || {
            let mut results: Vec<Result<_, Error>> = batch().into_iter().map(Ok).collect();
            results[0] = Err(crate::DeserializationError::MissingKey {
                key: "Items".to_string(),
            }
            .into());
            results
        };

        let result = UnsentCall::new("GetItem", 3, ErrorHandling::ThrowOnError)
            .sent()
            .complete_read(results());
        match result {
            Err(Error::Remote(error)) => assert_eq!(error.index, Some(1)),
            other => panic!("expected a remote error, got {other:?}"),
        }

        // Nothing is promoted, so the read failure surfaces.
        let result = UnsentCall::new("GetItem", 3, ErrorHandling::ReturnErrors)
            .sent()
            .complete_read(results());
        assert!(matches!(
            result,
            Err(Error::Deserialization(crate::DeserializationError::MissingKey { .. }))
        ));
    }

    #[test]
    fn response_count_must_match_the_batch() {
        for policy in [ErrorHandling::ThrowOnError, ErrorHandling::ReturnErrors] {
            let result = UnsentCall::new("GetItem", 2, policy)
                .sent()
                .complete(batch());
            assert!(matches!(
                result,
                Err(Error::UnexpectedResponseMessageCount {
                    expected: 2,
                    actual: 3
                })
            ));
        }
    }

    #[test]
    fn response_codes() {
        assert_eq!(
            ResponseCode::from_wire("ErrorServerBusy"),
            ResponseCode::ErrorServerBusy
        );
        assert_eq!(
            ResponseCode::from_wire("ErrorSomethingNew"),
            ResponseCode::Other("ErrorSomethingNew".to_string())
        );
        assert_eq!(ResponseCode::ErrorStaleObject.to_string(), "ErrorStaleObject");
        assert_eq!(
            ResponseCode::Other("ErrorSomethingNew".to_string()).to_string(),
            "ErrorSomethingNew"
        );
    }

    #[test]
    fn remote_error_display() {
        let error = ServiceResponse::<()>::error(ResponseCode::ErrorServerBusy, "Try later.")
            .remote_error(None)
            .unwrap();
        assert_eq!(error.to_string(), "ErrorServerBusy: Try later.");
    }
}
