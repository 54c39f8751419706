/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The request pipeline: validating a batched call, serializing it, sending
//! it through a [`Transport`] and reconciling its response messages.

use std::sync::{Mutex, PoisonError};

use http::StatusCode;
use uuid::Uuid;

use crate::{
    config::{ServiceConfig, WireFormat},
    enums::{ConflictResolutionMode, DeleteMode, MessageDisposition},
    json::JsonObject,
    object::{ServiceContext, ServiceObject},
    property::ServiceId,
    registry::TypeRegistry,
    response::{ErrorHandling, ServiceResponse, ServiceResponseCollection, UnsentCall},
    transport::{IncomingMessage, OutgoingMessage, Transport, TransportError},
    validate,
    version::ServerVersionInfo,
    wire::XmlElement,
    Error, Folder, Item, PropertySet,
};

mod envelope;
mod requests;

pub use self::{
    envelope::{Fault, FaultDetail},
    requests::FolderTarget,
};

use self::{
    envelope::ResponseEnvelope,
    requests::{CreateItem, DeleteItem, GetFolder, GetItem, ServiceRequest, UpdateItem},
};

/// A client for an EWS endpoint.
///
/// Every operation takes a batch of elements and an [`ErrorHandling`]
/// policy deciding how failures of individual elements are reported.
///
/// The service can be shared between threads, and its operations are `Send`
/// whenever the transport's futures are.
pub struct ExchangeService<T: Transport> {
    config: ServiceConfig,
    transport: T,
    registry: &'static TypeRegistry,
    server_version: Mutex<Option<ServerVersionInfo>>,
}

impl<T: Transport> ExchangeService<T> {
    pub fn new(config: ServiceConfig, transport: T) -> Self {
        ExchangeService {
            config,
            transport,
            registry: TypeRegistry::global(),
            server_version: Mutex::new(None),
        }
    }

    /// Uses `registry` to resolve the types of received objects.
    pub fn with_registry(mut self, registry: &'static TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The context new objects are bound to.
    pub fn context(&self) -> ServiceContext {
        ServiceContext {
            version: self.config.requested_version,
            time_zone: self.config.time_zone,
        }
    }

    /// The version information reported by the server in its most recent
    /// response, if any.
    pub fn server_version_info(&self) -> Option<ServerVersionInfo> {
        self.server_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetches items by identifier.
    pub async fn get_items(
        &self,
        item_ids: &[ServiceId],
        property_set: &PropertySet,
        policy: ErrorHandling,
    ) -> Result<ServiceResponseCollection<Item>, Error> {
        let request = GetItem {
            item_ids,
            property_set,
        };

        self.execute(&request, policy).await
    }

    /// Fetches folders by identifier or well-known name.
    pub async fn get_folders(
        &self,
        folders: &[FolderTarget],
        property_set: &PropertySet,
        policy: ErrorHandling,
    ) -> Result<ServiceResponseCollection<Folder>, Error> {
        let request = GetFolder {
            folders,
            property_set,
        };

        self.execute(&request, policy).await
    }

    /// Saves new items.
    ///
    /// Items the server accepted receive their identifier and are marked as
    /// saved. Items it rejected are left untouched.
    pub async fn create_items(
        &self,
        items: &mut [ServiceObject],
        saved_item_folder: Option<&FolderTarget>,
        message_disposition: MessageDisposition,
        policy: ErrorHandling,
    ) -> Result<ServiceResponseCollection<Option<ServiceId>>, Error> {
        let request = CreateItem {
            items: &*items,
            saved_item_folder,
            message_disposition,
        };
        let responses = self.execute(&request, policy).await?;

        merge_saved(items, &responses);

        Ok(responses)
    }

    /// Saves the pending changes of existing items.
    pub async fn update_items(
        &self,
        items: &mut [ServiceObject],
        conflict_resolution: ConflictResolutionMode,
        policy: ErrorHandling,
    ) -> Result<ServiceResponseCollection<Option<ServiceId>>, Error> {
        let request = UpdateItem {
            items: &*items,
            conflict_resolution,
        };
        let responses = self.execute(&request, policy).await?;

        merge_saved(items, &responses);

        Ok(responses)
    }

    pub async fn delete_items(
        &self,
        item_ids: &[ServiceId],
        delete_type: DeleteMode,
        policy: ErrorHandling,
    ) -> Result<ServiceResponseCollection<()>, Error> {
        let request = DeleteItem {
            item_ids,
            delete_type,
        };

        self.execute(&request, policy).await
    }

    /// Validates, sends and completes a request.
    ///
    /// Nothing is sent if validation fails.
    async fn execute<R: ServiceRequest>(
        &self,
        request: &R,
        policy: ErrorHandling,
    ) -> Result<ServiceResponseCollection<R::Output>, Error> {
        let version = self.config.requested_version;
        validate::validate_method_version(R::NAME, R::MIN_VERSION, version)?;
        request.validate(version)?;

        let call = UnsentCall::new(R::NAME, request.expected_responses(), policy);

        let body = envelope::write_request(request, version, self.config.wire_format)?;
        let response = self.send(R::NAME, body).await?.error_from_status();

        let response = match response {
            Ok(response) => response,

            // SOAP faults are delivered with a 500 status.
            Err(TransportError::StatusCode { status, body })
                if status == StatusCode::INTERNAL_SERVER_ERROR
                    && self.config.wire_format == WireFormat::Xml =>
            {
                log::error!("Request FAILED with status {status}: {}", R::NAME);
                return Err(fault_or_status(R::NAME, status, body));
            }
            Err(err) => {
                log::error!("Request FAILED: {err}");
                return Err(err.into());
            }
        };

        let call = call.sent();
        let context = self.context();

        let responses = match self.config.wire_format {
            WireFormat::Xml => {
                let document = XmlElement::parse(&response.body)?;
                let envelope = envelope::open_xml_response(&document, R::NAME)?;
                self.read_messages(request, envelope, &context)
            }
            WireFormat::Json => {
                let document = JsonObject::from_slice(&response.body)?;
                let envelope = envelope::open_json_response(&document, R::NAME)?;
                self.read_messages(request, envelope, &context)
            }
        };

        call.complete_read(responses)
    }

    fn read_messages<R: ServiceRequest>(
        &self,
        request: &R,
        envelope: ResponseEnvelope<'_>,
        context: &ServiceContext,
    ) -> Vec<Result<ServiceResponse<R::Output>, Error>> {
        if let Some(info) = envelope.server_version {
            self.update_server_version(info);
        }

        envelope
            .messages
            .into_iter()
            .map(|message| {
                envelope::read_response_message(message, |message| {
                    request.read_payload(message, context, self.registry)
                })
            })
            .collect()
    }

    fn update_server_version(&self, info: ServerVersionInfo) {
        let mut current = self
            .server_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.as_ref() != Some(&info) {
            log::debug!(
                "server reported version {}",
                info.version.as_deref().unwrap_or("(unknown)")
            );
            *current = Some(info);
        }
    }

    async fn send(&self, op_name: &str, body: Vec<u8>) -> Result<IncomingMessage, Error> {
        // Generate random id for logging purposes.
        let request_id = Uuid::new_v4();
        log::info!("Making operation request {request_id}: {op_name}");

        if self.config.log_payloads {
            log::info!("C: {}", String::from_utf8_lossy(&body));
        }

        let message = OutgoingMessage {
            endpoint: self.config.endpoint.clone(),
            content_type: self.config.wire_format.content_type(),
            body,
        };

        let response = self.transport.send(message).await?;

        log::info!(
            "Response received for request {request_id} (status {}): {op_name}",
            response.status
        );

        if self.config.log_payloads {
            log::info!("S: {}", String::from_utf8_lossy(&response.body));
        }

        Ok(response)
    }
}

/// Reads the SOAP fault out of an error response, falling back to the
/// status error if there is none.
fn fault_or_status(operation: &str, status: StatusCode, body: Vec<u8>) -> Error {
    if let Ok(document) = XmlElement::parse(&body) {
        if let Err(err @ Error::RequestFault(_)) = envelope::open_xml_response(&document, operation)
        {
            return err;
        }
    }

    TransportError::StatusCode { status, body }.into()
}

/// Records the outcome of a create or update on the objects that were saved.
fn merge_saved(
    objects: &mut [ServiceObject],
    responses: &ServiceResponseCollection<Option<ServiceId>>,
) {
    for (object, response) in objects.iter_mut().zip(responses.iter()) {
        let Some(returned_id) = &response.payload else {
            continue;
        };

        if let Some(id) = returned_id {
            object.merge_server_id(id.clone());
        }
        object.commit();
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use url::Url;

    use super::*;
    use crate::{
        enums::WellKnownFolderName, object::MESSAGE, schema, test_utils::CannedTransport,
        BasePropertySet, DeserializationError, ExchangeVersion, PropertyValue, ResponseClass,
        ResponseCode, ValidationError,
    };

    fn config() -> ServiceConfig {
        ServiceConfig::new(Url::parse("https://outlook.example.com/EWS/Exchange.asmx").unwrap())
            .with_requested_version(ExchangeVersion::Exchange2013)
            .with_log_payloads(false)
    }

    fn soap_response(operation: &str, messages: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Header><h:ServerVersionInfo xmlns:h="http://schemas.microsoft.com/exchange/services/2006/types" MajorVersion="15" MinorVersion="20" MajorBuildNumber="7452" MinorBuildNumber="50" Version="V2018_01_08"/></s:Header><s:Body><m:{operation}Response xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types"><m:ResponseMessages>{messages}</m:ResponseMessages></m:{operation}Response></s:Body></s:Envelope>"#
        )
    }

    const DELETE_SUCCESS: &str = r#"<m:DeleteItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode></m:DeleteItemResponseMessage>"#;
    const DELETE_NOT_FOUND: &str = r#"<m:DeleteItemResponseMessage ResponseClass="Error"><m:MessageText>The specified object was not found in the store.</m:MessageText><m:ResponseCode>ErrorItemNotFound</m:ResponseCode><m:DescriptiveLinkKey>0</m:DescriptiveLinkKey></m:DeleteItemResponseMessage>"#;

    #[test]
    fn request_envelope() {
        let transport = CannedTransport::new().respond(
            StatusCode::OK,
            soap_response("DeleteItem", DELETE_SUCCESS),
        );
        let service = ExchangeService::new(config(), transport);

        let responses = block_on(service.delete_items(
            &[ServiceId::new("AAA")],
            DeleteMode::HardDelete,
            ErrorHandling::ThrowOnError,
        ))
        .unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses.overall_class(), ResponseClass::Success);

        let expected = concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">"#,
            r#"<soap:Header><t:RequestServerVersion Version="Exchange2013"/></soap:Header>"#,
            r#"<soap:Body><m:DeleteItem DeleteType="HardDelete"><m:ItemIds><t:ItemId Id="AAA"/></m:ItemIds></m:DeleteItem></soap:Body>"#,
            r#"</soap:Envelope>"#,
        );
        assert_eq!(service.transport.sent_body(), expected);
        assert_eq!(
            service.transport.sent()[0].content_type,
            "text/xml; charset=utf-8"
        );

        assert_eq!(
            service
                .server_version_info()
                .and_then(|info| info.version),
            Some("V2018_01_08".to_string())
        );
    }

    #[test]
    fn error_policies() {
        let ids = [
            ServiceId::new("AAA"),
            ServiceId::new("BBB"),
            ServiceId::new("CCC"),
        ];
        let batch = soap_response(
            "DeleteItem",
            &[DELETE_SUCCESS, DELETE_NOT_FOUND, DELETE_SUCCESS].concat(),
        );

        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::OK, batch.clone()),
        );
        match block_on(service.delete_items(&ids, DeleteMode::SoftDelete, ErrorHandling::ThrowOnError)) {
            Err(Error::Remote(err)) => {
                assert_eq!(err.code, ResponseCode::ErrorItemNotFound);
                assert_eq!(err.index, Some(1));
            }
            other => panic!("expected a remote error, got {other:?}"),
        }

        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::OK, batch.clone()),
        );
        let responses = block_on(service.delete_items(
            &ids,
            DeleteMode::SoftDelete,
            ErrorHandling::ReturnErrors,
        ))
        .unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses.overall_class(), ResponseClass::Error);
        assert!(responses.get(0).unwrap().is_success());
        assert!(!responses.get(1).unwrap().is_success());
        assert!(responses.get(2).unwrap().is_success());

        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::OK, batch),
        );
        let responses = block_on(service.delete_items(
            &ids,
            DeleteMode::SoftDelete,
            ErrorHandling::ContinueOnError {
                tolerated: vec![ResponseCode::ErrorItemNotFound],
            },
        ))
        .unwrap();
        assert_eq!(responses.overall_class(), ResponseClass::Warning);
    }

    #[test]
    fn operations_can_run_on_other_threads() {
        fn assert_send<F: Send>(_: &F) {}

        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(
                StatusCode::OK,
                soap_response("DeleteItem", DELETE_SUCCESS),
            ),
        );
        let ids = [ServiceId::new("AAA")];

        let operation =
            service.delete_items(&ids, DeleteMode::HardDelete, ErrorHandling::ThrowOnError);
        assert_send(&operation);

        let responses = std::thread::scope(|scope| scope.spawn(|| block_on(operation)).join())
            .unwrap()
            .unwrap();
        assert_eq!(responses.len(), 1);
        assert!(service.server_version_info().is_some());
    }

    #[test]
    fn response_count_mismatch() {
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(
                StatusCode::OK,
                soap_response("DeleteItem", DELETE_SUCCESS),
            ),
        );

        let result = block_on(service.delete_items(
            &[ServiceId::new("AAA"), ServiceId::new("BBB")],
            DeleteMode::HardDelete,
            ErrorHandling::ReturnErrors,
        ));
        assert!(matches!(
            result,
            Err(Error::UnexpectedResponseMessageCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn soap_fault_with_back_off() {
        let fault = r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode xmlns:a="http://schemas.microsoft.com/exchange/services/2006/types">a:ErrorServerBusy</faultcode><faultstring xml:lang="en-US">The server cannot service this request right now. Try again later.</faultstring><detail><e:ResponseCode xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">ErrorServerBusy</e:ResponseCode><t:MessageXml xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types"><t:Value Name="BackOffMilliseconds">25</t:Value></t:MessageXml></detail></s:Fault></s:Body></s:Envelope>"#;
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::INTERNAL_SERVER_ERROR, fault),
        );

        match block_on(service.delete_items(
            &[ServiceId::new("AAA")],
            DeleteMode::HardDelete,
            ErrorHandling::ThrowOnError,
        )) {
            Err(Error::RequestFault(fault)) => {
                assert_eq!(fault.back_off_milliseconds(), Some(25));
                assert_eq!(fault.faultcode, "a:ErrorServerBusy");
            }
            other => panic!("expected a SOAP fault, got {other:?}"),
        }

        // A 500 without a fault is reported as a status error.
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
        );
        assert!(matches!(
            block_on(service.delete_items(
                &[ServiceId::new("AAA")],
                DeleteMode::HardDelete,
                ErrorHandling::ThrowOnError,
            )),
            Err(Error::Transport(TransportError::StatusCode { status, .. }))
                if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[test]
    fn transport_errors() {
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().fail(TransportError::TimedOut),
        );
        assert!(matches!(
            block_on(service.delete_items(
                &[ServiceId::new("AAA")],
                DeleteMode::HardDelete,
                ErrorHandling::ReturnErrors,
            )),
            Err(Error::Transport(TransportError::TimedOut))
        ));

        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::UNAUTHORIZED, ""),
        );
        assert!(matches!(
            block_on(service.delete_items(
                &[ServiceId::new("AAA")],
                DeleteMode::HardDelete,
                ErrorHandling::ReturnErrors,
            )),
            Err(Error::Transport(TransportError::StatusCode { status, .. }))
                if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[test]
    fn validation_prevents_sending() {
        let service = ExchangeService::new(
            config().with_requested_version(ExchangeVersion::Exchange2010),
            CannedTransport::new(),
        );

        let result = block_on(service.get_folders(
            &[FolderTarget::WellKnown(WellKnownFolderName::ToDoSearch)],
            &PropertySet::first_class_properties(),
            ErrorHandling::ThrowOnError,
        ));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::EnumValueVersion { .. }))
        ));

        let result = block_on(service.delete_items(
            &[],
            DeleteMode::HardDelete,
            ErrorHandling::ThrowOnError,
        ));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::EmptyCollection { .. }))
        ));

        assert!(service.transport.sent().is_empty());
    }

    #[test]
    fn get_items() {
        let messages = r#"<m:GetItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Items><t:Message><t:ItemId Id="AAA" ChangeKey="CK"/><t:Subject>Quarterly report</t:Subject></t:Message></m:Items></m:GetItemResponseMessage>"#;
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::OK, soap_response("GetItem", messages)),
        );

        let property_set = PropertySet::new(BasePropertySet::IdOnly, [&schema::SUBJECT]);
        let items = block_on(service.get_items(
            &[ServiceId::new("AAA")],
            &property_set,
            ErrorHandling::ThrowOnError,
        ))
        .unwrap()
        .into_payloads();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].subject().unwrap().as_deref(), Some("Quarterly report"));

        let sent = service.transport.sent_body();
        assert!(sent.contains(
            r#"<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape><t:AdditionalProperties><t:FieldURI FieldURI="item:Subject"/></t:AdditionalProperties></m:ItemShape>"#
        ));
    }

    #[test]
    fn get_items_rejects_unknown_types() {
        let messages = r#"<m:GetItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Items><t:Hologram><t:ItemId Id="AAA"/></t:Hologram></m:Items></m:GetItemResponseMessage>"#;
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::OK, soap_response("GetItem", messages)),
        );

        let result = block_on(service.get_items(
            &[ServiceId::new("AAA")],
            &PropertySet::id_only(),
            ErrorHandling::ReturnErrors,
        ));
        assert!(matches!(
            result,
            Err(Error::Deserialization(DeserializationError::UnknownObjectType { .. }))
        ));
    }

    #[test]
    fn create_merges_ids() {
        let messages = r#"<m:CreateItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Items><t:Message><t:ItemId Id="NEW" ChangeKey="CK1"/></t:Message></m:Items></m:CreateItemResponseMessage>"#;
        let service = ExchangeService::new(
            config(),
            CannedTransport::new().respond(StatusCode::OK, soap_response("CreateItem", messages)),
        );

        let mut message = ServiceObject::new_for_service(&MESSAGE, &service.context());
        message
            .set(&schema::SUBJECT, PropertyValue::from("Quarterly report"))
            .unwrap();
        let mut items = [message];

        let responses = block_on(service.create_items(
            &mut items,
            Some(&FolderTarget::WellKnown(WellKnownFolderName::Drafts)),
            MessageDisposition::SaveOnly,
            ErrorHandling::ThrowOnError,
        ))
        .unwrap();

        assert_eq!(
            responses.get(0).and_then(|response| response.payload.clone()),
            Some(Some(ServiceId::with_change_key("NEW", "CK1")))
        );
        assert_eq!(items[0].id(), Some(ServiceId::with_change_key("NEW", "CK1")));
        assert!(!items[0].is_new());
        assert!(!items[0].is_dirty());

        let sent = service.transport.sent_body();
        assert!(sent.contains(r#"<m:CreateItem MessageDisposition="SaveOnly">"#));
        assert!(sent.contains(r#"<t:Message><t:Subject>Quarterly report</t:Subject></t:Message>"#));
    }

    #[test]
    fn json_round_trip() {
        let response = json!({
            "Header": {
                "ServerVersionInfo": { "MajorVersion": 15, "Version": "Exchange2013" }
            },
            "Body": {
                "__type": "DeleteItemResponse:#Exchange",
                "ResponseMessages": {
                    "Items": [
                        { "ResponseClass": "Success", "ResponseCode": "NoError" }
                    ]
                }
            }
        });
        let service = ExchangeService::new(
            config().with_wire_format(WireFormat::Json),
            CannedTransport::new().respond(StatusCode::OK, response.to_string()),
        );

        let responses = block_on(service.delete_items(
            &[ServiceId::new("AAA")],
            DeleteMode::HardDelete,
            ErrorHandling::ThrowOnError,
        ))
        .unwrap();
        assert_eq!(responses.overall_class(), ResponseClass::Success);

        let sent = service.transport.sent();
        assert_eq!(sent[0].content_type, "application/json; charset=utf-8");

        let request: Value = serde_json::from_slice(&sent[0].body).unwrap();
        assert_eq!(request["__type"], "DeleteItemJsonRequest:#Exchange");
        assert_eq!(request["Header"]["RequestServerVersion"], "Exchange2013");
        assert_eq!(request["Body"]["__type"], "DeleteItemRequest:#Exchange");
        assert_eq!(request["Body"]["DeleteType"], "HardDelete");
        assert_eq!(request["Body"]["ItemIds"][0]["Id"], "AAA");

        assert_eq!(
            service.server_version_info().and_then(|info| info.exchange_version()),
            Some(ExchangeVersion::Exchange2013)
        );
    }
}
