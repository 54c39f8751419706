/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use time::UtcOffset;
use url::Url;

use crate::{
    version::{ExchangeVersion, ServerVersionInfo},
    Error,
};

/// The server version to target when nothing better is known. Exchange 2007
/// SP1 is understood by every server we support, and is the first version
/// using the identifier format modern servers still use.
pub const DEFAULT_SERVER_VERSION: ExchangeVersion = ExchangeVersion::Exchange2007_SP1;

/// The version assumed for servers reporting a version identifier we don't
/// know, which most likely means a more recent server.
pub const NEWEST_ASSUMED_VERSION: ExchangeVersion = ExchangeVersion::Exchange2013_SP1;

/// Setting this environment variable (to any value) enables logging of
/// request and response bodies, which may contain sensitive data.
pub const LOG_NETWORK_PAYLOADS_ENV_VAR: &str = "EWS_LOG_NETWORK_PAYLOADS";

/// The representation requests and responses are serialized with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WireFormat {
    #[default]
    Xml,
    Json,
}

impl WireFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Xml => "text/xml; charset=utf-8",
            WireFormat::Json => "application/json; charset=utf-8",
        }
    }
}

/// How to reach and talk to an EWS endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub endpoint: Url,

    /// The protocol version stated in requests, which also gates which
    /// properties, values and operations may be used.
    pub requested_version: ExchangeVersion,

    pub wire_format: WireFormat,

    /// The zone in which timestamps without an offset are interpreted.
    pub time_zone: UtcOffset,

    pub log_payloads: bool,
}

impl ServiceConfig {
    pub fn new(endpoint: Url) -> Self {
        ServiceConfig {
            endpoint,
            requested_version: DEFAULT_SERVER_VERSION,
            wire_format: WireFormat::default(),
            time_zone: UtcOffset::UTC,
            log_payloads: std::env::var_os(LOG_NETWORK_PAYLOADS_ENV_VAR).is_some(),
        }
    }

    pub fn with_requested_version(mut self, version: ExchangeVersion) -> Self {
        self.requested_version = version;
        self
    }

    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    pub fn with_time_zone(mut self, time_zone: UtcOffset) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn with_log_payloads(mut self, log_payloads: bool) -> Self {
        self.log_payloads = log_payloads;
        self
    }
}

/// Parses a stored map from endpoint to server version identifier.
///
/// Returns `None` for empty or invalid input. Invalid content is not an
/// error, since the map is rewritten with valid content as soon as a server
/// reports its version.
pub fn parse_known_server_versions(stored: &str) -> Option<HashMap<String, String>> {
    if stored.trim().is_empty() {
        return None;
    }

    let de = &mut serde_json::Deserializer::from_str(stored);
    match serde_path_to_error::deserialize(de) {
        Ok(known_versions) => Some(known_versions),
        Err(err) => {
            log::error!("failed to parse the known Exchange server versions: {err}");
            None
        }
    }
}

/// Looks up the version to target for `endpoint`.
///
/// Endpoints without a stored version use [`DEFAULT_SERVER_VERSION`]. A
/// stored identifier we don't know is an error, since we only ever store
/// versions we know.
pub fn server_version_for(
    known_versions: Option<&HashMap<String, String>>,
    endpoint: &Url,
) -> Result<ExchangeVersion, Error> {
    let stored = known_versions.and_then(|known_versions| known_versions.get(endpoint.as_str()));

    match stored {
        Some(version) => Ok(ExchangeVersion::try_from(version.as_str())?),
        None => Ok(DEFAULT_SERVER_VERSION),
    }
}

/// Records the version a server reported for `endpoint`.
///
/// Returns the version to target from now on, or `None` if the server did
/// not report a version. The map is left untouched if it already holds the
/// same version.
pub fn record_server_version(
    known_versions: &mut HashMap<String, String>,
    endpoint: &Url,
    info: &ServerVersionInfo,
) -> Option<ExchangeVersion> {
    let version = match info.version.as_deref() {
        Some(version) if !version.is_empty() => version,
        _ => return None,
    };

    let version = ExchangeVersion::try_from(version).unwrap_or(NEWEST_ASSUMED_VERSION);

    let identifier: String = version.into();
    if known_versions.get(endpoint.as_str()) != Some(&identifier) {
        known_versions.insert(endpoint.to_string(), identifier);
    }

    Some(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeserializationError;

    fn endpoint() -> Url {
        Url::parse("https://outlook.example.com/EWS/Exchange.asmx").unwrap()
    }

    fn version_info(version: Option<&str>) -> ServerVersionInfo {
        ServerVersionInfo {
            major_version: Some("15".to_string()),
            minor_version: Some("1".to_string()),
            major_build_number: Some("2507".to_string()),
            minor_build_number: Some("6".to_string()),
            version: version.map(str::to_string),
        }
    }

    #[test]
    fn defaults() {
        let config = ServiceConfig::new(endpoint())
            .with_wire_format(WireFormat::Json)
            .with_log_payloads(false);

        assert_eq!(config.requested_version, ExchangeVersion::Exchange2007_SP1);
        assert_eq!(config.time_zone, UtcOffset::UTC);
        assert_eq!(config.wire_format.content_type(), "application/json; charset=utf-8");
        assert!(!config.log_payloads);
    }

    #[test]
    fn stored_versions() {
        let known = parse_known_server_versions(
            r#"{"https://outlook.example.com/EWS/Exchange.asmx": "Exchange2010_SP2"}"#,
        );
        assert_eq!(
            server_version_for(known.as_ref(), &endpoint()).unwrap(),
            ExchangeVersion::Exchange2010_SP2
        );

        let other = Url::parse("https://mail.example.org/EWS/Exchange.asmx").unwrap();
        assert_eq!(
            server_version_for(known.as_ref(), &other).unwrap(),
            DEFAULT_SERVER_VERSION
        );
    }

    #[test]
    fn invalid_stored_versions() {
        assert_eq!(parse_known_server_versions(""), None);
        assert_eq!(parse_known_server_versions("{not json"), None);
        assert_eq!(parse_known_server_versions(r#"{"a": 1}"#), None);

        let known = parse_known_server_versions(
            r#"{"https://outlook.example.com/EWS/Exchange.asmx": "Exchange2099"}"#,
        );
        assert!(matches!(
            server_version_for(known.as_ref(), &endpoint()),
            Err(Error::Deserialization(DeserializationError::UnrecognizedEnumValue { .. }))
        ));
    }

    #[test]
    fn recording_versions() {
        let mut known = HashMap::new();

        assert_eq!(
            record_server_version(&mut known, &endpoint(), &version_info(None)),
            None
        );
        assert!(known.is_empty());

        assert_eq!(
            record_server_version(&mut known, &endpoint(), &version_info(Some("Exchange2013"))),
            Some(ExchangeVersion::Exchange2013)
        );
        assert_eq!(
            known.get(endpoint().as_str()).map(String::as_str),
            Some("Exchange2013")
        );

        // Unknown identifiers are assumed to denote recent servers.
        assert_eq!(
            record_server_version(&mut known, &endpoint(), &version_info(Some("V2099_01"))),
            Some(NEWEST_ASSUMED_VERSION)
        );
    }
}
