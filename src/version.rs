/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;

use crate::{wire::WireNode, DeserializationError};

/// The Exchange Server version identifiers allowed in `RequestServerVersion`
/// headers.
///
/// Variants are declared oldest first, so the derived ordering can be used to
/// check whether a feature is available under a given version.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/requestserverversion#version-attribute-values>
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExchangeVersion {
    Exchange2007_SP1,
    Exchange2010,
    Exchange2010_SP1,
    Exchange2010_SP2,
    Exchange2013,
    Exchange2013_SP1,
    Exchange2015,
    Exchange2016,
}

impl ExchangeVersion {
    /// Every known version, oldest first.
    pub const ALL: [ExchangeVersion; 8] = [
        ExchangeVersion::Exchange2007_SP1,
        ExchangeVersion::Exchange2010,
        ExchangeVersion::Exchange2010_SP1,
        ExchangeVersion::Exchange2010_SP2,
        ExchangeVersion::Exchange2013,
        ExchangeVersion::Exchange2013_SP1,
        ExchangeVersion::Exchange2015,
        ExchangeVersion::Exchange2016,
    ];

    /// The identifier used for this version on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            ExchangeVersion::Exchange2007_SP1 => "Exchange2007_SP1",
            ExchangeVersion::Exchange2010 => "Exchange2010",
            ExchangeVersion::Exchange2010_SP1 => "Exchange2010_SP1",
            ExchangeVersion::Exchange2010_SP2 => "Exchange2010_SP2",
            ExchangeVersion::Exchange2013 => "Exchange2013",
            ExchangeVersion::Exchange2013_SP1 => "Exchange2013_SP1",
            ExchangeVersion::Exchange2015 => "Exchange2015",
            ExchangeVersion::Exchange2016 => "Exchange2016",
        }
    }
}

impl fmt::Display for ExchangeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the provided string into a known version identifier.
impl TryFrom<&str> for ExchangeVersion {
    /// If the provided string could not be turned into a known version
    /// identifier, [`DeserializationError::UnrecognizedEnumValue`] is
    /// returned.
    type Error = DeserializationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ExchangeVersion::ALL
            .into_iter()
            .find(|version| version.as_str() == value)
            .ok_or_else(|| DeserializationError::UnrecognizedEnumValue {
                enum_name: "ExchangeVersion",
                value: value.to_owned(),
            })
    }
}

// Consumers can require this to persist the version associated with a given
// server.
impl From<ExchangeVersion> for String {
    fn from(value: ExchangeVersion) -> Self {
        value.as_str().into()
    }
}

/// The version information of the Exchange Server instance that generated
/// a response.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/serverversioninfo>
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerVersionInfo {
    pub major_version: Option<String>,
    pub minor_version: Option<String>,
    pub major_build_number: Option<String>,
    pub minor_build_number: Option<String>,
    pub version: Option<String>,
}

impl ServerVersionInfo {
    /// Reads version information from a `ServerVersionInfo` header node. The
    /// XML form carries these as attributes, the JSON form as keys.
    pub(crate) fn from_wire(node: WireNode<'_>) -> Self {
        let read = |name: &str| node.attribute(name).map(|value| value.into_owned());

        ServerVersionInfo {
            major_version: read("MajorVersion"),
            minor_version: read("MinorVersion"),
            major_build_number: read("MajorBuildNumber"),
            minor_build_number: read("MinorBuildNumber"),
            version: read("Version"),
        }
    }

    /// The protocol version advertised by the server, if it is one we know.
    pub fn exchange_version(&self) -> Option<ExchangeVersion> {
        self.version
            .as_deref()
            .and_then(|version| ExchangeVersion::try_from(version).ok())
    }
}
