/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Mapping between the symbolic names of enumerations and the spellings used
//! for them on the wire.
//!
//! Most enumeration members are sent under their own name. Some have a
//! different wire spelling (e.g. `WellKnownFolderName::Inbox` is `inbox`) and
//! some are only understood by newer servers. Both facts are declared next to
//! the member in the [`wire_enum!`] invocation, and each enumeration's lookup
//! table is derived from those declarations on first use and then cached for
//! the rest of the process.

use std::{collections::HashMap, fmt::Debug};

use crate::{version::ExchangeVersion, DeserializationError};

/// An enumeration which can be encoded to and decoded from its wire form.
///
/// Implementations are generated by [`wire_enum!`].
pub trait WireEnum: Copy + Debug + Eq + 'static {
    /// The name of the enumeration, used for diagnostics and for matching
    /// dynamically typed values against their declared kind.
    const ENUM_NAME: &'static str;

    /// Every member, in declaration order.
    fn variants() -> &'static [Self];

    /// The member's name as written in source.
    fn symbolic_name(self) -> &'static str;

    /// The wire spelling declared for this member, if it differs from the
    /// symbolic name.
    fn declared_schema_name(self) -> Option<&'static str>;

    /// The oldest server version which understands this member.
    fn declared_min_version(self) -> ExchangeVersion;

    /// The cached lookup table for this enumeration.
    fn table() -> &'static EnumTable;

    /// The spelling used for this member on the wire.
    fn schema_name(self) -> &'static str {
        Self::table()
            .schema_name(self.symbolic_name())
            .unwrap_or_else(|| self.symbolic_name())
    }

    fn min_version(self) -> ExchangeVersion {
        Self::table()
            .min_version(self.symbolic_name())
            .unwrap_or(ExchangeVersion::Exchange2007_SP1)
    }

    fn from_symbolic_name(name: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .copied()
            .find(|variant| variant.symbolic_name() == name)
    }

    /// Decodes a wire value, consulting the override table before falling back
    /// to the symbolic name.
    fn from_schema_name(value: &str) -> Result<Self, DeserializationError> {
        let symbol = Self::table().decode(value)?;
        Self::from_symbolic_name(symbol).ok_or_else(|| {
            DeserializationError::UnrecognizedEnumValue {
                enum_name: Self::ENUM_NAME,
                value: value.to_owned(),
            }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct EnumEntry {
    symbol: &'static str,
    schema_name: &'static str,
    min_version: ExchangeVersion,
}

/// The symbolic-to-wire and wire-to-symbolic lookup tables for one
/// enumeration, along with the minimum version of each member.
#[derive(Debug)]
pub struct EnumTable {
    enum_name: &'static str,
    entries: Vec<EnumEntry>,
    by_symbol: HashMap<&'static str, usize>,
    by_schema_name: HashMap<&'static str, usize>,
}

impl EnumTable {
    /// Builds the table from the declarations of `E`.
    pub fn build<E: WireEnum>() -> EnumTable {
        let entries: Vec<_> = E::variants()
            .iter()
            .map(|variant| EnumEntry {
                symbol: variant.symbolic_name(),
                schema_name: variant
                    .declared_schema_name()
                    .unwrap_or_else(|| variant.symbolic_name()),
                min_version: variant.declared_min_version(),
            })
            .collect();

        let by_symbol = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.symbol, index))
            .collect();

        // Only members with a distinct wire spelling need a reverse entry;
        // everything else decodes through its symbolic name.
        let by_schema_name = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.schema_name != entry.symbol)
            .map(|(index, entry)| (entry.schema_name, index))
            .collect();

        log::trace!("built wire name table for {}", E::ENUM_NAME);

        EnumTable {
            enum_name: E::ENUM_NAME,
            entries,
            by_symbol,
            by_schema_name,
        }
    }

    pub fn enum_name(&self) -> &'static str {
        self.enum_name
    }

    /// The symbolic names of all members, in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.symbol)
    }

    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn schema_name(&self, symbol: &str) -> Option<&'static str> {
        self.by_symbol
            .get(symbol)
            .map(|&index| self.entries[index].schema_name)
    }

    pub fn min_version(&self, symbol: &str) -> Option<ExchangeVersion> {
        self.by_symbol
            .get(symbol)
            .map(|&index| self.entries[index].min_version)
    }

    /// Resolves a wire value to the symbolic name of a member.
    pub fn decode(&self, value: &str) -> Result<&'static str, DeserializationError> {
        self.by_schema_name
            .get(value)
            .or_else(|| self.by_symbol.get(value))
            .map(|&index| self.entries[index].symbol)
            .ok_or_else(|| DeserializationError::UnrecognizedEnumValue {
                enum_name: self.enum_name,
                value: value.to_owned(),
            })
    }
}

/// Declares an enumeration along with its [`WireEnum`] implementation.
///
/// Each member may be followed by `= "wire"` to give it a wire spelling
/// distinct from its name and by `@ Version` to declare the oldest
/// [`ExchangeVersion`] which understands it.
///
/// ```rust,ignore
/// wire_enum! {
///     pub enum WellKnownFolderName {
///         Inbox = "inbox",
///         ArchiveRoot = "archiveroot" @ Exchange2010_SP1,
///     }
/// }
/// ```
macro_rules! wire_enum {
    (@schema_name) => {
        None
    };
    (@schema_name $wire:literal) => {
        Some($wire)
    };
    (@min_version) => {
        $crate::version::ExchangeVersion::Exchange2007_SP1
    };
    (@min_version $version:ident) => {
        $crate::version::ExchangeVersion::$version
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $wire:literal)? $(@ $version:ident)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $crate::schema_names::WireEnum for $name {
            const ENUM_NAME: &'static str = stringify!($name);

            fn variants() -> &'static [Self] {
                &[$($name::$variant,)*]
            }

            fn symbolic_name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)*
                }
            }

            fn declared_schema_name(self) -> Option<&'static str> {
                match self {
                    $($name::$variant => $crate::schema_names::wire_enum!(@schema_name $($wire)?),)*
                }
            }

            fn declared_min_version(self) -> $crate::version::ExchangeVersion {
                match self {
                    $($name::$variant => $crate::schema_names::wire_enum!(@min_version $($version)?),)*
                }
            }

            fn table() -> &'static $crate::schema_names::EnumTable {
                static TABLE: ::std::sync::OnceLock<$crate::schema_names::EnumTable> =
                    ::std::sync::OnceLock::new();

                TABLE.get_or_init($crate::schema_names::EnumTable::build::<$name>)
            }
        }
    };
}

pub(crate) use wire_enum;
