/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Checks run before a request is built, catching what the server would
//! reject without a round trip.

use crate::{
    object::ServiceObjectKind, property::ServiceId, schema_names::WireEnum,
    version::ExchangeVersion, PropertyDefinition, PropertyError, ValidationError,
};

/// A value able to check its own consistency.
pub trait SelfValidating {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl SelfValidating for ServiceId {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_non_empty(&self.id, "Id")
    }
}

/// Unwraps a required parameter.
pub fn validate_param<T>(value: Option<T>, name: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingParameter { name })
}

pub fn validate_non_empty(value: &str, name: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyParameter { name });
    }

    Ok(())
}

/// Checks that a batch has at least one element.
pub fn validate_collection_not_empty<T>(
    values: &[T],
    name: &'static str,
) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptyCollection { name });
    }

    Ok(())
}

/// Validates each element of a batch, stopping at the first failure.
pub fn validate_each<T: SelfValidating>(values: &[T]) -> Result<(), ValidationError> {
    values.iter().try_for_each(SelfValidating::validate)
}

pub fn validate_enum_version<E: WireEnum>(
    value: E,
    current: ExchangeVersion,
) -> Result<(), ValidationError> {
    let required = value.min_version();
    if current < required {
        return Err(ValidationError::EnumValueVersion {
            enum_name: E::ENUM_NAME,
            value: value.symbolic_name(),
            required,
            current,
        });
    }

    Ok(())
}

pub fn validate_method_version(
    method: &'static str,
    required: ExchangeVersion,
    current: ExchangeVersion,
) -> Result<(), ValidationError> {
    if current < required {
        return Err(ValidationError::MethodVersion {
            method,
            required,
            current,
        });
    }

    Ok(())
}

pub fn validate_property_version(
    definition: &PropertyDefinition,
    current: ExchangeVersion,
) -> Result<(), PropertyError> {
    definition.check_version(current)
}

pub fn validate_object_kind_version(
    kind: &ServiceObjectKind,
    current: ExchangeVersion,
) -> Result<(), ValidationError> {
    if current < kind.min_version {
        return Err(ValidationError::ObjectTypeVersion {
            type_name: kind.type_name,
            required: kind.min_version,
            current,
        });
    }

    Ok(())
}
