/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Property definitions and the per-object bag holding their values.

mod bag;
mod definition;
mod set;
mod value;

pub use self::{
    bag::{PropertyBag, UnknownProperty},
    definition::{PropertyDefinition, PropertyDefinitionFlags, PropertyKind},
    set::PropertySet,
    value::{BodyContent, EnumToken, PropertyValue, ServiceId},
};
