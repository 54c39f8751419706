/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Conversion between typed values and their canonical wire text.

use std::fmt::Write as _;

use time::{
    format_description::BorrowedFormatItem,
    macros::format_description,
    Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

use crate::{schema_names::WireEnum, DeserializationError};

/// The date and time part of a wire timestamp, without an offset.
const DATE_TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

const DATE_TIME_FORMAT_WHOLE_SECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const DATE_TIME_FORMAT_FRACTIONAL: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:1+]");

const OFFSET_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// A timestamp as exchanged with the server.
///
/// The wire form distinguishes instants given in UTC (a `Z` suffix), instants
/// given in some local offset (a `+hh:mm`/`-hh:mm` suffix) and floating
/// values with no zone information at all. The distinction is kept so that
/// values survive a round trip unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireDateTime {
    Utc(OffsetDateTime),
    Local(OffsetDateTime),
    Unspecified(PrimitiveDateTime),
}

impl WireDateTime {
    /// Interprets the value as an instant. Floating values are assumed to be
    /// relative to `reference_zone`.
    pub fn resolve(self, reference_zone: UtcOffset) -> OffsetDateTime {
        match self {
            WireDateTime::Utc(value) | WireDateTime::Local(value) => value,
            WireDateTime::Unspecified(value) => value.assume_offset(reference_zone),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            WireDateTime::Utc(_) => "utc",
            WireDateTime::Local(_) => "local",
            WireDateTime::Unspecified(_) => "unspecified",
        }
    }
}

impl From<OffsetDateTime> for WireDateTime {
    fn from(value: OffsetDateTime) -> Self {
        if value.offset().is_utc() {
            WireDateTime::Utc(value)
        } else {
            WireDateTime::Local(value)
        }
    }
}

impl From<PrimitiveDateTime> for WireDateTime {
    fn from(value: PrimitiveDateTime) -> Self {
        WireDateTime::Unspecified(value)
    }
}

pub fn encode_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Decodes a boolean. Only the exact strings `true` and `false` are accepted.
pub fn decode_bool(text: &str) -> Result<bool, DeserializationError> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(malformed("boolean", text)),
    }
}

pub fn decode_integer(text: &str) -> Result<i64, DeserializationError> {
    text.trim().parse().map_err(|_| malformed("integer", text))
}

pub fn decode_double(text: &str) -> Result<f64, DeserializationError> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(malformed("double", text)),
    }
}

pub fn encode_date_time(value: &WireDateTime) -> String {
    let (primitive, offset) = match value {
        WireDateTime::Utc(value) => {
            let value = value.to_offset(UtcOffset::UTC);
            (PrimitiveDateTime::new(value.date(), value.time()), Some(UtcOffset::UTC))
        }
        WireDateTime::Local(value) => (
            PrimitiveDateTime::new(value.date(), value.time()),
            Some(value.offset()),
        ),
        WireDateTime::Unspecified(value) => (*value, None),
    };

    let format = if primitive.nanosecond() == 0 {
        DATE_TIME_FORMAT_WHOLE_SECONDS
    } else {
        DATE_TIME_FORMAT_FRACTIONAL
    };

    // Formatting into a `String` cannot fail for the components used here.
    let mut text = primitive.format(format).unwrap_or_default();

    match (value, offset) {
        (WireDateTime::Utc(_), _) => text.push('Z'),
        (WireDateTime::Local(_), Some(offset)) => {
            text.push_str(&offset.format(OFFSET_FORMAT).unwrap_or_default())
        }
        _ => {}
    }

    text
}

/// Decodes a timestamp, recovering its kind from the suffix.
pub fn decode_date_time(text: &str) -> Result<WireDateTime, DeserializationError> {
    let time_start = text
        .find('T')
        .ok_or_else(|| malformed("dateTime", text))?;

    if let Some(rest) = text.strip_suffix('Z') {
        let value = PrimitiveDateTime::parse(rest, DATE_TIME_FORMAT)
            .map_err(|_| malformed("dateTime", text))?;
        return Ok(WireDateTime::Utc(value.assume_utc()));
    }

    // Date components are separated by `-` too, so only look for an offset
    // after the time designator.
    let offset_start = text[time_start..]
        .rfind(|c: char| c == '+' || c == '-')
        .map(|index| time_start + index);

    match offset_start {
        Some(offset_start) => {
            let value = PrimitiveDateTime::parse(&text[..offset_start], DATE_TIME_FORMAT)
                .map_err(|_| malformed("dateTime", text))?;
            let offset = UtcOffset::parse(&text[offset_start..], OFFSET_FORMAT)
                .map_err(|_| malformed("dateTime", text))?;

            Ok(WireDateTime::Local(value.assume_offset(offset)))
        }
        None => PrimitiveDateTime::parse(text, DATE_TIME_FORMAT)
            .map(WireDateTime::Unspecified)
            .map_err(|_| malformed("dateTime", text)),
    }
}

/// Encodes a duration as `[-]P{d}DT{h}H{m}M{s}[.f]S`.
///
/// At most four fractional digits are written, with trailing zeros trimmed.
pub fn encode_duration(value: Duration) -> String {
    let mut text = String::new();
    if value.is_negative() {
        text.push('-');
    }

    let value = value.abs();
    let total_seconds = value.whole_seconds();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let _ = write!(text, "P{days}DT{hours}H{minutes}M{seconds}");

    let fraction = value.subsec_nanoseconds() / 100_000;
    if fraction != 0 {
        let digits = format!("{fraction:04}");
        text.push('.');
        text.push_str(digits.trim_end_matches('0'));
    }

    text.push('S');
    text
}

/// Decodes an `xs:duration`.
///
/// Years count as 365 days and months as 30 days. Fractional seconds beyond
/// four digits are truncated.
pub fn decode_duration(text: &str) -> Result<Duration, DeserializationError> {
    parse_duration(text).ok_or_else(|| malformed("duration", text))
}

fn parse_duration(text: &str) -> Option<Duration> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => {
            // A time designator must be followed by at least one component.
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (rest, None),
    };

    if date_part.is_empty() && time_part.is_none() {
        return None;
    }

    let mut total = Duration::ZERO;

    let mut date_components = Components::new(date_part);
    let mut date_order = 0;
    while let Some((number, fraction, designator)) = date_components.next_component()? {
        if fraction.is_some() {
            return None;
        }

        let (order, unit_seconds) = match designator {
            'Y' => (1, 365 * 86_400),
            'M' => (2, 30 * 86_400),
            'D' => (3, 86_400),
            _ => return None,
        };
        if order <= date_order {
            return None;
        }
        date_order = order;

        total = total.checked_add(Duration::seconds(number.checked_mul(unit_seconds)?))?;
    }

    if let Some(time_part) = time_part {
        let mut time_components = Components::new(time_part);
        let mut time_order = 0;
        while let Some((number, fraction, designator)) = time_components.next_component()? {
            let (order, unit_seconds) = match designator {
                'H' => (1, 3_600),
                'M' => (2, 60),
                'S' => (3, 1),
                _ => return None,
            };
            if order <= time_order || (fraction.is_some() && designator != 'S') {
                return None;
            }
            time_order = order;

            total = total.checked_add(Duration::seconds(number.checked_mul(unit_seconds)?))?;

            if let Some(fraction) = fraction {
                // Keep four digits, padding shorter fractions on the right.
                let digits: String = fraction.chars().chain("0000".chars()).take(4).collect();
                let ticks: i64 = digits.parse().ok()?;
                total = total.checked_add(Duration::nanoseconds(ticks * 100_000))?;
            }
        }
    }

    Some(if negative { -total } else { total })
}

/// Iterates the `{number}{designator}` components of a duration section.
struct Components<'a> {
    remaining: &'a str,
}

impl<'a> Components<'a> {
    fn new(text: &'a str) -> Self {
        Components { remaining: text }
    }

    /// Returns `Some(None)` once the section is exhausted and `None` if it is
    /// malformed.
    #[allow(clippy::type_complexity)]
    fn next_component(&mut self) -> Option<Option<(i64, Option<&'a str>, char)>> {
        if self.remaining.is_empty() {
            return Some(None);
        }

        let integer_len = self
            .remaining
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.remaining.len());
        if integer_len == 0 {
            return None;
        }
        let number: i64 = self.remaining[..integer_len].parse().ok()?;
        let mut rest = &self.remaining[integer_len..];

        let fraction = match rest.strip_prefix('.') {
            Some(after_dot) => {
                let fraction_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                if fraction_len == 0 {
                    return None;
                }
                rest = &after_dot[fraction_len..];
                Some(&after_dot[..fraction_len])
            }
            None => None,
        };

        let mut chars = rest.chars();
        let designator = chars.next()?;
        self.remaining = chars.as_str();

        Some(Some((number, fraction, designator)))
    }
}

pub fn encode_enum<E: WireEnum>(value: E) -> &'static str {
    value.schema_name()
}

/// Decodes an enumeration member. Values matching neither a wire spelling nor
/// a symbolic name are an error.
pub fn decode_enum<E: WireEnum>(text: &str) -> Result<E, DeserializationError> {
    E::from_schema_name(text)
}

fn malformed(kind: &'static str, value: &str) -> DeserializationError {
    DeserializationError::MalformedValue {
        kind,
        value: value.to_owned(),
    }
}
