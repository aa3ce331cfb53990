use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::{
    parameters::ParameterSet,
    parser::DecodedProperty,
    unescape::{unescape, Newline},
};

/// The event properties that feed a [`crate::components::CalendarEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// Short title of the event. Escaped newlines become spaces.
    Summary(PropertyValue<String>),

    /// Longer free text. Escaped newlines are kept as line breaks.
    Description(PropertyValue<String>),

    /// Venue of the event. Escaped newlines become spaces.
    Location(PropertyValue<String>),

    /// Inclusive start. `None` when the value isn't a date we understand.
    ///
    /// `is_all_day` is set when the property token mentions `VALUE=DATE`.
    Start {
        value: PropertyValue<Option<DateTime<Utc>>>,
        is_all_day: bool,
    },

    /// Non-inclusive end. `None` when the value isn't a date we understand.
    End(PropertyValue<Option<DateTime<Utc>>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue<T> {
    pub value: T,
    pub parameters: ParameterSet,
}

impl Property {
    /// Interpret a decoded line, reading floating times in `tz`.
    ///
    /// Returns `None` for properties that don't describe an event field.
    pub fn decode_in<Tz: TimeZone>(property: DecodedProperty, tz: &Tz) -> Option<Property> {
        let is_all_day = property.marks_date_value();
        let DecodedProperty {
            name,
            parameters,
            raw_value,
            ..
        } = property;

        let prop = match &name as &str {
            "SUMMARY" => Property::Summary(PropertyValue {
                value: unescape(&raw_value, Newline::Space),
                parameters,
            }),
            "DESCRIPTION" => Property::Description(PropertyValue {
                value: unescape(&raw_value, Newline::LineBreak),
                parameters,
            }),
            "LOCATION" => Property::Location(PropertyValue {
                value: unescape(&raw_value, Newline::Space),
                parameters,
            }),
            "DTSTART" => Property::Start {
                value: PropertyValue {
                    value: parse_date_in(&raw_value, tz),
                    parameters,
                },
                is_all_day,
            },
            "DTEND" => Property::End(PropertyValue {
                value: parse_date_in(&raw_value, tz),
                parameters,
            }),
            _ => return None,
        };

        Some(prop)
    }
}

/// Parse a `DATE` or `DATE-TIME` value, reading floating times in the host's
/// local timezone.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    parse_date_in(value, &Local)
}

/// Parse a `DATE` or `DATE-TIME` value into an absolute instant.
///
/// Accepted shapes, after dropping anything up to the last `:`:
///
/// - `YYYYMMDD`: midnight at the start of that day in `tz`.
/// - `YYYYMMDDTHHMMSSZ`: that instant in UTC.
/// - `YYYYMMDDTHHMMSS`: that wall-clock time in `tz`.
///
/// Named timezones are not resolved, a `TZID` only ever yields a floating
/// time. Anything else, including out-of-range fields and wall-clock times
/// skipped by a DST transition, gives `None`.
pub fn parse_date_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.rsplit(':').next().unwrap_or(value).trim();

    match value.len() {
        8 => {
            let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
            from_local(tz, date.and_hms_opt(0, 0, 0)?)
        }
        15 | 16 => {
            let (stamp, is_utc) = match value.strip_suffix('Z') {
                Some(stamp) => (stamp, true),
                None => (value, false),
            };

            if stamp.len() != 15 {
                return None;
            }

            let date = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S").ok()?;

            if is_utc {
                Some(date.and_utc())
            } else {
                from_local(tz, date)
            }
        }
        _ => None,
    }
}

pub(crate) fn from_local<Tz: TimeZone>(tz: &Tz, date: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
}
