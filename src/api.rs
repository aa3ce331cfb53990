//! Events from a calendar API returning JSON, shaped like Google Calendar's
//! `events.list` response.

use anyhow::{Context, Error};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::{
    components::{CalendarEvent, Clock, EventOrigin},
    property::from_local,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsResponse {
    pub items: Option<Vec<ApiEvent>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEvent {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
}

/// Either a timed instant or, for all-day events, a bare date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl EventDateTime {
    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none()
    }

    /// The instant this refers to, with bare dates and offset-less times read
    /// in `tz`.
    pub fn to_utc<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        if let Some(date_time) = &self.date_time {
            return match DateTime::parse_from_rfc3339(date_time) {
                Ok(d) => Some(d.with_timezone(&Utc)),
                Err(_) => NaiveDateTime::parse_from_str(date_time, "%Y-%m-%dT%H:%M:%S")
                    .ok()
                    .and_then(|d| from_local(tz, d)),
            };
        }

        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        from_local(tz, date.and_hms_opt(0, 0, 0)?)
    }
}

impl ApiEvent {
    pub fn to_event<Tz: TimeZone>(&self, tz: &Tz) -> CalendarEvent {
        CalendarEvent {
            summary: self.summary.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            start: self.start.as_ref().and_then(|s| s.to_utc(tz)),
            end: self.end.as_ref().and_then(|e| e.to_utc(tz)),
            is_all_day: self.start.as_ref().map_or(false, EventDateTime::is_all_day),
            origin: EventOrigin::Api,
        }
    }
}

/// Parse an API response into the events that haven't started yet.
pub fn parse_json<C: Clock>(data: &str, clock: C) -> Result<Vec<CalendarEvent>, Error> {
    parse_json_in(data, clock, Local)
}

/// Like [`parse_json`] but reading bare dates in `tz`.
pub fn parse_json_in<C: Clock, Tz: TimeZone>(
    data: &str,
    clock: C,
    tz: Tz,
) -> Result<Vec<CalendarEvent>, Error> {
    let response: EventsResponse =
        serde_json::from_str(data).context("decoding calendar API response")?;

    let mut events = Vec::new();
    for item in response.items.unwrap_or_default() {
        let event = item.to_event(&tz);
        let now = clock.now();

        if event.starts_after(now) {
            events.push(event);
        } else {
            log::debug!(
                "Dropping event {:?} starting {:?}, not after {}",
                event.summary,
                event.start,
                now
            );
        }
    }

    log::debug!("Parsed {} upcoming events", events.len());

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn timed_and_all_day_items() -> Result<(), Error> {
        let data = r#"{
            "kind": "calendar#events",
            "items": [
                {
                    "summary": "Jam Night",
                    "location": "Main Hall",
                    "start": {"dateTime": "2025-06-15T19:00:00+01:00"},
                    "end": {"dateTime": "2025-06-15T22:00:00+01:00"}
                },
                {
                    "summary": "Festival",
                    "description": "All weekend",
                    "start": {"date": "2025-07-05"},
                    "end": {"date": "2025-07-07"}
                }
            ]
        }"#;

        let events = parse_json_in(data, now(), Utc)?;

        assert_eq!(events.len(), 2);

        assert_eq!(events[0].summary, "Jam Night");
        assert_eq!(events[0].location, "Main Hall");
        assert!(!events[0].is_all_day);
        assert_eq!(events[0].start, Some(Utc.with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap()));
        assert_eq!(events[0].origin, EventOrigin::Api);

        assert!(events[1].is_all_day);
        assert_eq!(events[1].description, "All weekend");
        assert_eq!(events[1].start, Some(Utc.with_ymd_and_hms(2025, 7, 5, 0, 0, 0).unwrap()));
        assert_eq!(events[1].end, Some(Utc.with_ymd_and_hms(2025, 7, 7, 0, 0, 0).unwrap()));

        Ok(())
    }

    #[test]
    fn bare_dates_use_given_timezone() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let start = EventDateTime {
            date_time: None,
            date: Some("2025-07-05".to_string()),
        };

        assert_eq!(
            start.to_utc(&tz),
            Some(Utc.with_ymd_and_hms(2025, 7, 4, 23, 0, 0).unwrap())
        );
    }

    #[test]
    fn past_and_undated_items_are_dropped() -> Result<(), Error> {
        let data = r#"{"items": [
            {"summary": "Past", "start": {"dateTime": "2025-05-01T19:00:00Z"}},
            {"summary": "No start"},
            {"summary": "Bad start", "start": {"dateTime": "soon"}},
            {"start": {"dateTime": "2025-06-02T19:00:00Z"}}
        ]}"#;

        let events = parse_json_in(data, now(), Utc)?;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "");

        Ok(())
    }

    #[test]
    fn far_future_item_with_system_clock() -> Result<(), Error> {
        let data = r#"{"items": [{"summary": "Jam", "start": {"date": "2099-12-31"}}]}"#;

        let events = parse_json(data, crate::components::SystemClock)?;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_all_day);

        Ok(())
    }

    #[test]
    fn missing_items() -> Result<(), Error> {
        assert!(parse_json_in("{}", now(), Utc)?.is_empty());
        assert!(parse_json_in(r#"{"items": null}"#, now(), Utc)?.is_empty());

        Ok(())
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_json_in("BEGIN:VCALENDAR", now(), Utc).is_err());
    }
}
