use std::{fmt::Display, sync::OnceLock};

use chrono::{DateTime, Local, TimeZone, Utc};
use itertools::Itertools;
use regex::Regex;
use serde::Deserialize;

use crate::components::{CalendarEvent, EventOrigin};

pub const MAX_EVENTS: usize = 20;

/// Title shown for API events that have none.
pub const UNTITLED_EVENT: &str = "Untitled Event";

const DATE_FORMAT: &str = "%a %-d %b %Y";
const TIME_FORMAT: &str = "%H:%M";

/// The texts shown instead of an event list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub loading: String,
    pub error: String,
    pub empty: String,
}

impl Default for Messages {
    fn default() -> Self {
        Messages {
            loading: "Loading upcoming events...".to_string(),
            error: "Unable to load events. Please try again later.".to_string(),
            empty: "No upcoming events at this time. Check back soon!".to_string(),
        }
    }
}

impl Messages {
    pub fn loading_html(&self) -> String {
        format!(r#"<p class="loading-events">{}</p>"#, escape_html(&self.loading))
    }

    pub fn error_html(&self) -> String {
        format!(r#"<p class="error-events">{}</p>"#, escape_html(&self.error))
    }

    pub fn empty_html(&self) -> String {
        format!(r#"<p class="no-events">{}</p>"#, escape_html(&self.empty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub max_events: usize,
    pub messages: Messages,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            max_events: MAX_EVENTS,
            messages: Messages::default(),
        }
    }
}

/// What sort of meetup an API event is, used as an extra CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    JamSession,
    Concert,
}

impl EventKind {
    pub fn classify(event: &CalendarEvent) -> EventKind {
        static JAM: OnceLock<Regex> = OnceLock::new();
        let jam = JAM.get_or_init(|| Regex::new(r"(?i)play-along|jam|session").unwrap());

        let text = format!("{} {}", event.description, event.summary);

        if jam.is_match(&text) {
            EventKind::JamSession
        } else {
            EventKind::Concert
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            EventKind::JamSession => "jam-session",
            EventKind::Concert => "concert",
        }
    }
}

/// One entry of the rendered list. Text fields are already HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    pub date: String,
    pub title: String,
    pub location: Option<String>,
    pub kind: Option<EventKind>,
}

impl DisplayRecord {
    pub fn from_event<Tz: TimeZone>(event: &CalendarEvent, tz: &Tz) -> DisplayRecord
    where
        Tz::Offset: Display,
    {
        let title = match event.origin {
            EventOrigin::Api if event.summary.is_empty() => UNTITLED_EVENT,
            _ => event.summary.as_str(),
        };

        let kind = match event.origin {
            EventOrigin::Api => Some(EventKind::classify(event)),
            EventOrigin::Ics => None,
        };

        DisplayRecord {
            date: event
                .start
                .map(|start| format_event_date_in(start, event.is_all_day, tz))
                .unwrap_or_default(),
            title: escape_html(title),
            location: Some(&event.location)
                .filter(|l| !l.is_empty())
                .map(|l| escape_html(l)),
            kind,
        }
    }

    pub fn to_html(&self) -> String {
        let class = match self.kind {
            Some(kind) => format!("calendar-event {}", kind.class_name()),
            None => "calendar-event".to_string(),
        };

        let mut html = format!(
            "<div class=\"{}\">\n  <div class=\"event-date\">{}</div>\n  <div class=\"event-title\">{}</div>\n",
            class, self.date, self.title
        );
        if let Some(location) = &self.location {
            html.push_str(&format!(
                "  <div class=\"event-location\">\u{1F4CD} {}</div>\n",
                location
            ));
        }
        html.push_str("</div>");

        html
    }
}

/// Sort events by start, keeping feed order for equal starts, and keep the
/// first `max`.
pub fn upcoming(events: Vec<CalendarEvent>, max: usize) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .sorted_by_key(|event| event.start)
        .take(max)
        .collect()
}

/// Format a start date as seen in `tz`, like `Sun 15 Jun 2025 at 19:00`,
/// leaving off the time for all-day events.
pub fn format_event_date_in<Tz: TimeZone>(start: DateTime<Utc>, is_all_day: bool, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let start = start.with_timezone(tz);
    let date = start.format(DATE_FORMAT).to_string();

    if is_all_day {
        date
    } else {
        format!("{} at {}", date, start.format(TIME_FORMAT))
    }
}

/// The display records for `events`, in display order.
pub fn display_records_in<Tz: TimeZone>(
    events: Vec<CalendarEvent>,
    max: usize,
    tz: &Tz,
) -> Vec<DisplayRecord>
where
    Tz::Offset: Display,
{
    upcoming(events, max)
        .iter()
        .map(|event| DisplayRecord::from_event(event, tz))
        .collect()
}

/// Render the event list markup, or the empty message when there are no
/// events.
pub fn render(events: Vec<CalendarEvent>, options: &RenderOptions) -> String {
    render_in(events, options, &Local)
}

/// Like [`render`] but showing dates as seen in `tz`.
pub fn render_in<Tz: TimeZone>(
    events: Vec<CalendarEvent>,
    options: &RenderOptions,
    tz: &Tz,
) -> String
where
    Tz::Offset: Display,
{
    let records = display_records_in(events, options.max_events, tz);
    if records.is_empty() {
        return options.messages.empty_html();
    }

    log::debug!("Rendering {} events", records.len());

    records.iter().map(DisplayRecord::to_html).join("\n")
}

/// Escape text for use in HTML content or a quoted attribute.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
