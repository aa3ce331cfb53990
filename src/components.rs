use chrono::{DateTime, Local, TimeZone, Utc};

use crate::{
    parser::{logical_lines, DecodedProperty},
    property::Property,
};

const BEGIN_EVENT: &str = "BEGIN:VEVENT";
const END_EVENT: &str = "END:VEVENT";

/// Where an event was read from.
///
/// Feeds differ in how a missing title is shown and whether the event gets
/// classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrigin {
    #[default]
    Ics,
    Api,
}

/// An upcoming event, as shown on the site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Whether the event only has date granularity.
    pub is_all_day: bool,
    pub origin: EventOrigin,
}

impl CalendarEvent {
    /// Whether the event has a start that is strictly after `now`.
    ///
    /// Ongoing events don't count.
    pub fn starts_after(&self, now: DateTime<Utc>) -> bool {
        matches!(self.start, Some(start) if start > now)
    }

    fn apply(&mut self, property: Property) {
        match property {
            Property::Summary(value) => self.summary = value.value,
            Property::Description(value) => self.description = value.value,
            Property::Location(value) => self.location = value.value,
            Property::Start { value, is_all_day } => {
                self.is_all_day = is_all_day;
                self.start = value.value;
            }
            Property::End(value) => self.end = value.value,
        }
    }
}

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at a fixed instant.
impl Clock for DateTime<Utc> {
    fn now(&self) -> DateTime<Utc> {
        *self
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug)]
enum State {
    Idle,
    InEvent(CalendarEvent),
}

/// Builds events out of a stream of logical lines.
///
/// `BEGIN:VEVENT` opens an event, properties fill it in (last one wins) and
/// `END:VEVENT` closes it. A closed event is kept only if it starts after the
/// clock's current instant, read at the moment it closes.
///
/// A `BEGIN:VEVENT` inside an open event abandons the open one and starts
/// afresh. A stray `END:VEVENT` is ignored, as is an event left open when the
/// input runs out.
///
/// Every parse needs its own assembler.
#[derive(Debug)]
pub struct EventAssembler<C, Tz> {
    clock: C,
    tz: Tz,
    state: State,
    events: Vec<CalendarEvent>,
}

impl<C: Clock, Tz: TimeZone> EventAssembler<C, Tz> {
    /// An assembler that reads floating times in `tz`.
    pub fn with_timezone(clock: C, tz: Tz) -> Self {
        EventAssembler {
            clock,
            tz,
            state: State::Idle,
            events: Vec::new(),
        }
    }

    pub fn is_in_event(&self) -> bool {
        matches!(self.state, State::InEvent(_))
    }

    /// Feed the next logical line.
    pub fn push_line(&mut self, line: &str) {
        if line == BEGIN_EVENT {
            if self.is_in_event() {
                log::warn!("Found {} inside an open event, discarding the open one", BEGIN_EVENT);
            }

            self.state = State::InEvent(CalendarEvent::default());
            return;
        }

        if line == END_EVENT {
            match std::mem::replace(&mut self.state, State::Idle) {
                State::InEvent(event) => self.commit(event),
                State::Idle => log::debug!("Ignoring {} without an open event", END_EVENT),
            }
            return;
        }

        let event = match &mut self.state {
            State::InEvent(event) => event,
            State::Idle => return,
        };

        let decoded = match DecodedProperty::from_line(line) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::trace!("Skipping line: {}", e);
                return;
            }
        };

        match Property::decode_in(decoded, &self.tz) {
            Some(property) => event.apply(property),
            None => log::trace!("Ignoring property in line {:?}", line),
        }
    }

    fn commit(&mut self, event: CalendarEvent) {
        let now = self.clock.now();

        if event.starts_after(now) {
            self.events.push(event);
        } else {
            log::debug!(
                "Dropping event {:?} starting {:?}, not after {}",
                event.summary,
                event.start,
                now
            );
        }
    }

    /// The committed events, in the order they were read.
    pub fn finish(self) -> Vec<CalendarEvent> {
        if let State::InEvent(event) = &self.state {
            log::debug!("Discarding unterminated event {:?}", event.summary);
        }

        self.events
    }
}

/// Parse an ICS body into the events that haven't started yet.
pub fn parse_ics<C: Clock>(data: &str, clock: C) -> Vec<CalendarEvent> {
    parse_ics_in(data, clock, Local)
}

/// Like [`parse_ics`] but reading floating times in `tz`.
pub fn parse_ics_in<C: Clock, Tz: TimeZone>(data: &str, clock: C, tz: Tz) -> Vec<CalendarEvent> {
    let mut assembler = EventAssembler::with_timezone(clock, tz);

    for line in logical_lines(data) {
        assembler.push_line(&line);
    }

    let events = assembler.finish();
    log::debug!("Parsed {} upcoming events", events.len());

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};
    use std::cell::Cell;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn event(summary: &str, start: &str) -> String {
        format!("BEGIN:VEVENT\nSUMMARY:{}\nDTSTART:{}\nEND:VEVENT\n", summary, start)
    }

    #[test]
    fn keeps_only_future_events() {
        let data = [
            event("Past", "20250601T115959Z"),
            event("Now", "20250601T120000Z"),
            event("Future", "20250601T120001Z"),
        ]
        .concat();

        let events = parse_ics_in(&data, now(), Utc);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Future");
        assert_eq!(events[0].start, Some(now() + Duration::seconds(1)));
    }

    #[test]
    fn clock_is_read_at_each_commit() {
        struct Ticking(Cell<DateTime<Utc>>);

        impl Clock for Ticking {
            fn now(&self) -> DateTime<Utc> {
                let now = self.0.get();
                self.0.set(now + Duration::hours(1));
                now
            }
        }

        let data = [
            event("First", "20250601T123000Z"),
            event("Second", "20250601T123000Z"),
        ]
        .concat();

        let clock = Ticking(Cell::new(now()));
        let events = parse_ics_in(&data, &clock, Utc);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "First");
    }

    #[test]
    fn events_without_start_are_dropped() {
        let data = "BEGIN:VEVENT\nSUMMARY:No date\nEND:VEVENT\n\
                    BEGIN:VEVENT\nSUMMARY:Bad date\nDTSTART:tomorrow\nEND:VEVENT\n";

        assert!(parse_ics_in(data, now(), Utc).is_empty());
    }

    #[test]
    fn all_day_event() {
        let data = "BEGIN:VEVENT\nSUMMARY:Festival\nDTSTART;VALUE=DATE:20250701\n\
                    DTEND;VALUE=DATE:20250702\nEND:VEVENT";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(events.len(), 1);
        assert!(events[0].is_all_day);
        assert_eq!(events[0].start, Some(Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()));
        assert_eq!(events[0].end, Some(Utc.with_ymd_and_hms(2025, 7, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn any_value_date_mention_marks_all_day() {
        for start in &[
            "DTSTART;VALUE=DATE-TIME:20250702T100000Z",
            "DTSTART;X-NOTE=VALUE=DATE:20250702T100000Z",
        ] {
            let data = format!("BEGIN:VEVENT\nSUMMARY:x\n{}\nEND:VEVENT", start);

            let events = parse_ics_in(&data, now(), Utc);

            assert_eq!(events.len(), 1, "{}", start);
            assert!(events[0].is_all_day, "{}", start);
            assert_eq!(events[0].start, Some(Utc.with_ymd_and_hms(2025, 7, 2, 10, 0, 0).unwrap()));
        }
    }

    #[test]
    fn floating_times_use_given_timezone() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let events = parse_ics_in(&event("Jam", "20250615T190000"), now(), tz);

        assert_eq!(events[0].start, Some(Utc.with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap()));
        assert!(!events[0].is_all_day);
    }

    #[test]
    fn text_fields_are_unescaped_once() {
        let data = "BEGIN:VEVENT\r\n\
                    SUMMARY:Strum\\, Sing\\nRepeat \\\\o/\r\n\
                    LOCATION:The Hall\\, Upstairs\r\n\
                    DESCRIPTION:Line one\\nLine two\r\n\
                    DTSTART:20250615T190000Z\r\n\
                    END:VEVENT\r\n";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(events[0].summary, "Strum, Sing Repeat \\o/");
        assert_eq!(events[0].location, "The Hall, Upstairs");
        assert_eq!(events[0].description, "Line one\nLine two");
    }

    #[test]
    fn folded_summary() {
        let data = "BEGIN:VEVENT\r\nSUMMARY:Ukulele \r\n Jam\r\n  Night\r\nDTSTART:20250615T190000Z\r\nEND:VEVENT";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(events[0].summary, "Ukulele JamNight");
    }

    #[test]
    fn repeated_properties_last_wins() {
        let data = "BEGIN:VEVENT\nSUMMARY:First\nSUMMARY:Second\n\
                    DTSTART;VALUE=DATE:20250701\nDTSTART:20250702T100000Z\nEND:VEVENT";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(events[0].summary, "Second");
        assert!(!events[0].is_all_day);
        assert_eq!(events[0].start, Some(Utc.with_ymd_and_hms(2025, 7, 2, 10, 0, 0).unwrap()));
    }

    #[test]
    fn malformed_lines_do_not_touch_the_event() {
        let data = "BEGIN:VEVENT\nSUMMARY:Jam\nNOT A PROPERTY\n\nX-WR-CALNAME:Club\n\
                    DTSTART:20250615T190000Z\nEND:VEVENT";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(
            events,
            vec![CalendarEvent {
                summary: "Jam".to_string(),
                start: Some(Utc.with_ymd_and_hms(2025, 6, 15, 19, 0, 0).unwrap()),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn properties_outside_events_are_ignored() {
        let data = "BEGIN:VCALENDAR\nSUMMARY:Calendar level\nDTSTART:20250615T190000Z\n\
                    BEGIN:VEVENT\nDTSTART:20250616T190000Z\nEND:VEVENT\nEND:VCALENDAR";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "");
    }

    #[test]
    fn nested_begin_restarts_the_event() {
        let data = "BEGIN:VEVENT\nSUMMARY:Abandoned\nDTSTART:20250615T190000Z\n\
                    BEGIN:VEVENT\nSUMMARY:Kept\nEND:VEVENT";

        let events = parse_ics_in(data, now(), Utc);

        // The restarted event carries nothing over, not even the start.
        assert!(events.is_empty());

        let data = "BEGIN:VEVENT\nSUMMARY:Abandoned\nDTSTART:20250615T190000Z\n\
                    BEGIN:VEVENT\nSUMMARY:Kept\nDTSTART:20250616T190000Z\nEND:VEVENT";

        let events = parse_ics_in(data, now(), Utc);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Kept");
    }

    #[test]
    fn stray_end_and_unterminated_events() {
        let data = "END:VEVENT\n\
                    BEGIN:VEVENT\nSUMMARY:Kept\nDTSTART:20250616T190000Z\nEND:VEVENT\n\
                    END:VEVENT\n\
                    BEGIN:VEVENT\nSUMMARY:Unterminated\nDTSTART:20250617T190000Z\n";

        let mut assembler = EventAssembler::with_timezone(now(), Utc);
        for line in logical_lines(data) {
            assembler.push_line(&line);
        }

        assert!(assembler.is_in_event());

        let events = assembler.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Kept");
    }
}
