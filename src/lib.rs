pub mod api;
pub mod calendar;
pub mod components;
pub mod config;
pub mod fetch;
pub mod parameters;
pub mod parser;
pub mod property;
pub mod render;
pub mod surface;
pub mod unescape;

pub use calendar::{init_calendar, Feed, Outcome};
pub use components::{parse_ics, CalendarEvent, Clock, EventOrigin, SystemClock};
