//! One fetch, parse and render pass over a calendar feed.

use std::fmt::Display;

use anyhow::Error;
use chrono::{Local, TimeZone};
use url::Url;

use crate::{
    api::parse_json_in,
    components::{parse_ics_in, Clock},
    config,
    fetch::{self, FeedFormat, Fetch},
    render::{render_in, RenderOptions},
    surface::Surface,
};

/// Where to read events from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub url: Url,
    pub format: FeedFormat,
}

impl From<&config::Calendar> for Feed {
    fn from(calendar: &config::Calendar) -> Self {
        Feed {
            url: calendar.url.clone(),
            format: calendar.format,
        }
    }
}

/// What ended up on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// This many events are listed.
    Rendered(usize),
    /// The feed had no upcoming events.
    Empty,
    /// The feed couldn't be retrieved; the error message is shown.
    Failed(fetch::Error),
}

/// Show the loading message, fetch the feed and replace it with the rendered
/// events, the empty message or the error message.
///
/// The fetch is tried once. `Err` is only returned if the surface itself
/// can't be updated.
pub fn init_calendar<F, S, C>(
    fetcher: &F,
    surface: &mut S,
    feed: &Feed,
    options: &RenderOptions,
    clock: C,
) -> Result<Outcome, Error>
where
    F: Fetch + ?Sized,
    S: Surface + ?Sized,
    C: Clock,
{
    init_calendar_in(fetcher, surface, feed, options, clock, Local)
}

/// Like [`init_calendar`] but reading and showing times in `tz`.
pub fn init_calendar_in<F, S, C, Tz>(
    fetcher: &F,
    surface: &mut S,
    feed: &Feed,
    options: &RenderOptions,
    clock: C,
    tz: Tz,
) -> Result<Outcome, Error>
where
    F: Fetch + ?Sized,
    S: Surface + ?Sized,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    surface.replace(&options.messages.loading_html())?;

    let events = fetcher.fetch(&feed.url, feed.format).and_then(|body| match feed.format {
        FeedFormat::Ics => Ok(parse_ics_in(&body, clock, tz.clone())),
        FeedFormat::Json => parse_json_in(&body, clock, tz.clone())
            .map_err(|e| fetch::Error::decode(format!("{:#}", e))),
    });

    let events = match events {
        Ok(events) => events,
        Err(e) => {
            log::error!("Error fetching calendar from {}: {}", feed.url, e);
            surface.replace(&options.messages.error_html())?;
            return Ok(Outcome::Failed(e));
        }
    };

    let shown = events.len().min(options.max_events);
    surface.replace(&render_in(events, options, &tz))?;

    if shown == 0 {
        Ok(Outcome::Empty)
    } else {
        Ok(Outcome::Rendered(shown))
    }
}
