use std::path::Path;

use anyhow::{ensure, Context, Error};
use serde::Deserialize;
use url::Url;

use crate::{
    fetch::FeedFormat,
    render::{Messages, RenderOptions, MAX_EVENTS},
};

pub const DEFAULT_CONTAINER_ID: &str = "upcoming-events-list";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub calendar: Calendar,
    #[serde(default)]
    pub messages: Messages,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Calendar {
    pub url: Url,
    #[serde(default)]
    pub format: FeedFormat,
    #[serde(default = "default_container_id")]
    pub container_id: String,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Give up on the request after this many seconds. Waits forever if unset.
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_events: self.calendar.max_events,
            messages: self.messages.clone(),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;

        ensure!(config.calendar.max_events > 0, "max_events must be at least 1");
        ensure!(
            !config.calendar.container_id.is_empty(),
            "container_id must not be empty"
        );

        Ok(config)
    }
}

pub fn init(path: impl AsRef<Path>) -> Result<Config, Error> {
    let path = path.as_ref();
    let string = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;

    string
        .parse::<Config>()
        .with_context(|| format!("parsing config {}", path.display()))
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

const fn default_max_events() -> usize {
    MAX_EVENTS
}
