use std::time::Duration;

use serde::Deserialize;
use ureq::Agent;
use url::Url;

/// The payload shape a calendar endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// Raw iCalendar text.
    #[default]
    Ics,
    /// A JSON object with an `items` array.
    Json,
}

impl FeedFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            FeedFormat::Ics => "text/calendar",
            FeedFormat::Json => "application/json",
        }
    }
}

/// Retrieves the raw body of a calendar feed.
pub trait Fetch {
    fn fetch(&self, url: &Url, format: FeedFormat) -> Result<String, Error>;
}

/// Fetches feeds over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: Agent::new(),
        }
    }

    /// A fetcher that gives up on a request after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url, format: FeedFormat) -> Result<String, Error> {
        log::debug!("Fetching calendar from {}", url);

        let body = self
            .agent
            .get(url.as_str())
            .set("Accept", format.content_type())
            .call()?
            .into_string()?;

        Ok(body)
    }
}

/// Failure to retrieve a calendar feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server answered with a non-success status.
    Http(u16),
    /// The request never got an answer.
    Transport,
    /// The body could not be read or understood.
    Decode,
}

impl Error {
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::Http(status) => write!(f, "HTTP error {}: {}", status, self.message),
            ErrorKind::Transport => write!(f, "request failed: {}", self.message),
            ErrorKind::Decode => write!(f, "invalid calendar data: {}", self.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(status, response) => Self {
                kind: ErrorKind::Http(status),
                message: response.status_text().to_string(),
            },
            ureq::Error::Transport(transport) => Self {
                kind: ErrorKind::Transport,
                message: transport.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::decode(e.to_string())
    }
}
