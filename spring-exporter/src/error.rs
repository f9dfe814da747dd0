//! Error types for a scrape cycle.

use thiserror::Error;

/// Result type alias using [`ScrapeError`].
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors that can end a scrape cycle.
///
/// None of these are fatal to the process; the next scrape starts fresh.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The request could not be constructed (malformed URI).
    #[error("Failed to build request: {0}")]
    Construction(String),

    /// DNS, connect, TLS or timeout failure.
    #[error("Error scraping spring endpoint: {0}")]
    Transport(String),

    /// The endpoint answered with something other than 200.
    #[error("Response code is {0}, expected 200")]
    Status(u16),

    /// The response body could not be read after the headers arrived.
    #[error("Failed to read response body: {0}")]
    BodyRead(String),

    /// The body is not a flat JSON object of numbers.
    #[error("Failed to parse metrics payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Short label used for statistics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Construction(_) => "construction",
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::BodyRead(_) => "body_read",
            Self::Parse(_) => "parse",
        }
    }

    /// Whether an HTTP response was received before the error occurred.
    ///
    /// This decides the value of the `up` meta-measurement.
    pub fn response_received(&self) -> bool {
        matches!(self, Self::Status(_) | Self::BodyRead(_) | Self::Parse(_))
    }
}
