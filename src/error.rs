use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the video platform. Always transient: the cycle is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no channel found for id {0}")]
    NoItems(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Feed markup could not be parsed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed feed: {0}")]
    Malformed(&'static str),
}

/// Failure performing an action on the chat platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("missing permission to {0}")]
    Forbidden(String),
    #[error("discord error {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("failed to reach discord: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid discord response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PlatformError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, PlatformError::Forbidden(_))
    }
}
