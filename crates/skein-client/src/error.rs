//! Errors talking to the lineage server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("lineage server request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid lineage server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed lineage payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("lineage server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// 401 from the server; the API key is missing or rejected.
    #[error("lineage server rejected credentials: {0}")]
    Unauthorized(String),

    /// 404 from the server, e.g. marking a run that was never created.
    #[error("unknown to lineage server: {0}")]
    NotFound(String),

    #[error("invalid lineage client configuration: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status the server answered with, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Unauthorized(_) => Some(401),
            Error::NotFound(_) => Some(404),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the same call may succeed later: unreachable server, timeout,
    /// throttling, or a 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the lineage server.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    pub message: String,
}
