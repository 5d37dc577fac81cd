//! Error types for the Mapit tracker.

use thiserror::Error;

/// Maximum number of body bytes rendered in error messages.
const MAX_DISPLAY_BODY: usize = 500;

/// The main error type for all tracker operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// The signature or tokens were rejected (HTTP 401/403).
    #[error("Unauthorized - tokens rejected or expired")]
    Unauthorized,

    /// Any other non-success HTTP response.
    #[error("Request failed with status {status}: {}", truncate_body(.body))]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The token cache file could not be read or written.
    #[error("Token cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A downstream reading store could not be reached.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Invalid or incomplete response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication error not tied to an HTTP status
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A required credential is not configured
    #[error("Missing credentials: {0} not set")]
    MissingCredentials(String),
}

impl TrackerError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        match status.as_u16() {
            401 | 403 => TrackerError::Unauthorized,
            code => TrackerError::RequestFailed {
                status: code,
                body: body.into(),
            },
        }
    }

    /// True when a fresh authentication may fix the failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TrackerError::Unauthorized)
    }

    /// True for failures a continuous poller should log and ride out.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TrackerError::Http(_)
                | TrackerError::HttpMiddleware(_)
                | TrackerError::Json(_)
                | TrackerError::RequestFailed { .. }
                | TrackerError::InvalidResponse(_)
                | TrackerError::StorageUnavailable(_)
        )
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::StorageUnavailable(err.to_string())
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_DISPLAY_BODY {
        return body.to_string();
    }
    let mut end = MAX_DISPLAY_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &body[..end], body.len())
}
