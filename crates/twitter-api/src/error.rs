use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TwitterError>;

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("unexpected status ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("api error: {0}")]
    Api(String),
}

impl TwitterError {
    /// Whether a later attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TwitterError::RateLimited { .. } | TwitterError::Server { .. } => true,
            TwitterError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Wait requested by the API before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TwitterError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether the credentials were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, TwitterError::Unauthorized { .. })
    }
}
