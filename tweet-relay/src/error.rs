//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Detail fetch failed for item {id}: {message}")]
    DetailFetch { id: String, message: String },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Mention resolution failed: {0}")]
    MentionResolution(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn scan(msg: impl Into<String>) -> Self {
        Self::Scan(msg.into())
    }

    pub fn detail_fetch(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DetailFetch {
            id: id.into(),
            message: msg.into(),
        }
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Errors that must stop the process before the scheduler starts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::config("missing TWITTER_USERNAME").is_fatal());
        assert!(Error::auth("401").is_fatal());
        assert!(!Error::scan("timeout").is_fatal());
        assert!(!Error::detail_fetch("1", "gone").is_fatal());
        assert!(!Error::delivery("500").is_fatal());
        assert!(!Error::MentionResolution("no guild".to_string()).is_fatal());
    }

    #[test]
    fn test_detail_fetch_display() {
        let err = Error::detail_fetch("123", "not found");
        assert_eq!(
            err.to_string(),
            "Detail fetch failed for item 123: not found"
        );
    }
}
