//! Error types for the cascade monitor

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cascade monitor
#[derive(Error, Debug)]
pub enum Error {
    // Computation errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Non-finite value computed for {0}")]
    NonFinite(&'static str),

    // Feed errors
    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Feed request timed out after {0}ms")]
    FeedTimeout(u64),

    #[error("Feed returned status {status} for {url}")]
    FeedStatus { status: u16, url: String },

    // Position store errors
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Position persistence failed: {0}")]
    PositionPersistence(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Feed(_) | Error::FeedTimeout(_) => true,
            Error::FeedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this error signals a violated computation precondition
    pub fn is_computation_fault(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::NonFinite(_))
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Error::FeedStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        Error::Feed(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
