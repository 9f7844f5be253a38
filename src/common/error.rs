//! Error types for blogcheck
//!
//! Every failure a step can raise maps onto one of four kinds (acquisition,
//! timeout, assertion, transport). The scenario runner classifies step
//! failures by kind and by the step's declared criticality.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for blogcheck
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Could not acquire session: {0}")]
    Acquisition(String),

    #[error("Session already released")]
    SessionReleased,

    // === Step Errors ===
    #[error("Condition not met after {waited_ms} ms{}", last_error_suffix(.last_error))]
    Timeout {
        waited_ms: u64,
        last_error: Option<String>,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last error: {e})"))
        .unwrap_or_default()
}

/// Coarse classification of an [`Error`], recorded on failed step results
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Acquisition,
    Timeout,
    Assertion,
    Transport,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquisition => write!(f, "acquisition"),
            Self::Timeout => write!(f, "timeout"),
            Self::Assertion => write!(f, "assertion"),
            Self::Transport => write!(f, "transport"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl Error {
    /// Create an assertion error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create a timeout error
    pub fn timeout(waited_ms: u64, last_error: Option<String>) -> Self {
        Self::Timeout {
            waited_ms,
            last_error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Acquisition(_) => ErrorKind::Acquisition,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Assertion(_) => ErrorKind::Assertion,
            Error::Transport(_) | Error::SessionReleased => ErrorKind::Transport,
            _ => ErrorKind::Other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::timeout(0, Some(e.to_string()))
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<thirtyfour::error::WebDriverError> for Error {
    fn from(e: thirtyfour::error::WebDriverError) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::Acquisition("x".into()).kind(), ErrorKind::Acquisition);
        assert_eq!(Error::timeout(10, None).kind(), ErrorKind::Timeout);
        assert_eq!(Error::assertion("x").kind(), ErrorKind::Assertion);
        assert_eq!(Error::transport("x").kind(), ErrorKind::Transport);
        assert_eq!(Error::SessionReleased.kind(), ErrorKind::Transport);
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_timeout_message_includes_last_error() {
        let e = Error::timeout(200, Some("element not found".into()));
        assert_eq!(
            e.to_string(),
            "Condition not met after 200 ms (last error: element not found)"
        );
        assert_eq!(
            Error::timeout(50, None).to_string(),
            "Condition not met after 50 ms"
        );
    }
}
