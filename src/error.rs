//! Error types for scrape-orchestrator
//!
//! Two families live here:
//! - [`Error`]: programmer / configuration errors. These are returned as `Err`
//!   synchronously, before any network activity starts.
//! - [`TransportError`]: a failed network exchange. These never cross the
//!   `fetch_one` / `fetch_many` boundary as `Err`; they are wrapped into
//!   [`Outcome::TransportFailed`](crate::types::Outcome::TransportFailed).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for scrape-orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scrape-orchestrator
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "timeout")
        key: Option<String>,
    },

    /// HTTP method string not in GET/PUT/POST/PATCH/DELETE/HEAD/OPTIONS
    #[error("unsupported HTTP method: {0:?}")]
    InvalidMethod(String),

    /// Target URL is empty, unparsable, or not http(s)
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The URL as given by the caller
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Header name or value that cannot be sent
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// The offending header name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Building the underlying HTTP client failed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Serialization error (JSON request bodies, JSON response decoding)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::Config`] with a key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Category of a transport-level failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The per-request deadline elapsed
    Timeout,
    /// Connection refused, reset, DNS or TLS failure
    Connect,
    /// Too many redirects or a redirect loop
    Redirect,
    /// Reading or decoding the response body failed
    Body,
    /// The response could not be interpreted as HTTP (e.g. invalid status line)
    Malformed,
    /// The worker executing the request terminated abnormally
    Aborted,
    /// Anything else the client reports
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Redirect => "redirect",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Malformed => "malformed",
            TransportErrorKind::Aborted => "aborted",
            TransportErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A network exchange that produced no usable HTTP response
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    /// Failure category
    pub kind: TransportErrorKind,
    /// Human-readable description from the client
    pub message: String,
}

impl TransportError {
    /// Create a new transport error
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Deadline exceeded after `after`
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("request timed out after {}ms", after.as_millis()),
        )
    }

    /// True for failures a caller may reasonably retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_redirect() {
            TransportErrorKind::Redirect
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, e.to_string())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn config_error_carries_key() {
        let err = Error::config("timeout must be greater than zero", "timeout");
        match &err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("timeout")),
            other => panic!("expected Config, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "configuration error: timeout must be greater than zero"
        );
    }

    #[test]
    fn timeout_error_reports_deadline() {
        let err = TransportError::timeout(Duration::from_millis(250));
        assert_eq!(err.kind, TransportErrorKind::Timeout);
        assert_eq!(err.to_string(), "timeout error: request timed out after 250ms");
    }

    #[test]
    fn only_timeouts_and_connect_failures_are_transient() {
        assert!(TransportError::new(TransportErrorKind::Timeout, "t").is_transient());
        assert!(TransportError::new(TransportErrorKind::Connect, "c").is_transient());
        assert!(!TransportError::new(TransportErrorKind::Malformed, "m").is_transient());
        assert!(!TransportError::new(TransportErrorKind::Aborted, "a").is_transient());
        assert!(!TransportError::new(TransportErrorKind::Body, "b").is_transient());
    }

    #[test]
    fn transport_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransportErrorKind::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
