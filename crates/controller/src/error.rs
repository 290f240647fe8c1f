//! Error types for controller operations.
//!
//! Errors are categorized to enable retry logic and appropriate user
//! feedback. A missing object is its own variant because callers treat it
//! as a state change, not a failure.

use crate::types::Kind;
use std::fmt;
use thiserror::Error;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of controller errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connectivity problems and server-side failures (transient, retryable)
    Network,
    /// The object does not exist on the controller
    NotFound,
    /// Missing or rejected credentials
    Auth,
    /// The controller refused the request body
    Rejected,
    /// Unexpected response shape
    Format,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Controller unreachable",
            Self::NotFound => "Object not found",
            Self::Auth => "Authentication failed",
            Self::Rejected => "Request rejected by controller",
            Self::Format => "Unexpected response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the controller URL and that it is reachable, then try again",
            Self::NotFound => "Run `netform refresh` to drop objects deleted outside netform",
            Self::Auth => "Check the API key (NETFORM_API_KEY) and its permissions",
            Self::Rejected => "Check the declared values against the controller's constraints",
            Self::Format => "The controller version may be unsupported",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the controller.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or unexpected HTTP status.
    #[error("HTTP request failed: {message}")]
    Http {
        message: String,
        status: Option<u16>,
    },

    /// The request never left this host: DNS failure or refused connection.
    #[error("cannot reach controller: {0}")]
    Connect(String),

    /// The object does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: Kind, id: String },

    /// Credentials were missing or rejected.
    #[error("authentication failed (HTTP {status})")]
    Auth { status: u16 },

    /// The controller refused the request.
    #[error("{kind} rejected by controller: {message}")]
    Rejected { kind: Kind, message: String },

    /// The response could not be decoded.
    #[error("invalid {kind} response: {message}")]
    Decode { kind: Kind, message: String },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    pub fn not_found(kind: Kind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn decode(kind: Kind, err: impl fmt::Display) -> Self {
        Self::Decode {
            kind,
            message: err.to_string(),
        }
    }

    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                None => ErrorCategory::Network,
                Some(code) if *code == 429 || *code >= 500 => ErrorCategory::Network,
                Some(_) => ErrorCategory::Other,
            },
            Error::Connect(_) => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Auth { .. } => ErrorCategory::Auth,
            Error::Rejected { .. } => ErrorCategory::Rejected,
            Error::Decode { .. } => ErrorCategory::Format,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether the controller cannot have seen the request.
    ///
    /// Only these errors are safe to retry for non-idempotent calls.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Error::Connect(_))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                Self::Connect(err.to_string())
            }
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
