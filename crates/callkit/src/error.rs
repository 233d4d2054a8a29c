//! Error types for outbound API calls.
//!
//! Errors are categorized so callers can give appropriate feedback.
//! Retryable statuses never surface here unless the attempt budget
//! is exhausted.

use std::fmt;
use thiserror::Error;

/// Result type alias for call operations.
pub type Result<T> = std::result::Result<T, CallError>;

/// Categories of call errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credentials rejected (401/403).
    Auth,
    /// Resource does not exist (404).
    NotFound,
    /// Remote kept answering 429/500 until the attempt budget ran out.
    RateLimited,
    /// Request was rejected for another client-side reason.
    Rejected,
    /// Remote failed with a non-retryable server error.
    Server,
    /// Connection-level failure (DNS, refused, TLS, timeout).
    Network,
    /// Response body could not be understood.
    Format,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Auth => "Authentication failed",
            Self::NotFound => "Resource not found",
            Self::RateLimited => "Rate limit not cleared",
            Self::Rejected => "Request rejected",
            Self::Server => "Remote server error",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected response format",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Auth => "Check the access token or key configured for this service",
            Self::NotFound => "Verify the goal or report identifiers in the config file",
            Self::RateLimited => "Reduce sync frequency or try again later",
            Self::Rejected => "Check the error message returned by the service",
            Self::Server => "The service may be degraded, try again later",
            Self::Network => "Check your internet connection and try again",
            Self::Format => "The service API may have changed, check the API version",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while calling a remote API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// Remote answered with a terminal error status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// First error message reported by the service.
        message: String,
    },

    /// Every attempt was answered with a retryable status.
    #[error("gave up after {attempts} attempts (last status {last_status})")]
    RateLimitTimeout {
        /// Number of requests sent.
        attempts: u32,
        /// Status of the final response.
        last_status: u16,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl CallError {
    /// Create an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Status code associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimitTimeout { last_status, .. } => Some(*last_status),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status, .. } => match status {
                401 | 403 => ErrorCategory::Auth,
                404 => ErrorCategory::NotFound,
                s if *s >= 500 => ErrorCategory::Server,
                _ => ErrorCategory::Rejected,
            },
            Self::RateLimitTimeout { .. } => ErrorCategory::RateLimited,
            Self::Transport(_) => ErrorCategory::Network,
            Self::Decode(_) => ErrorCategory::Format,
        }
    }
}

/// Whether a response status should be retried with backoff.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500)
}
