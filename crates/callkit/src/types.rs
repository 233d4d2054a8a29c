//! Core types for calls and retry configuration.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// HTTP method used by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    /// Canonical method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// JSON document.
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    pub body: Body,
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
}

impl Request {
    /// Create a request with no query, body or credentials.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: Body::Empty,
            bearer: None,
        }
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Attach a bearer token.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// The `Authorization` header value, if any.
    pub fn authorization(&self) -> Option<String> {
        self.bearer.as_ref().map(|t| format!("Bearer {t}"))
    }
}

/// Status and body of a response, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of requests sent for one call
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` (0-indexed) is `base * n²`
    pub backoff_base: Duration,
    /// Attempt at which a "slowing down" notice is emitted
    pub slow_notice_at: u32,
    /// Attempt at which a "still slow" notice is emitted
    pub patience_notice_at: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_base: Duration::from_millis(500),
            slow_notice_at: 6,
            patience_notice_at: 8,
        }
    }
}

impl RetryConfig {
    /// Create a retry config with custom attempt budget and delay unit.
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            ..Default::default()
        }
    }

    /// Calculate the delay after a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt.saturating_mul(attempt)
    }
}

/// Progress of a single call through its retry budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts already sent (0-indexed number of the next attempt)
    pub attempt: u32,
    /// Delay applied before the next attempt
    pub delay: Duration,
    /// Status that triggered the most recent retry
    pub last_status: Option<u16>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }
}
