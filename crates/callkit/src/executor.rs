//! Retrying call executor.
//!
//! Every outbound call goes through [`RetryingExecutor::execute`], which
//! absorbs 429/500 responses with backoff and turns everything else into
//! either parsed JSON or a [`CallError`].

use crate::error::{CallError, Result};
use crate::retry::{LogCallback, RetryCallback, Sleeper, ThreadSleeper, with_backoff};
use crate::transport::{Transport, UreqTransport};
use crate::types::{RawResponse, Request, RetryConfig};
use serde_json::Value;
use std::sync::Arc;

/// Longest body excerpt used as an error message when the service sent
/// no structured error.
const MAX_MESSAGE_LEN: usize = 200;

/// Executes requests with bounded retries.
///
/// Cheap to clone; clones share the transport, sleeper and callback.
#[derive(Clone)]
pub struct RetryingExecutor {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    callback: Arc<dyn RetryCallback>,
    config: RetryConfig,
}

impl RetryingExecutor {
    /// Create an executor over the network with default retry settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(Arc::new(UreqTransport::new()))
    }

    /// Create an executor over a custom transport (for testing).
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(ThreadSleeper),
            callback: Arc::new(LogCallback),
            config: RetryConfig::default(),
        }
    }

    /// Replace the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the sleeper used between attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the retry progress callback.
    pub fn callback(mut self, callback: Arc<dyn RetryCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Get the current retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Send a request, retrying rate-limited responses, and parse the JSON body.
    pub fn execute(&self, request: &Request) -> Result<Value> {
        let response = with_backoff(
            &self.config,
            self.sleeper.as_ref(),
            self.callback.as_ref(),
            || self.transport.send(request),
        )?;

        interpret(response)
    }
}

impl Default for RetryingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a final (non-retryable) response into JSON or an error.
fn interpret(response: RawResponse) -> Result<Value> {
    if response.status >= 400 {
        return Err(CallError::Http {
            status: response.status,
            message: error_message(&response.body),
        });
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&response.body).map_err(|e| CallError::decode(e.to_string()))
}

/// Extract the first error message from an error response body.
///
/// Understands `{"errors":[{"message":..}]}`, a top-level array of error
/// objects, and OAuth-style `error_description`.
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let structured = parsed.as_ref().and_then(|json| {
        let first = match json {
            Value::Array(items) => items.first(),
            Value::Object(map) => map.get("errors").and_then(Value::as_array).and_then(|e| e.first()),
            _ => None,
        };

        first
            .and_then(|e| e.get("message"))
            .or_else(|| json.get("error_description"))
            .or_else(|| json.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    structured.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "no error details".to_string()
        } else {
            trimmed.chars().take(MAX_MESSAGE_LEN).collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{NoCallback, RecordingSleeper};
    use crate::transport::MockTransport;
    use crate::types::Method;
    use std::time::Duration;

    const URL: &str = "https://api.test/goals/1";

    fn executor(mock: &MockTransport, sleeper: &RecordingSleeper) -> RetryingExecutor {
        RetryingExecutor::with_transport(Arc::new(mock.clone()))
            .sleeper(Arc::new(sleeper.clone()))
            .callback(Arc::new(NoCallback))
    }

    #[test]
    fn test_execute_parses_json() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, URL, 200, r#"{"data":{"gid":"1"}}"#);
        let sleeper = RecordingSleeper::new();

        let value = executor(&mock, &sleeper)
            .execute(&Request::new(Method::Get, URL))
            .unwrap();

        assert_eq!(value["data"]["gid"], "1");
    }

    #[test]
    fn test_rate_limited_then_success() {
        let mock = MockTransport::new();
        mock.respond_sequence(Method::Get, URL, &[429, 429, 429], r#"{"ok":true}"#);
        let sleeper = RecordingSleeper::new();

        let value = executor(&mock, &sleeper)
            .execute(&Request::new(Method::Get, URL))
            .unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(mock.requests().len(), 4);
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_secs(2)
            ]
        );
    }

    #[test]
    fn test_eleven_rate_limits_time_out() {
        let mock = MockTransport::new();
        for _ in 0..11 {
            mock.respond(Method::Get, URL, 429, "");
        }
        let sleeper = RecordingSleeper::new();

        let err = executor(&mock, &sleeper)
            .execute(&Request::new(Method::Get, URL))
            .unwrap_err();

        assert!(matches!(err, CallError::RateLimitTimeout { attempts: 10, .. }));
        assert_eq!(mock.requests().len(), 10);
    }

    #[test]
    fn test_terminal_error_uses_first_message() {
        let mock = MockTransport::new();
        mock.respond(
            Method::Get,
            URL,
            403,
            r#"{"errors":[{"message":"Not authorized"},{"message":"second"}]}"#,
        );
        let sleeper = RecordingSleeper::new();

        let err = executor(&mock, &sleeper)
            .execute(&Request::new(Method::Get, URL))
            .unwrap_err();

        assert_eq!(err, CallError::http(403, "Not authorized"));
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_empty_body_is_null() {
        let mock = MockTransport::new();
        mock.respond(Method::Put, URL, 204, "");
        let sleeper = RecordingSleeper::new();

        let value = executor(&mock, &sleeper)
            .execute(&Request::new(Method::Put, URL))
            .unwrap();

        assert!(value.is_null());
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, URL, 200, "<html>");
        let sleeper = RecordingSleeper::new();

        let err = executor(&mock, &sleeper)
            .execute(&Request::new(Method::Get, URL))
            .unwrap_err();

        assert!(matches!(err, CallError::Decode(_)));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"[{"message":"Session expired","errorCode":"INVALID_SESSION_ID"}]"#),
            "Session expired"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"user hasn't approved"}"#),
            "user hasn't approved"
        );
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(""), "no error details");
    }
}
