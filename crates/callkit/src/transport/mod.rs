//! Transport trait and implementations for sending a single request.
//!
//! The [`Transport`] performs exactly one network round trip; retries are
//! layered on top by [`crate::RetryingExecutor`].
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use callkit::transport::{MockTransport, Transport};
//! use callkit::{Method, Request};
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "https://example.com/goals/1", 200, r#"{"data":{}}"#);
//!
//! let response = mock
//!     .send(&Request::new(Method::Get, "https://example.com/goals/1"))
//!     .unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.requests().len(), 1);
//! ```

pub mod http;

use crate::error::{CallError, Result};
use crate::types::{Method, RawResponse, Request};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub use http::UreqTransport;

/// Sends one request and returns the raw response.
///
/// Implementations must not interpret status codes: a 4xx/5xx answer is
/// still `Ok`. Only failures to obtain a response are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<RawResponse>;
}

#[derive(Debug)]
struct Route {
    method: Method,
    url: String,
    responses: VecDeque<RawResponse>,
}

/// Mock transport for testing without network access.
///
/// Responses are scripted per method and URL. Queued responses are served
/// in order; the last one repeats once the queue is down to one entry.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a new mock with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a method and URL.
    pub fn respond(&self, method: Method, url: impl Into<String>, status: u16, body: impl Into<String>) {
        let url = url.into();
        let response = RawResponse::new(status, body);
        let mut routes = self.routes.lock().unwrap();

        match routes.iter_mut().find(|r| r.method == method && r.url == url) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                url,
                responses: VecDeque::from([response]),
            }),
        }
    }

    /// Queue a sequence of statuses (with empty JSON bodies) followed by a final response.
    pub fn respond_sequence(&self, method: Method, url: &str, statuses: &[u16], body: &str) {
        for status in statuses {
            self.respond(method, url, *status, "{}");
        }
        self.respond(method, url, 200, body);
    }

    /// All requests sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent with the given method.
    pub fn requests_with(&self, method: Method) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.url == request.url)
            .ok_or_else(|| {
                CallError::Transport(format!("no mock route for {} {}", request.method, request.url))
            })?;

        if route.responses.len() > 1 {
            Ok(route.responses.pop_front().unwrap_or_else(|| RawResponse::new(200, "")))
        } else {
            route
                .responses
                .front()
                .cloned()
                .ok_or_else(|| CallError::Transport("empty mock route".to_string()))
        }
    }
}
