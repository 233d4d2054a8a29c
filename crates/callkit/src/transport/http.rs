//! ureq-backed transport.

use crate::error::{CallError, Result};
use crate::transport::Transport;
use crate::types::{Body, Method, RawResponse, Request};
use std::time::Duration;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport using a blocking ureq agent.
///
/// Status codes are never turned into errors here; the executor decides
/// what a 4xx/5xx means.
pub struct UreqTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a new transport.
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .user_agent(concat!("goalsync/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply headers and query parameters shared by every method.
fn decorate<B>(mut builder: ureq::RequestBuilder<B>, request: &Request) -> ureq::RequestBuilder<B> {
    builder = builder.header("Accept", "application/json");
    if let Some(auth) = request.authorization() {
        builder = builder.header("Authorization", auth);
    }
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    builder
}

fn send_with_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: &Body,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Body::Empty => builder.send_empty(),
        Body::Json(value) => builder.send_json(value),
        Body::Form(pairs) => builder.send_form(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<RawResponse> {
        log::debug!("{} {}", request.method, request.url);

        let result = match request.method {
            Method::Get => decorate(self.agent.get(&request.url), request).call(),
            Method::Post => send_with_body(decorate(self.agent.post(&request.url), request), &request.body),
            Method::Put => send_with_body(decorate(self.agent.put(&request.url), request), &request.body),
        };

        let mut response = result.map_err(|e| CallError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| CallError::Transport(e.to_string()))?;

        log::debug!("Received response [{status}]: {body}");
        Ok(RawResponse { status, body })
    }
}
