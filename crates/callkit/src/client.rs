//! Bearer-authenticated client bound to one API base URL.

use crate::error::Result;
use crate::executor::RetryingExecutor;
use crate::types::{Body, Method, Request};
use serde_json::Value;

/// A client for one service: base URL, bearer token and shared executor.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    executor: RetryingExecutor,
}

impl ApiClient {
    /// Create a client for `base_url` that authenticates with `token`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, executor: RetryingExecutor) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Some(token.into()),
            executor,
        }
    }

    /// Create a client that sends no credentials.
    pub fn anonymous(base_url: impl Into<String>, executor: RetryingExecutor) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            executor,
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute a call against this service.
    pub fn execute(&self, method: Method, path: &str, params: &[(&str, &str)], body: Body) -> Result<Value> {
        let mut request = Request::new(method, self.url(path)).body(body);
        for (key, value) in params {
            request = request.query(*key, *value);
        }
        if let Some(token) = &self.token {
            request = request.bearer(token.clone());
        }

        self.executor.execute(&request)
    }

    /// `GET` a path.
    pub fn get(&self, path: &str) -> Result<Value> {
        self.execute(Method::Get, path, &[], Body::Empty)
    }

    /// `POST` a JSON body to a path.
    pub fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(Method::Post, path, &[], Body::Json(body))
    }

    /// `PUT` a JSON body to a path.
    pub fn put_json(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(Method::Put, path, &[], Body::Json(body))
    }
}
