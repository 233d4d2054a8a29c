//! # callkit
//!
//! Blocking HTTP calls for rate-limited JSON APIs.
//!
//! This crate provides:
//! - A [`RetryingExecutor`] that absorbs 429/500 responses with quadratic
//!   backoff (`base * attempt²`) up to a bounded number of attempts
//! - An [`ApiClient`] that binds a base URL and bearer token to an executor
//! - A [`transport::Transport`] seam with a ureq implementation and a mock
//!
//! ## Example
//!
//! ```no_run
//! use callkit::{ApiClient, RetryingExecutor};
//!
//! let executor = RetryingExecutor::new();
//! let asana = ApiClient::new("https://app.asana.com/api/1.0", "token", executor);
//!
//! let goal = asana.get("goals/1201008336897091").expect("request failed");
//! println!("{}", goal["data"]["name"]);
//! ```
//!
//! ## Retry Logic
//!
//! Callers never write their own retry loop. Only 429 and 500 are retried;
//! any other status of 400 or above fails immediately with
//! [`CallError::Http`], carrying the first message from the service's
//! error list.

#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod executor;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::{CallError, ErrorCategory, Result, is_retryable_status};
pub use executor::RetryingExecutor;
pub use retry::{LogCallback, NoCallback, Notice, RecordingSleeper, RetryCallback, Sleeper, ThreadSleeper};
pub use types::{Body, Method, RawResponse, Request, RetryConfig, RetryState};
