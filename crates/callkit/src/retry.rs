//! Retry logic with quadratic backoff for rate-limited responses.
//!
//! A call is retried while the remote answers 429 or 500. The wait after
//! attempt `n` (0-indexed) is `backoff_base * n²`, so the first retry is
//! immediate. Any other status ends the loop right away.

use crate::error::{CallError, Result, is_retryable_status};
use crate::types::{RawResponse, RetryConfig, RetryState};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Something that can wait.
///
/// Injected so tests can observe backoff delays without sleeping.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Records requested delays instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Milestones worth telling the user about while retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Reached `slow_notice_at` attempts.
    SlowingDown,
    /// Reached `patience_notice_at` attempts.
    StillSlow,
    /// Attempt budget exhausted.
    Exhausted,
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Send + Sync {
    /// Called before sleeping ahead of a retry.
    ///
    /// `state.attempt` is the attempt that just failed (0-indexed).
    fn on_retry(&self, state: &RetryState, max_attempts: u32);

    /// Called when a milestone is reached.
    fn on_notice(&self, _notice: Notice, _state: &RetryState) {}
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _state: &RetryState, _max_attempts: u32) {}
}

/// Callback that reports through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, state: &RetryState, max_attempts: u32) {
        log::info!(
            "Attempt {}/{} answered {}; waiting {:.1}s before retrying",
            state.attempt + 1,
            max_attempts,
            state.last_status.unwrap_or_default(),
            state.delay.as_secs_f64()
        );
    }

    fn on_notice(&self, notice: Notice, state: &RetryState) {
        match notice {
            Notice::SlowingDown => log::warn!("Hitting rate limits, slowing down calls..."),
            Notice::StillSlow => log::warn!("Thanks for your patience, still slow."),
            Notice::Exhausted => log::error!(
                "Too many requests hit rate limits after {} attempts, giving up",
                state.attempt + 1
            ),
        }
    }
}

/// Send a request until it yields a non-retryable response.
///
/// `send` performs one attempt. Transport errors from `send` are returned
/// immediately. Responses with status 429 or 500 are retried up to
/// `config.max_attempts` sends in total; everything else is handed back to
/// the caller for interpretation.
pub fn with_backoff<F>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    callback: &dyn RetryCallback,
    mut send: F,
) -> Result<RawResponse>
where
    F: FnMut() -> Result<RawResponse>,
{
    let mut state = RetryState::new();

    loop {
        if state.attempt > 0 && state.attempt == config.slow_notice_at {
            callback.on_notice(Notice::SlowingDown, &state);
        }
        if state.attempt > 0 && state.attempt == config.patience_notice_at {
            callback.on_notice(Notice::StillSlow, &state);
        }

        let response = send()?;
        if !is_retryable_status(response.status) {
            return Ok(response);
        }

        state.last_status = Some(response.status);

        // No point waiting after the final attempt
        if state.attempt + 1 >= config.max_attempts {
            callback.on_notice(Notice::Exhausted, &state);
            return Err(CallError::RateLimitTimeout {
                attempts: state.attempt + 1,
                last_status: response.status,
            });
        }

        state.delay = config.delay_for_attempt(state.attempt);
        callback.on_retry(&state, config.max_attempts);
        sleeper.sleep(state.delay);
        state.attempt += 1;
    }
}
