//! Standalone and service run modes.
//!
//! The service loop is a small state machine: [`ServiceLoop::poll`] looks at
//! the current time and says what to do next, and [`run_service`] carries
//! it out against a [`Clock`]. Missed fire times are never caught up; after
//! a pass the cursor moves to the first fire time after the pass ended.

use crate::clock::Clock;
use crate::expr::CronSchedule;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default interval between schedule checks.
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// How the process runs passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One pass, then exit
    Standalone,
    /// Passes on a cron schedule until shutdown
    Service,
}

/// Cooperative shutdown request, checked once per loop iteration
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The shared flag, for signal handlers
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// What the service loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RunPass,
    Sleep(Duration),
    Stop,
}

/// Cron cursor plus shutdown state
#[derive(Debug, Clone)]
pub struct ServiceLoop {
    schedule: CronSchedule,
    tick: Duration,
    next_fire: Option<DateTime<Utc>>,
    shutdown: ShutdownFlag,
}

impl ServiceLoop {
    /// Start a loop whose first fire is the first scheduled time after `start`
    pub fn new(schedule: CronSchedule, start: DateTime<Utc>, shutdown: ShutdownFlag) -> Self {
        let next_fire = schedule.next_after(start);
        Self {
            schedule,
            tick: DEFAULT_TICK,
            next_fire,
            shutdown,
        }
    }

    /// Set the interval between schedule checks
    #[must_use]
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    /// Next scheduled pass, or `None` if the schedule never fires again
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.next_fire
    }

    pub fn poll(&self, now: DateTime<Utc>) -> Action {
        if self.shutdown.is_requested() {
            return Action::Stop;
        }
        match self.next_fire {
            None => Action::Stop,
            Some(fire) if now >= fire => Action::RunPass,
            Some(_) => Action::Sleep(self.tick),
        }
    }

    /// Advance the cursor past `now` once a pass has run
    pub fn pass_finished(&mut self, now: DateTime<Utc>) {
        self.next_fire = self.schedule.next_after(now);
    }
}

/// Outcome of a service run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSummary {
    pub passes: usize,
    pub failures: usize,
    /// Message of the most recent failed pass
    pub last_error: Option<String>,
}

impl ServiceSummary {
    pub fn succeeded(&self) -> usize {
        self.passes - self.failures
    }
}

/// Run exactly one pass
pub fn run_standalone<T, E, F>(pass: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    info!("Running a single pass");
    let result = pass();
    if let Err(e) = &result {
        warn!("Pass failed: {e}");
    }
    result
}

/// Run passes on schedule until shutdown
///
/// A failed pass is logged and counted; the loop keeps going.
pub fn run_service<T, E, F>(mut state: ServiceLoop, clock: &dyn Clock, mut pass: F) -> ServiceSummary
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut summary = ServiceSummary::default();
    match state.next_fire() {
        Some(fire) => info!("Service started with schedule '{}', first pass at {fire}", state.schedule()),
        None => warn!("Schedule '{}' never fires", state.schedule()),
    }

    loop {
        match state.poll(clock.now()) {
            Action::Stop => break,
            Action::Sleep(tick) => clock.sleep(tick),
            Action::RunPass => {
                summary.passes += 1;
                if let Err(e) = pass() {
                    summary.failures += 1;
                    warn!("Pass {} failed: {e}", summary.passes);
                    summary.last_error = Some(e.to_string());
                }

                state.pass_finished(clock.now());
                match state.next_fire() {
                    Some(fire) => debug!("Next pass at {fire}"),
                    None => warn!("Schedule '{}' has no further fire times", state.schedule()),
                }
            }
        }
    }

    info!(
        "Service stopped after {} pass(es), {} failed",
        summary.passes, summary.failures
    );
    summary
}
