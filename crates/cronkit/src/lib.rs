//! # cronkit
//!
//! Cron schedules and a polling service loop.
//!
//! - [`CronSchedule`]: five-field cron expressions with next-fire search
//! - [`Clock`]: injectable time source ([`SystemClock`], [`ManualClock`])
//! - [`ServiceLoop`]: state machine deciding between running a pass,
//!   sleeping a tick and stopping
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use cronkit::{Action, CronSchedule, ServiceLoop, ShutdownFlag};
//!
//! let schedule = CronSchedule::parse("*/30 * * * *").unwrap();
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 10, 0).unwrap();
//! let state = ServiceLoop::new(schedule, start, ShutdownFlag::new());
//!
//! assert_eq!(state.next_fire(), Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()));
//! assert!(matches!(state.poll(start), Action::Sleep(_)));
//! ```

#![warn(clippy::all)]

pub mod clock;
pub mod expr;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expr::{CronError, CronSchedule};
pub use scheduler::{
    Action, DEFAULT_TICK, Mode, ServiceLoop, ServiceSummary, ShutdownFlag, run_service, run_standalone,
};
