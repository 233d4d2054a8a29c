//! # goalkit
//!
//! Goal synchronization: compute each goal's value from its source, push
//! the value and a derived status to the goal store.
//!
//! ## Core Concepts
//!
//! - **Goal**: a configured id, the goal store id it maps to and a [`GoalSource`]
//! - **GoalSource**: fixed constant, report metric, weighted composite of
//!   other goals, or readback from the goal store itself
//! - **Pass**: one sync of every top-level goal, memoized per goal id
//! - **Status**: `OFF_TRACK` below 33% of target, `AT_RISK` below 66%,
//!   `ON_TRACK` otherwise
//!
//! ## Example
//!
//! ```
//! use goalkit::{Goal, GoalBook, GoalSource, GoalStatus, MockReports, MockStore, SyncEngine};
//!
//! let mut book = GoalBook::new();
//! book.insert(Goal::new("hires", "1201", GoalSource::Fixed { value: 40.0 }));
//! book.add_root("hires");
//!
//! let store = MockStore::new().with_goal("1201", 0.0, 200.0);
//! let engine = SyncEngine::new(book, Box::new(store.clone()), Box::new(MockReports::new()));
//!
//! let report = engine.run_pass().unwrap();
//! assert_eq!(report.get("hires").unwrap().status, GoalStatus::OffTrack);
//! ```
//!
//! ## Provider Traits
//!
//! - [`GoalStore`]: reads and writes goals ([`AsanaStore`], [`MockStore`])
//! - [`ReportSource`]: fetches reports ([`SalesforceReports`], [`MockReports`])
//! - [`Authenticator`]: produces report service credentials
//! - [`SyncObserver`]: receives progress updates during a pass

#![warn(clippy::all)]

pub mod context;
pub mod engine;
pub mod error;
pub mod report;
pub mod resolver;
pub mod status;
pub mod store;
pub mod types;

pub use context::{NoObserver, Pass, SyncObserver};
pub use engine::SyncEngine;
pub use error::{EngineError, ReportError, ResolveError, Result};
pub use report::{
    Authenticator, Credential, JwtBearer, MockReports, NoReports, Report, ReportSource, SalesforceReports,
    StaticCredential,
};
pub use resolver::Resolved;
pub use status::{assess, completion_ratio, status_for_ratio};
pub use store::{AsanaStore, GoalStore, MockStore, StoreCall};
pub use types::{Goal, GoalBook, GoalRecord, GoalSource, GoalStatus, PassReport, SubGoal, SyncResult};
