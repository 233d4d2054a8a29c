//! Goal store trait and implementations.
//!
//! The goal store is the target system: it holds each goal's metric
//! (current and target value) and status. The primary implementation is
//! [`asana::AsanaStore`].
//!
//! # Testing
//!
//! Use [`MockStore`] for testing without network access:
//!
//! ```
//! use goalkit::store::{GoalStore, MockStore};
//!
//! let store = MockStore::new().with_goal("1201", 0.0, 200.0);
//! let record = store.set_current_value("1201", 40.0).unwrap();
//! assert_eq!(record.current_value, 40.0);
//! assert_eq!(store.value_writes("1201"), 1);
//! ```

pub mod asana;

use crate::types::{GoalRecord, GoalStatus};
use callkit::{CallError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub use asana::AsanaStore;

/// Read and write goal state in the target system.
pub trait GoalStore: Send + Sync {
    /// Fetch a goal's current metric and status.
    fn get_goal(&self, remote_id: &str) -> Result<GoalRecord>;

    /// Set the metric's current value; returns the updated goal.
    fn set_current_value(&self, remote_id: &str, value: f64) -> Result<GoalRecord>;

    /// Set the goal's status; returns the updated goal.
    fn update_status(&self, remote_id: &str, status: GoalStatus) -> Result<GoalRecord>;
}

/// A call made against a [`MockStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Get(String),
    SetValue(String, f64),
    SetStatus(String, GoalStatus),
}

impl StoreCall {
    fn remote_id(&self) -> &str {
        match self {
            Self::Get(id) | Self::SetValue(id, _) | Self::SetStatus(id, _) => id,
        }
    }
}

/// In-memory goal store for testing.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    records: Arc<Mutex<HashMap<String, GoalRecord>>>,
    failures: Arc<Mutex<HashMap<String, CallError>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl MockStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a goal with the given metric values.
    #[must_use]
    pub fn with_goal(self, remote_id: &str, current: f64, target: f64) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), GoalRecord::new(remote_id, current, target));
        self
    }

    /// Make every call for `remote_id` fail with `error`.
    #[must_use]
    pub fn failing(self, remote_id: &str, error: CallError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), error);
        self
    }

    /// Current state of a goal.
    pub fn record(&self, remote_id: &str) -> Option<GoalRecord> {
        self.records.lock().unwrap().get(remote_id).cloned()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of value writes for a goal.
    pub fn value_writes(&self, remote_id: &str) -> usize {
        self.count(remote_id, |c| matches!(c, StoreCall::SetValue(..)))
    }

    /// Number of status writes for a goal.
    pub fn status_writes(&self, remote_id: &str) -> usize {
        self.count(remote_id, |c| matches!(c, StoreCall::SetStatus(..)))
    }

    fn count(&self, remote_id: &str, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.remote_id() == remote_id && pred(c))
            .count()
    }

    fn apply(&self, call: StoreCall) -> Result<GoalRecord> {
        let remote_id = call.remote_id().to_string();
        self.calls.lock().unwrap().push(call.clone());

        if let Some(err) = self.failures.lock().unwrap().get(&remote_id) {
            return Err(err.clone());
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&remote_id)
            .ok_or_else(|| CallError::http(404, format!("goal {remote_id}: Unknown object")))?;

        match call {
            StoreCall::Get(_) => {}
            StoreCall::SetValue(_, value) => record.current_value = value,
            StoreCall::SetStatus(_, status) => record.status = Some(status),
        }

        Ok(record.clone())
    }
}

impl GoalStore for MockStore {
    fn get_goal(&self, remote_id: &str) -> Result<GoalRecord> {
        self.apply(StoreCall::Get(remote_id.to_string()))
    }

    fn set_current_value(&self, remote_id: &str, value: f64) -> Result<GoalRecord> {
        self.apply(StoreCall::SetValue(remote_id.to_string(), value))
    }

    fn update_status(&self, remote_id: &str, status: GoalStatus) -> Result<GoalRecord> {
        self.apply(StoreCall::SetStatus(remote_id.to_string(), status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_store_updates() {
        let store = MockStore::new().with_goal("g1", 1.0, 10.0);

        store.set_current_value("g1", 7.0).unwrap();
        let record = store.update_status("g1", GoalStatus::OnTrack).unwrap();

        assert_eq!(record.current_value, 7.0);
        assert_eq!(record.status, Some(GoalStatus::OnTrack));
        assert_eq!(store.value_writes("g1"), 1);
        assert_eq!(store.status_writes("g1"), 1);
    }

    #[test]
    fn test_mock_store_unknown_goal() {
        let store = MockStore::new();
        let err = store.get_goal("nope").unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_mock_store_failure_injection() {
        let store = MockStore::new()
            .with_goal("g1", 1.0, 10.0)
            .failing("g1", CallError::Transport("down".into()));

        assert!(matches!(store.get_goal("g1"), Err(CallError::Transport(_))));
        assert_eq!(store.calls().len(), 1);
    }
}
