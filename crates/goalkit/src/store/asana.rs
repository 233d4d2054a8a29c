//! Asana Goals API backend.
//!
//! This module provides the [`AsanaStore`] implementation of
//! [`GoalStore`] over the Asana REST API.
//!
//! # Rate Limiting
//!
//! Asana answers 429 when a token makes too many calls per minute. Those
//! responses are absorbed by the shared [`RetryingExecutor`].

use crate::store::GoalStore;
use crate::types::{GoalRecord, GoalStatus};
use callkit::{ApiClient, CallError, Result, RetryingExecutor};
use serde::Deserialize;
use serde_json::{Value, json};

/// Default Asana API base URL.
pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Asana goal store.
///
/// # Example
///
/// ```no_run
/// use callkit::RetryingExecutor;
/// use goalkit::store::{AsanaStore, GoalStore};
///
/// let store = AsanaStore::new("access-token", RetryingExecutor::new());
/// let goal = store.get_goal("1201008336897091").unwrap();
/// println!("{} / {}", goal.current_value, goal.target_value);
/// ```
pub struct AsanaStore {
    client: ApiClient,
}

impl AsanaStore {
    /// Create a store against the public Asana API.
    pub fn new(access_token: impl Into<String>, executor: RetryingExecutor) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, access_token, executor)
    }

    /// Create a store with a custom API base (for testing).
    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        executor: RetryingExecutor,
    ) -> Self {
        Self {
            client: ApiClient::new(base_url, access_token, executor),
        }
    }

    /// Get the current API base URL.
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    fn goal_path(remote_id: &str) -> String {
        format!("goals/{remote_id}")
    }
}

impl GoalStore for AsanaStore {
    fn get_goal(&self, remote_id: &str) -> Result<GoalRecord> {
        let response = self.client.get(&Self::goal_path(remote_id))?;
        parse_goal(remote_id, response)
    }

    fn set_current_value(&self, remote_id: &str, value: f64) -> Result<GoalRecord> {
        let response = self.client.post_json(
            &format!("goals/{remote_id}/setMetricCurrentValue"),
            json!({ "data": { "current_number_value": value } }),
        )?;
        parse_goal(remote_id, response)
    }

    fn update_status(&self, remote_id: &str, status: GoalStatus) -> Result<GoalRecord> {
        let response = self.client.put_json(
            &Self::goal_path(remote_id),
            json!({ "data": { "status": status.code() } }),
        )?;
        parse_goal(remote_id, response)
    }
}

// =============================================================================
// Asana API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    data: AsanaGoal,
}

#[derive(Debug, Deserialize)]
struct AsanaGoal {
    gid: Option<String>,
    status: Option<String>,
    metric: Option<AsanaMetric>,
}

#[derive(Debug, Deserialize)]
struct AsanaMetric {
    current_number_value: Option<f64>,
    target_number_value: Option<f64>,
}

fn parse_goal(remote_id: &str, response: Value) -> Result<GoalRecord> {
    let envelope: Envelope = serde_json::from_value(response)
        .map_err(|e| CallError::decode(format!("goal {remote_id}: {e}")))?;
    let goal = envelope.data;

    let metric = goal
        .metric
        .ok_or_else(|| CallError::decode(format!("goal {remote_id} has no metric")))?;

    Ok(GoalRecord {
        remote_id: goal.gid.unwrap_or_else(|| remote_id.to_string()),
        current_value: metric.current_number_value.unwrap_or_default(),
        target_value: metric.target_number_value.unwrap_or_default(),
        status: goal.status.as_deref().and_then(GoalStatus::from_code),
    })
}
