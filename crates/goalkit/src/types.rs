//! Core types for goal synchronization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Qualitative status of a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalStatus {
    /// At least 66% of target
    #[serde(rename = "green")]
    OnTrack,
    /// Between 33% and 66% of target
    #[serde(rename = "yellow")]
    AtRisk,
    /// Below 33% of target
    #[serde(rename = "red")]
    OffTrack,
}

impl GoalStatus {
    /// Wire code used by the goal store
    pub fn code(&self) -> &'static str {
        match self {
            Self::OnTrack => "green",
            Self::AtRisk => "yellow",
            Self::OffTrack => "red",
        }
    }

    /// Parse a wire code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "green" => Some(Self::OnTrack),
            "yellow" => Some(Self::AtRisk),
            "red" => Some(Self::OffTrack),
            _ => None,
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OnTrack => "ON_TRACK",
            Self::AtRisk => "AT_RISK",
            Self::OffTrack => "OFF_TRACK",
        })
    }
}

/// One weighted entry of a composite goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubGoal {
    /// Configured id of the sub-goal
    pub goal: String,
    pub weight: f64,
}

impl SubGoal {
    pub fn new(goal: impl Into<String>, weight: f64) -> Self {
        Self {
            goal: goal.into(),
            weight,
        }
    }
}

/// Where a goal's value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GoalSource {
    /// Constant from configuration
    Fixed { value: f64 },
    /// Named aggregate of a remote report
    Report { report_id: String, metric: String },
    /// Weighted sum of sub-goal completion ratios
    Composite { parts: Vec<SubGoal> },
    /// The goal store already holds the authoritative value
    Readback,
}

impl GoalSource {
    /// Short name of the source kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::Report { .. } => "report",
            Self::Composite { .. } => "composite",
            Self::Readback => "readback",
        }
    }

    /// Whether the resolved value must be written to the goal store
    pub fn writes_value(&self) -> bool {
        !matches!(self, Self::Readback)
    }
}

/// A configured goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Configuration key, unique within a pass
    pub id: String,
    /// Identifier of the goal in the goal store
    pub remote_id: String,
    pub source: GoalSource,
}

impl Goal {
    pub fn new(id: impl Into<String>, remote_id: impl Into<String>, source: GoalSource) -> Self {
        Self {
            id: id.into(),
            remote_id: remote_id.into(),
            source,
        }
    }
}

/// Snapshot of a goal as reported by the goal store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub remote_id: String,
    pub current_value: f64,
    pub target_value: f64,
    /// Status currently set remotely, if any
    pub status: Option<GoalStatus>,
}

impl GoalRecord {
    pub fn new(remote_id: impl Into<String>, current_value: f64, target_value: f64) -> Self {
        Self {
            remote_id: remote_id.into(),
            current_value,
            target_value,
            status: None,
        }
    }
}

/// Outcome of synchronizing one goal in one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Configured goal id
    pub goal: String,
    /// Goal store id the result was written to
    pub remote_id: String,
    /// Value produced by the goal's source
    pub value: f64,
    pub status: GoalStatus,
    /// Current value reported back by the goal store
    pub current_value: f64,
    /// Target value reported back by the goal store (never zero)
    pub target_value: f64,
}

impl SyncResult {
    /// Completion ratio used for the status
    pub fn ratio(&self) -> f64 {
        self.current_value / self.target_value
    }
}

/// The set of configured goals plus the top-level ids synced each pass
#[derive(Debug, Clone, Default)]
pub struct GoalBook {
    goals: HashMap<String, Goal>,
    roots: Vec<String>,
}

impl GoalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a goal
    pub fn insert(&mut self, goal: Goal) {
        self.goals.insert(goal.id.clone(), goal);
    }

    /// Append a top-level goal id
    pub fn add_root(&mut self, id: impl Into<String>) {
        self.roots.push(id.into());
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.goals.get(id)
    }

    /// Top-level goal ids, in configured order
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Iterate goals sorted by id
    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        let mut goals: Vec<&Goal> = self.goals.values().collect();
        goals.sort_by(|a, b| a.id.cmp(&b.id));
        goals.into_iter()
    }

    /// References to goals that are not configured, as `(referrer, missing)`
    ///
    /// Top-level ids are reported with referrer `"app.goals"`.
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        let mut dangling: Vec<(String, String)> = self
            .roots
            .iter()
            .filter(|id| !self.goals.contains_key(*id))
            .map(|id| ("app.goals".to_string(), id.clone()))
            .collect();

        for goal in self.iter() {
            if let GoalSource::Composite { parts } = &goal.source {
                for part in parts {
                    if !self.goals.contains_key(&part.goal) {
                        dangling.push((goal.id.clone(), part.goal.clone()));
                    }
                }
            }
        }

        dangling
    }
}

/// Results of one synchronization pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Results in completion order (sub-goals before their parents)
    pub results: Vec<SyncResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    /// Number of goals synced
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Number of goals with the given status
    pub fn count(&self, status: GoalStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn get(&self, goal: &str) -> Option<&SyncResult> {
        self.results.iter().find(|r| r.goal == goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        for status in [GoalStatus::OnTrack, GoalStatus::AtRisk, GoalStatus::OffTrack] {
            assert_eq!(GoalStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(GoalStatus::from_code("string"), None);
        assert_eq!(GoalStatus::AtRisk.to_string(), "AT_RISK");
    }

    #[test]
    fn test_status_serde_uses_codes() {
        let json = serde_json::to_string(&GoalStatus::OffTrack).unwrap();
        assert_eq!(json, "\"red\"");
    }

    #[test]
    fn test_dangling_references() {
        let mut book = GoalBook::new();
        book.insert(Goal::new(
            "parent",
            "1",
            GoalSource::Composite {
                parts: vec![SubGoal::new("child", 0.5), SubGoal::new("ghost", 0.5)],
            },
        ));
        book.insert(Goal::new("child", "2", GoalSource::Fixed { value: 1.0 }));
        book.add_root("parent");
        book.add_root("missing_root");

        assert_eq!(
            book.dangling_references(),
            vec![
                ("app.goals".to_string(), "missing_root".to_string()),
                ("parent".to_string(), "ghost".to_string()),
            ]
        );
    }

    #[test]
    fn test_writes_value() {
        assert!(GoalSource::Fixed { value: 1.0 }.writes_value());
        assert!(!GoalSource::Readback.writes_value());
    }
}
