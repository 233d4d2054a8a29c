//! Pass context and observer trait
//!
//! A [`Pass`] is created fresh for every synchronization pass and dropped
//! when it ends. It owns the memo of finished goals, the stack of goals
//! currently being resolved (for cycle detection) and an optional
//! [`SyncObserver`].

use crate::error::EngineError;
use crate::types::{PassReport, SyncResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Progress observer for a synchronization pass
///
/// Implement this trait to receive updates while goals are synced.
pub trait SyncObserver: Send {
    /// Called when a goal starts resolving
    ///
    /// # Arguments
    /// * `id` - Configured goal id
    /// * `depth` - Nesting depth; top-level goals are at depth 0
    fn on_goal_start(&mut self, id: &str, depth: usize);

    /// Called when a goal's value and status have been written
    fn on_goal_synced(&mut self, result: &SyncResult);

    /// Called when a goal fails; the pass aborts afterwards
    fn on_goal_failed(&mut self, _id: &str, _error: &EngineError) {}
}

/// No-op observer
pub struct NoObserver;

impl SyncObserver for NoObserver {
    fn on_goal_start(&mut self, _id: &str, _depth: usize) {}
    fn on_goal_synced(&mut self, _result: &SyncResult) {}
}

/// State of one synchronization pass
pub struct Pass<'a> {
    memo: HashMap<String, SyncResult>,
    stack: Vec<String>,
    order: Vec<String>,
    observer: Option<&'a mut dyn SyncObserver>,
    failure_reported: bool,
    started_at: DateTime<Utc>,
}

impl Default for Pass<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Pass<'a> {
    /// Start an unobserved pass
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
            observer: None,
            failure_reported: false,
            started_at: Utc::now(),
        }
    }

    /// Start a pass that reports to `observer`
    pub fn observed(observer: &'a mut dyn SyncObserver) -> Self {
        Self {
            observer: Some(observer),
            ..Self::new()
        }
    }

    /// Memoized result for a goal synced earlier in this pass
    pub fn get(&self, id: &str) -> Option<&SyncResult> {
        self.memo.get(id)
    }

    /// Number of goals synced so far
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Goals currently being resolved, outermost first
    pub fn resolving(&self) -> &[String] {
        &self.stack
    }

    /// If `id` is already being resolved, the cycle it would close
    ///
    /// The path runs from the first occurrence of `id` on the stack to the
    /// re-entry, so it starts and ends with `id`.
    pub fn cycle_through(&self, id: &str) -> Option<Vec<String>> {
        let start = self.stack.iter().position(|g| g == id)?;
        let mut path = self.stack[start..].to_vec();
        path.push(id.to_string());
        Some(path)
    }

    pub(crate) fn enter(&mut self, id: &str) {
        let depth = self.stack.len();
        self.stack.push(id.to_string());
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_goal_start(id, depth);
        }
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn complete(&mut self, result: SyncResult) {
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_goal_synced(&result);
        }
        self.order.push(result.goal.clone());
        self.memo.insert(result.goal.clone(), result);
    }

    /// Report a failure once, at the goal where it started
    ///
    /// Ancestors unwinding with the same error stay silent.
    pub(crate) fn fail(&mut self, id: &str, error: &EngineError) {
        if self.failure_reported {
            return;
        }
        self.failure_reported = true;
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_goal_failed(id, error);
        }
    }

    /// Close the pass, returning results in completion order
    pub fn finish(mut self) -> PassReport {
        let results = self
            .order
            .iter()
            .filter_map(|id| self.memo.remove(id))
            .collect();

        PassReport {
            results,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GoalStatus;

    fn result(goal: &str) -> SyncResult {
        SyncResult {
            goal: goal.to_string(),
            remote_id: format!("remote-{goal}"),
            value: 1.0,
            status: GoalStatus::OnTrack,
            current_value: 1.0,
            target_value: 1.0,
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl SyncObserver for Recorder {
        fn on_goal_start(&mut self, id: &str, depth: usize) {
            self.events.push(format!("start {id} {depth}"));
        }

        fn on_goal_synced(&mut self, result: &SyncResult) {
            self.events.push(format!("synced {}", result.goal));
        }
    }

    #[test]
    fn test_cycle_path() {
        let mut pass = Pass::new();
        pass.enter("root");
        pass.enter("a");
        pass.enter("b");

        assert_eq!(pass.cycle_through("a"), Some(vec!["a".into(), "b".into(), "a".into()]));
        assert_eq!(pass.cycle_through("c"), None);
    }

    #[test]
    fn test_finish_keeps_completion_order() {
        let mut pass = Pass::new();
        pass.complete(result("child"));
        pass.complete(result("parent"));

        let report = pass.finish();
        let order: Vec<&str> = report.results.iter().map(|r| r.goal.as_str()).collect();
        assert_eq!(order, vec!["child", "parent"]);
    }

    #[test]
    fn test_observer_events() {
        let mut recorder = Recorder::default();
        {
            let mut pass = Pass::observed(&mut recorder);
            pass.enter("parent");
            pass.enter("child");
            pass.complete(result("child"));
            pass.leave();
            pass.complete(result("parent"));
            pass.leave();
            assert!(pass.resolving().is_empty());
        }

        assert_eq!(
            recorder.events,
            vec!["start parent 0", "start child 1", "synced child", "synced parent"]
        );
    }
}
