//! Value source resolvers
//!
//! One resolver per [`GoalSource`] variant, dispatched by an exhaustive
//! match. Composite resolution re-enters the engine for each sub-goal.

use crate::context::Pass;
use crate::engine::SyncEngine;
use crate::error::{EngineError, ResolveError, Result};
use crate::types::{Goal, GoalRecord, GoalSource, SubGoal};
use log::debug;

/// A goal's raw value plus, for readback goals, the snapshot it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: f64,
    /// Goal store state read while resolving; reused instead of a second read
    pub snapshot: Option<GoalRecord>,
}

impl Resolved {
    fn value(value: f64) -> Self {
        Self {
            value,
            snapshot: None,
        }
    }
}

/// Produce the raw value of `goal`
pub fn resolve(engine: &SyncEngine, pass: &mut Pass<'_>, goal: &Goal) -> Result<Resolved> {
    match &goal.source {
        GoalSource::Fixed { value } => Ok(Resolved::value(*value)),
        GoalSource::Report { report_id, metric } => {
            resolve_report(engine, goal, report_id, metric).map(Resolved::value)
        }
        GoalSource::Composite { parts } => resolve_composite(engine, pass, goal, parts).map(Resolved::value),
        GoalSource::Readback => {
            let record = engine.store().get_goal(&goal.remote_id)?;
            Ok(Resolved {
                value: record.current_value,
                snapshot: Some(record),
            })
        }
    }
}

fn resolve_report(engine: &SyncEngine, goal: &Goal, report_id: &str, metric: &str) -> Result<f64> {
    let report = engine
        .reports()
        .fetch_report(report_id)
        .map_err(|e| e.for_goal(&goal.id))?;

    let value = report
        .metric(metric)
        .map_err(|e| EngineError::resolve(&goal.id, e))?;

    debug!("{}: report {report_id} metric {metric} = {value}", goal.id);
    Ok(value)
}

/// Weighted sum of sub-goal completion ratios, not normalized against the
/// composite's own target.
fn resolve_composite(engine: &SyncEngine, pass: &mut Pass<'_>, goal: &Goal, parts: &[SubGoal]) -> Result<f64> {
    if parts.is_empty() {
        return Err(EngineError::resolve(
            &goal.id,
            ResolveError::MalformedSource {
                goal: goal.id.clone(),
                reason: "composite goal has no sub-goals".to_string(),
            },
        ));
    }

    let mut sum = 0.0;
    for part in parts {
        let sub = engine.sync_goal(pass, &part.goal)?;
        sum += part.weight * sub.ratio();
    }

    debug!("{}: composite of {} sub-goals = {sum}", goal.id, parts.len());
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MockReports;
    use crate::store::MockStore;
    use crate::types::GoalBook;

    fn engine(book: GoalBook, store: &MockStore, reports: &MockReports) -> SyncEngine {
        SyncEngine::new(book, Box::new(store.clone()), Box::new(reports.clone()))
    }

    #[test]
    fn test_fixed_makes_no_calls() {
        let store = MockStore::new();
        let reports = MockReports::new();
        let engine = engine(GoalBook::new(), &store, &reports);
        let goal = Goal::new("g", "1", GoalSource::Fixed { value: 40.0 });

        let resolved = resolve(&engine, &mut Pass::new(), &goal).unwrap();

        assert_eq!(resolved, Resolved::value(40.0));
        assert!(store.calls().is_empty());
        assert!(reports.fetches().is_empty());
    }

    #[test]
    fn test_report_metric() {
        let store = MockStore::new();
        let reports = MockReports::new().with_metric("00O1", "s!AMOUNT", 58000.0);
        let engine = engine(GoalBook::new(), &store, &reports);
        let goal = Goal::new(
            "revenue",
            "1",
            GoalSource::Report {
                report_id: "00O1".into(),
                metric: "s!AMOUNT".into(),
            },
        );

        assert_eq!(resolve(&engine, &mut Pass::new(), &goal).unwrap().value, 58000.0);
    }

    #[test]
    fn test_report_metric_not_found() {
        let store = MockStore::new();
        let reports = MockReports::new().with_metric("00O1", "s!AMOUNT", 1.0);
        let engine = engine(GoalBook::new(), &store, &reports);
        let goal = Goal::new(
            "revenue",
            "1",
            GoalSource::Report {
                report_id: "00O1".into(),
                metric: "RowCount".into(),
            },
        );

        let err = resolve(&engine, &mut Pass::new(), &goal).unwrap_err();
        assert_eq!(
            err,
            EngineError::resolve("revenue", ResolveError::MetricNotFound("RowCount".into()))
        );
    }

    #[test]
    fn test_readback_returns_snapshot() {
        let store = MockStore::new().with_goal("1", 7.5, 10.0);
        let engine = engine(GoalBook::new(), &store, &MockReports::new());
        let goal = Goal::new("g", "1", GoalSource::Readback);

        let resolved = resolve(&engine, &mut Pass::new(), &goal).unwrap();

        assert_eq!(resolved.value, 7.5);
        assert_eq!(resolved.snapshot, Some(GoalRecord::new("1", 7.5, 10.0)));
        assert_eq!(store.value_writes("1"), 0);
    }

    #[test]
    fn test_empty_composite_rejected() {
        let engine = engine(GoalBook::new(), &MockStore::new(), &MockReports::new());
        let goal = Goal::new("c", "1", GoalSource::Composite { parts: vec![] });

        let err = resolve(&engine, &mut Pass::new(), &goal).unwrap_err();
        assert!(matches!(err, EngineError::Resolve { .. }));
    }
}
