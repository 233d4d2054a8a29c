//! Goal resolution engine
//!
//! Syncs goals one at a time: resolve the raw value, write it to the goal
//! store unless the store is the source, derive the status from the
//! returned record and write the status. Results are memoized per pass so
//! a goal shared by several composites is written once.

use crate::context::{NoObserver, Pass, SyncObserver};
use crate::error::{EngineError, Result};
use crate::report::ReportSource;
use crate::resolver::resolve;
use crate::status::{completion_ratio, status_for_ratio};
use crate::store::GoalStore;
use crate::types::{Goal, GoalBook, PassReport, SyncResult};
use log::{debug, info};

/// Drives synchronization passes over a [`GoalBook`]
pub struct SyncEngine {
    book: GoalBook,
    store: Box<dyn GoalStore>,
    reports: Box<dyn ReportSource>,
}

impl SyncEngine {
    pub fn new(book: GoalBook, store: Box<dyn GoalStore>, reports: Box<dyn ReportSource>) -> Self {
        Self { book, store, reports }
    }

    pub fn book(&self) -> &GoalBook {
        &self.book
    }

    pub fn store(&self) -> &dyn GoalStore {
        self.store.as_ref()
    }

    pub fn reports(&self) -> &dyn ReportSource {
        self.reports.as_ref()
    }

    /// Sync every top-level goal once
    pub fn run_pass(&self) -> Result<PassReport> {
        self.run_pass_with(&mut NoObserver)
    }

    /// Sync every top-level goal once, reporting progress to `observer`
    ///
    /// The first error aborts the pass. Goals written before it stay written.
    pub fn run_pass_with(&self, observer: &mut dyn SyncObserver) -> Result<PassReport> {
        let mut pass = Pass::observed(observer);

        for id in self.book.roots() {
            self.sync_goal(&mut pass, id)?;
        }

        let report = pass.finish();
        info!(
            "Pass complete: {} goal(s) synced in {} ms",
            report.total(),
            (report.finished_at - report.started_at).num_milliseconds()
        );
        Ok(report)
    }

    /// Sync one goal within `pass`, recursing into composite sub-goals
    pub fn sync_goal(&self, pass: &mut Pass<'_>, id: &str) -> Result<SyncResult> {
        if let Some(done) = pass.get(id) {
            debug!("{id}: already synced this pass");
            return Ok(done.clone());
        }

        if let Some(path) = pass.cycle_through(id) {
            let err = EngineError::CyclicDependency(path);
            pass.fail(id, &err);
            return Err(err);
        }

        let Some(goal) = self.book.get(id) else {
            let err = EngineError::UnknownGoal(id.to_string());
            pass.fail(id, &err);
            return Err(err);
        };

        pass.enter(id);
        let outcome = self.sync_uncached(pass, goal);
        pass.leave();

        match outcome {
            Ok(result) => {
                pass.complete(result.clone());
                Ok(result)
            }
            Err(err) => {
                pass.fail(id, &err);
                Err(err)
            }
        }
    }

    fn sync_uncached(&self, pass: &mut Pass<'_>, goal: &Goal) -> Result<SyncResult> {
        let resolved = resolve(self, pass, goal)?;

        let record = match resolved.snapshot {
            Some(snapshot) if !goal.source.writes_value() => snapshot,
            _ => {
                info!("Updating {} ({}) to {}", goal.id, goal.remote_id, resolved.value);
                self.store.set_current_value(&goal.remote_id, resolved.value)?
            }
        };

        let ratio = completion_ratio(record.current_value, record.target_value).ok_or_else(|| {
            EngineError::ZeroTarget {
                goal: goal.id.clone(),
            }
        })?;
        let status = status_for_ratio(ratio);

        self.store.update_status(&goal.remote_id, status)?;
        info!("{} is {status} ({:.1}%)", goal.id, ratio * 100.0);

        Ok(SyncResult {
            goal: goal.id.clone(),
            remote_id: goal.remote_id.clone(),
            value: resolved.value,
            status,
            current_value: record.current_value,
            target_value: record.target_value,
        })
    }
}
