use anyhow::{Context as _, Result};
use chrono::Utc;
use cronkit::{Mode, ServiceLoop, ShutdownFlag, SystemClock, run_service, run_standalone};
use goalkit::{EngineError, GoalStatus, PassReport, SyncObserver, SyncResult};
use std::collections::HashMap;
use std::path::Path;

use crate::Context;
use crate::config::Config;
use crate::{signals, ui};

/// Prints each goal as it is synced
struct GoalPrinter {
    quiet: bool,
    depths: HashMap<String, usize>,
}

impl GoalPrinter {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            depths: HashMap::new(),
        }
    }
}

impl SyncObserver for GoalPrinter {
    fn on_goal_start(&mut self, id: &str, depth: usize) {
        self.depths.insert(id.to_string(), depth);
    }

    fn on_goal_synced(&mut self, result: &SyncResult) {
        if !self.quiet {
            let depth = self.depths.get(&result.goal).copied().unwrap_or(0);
            ui::goal_line(result, depth);
        }
    }

    fn on_goal_failed(&mut self, id: &str, error: &EngineError) {
        ui::error(&format!("{id}: {error}"));
        if let Some(hint) = failure_hint(error) {
            ui::dim(hint);
        }
    }
}

/// Advice for failures caused by a remote call
fn failure_hint(error: &EngineError) -> Option<&'static str> {
    match error {
        EngineError::Upstream(call) => Some(call.category().advice()),
        _ => None,
    }
}

pub fn run(ctx: &Context, config_path: &Path, mode: Mode, json: bool) -> Result<()> {
    let config = Config::load(config_path)?;
    let engine = super::build_engine(&config)?;

    match mode {
        Mode::Standalone => {
            let quiet = ctx.quiet || json;
            if !quiet {
                ui::header("Syncing Goals");
            }

            let mut printer = GoalPrinter::new(quiet);
            let report = run_standalone(|| engine.run_pass_with(&mut printer)).context("Sync pass failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if !ctx.quiet {
                print_summary(&report);
                if ctx.verbose > 0 {
                    let elapsed = report.finished_at - report.started_at;
                    ui::dim(&format!("Pass took {} ms", elapsed.num_milliseconds()));
                }
            }
            Ok(())
        }
        Mode::Service => {
            let schedule = config.schedule()?;
            let shutdown = ShutdownFlag::new();
            signals::install(&shutdown)?;

            let state = ServiceLoop::new(schedule, Utc::now(), shutdown).tick(config.poll_interval());
            if !ctx.quiet {
                ui::header("Goal Sync Service");
                ui::kv("Schedule", state.schedule().source());
                ui::kv("Goals", &config.app.goals.join(", "));
                if let Some(next) = state.next_fire() {
                    ui::kv("First pass", &next.to_rfc3339());
                }
            }

            let summary = run_service(state, &SystemClock, || {
                let mut printer = GoalPrinter::new(ctx.quiet);
                engine.run_pass_with(&mut printer).map(|report| {
                    if !ctx.quiet {
                        print_summary(&report);
                    }
                })
            });

            if !ctx.quiet {
                println!();
                ui::info(&format!(
                    "Stopped after {} pass(es), {} failed",
                    summary.passes, summary.failures
                ));
            }
            Ok(())
        }
    }
}

fn print_summary(report: &PassReport) {
    println!();
    ui::success(&summary_line(report));
}

fn summary_line(report: &PassReport) -> String {
    format!(
        "Synced {} goal(s): {} on track, {} at risk, {} off track",
        report.total(),
        report.count(GoalStatus::OnTrack),
        report.count(GoalStatus::AtRisk),
        report.count(GoalStatus::OffTrack)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use callkit::CallError;

    fn result(goal: &str, status: GoalStatus) -> SyncResult {
        SyncResult {
            goal: goal.to_string(),
            remote_id: "1".to_string(),
            value: 1.0,
            status,
            current_value: 1.0,
            target_value: 2.0,
        }
    }

    #[test]
    fn test_summary_line() {
        let report = PassReport {
            results: vec![
                result("a", GoalStatus::OnTrack),
                result("b", GoalStatus::OffTrack),
                result("c", GoalStatus::OnTrack),
            ],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        assert_eq!(
            summary_line(&report),
            "Synced 3 goal(s): 2 on track, 0 at risk, 1 off track"
        );
    }

    #[test]
    fn test_failure_hint_for_remote_errors() {
        let not_found = EngineError::Upstream(CallError::http(404, "goal not found"));
        assert_eq!(
            failure_hint(&not_found),
            Some("Verify the goal or report identifiers in the config file")
        );

        let rate_limited = EngineError::Upstream(CallError::RateLimitTimeout {
            attempts: 10,
            last_status: 429,
        });
        assert_eq!(failure_hint(&rate_limited), Some("Reduce sync frequency or try again later"));

        assert_eq!(failure_hint(&EngineError::UnknownGoal("ghost".into())), None);
    }

    #[test]
    fn test_printer_tracks_depth() {
        let mut printer = GoalPrinter::new(true);
        printer.on_goal_start("parent", 0);
        printer.on_goal_start("child", 1);
        printer.on_goal_synced(&result("child", GoalStatus::AtRisk));

        assert_eq!(printer.depths.get("child"), Some(&1));
    }
}
