//! Scheduled-import check.

use std::sync::Arc;

use jiff::Timestamp;

use crate::host::ImportRunner;
use crate::report::{CheckKind, CheckReport};
use crate::store::ImportStore;

const TRACING_TARGET: &str = "relay_monitor::import";

/// Runs due import schedules and advances their next occurrence.
///
/// The next occurrence is recomputed from the run instant, so a
/// schedule fires at most once per due window even if the import
/// itself fails.
pub struct ImportCheck {
    store: Arc<dyn ImportStore>,
    runner: Arc<dyn ImportRunner>,
}

impl ImportCheck {
    /// Creates the check over a store and an import runner.
    pub fn new(store: Arc<dyn ImportStore>, runner: Arc<dyn ImportRunner>) -> Self {
        Self { store, runner }
    }

    /// Runs one pass at the given instant.
    pub async fn run(&self, now: Timestamp) -> CheckReport {
        let mut report = CheckReport::begin(CheckKind::ScheduledImport, now);

        let schedules = match self.store.list_due(now).await {
            Ok(schedules) => schedules,
            Err(err) => {
                tracing::error!(target: TRACING_TARGET, error = %err, "schedule query failed");
                return report.fail(now, err.to_string());
            }
        };

        let due = schedules.len();
        for schedule in schedules {
            report.item();

            let import_result = self.runner.run_import(&schedule).await;

            // Advance the schedule regardless of import outcome; a
            // failing import must not re-fire every tick.
            let advanced = match schedule.next_run_after(now) {
                Ok(next) => self.store.record_run(schedule.id, now, next).await,
                Err(err) => Err(err),
            };

            match (import_result, advanced) {
                (Ok(outcome), Ok(())) => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        schedule_id = %schedule.id,
                        schedule = %schedule.name,
                        imported = outcome.imported,
                        failed = outcome.failed,
                        "import completed",
                    );
                    report.success();
                }
                (Err(err), _) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        schedule_id = %schedule.id,
                        error = %err,
                        "import failed",
                    );
                    report.failure();
                }
                (Ok(_), Err(err)) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        schedule_id = %schedule.id,
                        error = %err,
                        "failed to advance schedule",
                    );
                    report.failure();
                }
            }
        }

        report.complete(now, format!("{due} schedules due"))
    }
}
