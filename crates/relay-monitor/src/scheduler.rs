//! The background monitor scheduler.

use std::sync::Arc;

use jiff::Timestamp;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::checks::{ImportCheck, OverdueCheck, RetryCheck, SyncCheck};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::report::CheckReport;
use crate::store::ReportSink;

const TRACING_TARGET: &str = "relay_monitor::scheduler";

/// Background loop driving the four monitor checks.
///
/// Started once per process. Every tick runs the checks in a fixed
/// order (retry, overdue, resource-sync, scheduled-import); each check
/// contains its own failures, so one failing check never blocks the
/// others, and each produces exactly one report per tick.
pub struct MonitorScheduler {
    config: MonitorConfig,
    retry: RetryCheck,
    overdue: OverdueCheck,
    sync: SyncCheck,
    import: ImportCheck,
    reports: Arc<dyn ReportSink>,
    cancel_token: CancellationToken,
}

impl MonitorScheduler {
    /// Creates a scheduler from a validated configuration and its checks.
    pub fn new(
        config: MonitorConfig,
        retry: RetryCheck,
        overdue: OverdueCheck,
        sync: SyncCheck,
        import: ImportCheck,
        reports: Arc<dyn ReportSink>,
        cancel_token: CancellationToken,
    ) -> MonitorResult<Self> {
        config.validate().map_err(MonitorError::InvalidConfig)?;
        Ok(Self {
            config,
            retry,
            overdue,
            sync,
            import,
            reports,
            cancel_token,
        })
    }

    /// Spawns the scheduler as a background task.
    ///
    /// Returns a join handle that resolves when the cancellation token
    /// fires and the current tick, if any, has finished.
    pub fn spawn(self) -> JoinHandle<MonitorResult<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the tick loop until cancelled.
    #[tracing::instrument(skip(self), target = TRACING_TARGET, name = "monitor_scheduler")]
    async fn run(self) -> MonitorResult<()> {
        tracing::info!(
            target: TRACING_TARGET,
            tick_interval = ?self.config.tick_interval(),
            "Starting monitor scheduler"
        );

        let mut ticker = tokio::time::interval(self.config.tick_interval());
        // A tick that overruns the interval is not replayed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Shutdown requested, stopping monitor scheduler"
                    );
                    break;
                }

                _ = ticker.tick() => {
                    self.tick(Timestamp::now()).await;
                }
            }
        }

        Ok(())
    }

    /// Runs all four checks once, in the fixed order.
    ///
    /// Public so hosts and tests can drive a pass at a chosen instant
    /// without the timer loop.
    pub async fn tick(&self, now: Timestamp) {
        tracing::debug!(target: TRACING_TARGET, %now, "monitor tick");

        let report = self.retry.run(now).await;
        self.record(report).await;
        let report = self.overdue.run(now).await;
        self.record(report).await;
        let report = self.sync.run(now).await;
        self.record(report).await;
        let report = self.import.run(now).await;
        self.record(report).await;
    }

    async fn record(&self, report: CheckReport) {
        if let Err(err) = self.reports.record(report).await {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %err,
                "failed to record check report"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use relay_core::store::MemoryRunStore;
    use relay_runtime::definition::Workflow;
    use uuid::Uuid;

    use crate::checks::testing::{RecordingSender, StaticResolver};
    use crate::host::{HostResult, ImportRunner, SyncStrategy, WorkflowProvider};
    use crate::import::{ImportOutcome, ImportSchedule};
    use crate::report::CheckKind;
    use crate::resource::{SourceKind, SyncOutcome, SyncResource};
    use crate::store::{MemoryImportStore, MemoryReportSink, MemorySyncStore};

    use super::*;

    struct NoWorkflows;

    #[async_trait]
    impl WorkflowProvider for NoWorkflows {
        async fn workflow(&self, _workflow_id: Uuid) -> HostResult<Option<Workflow>> {
            Ok(None)
        }
    }

    struct NoopStrategy;

    #[async_trait]
    impl SyncStrategy for NoopStrategy {
        async fn sync(&self, _resource: &SyncResource) -> HostResult<SyncOutcome> {
            Ok(SyncOutcome::default())
        }
    }

    struct NoopRunner;

    #[async_trait]
    impl ImportRunner for NoopRunner {
        async fn run_import(&self, _schedule: &ImportSchedule) -> HostResult<ImportOutcome> {
            Ok(ImportOutcome::default())
        }
    }

    fn scheduler(
        reports: Arc<MemoryReportSink>,
        cancel_token: CancellationToken,
    ) -> MonitorScheduler {
        let run_store = Arc::new(MemoryRunStore::new());
        let resolver = Arc::new(StaticResolver::new("oncall@host"));
        let sender = Arc::new(RecordingSender::new());

        let retry = RetryCheck::new(run_store.clone(), resolver.clone(), sender.clone());
        let overdue = OverdueCheck::new(
            run_store.clone(),
            Arc::new(NoWorkflows),
            resolver,
            sender,
        );
        let mut strategies: HashMap<SourceKind, Arc<dyn SyncStrategy>> = HashMap::new();
        strategies.insert(SourceKind::Spreadsheet, Arc::new(NoopStrategy));
        let sync = SyncCheck::new(Arc::new(MemorySyncStore::new()), strategies);
        let import = ImportCheck::new(Arc::new(MemoryImportStore::new()), Arc::new(NoopRunner));

        MonitorScheduler::new(
            MonitorConfig::new(),
            retry,
            overdue,
            sync,
            import,
            reports,
            cancel_token,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tick_reports_all_checks_in_order() {
        let reports = Arc::new(MemoryReportSink::new());
        let scheduler = scheduler(reports.clone(), CancellationToken::new());

        scheduler.tick(Timestamp::UNIX_EPOCH).await;

        let recorded = reports.reports().await;
        let kinds: Vec<_> = recorded.iter().map(|r| r.check).collect();
        assert_eq!(
            kinds,
            vec![
                CheckKind::Retry,
                CheckKind::Overdue,
                CheckKind::ResourceSync,
                CheckKind::ScheduledImport,
            ]
        );
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_loop() {
        let reports = Arc::new(MemoryReportSink::new());
        let cancel_token = CancellationToken::new();
        let handle = scheduler(reports, cancel_token.clone()).spawn();

        cancel_token.cancel();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }
}
