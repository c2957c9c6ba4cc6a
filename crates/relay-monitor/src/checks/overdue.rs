//! Overdue check over running runs.

use std::sync::Arc;

use jiff::Timestamp;
use relay_core::config::OverdueConfig;
use relay_core::recipient::RecipientResolver;
use relay_core::run::{ExecutionRun, RunStatus};
use relay_core::store::RunStore;
use relay_runtime::graph::RunGraph;

use crate::error::{MonitorError, MonitorResult};
use crate::host::{MessageSender, WorkflowProvider};
use crate::report::{CheckKind, CheckReport, CheckReportBuilder};

const TRACING_TARGET: &str = "relay_monitor::overdue";

/// Fires the one-time overdue escalation for long-running runs.
///
/// The threshold lives on the start node of the workflow definition,
/// so the check looks each run's workflow up through the host. The
/// notified flag is claimed through the store before the escalation
/// is sent.
pub struct OverdueCheck {
    store: Arc<dyn RunStore>,
    workflows: Arc<dyn WorkflowProvider>,
    resolver: Arc<dyn RecipientResolver>,
    sender: Arc<dyn MessageSender>,
}

impl OverdueCheck {
    /// Creates the check over its collaborators.
    pub fn new(
        store: Arc<dyn RunStore>,
        workflows: Arc<dyn WorkflowProvider>,
        resolver: Arc<dyn RecipientResolver>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            store,
            workflows,
            resolver,
            sender,
        }
    }

    /// Runs one pass at the given instant.
    pub async fn run(&self, now: Timestamp) -> CheckReport {
        let mut report = CheckReport::begin(CheckKind::Overdue, now);

        let runs = match self.store.list_runs_by_status(RunStatus::Running).await {
            Ok(runs) => runs,
            Err(err) => {
                tracing::error!(target: TRACING_TARGET, error = %err, "running-run query failed");
                return report.fail(now, err.to_string());
            }
        };

        let scanned = runs.len();
        for run in runs.into_iter().filter(|run| !run.overdue_notified) {
            let config = match self.overdue_config_for(&run).await {
                Ok(Some(config)) => config,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        run_id = %run.id,
                        error = %err,
                        "overdue config lookup failed",
                    );
                    report.item();
                    report.failure();
                    continue;
                }
            };
            if !config.is_active() {
                continue;
            }

            let threshold = config.threshold_minutes();
            let elapsed = now.duration_since(run.started_at).as_mins();
            if elapsed < threshold {
                continue;
            }

            self.try_notify(&run, &config, threshold, now, &mut report)
                .await;
        }

        report.complete(now, format!("{scanned} running runs scanned"))
    }

    /// Claims the notified flag and sends the escalation.
    async fn try_notify(
        &self,
        run: &ExecutionRun,
        config: &OverdueConfig,
        threshold: i64,
        now: Timestamp,
        report: &mut CheckReportBuilder,
    ) {
        match self.store.claim_overdue(run.id, threshold, now).await {
            // Lost the claim: another pass already notified this run.
            Ok(false) => return,
            Ok(true) => {}
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    error = %err,
                    "overdue claim failed",
                );
                report.item();
                report.failure();
                return;
            }
        }

        report.item();
        match self.send_escalation(run, config).await {
            Ok(()) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    threshold_minutes = threshold,
                    "overdue escalation sent",
                );
                report.success();
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    error = %err,
                    "overdue dispatch failed",
                );
                report.failure();
            }
        }
    }

    /// Reads the overdue policy from the run's workflow start node.
    async fn overdue_config_for(&self, run: &ExecutionRun) -> MonitorResult<Option<OverdueConfig>> {
        let workflow = self
            .workflows
            .workflow(run.workflow_id)
            .await
            .map_err(|err| MonitorError::host(err.to_string()))?;
        let Some(workflow) = workflow else {
            tracing::debug!(
                target: TRACING_TARGET,
                run_id = %run.id,
                workflow_id = %run.workflow_id,
                "workflow no longer exists",
            );
            return Ok(None);
        };
        let graph = RunGraph::compile(&workflow)?;
        Ok(graph.overdue_config().cloned())
    }

    async fn send_escalation(&self, run: &ExecutionRun, config: &OverdueConfig) -> MonitorResult<()> {
        let Some(escalation) = config.escalation.as_ref() else {
            tracing::debug!(target: TRACING_TARGET, run_id = %run.id, "no escalation configured");
            return Ok(());
        };
        let targets = self.resolver.resolve(run.id, &escalation.recipient).await?;
        if targets.is_empty() {
            return Err(relay_core::CoreError::RecipientResolution(
                "overdue recipient resolved to no targets".into(),
            )
            .into());
        }
        for target in &targets {
            self.sender
                .send(target, &escalation.content)
                .await
                .map_err(|err| MonitorError::host(err.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use jiff::SignedDuration;
    use relay_core::config::EscalationConfig;
    use relay_core::recipient::Recipient;
    use relay_core::store::MemoryRunStore;
    use relay_runtime::definition::{Edge, Node, NodeKind, StartData, Workflow};
    use uuid::Uuid;

    use crate::checks::testing::{RecordingSender, StaticResolver};
    use crate::host::HostResult;
    use crate::report::CheckStatus;

    use super::*;

    /// Serves one fixed workflow for every lookup.
    struct FixedWorkflows {
        workflow: Workflow,
    }

    #[async_trait]
    impl WorkflowProvider for FixedWorkflows {
        async fn workflow(&self, _workflow_id: Uuid) -> HostResult<Option<Workflow>> {
            Ok(Some(self.workflow.clone()))
        }
    }

    fn overdue_workflow(threshold_minutes: i64) -> Workflow {
        let start = Node::new(
            "n-start",
            NodeKind::Start(StartData {
                overdue: Some(OverdueConfig {
                    enabled: true,
                    minutes: threshold_minutes,
                    escalation: Some(EscalationConfig {
                        recipient: Recipient::Initiator,
                        content: "run is overdue".into(),
                    }),
                    ..Default::default()
                }),
            }),
        );
        let end = Node::new("n-end", NodeKind::End);
        Workflow {
            id: Uuid::now_v7(),
            nodes: vec![start, end],
            edges: vec![Edge::new("e1", "n-start", "n-end")],
        }
    }

    fn harness(
        threshold_minutes: i64,
    ) -> (Arc<MemoryRunStore>, Arc<RecordingSender>, OverdueCheck) {
        let store = Arc::new(MemoryRunStore::new());
        let sender = Arc::new(RecordingSender::new());
        let check = OverdueCheck::new(
            store.clone(),
            Arc::new(FixedWorkflows {
                workflow: overdue_workflow(threshold_minutes),
            }),
            Arc::new(StaticResolver::new("oncall@host")),
            sender.clone(),
        );
        (store, sender, check)
    }

    #[tokio::test]
    async fn test_fires_once_past_threshold() {
        let (store, sender, check) = harness(60);
        let start = Timestamp::UNIX_EPOCH;
        let run = ExecutionRun::new(Uuid::now_v7(), start);
        let run_id = run.id;
        store.create_run(run).await.unwrap();

        let report = check.run(start + SignedDuration::from_mins(61)).await;
        assert_eq!(report.status, CheckStatus::Completed);
        assert_eq!(report.total_items, 1);
        assert_eq!(report.success_count, 1);

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].address, "oncall@host");
        assert_eq!(sent[0].content, "run is overdue");

        let run = store.get_run(run_id).await.unwrap();
        assert!(run.overdue_notified);
        assert_eq!(run.overdue_threshold_minutes, Some(60));

        // Notified flag guards re-fire.
        let report = check.run(start + SignedDuration::from_mins(120)).await;
        assert_eq!(report.total_items, 0);
        assert_eq!(sender.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_not_due_before_threshold() {
        let (store, sender, check) = harness(60);
        let start = Timestamp::UNIX_EPOCH;
        store
            .create_run(ExecutionRun::new(Uuid::now_v7(), start))
            .await
            .unwrap();

        let report = check.run(start + SignedDuration::from_mins(59)).await;
        assert_eq!(report.total_items, 0);
        assert!(sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_non_running_runs_are_ignored() {
        let (store, sender, check) = harness(60);
        let start = Timestamp::UNIX_EPOCH;
        let mut run = ExecutionRun::new(Uuid::now_v7(), start);
        run.complete(start);
        store.create_run(run).await.unwrap();

        let report = check.run(start + SignedDuration::from_mins(120)).await;
        assert_eq!(report.total_items, 0);
        assert!(sender.sent().await.is_empty());

        let runs = store.list_runs_by_status(RunStatus::Completed).await.unwrap();
        assert!(!runs[0].overdue_notified);
    }
}
