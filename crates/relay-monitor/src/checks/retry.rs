//! Retry and escalation check over waiting steps.

use std::sync::Arc;

use jiff::Timestamp;
use relay_core::config::ValidationConfig;
use relay_core::recipient::{Recipient, RecipientResolver, ResolvedTarget};
use relay_core::step::StepExecution;
use relay_core::store::RunStore;

use crate::error::{MonitorError, MonitorResult};
use crate::host::MessageSender;
use crate::report::{CheckKind, CheckReport, CheckReportBuilder};

const TRACING_TARGET: &str = "relay_monitor::retry";

/// Scans waiting steps and fires due retry or escalation messages.
///
/// Every action is gated by a store claim: the retry counter or the
/// escalation flag is persisted before the message leaves, so a step
/// crosses each threshold at most once even when passes overlap.
pub struct RetryCheck {
    store: Arc<dyn RunStore>,
    resolver: Arc<dyn RecipientResolver>,
    sender: Arc<dyn MessageSender>,
}

impl RetryCheck {
    /// Creates the check over its collaborators.
    pub fn new(
        store: Arc<dyn RunStore>,
        resolver: Arc<dyn RecipientResolver>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            store,
            resolver,
            sender,
        }
    }

    /// Runs one pass at the given instant.
    pub async fn run(&self, now: Timestamp) -> CheckReport {
        let mut report = CheckReport::begin(CheckKind::Retry, now);

        let steps = match self.store.list_waiting_steps().await {
            Ok(steps) => steps,
            Err(err) => {
                tracing::error!(target: TRACING_TARGET, error = %err, "waiting-step query failed");
                return report.fail(now, err.to_string());
            }
        };

        let scanned = steps.len();
        for step in steps {
            let Some(validation) = step.validation.clone().filter(|v| v.is_active()) else {
                continue;
            };
            let elapsed = now.duration_since(step.last_activity_at()).as_mins();
            if elapsed < validation.interval_minutes() {
                continue;
            }

            if step.retry_count < validation.retry_limit {
                self.try_retry(&step, &validation, now, &mut report).await;
            } else if !step.escalation_sent {
                self.try_escalate(&step, &validation, now, &mut report).await;
            }
        }

        report.complete(now, format!("{scanned} waiting steps scanned"))
    }

    /// Claims and sends the next retry message for a due step.
    async fn try_retry(
        &self,
        step: &StepExecution,
        validation: &ValidationConfig,
        now: Timestamp,
        report: &mut CheckReportBuilder,
    ) {
        match self.store.claim_retry(step.id, step.retry_count, now).await {
            // Lost the claim: another pass already sent this retry.
            Ok(false) => return,
            Ok(true) => {}
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    step_id = %step.id,
                    error = %err,
                    "retry claim failed",
                );
                report.item();
                report.failure();
                return;
            }
        }

        report.item();
        match self.send_retry(step, validation).await {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    step_id = %step.id,
                    retry = step.retry_count + 1,
                    "retry message sent",
                );
                report.success();
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    step_id = %step.id,
                    error = %err,
                    "retry dispatch failed",
                );
                report.failure();
            }
        }
    }

    /// Claims and sends the one-time escalation for an exhausted step.
    async fn try_escalate(
        &self,
        step: &StepExecution,
        validation: &ValidationConfig,
        now: Timestamp,
        report: &mut CheckReportBuilder,
    ) {
        let Some(escalation) = validation.escalation.as_ref() else {
            return;
        };

        match self.store.claim_escalation(step.id, now).await {
            Ok(false) => return,
            Ok(true) => {}
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    step_id = %step.id,
                    error = %err,
                    "escalation claim failed",
                );
                report.item();
                report.failure();
                return;
            }
        }

        report.item();
        let result = async {
            let targets = self
                .resolver
                .resolve(step.run_id, &escalation.recipient)
                .await?;
            self.send_all(&targets, &escalation.content).await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    step_id = %step.id,
                    run_id = %step.run_id,
                    "escalation sent",
                );
                report.success();
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    step_id = %step.id,
                    error = %err,
                    "escalation dispatch failed",
                );
                report.failure();
            }
        }
    }

    /// Sends the configured retry message, if any.
    ///
    /// A step with no retry message still consumes a retry via the
    /// claim, so the escalation threshold is eventually reached.
    async fn send_retry(
        &self,
        step: &StepExecution,
        validation: &ValidationConfig,
    ) -> MonitorResult<()> {
        let Some(message) = validation.retry_message.as_ref() else {
            tracing::debug!(
                target: TRACING_TARGET,
                step_id = %step.id,
                "no retry message configured",
            );
            return Ok(());
        };
        if message.content.is_empty() {
            tracing::debug!(target: TRACING_TARGET, step_id = %step.id, "empty retry content");
            return Ok(());
        }

        let targets = self.retry_targets(step, message.recipient.as_ref()).await?;
        if targets.is_empty() {
            return Err(relay_core::CoreError::RecipientResolution(
                "retry recipient resolved to no targets".into(),
            )
            .into());
        }
        self.send_all(&targets, &message.content).await
    }

    /// Resolves who receives a retry message.
    ///
    /// The configured override wins; otherwise the awaited party
    /// recorded on the step is addressed directly.
    async fn retry_targets(
        &self,
        step: &StepExecution,
        recipient: Option<&Recipient>,
    ) -> MonitorResult<Vec<ResolvedTarget>> {
        match recipient {
            Some(recipient) => Ok(self.resolver.resolve(step.run_id, recipient).await?),
            None => match step.waiting_for.as_deref() {
                Some(address) => Ok(vec![ResolvedTarget::new(address)]),
                None => Ok(Vec::new()),
            },
        }
    }

    async fn send_all(&self, targets: &[ResolvedTarget], content: &str) -> MonitorResult<()> {
        for target in targets {
            self.sender
                .send(target, content)
                .await
                .map_err(|err| MonitorError::host(err.to_string()))?;
        }
        Ok(())
    }
}
