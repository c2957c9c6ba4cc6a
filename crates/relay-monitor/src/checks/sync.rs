//! Resource auto-sync check.

use std::collections::HashMap;
use std::sync::Arc;

use jiff::Timestamp;

use crate::error::{MonitorError, MonitorResult};
use crate::host::SyncStrategy;
use crate::report::{CheckKind, CheckReport};
use crate::resource::{SourceKind, SyncOutcome, SyncResource, SyncStatus};
use crate::store::SyncStore;

const TRACING_TARGET: &str = "relay_monitor::sync";

/// Keeps scheduled external resources fresh.
///
/// Strategies are an explicit map keyed by source kind, resolved at
/// construction. Due resources sync one at a time; a resource whose
/// claim is lost (already `Running`) is skipped.
pub struct SyncCheck {
    store: Arc<dyn SyncStore>,
    strategies: HashMap<SourceKind, Arc<dyn SyncStrategy>>,
}

impl SyncCheck {
    /// Creates the check over a store and a strategy map.
    pub fn new(
        store: Arc<dyn SyncStore>,
        strategies: HashMap<SourceKind, Arc<dyn SyncStrategy>>,
    ) -> Self {
        Self { store, strategies }
    }

    /// Runs one pass at the given instant.
    ///
    /// Syncs run sequentially; one slow resource delays the rest of
    /// the pass rather than overlapping with it.
    pub async fn run(&self, now: Timestamp) -> CheckReport {
        let mut report = CheckReport::begin(CheckKind::ResourceSync, now);

        let resources = match self.store.list_scheduled().await {
            Ok(resources) => resources,
            Err(err) => {
                tracing::error!(target: TRACING_TARGET, error = %err, "resource query failed");
                return report.fail(now, err.to_string());
            }
        };

        let scanned = resources.len();
        for resource in resources {
            if !resource.is_due(now) {
                continue;
            }

            let Some(strategy) = self.strategies.get(&resource.source) else {
                tracing::warn!(
                    target: TRACING_TARGET,
                    resource_id = %resource.id,
                    source = %resource.source,
                    "no strategy registered for source",
                );
                report.item();
                report.failure();
                continue;
            };

            match self.store.claim_sync(resource.id).await {
                // Lost the claim: a sync of this resource is in flight.
                Ok(false) => continue,
                Ok(true) => {}
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        resource_id = %resource.id,
                        error = %err,
                        "sync claim failed",
                    );
                    report.item();
                    report.failure();
                    continue;
                }
            }

            report.item();
            match self.sync_one(strategy.as_ref(), &resource, now).await {
                Ok(outcome) => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        resource_id = %resource.id,
                        resource = %resource.name,
                        synced = outcome.synced,
                        failed = outcome.failed,
                        "resource synced",
                    );
                    report.success();
                }
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        resource_id = %resource.id,
                        error = %err,
                        "resource sync failed",
                    );
                    report.failure();
                }
            }
        }

        report.complete(now, format!("{scanned} scheduled resources scanned"))
    }

    /// Syncs one resource and records the terminal status.
    async fn sync_one(
        &self,
        strategy: &dyn SyncStrategy,
        resource: &SyncResource,
        now: Timestamp,
    ) -> MonitorResult<SyncOutcome> {
        match strategy.sync(resource).await {
            Ok(outcome) => {
                self.store
                    .finish_sync(resource.id, SyncStatus::Completed, Some(outcome), now)
                    .await?;
                Ok(outcome)
            }
            Err(err) => {
                self.store
                    .finish_sync(resource.id, SyncStatus::Failed, None, now)
                    .await?;
                Err(MonitorError::host(err.to_string()))
            }
        }
    }
}
