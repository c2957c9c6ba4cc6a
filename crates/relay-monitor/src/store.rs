//! Monitor-side persistence traits and in-memory implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{MonitorError, MonitorResult};
use crate::import::ImportSchedule;
use crate::report::CheckReport;
use crate::resource::{SyncOutcome, SyncResource, SyncStatus};

/// Persistence for sync resources.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Returns all resources flagged for scheduled sync.
    async fn list_scheduled(&self) -> MonitorResult<Vec<SyncResource>>;

    /// Claims a resource for syncing.
    ///
    /// Wins only if the resource is not already `Running`; on a win
    /// the status is set to `Running` durably before returning, so
    /// overlapping passes cannot sync the same resource twice.
    async fn claim_sync(&self, resource_id: Uuid) -> MonitorResult<bool>;

    /// Records the result of a finished sync and releases the claim.
    async fn finish_sync(
        &self,
        resource_id: Uuid,
        status: SyncStatus,
        outcome: Option<SyncOutcome>,
        at: Timestamp,
    ) -> MonitorResult<()>;
}

/// Persistence for import schedules.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Returns all active schedules due at the given instant.
    async fn list_due(&self, now: Timestamp) -> MonitorResult<Vec<ImportSchedule>>;

    /// Records a completed run and the recomputed next occurrence.
    async fn record_run(
        &self,
        schedule_id: Uuid,
        last_run_at: Timestamp,
        next_run_at: Timestamp,
    ) -> MonitorResult<()>;
}

/// Destination for per-check pass reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Appends one report to the execution log.
    async fn record(&self, report: CheckReport) -> MonitorResult<()>;
}

/// In-memory sync store for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemorySyncStore {
    resources: Mutex<HashMap<Uuid, SyncResource>>,
}

impl MemorySyncStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource.
    pub async fn insert(&self, resource: SyncResource) {
        self.resources.lock().await.insert(resource.id, resource);
    }

    /// Returns a resource by ID.
    pub async fn get(&self, resource_id: Uuid) -> Option<SyncResource> {
        self.resources.lock().await.get(&resource_id).cloned()
    }
}

#[async_trait]
impl SyncStore for MemorySyncStore {
    async fn list_scheduled(&self) -> MonitorResult<Vec<SyncResource>> {
        let resources = self.resources.lock().await;
        Ok(resources.values().filter(|r| r.scheduled).cloned().collect())
    }

    async fn claim_sync(&self, resource_id: Uuid) -> MonitorResult<bool> {
        let mut resources = self.resources.lock().await;
        let resource = resources
            .get_mut(&resource_id)
            .ok_or_else(|| MonitorError::host(format!("unknown resource {resource_id}")))?;
        if resource.status == SyncStatus::Running {
            return Ok(false);
        }
        resource.status = SyncStatus::Running;
        Ok(true)
    }

    async fn finish_sync(
        &self,
        resource_id: Uuid,
        status: SyncStatus,
        outcome: Option<SyncOutcome>,
        at: Timestamp,
    ) -> MonitorResult<()> {
        let mut resources = self.resources.lock().await;
        let resource = resources
            .get_mut(&resource_id)
            .ok_or_else(|| MonitorError::host(format!("unknown resource {resource_id}")))?;
        resource.status = status;
        resource.last_synced_at = Some(at);
        if outcome.is_some() {
            resource.last_outcome = outcome;
        }
        Ok(())
    }
}

/// In-memory import store for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryImportStore {
    schedules: Mutex<HashMap<Uuid, ImportSchedule>>,
}

impl MemoryImportStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schedule.
    pub async fn insert(&self, schedule: ImportSchedule) {
        self.schedules.lock().await.insert(schedule.id, schedule);
    }

    /// Returns a schedule by ID.
    pub async fn get(&self, schedule_id: Uuid) -> Option<ImportSchedule> {
        self.schedules.lock().await.get(&schedule_id).cloned()
    }
}

#[async_trait]
impl ImportStore for MemoryImportStore {
    async fn list_due(&self, now: Timestamp) -> MonitorResult<Vec<ImportSchedule>> {
        let schedules = self.schedules.lock().await;
        Ok(schedules
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect())
    }

    async fn record_run(
        &self,
        schedule_id: Uuid,
        last_run_at: Timestamp,
        next_run_at: Timestamp,
    ) -> MonitorResult<()> {
        let mut schedules = self.schedules.lock().await;
        let schedule = schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| MonitorError::host(format!("unknown schedule {schedule_id}")))?;
        schedule.last_run_at = Some(last_run_at);
        schedule.next_run_at = next_run_at;
        Ok(())
    }
}

/// In-memory report sink that keeps every report, newest last.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    reports: Mutex<Vec<CheckReport>>,
}

impl MemoryReportSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded reports.
    pub async fn reports(&self) -> Vec<CheckReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn record(&self, report: CheckReport) -> MonitorResult<()> {
        self.reports.lock().await.push(report);
        Ok(())
    }
}
