//! Per-check pass reports.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Which scheduler check produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckKind {
    /// Retry/escalation check over waiting steps.
    Retry,
    /// Overdue check over running runs.
    Overdue,
    /// Resource auto-sync check.
    ResourceSync,
    /// Scheduled-import check.
    ScheduledImport,
}

/// Outcome of one check pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckStatus {
    /// The check pass ran to the end; per-item failures may still be
    /// counted in `failed_count`.
    Completed,
    /// The check pass itself failed before finishing.
    Failed,
}

/// One record per check per scheduler pass.
///
/// Appended to the execution log for observability; never read back by
/// the scheduler itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    /// Which check produced this report.
    #[serde(rename = "scheduleType")]
    pub check: CheckKind,
    /// Optional identifier of a related entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    /// Pass outcome.
    pub status: CheckStatus,
    /// Number of items the pass considered due.
    pub total_items: u32,
    /// Items acted on successfully.
    pub success_count: u32,
    /// Items that failed individually.
    pub failed_count: u32,
    /// Human-readable summary.
    pub message: String,
    /// Error detail for failed passes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the pass started.
    pub started_at: Timestamp,
    /// When the pass finished.
    pub completed_at: Timestamp,
    /// Pass duration in milliseconds.
    pub duration_ms: i64,
}

impl CheckReport {
    /// Starts building a report for a check at the given instant.
    pub fn begin(check: CheckKind, started_at: Timestamp) -> CheckReportBuilder {
        CheckReportBuilder {
            check,
            started_at,
            total_items: 0,
            success_count: 0,
            failed_count: 0,
        }
    }
}

/// Accumulates per-item outcomes during one check pass.
#[derive(Debug)]
pub struct CheckReportBuilder {
    check: CheckKind,
    started_at: Timestamp,
    total_items: u32,
    success_count: u32,
    failed_count: u32,
}

impl CheckReportBuilder {
    /// Records one due item about to be acted on.
    pub fn item(&mut self) {
        self.total_items += 1;
    }

    /// Records a successful item action.
    pub fn success(&mut self) {
        self.success_count += 1;
    }

    /// Records a failed item action.
    pub fn failure(&mut self) {
        self.failed_count += 1;
    }

    /// Finishes the pass with a completed status.
    pub fn complete(self, completed_at: Timestamp, message: impl Into<String>) -> CheckReport {
        self.finish(CheckStatus::Completed, completed_at, message, None)
    }

    /// Finishes the pass with a failed status.
    pub fn fail(self, completed_at: Timestamp, error: impl Into<String>) -> CheckReport {
        let error = error.into();
        self.finish(
            CheckStatus::Failed,
            completed_at,
            "check pass failed",
            Some(error),
        )
    }

    fn finish(
        self,
        status: CheckStatus,
        completed_at: Timestamp,
        message: impl Into<String>,
        error_message: Option<String>,
    ) -> CheckReport {
        let duration_ms = completed_at
            .duration_since(self.started_at)
            .as_millis() as i64;
        CheckReport {
            check: self.check,
            related_id: None,
            status,
            total_items: self.total_items,
            success_count: self.success_count,
            failed_count: self.failed_count,
            message: message.into(),
            error_message,
            started_at: self.started_at,
            completed_at,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_builder_counts() {
        let start = Timestamp::UNIX_EPOCH;
        let mut builder = CheckReport::begin(CheckKind::Retry, start);
        builder.item();
        builder.success();
        builder.item();
        builder.failure();

        let end = start + jiff::SignedDuration::from_millis(250);
        let report = builder.complete(end, "2 due");
        assert_eq!(report.status, CheckStatus::Completed);
        assert_eq!(report.total_items, 2);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.duration_ms, 250);
    }

    #[test]
    fn test_check_kind_wire_name() {
        assert_eq!(CheckKind::ResourceSync.to_string(), "resource_sync");
    }
}
