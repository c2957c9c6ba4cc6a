//! Execution run records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::RunId;

/// Lifecycle status of a workflow execution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// The run is actively traversing the graph.
    Running,
    /// The run is suspended on a wait-reply node.
    Waiting,
    /// All end nodes of the graph have completed.
    Completed,
    /// Traversal aborted with an unhandled error.
    Error,
}

impl RunStatus {
    /// Returns whether this is a terminal status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Error)
    }
}

/// One execution instance of a workflow graph.
///
/// Created when a run starts and mutated by both the executor and the
/// background monitor. Runs are never deleted; they form the audit trail
/// for every workflow start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRun {
    /// Unique run identifier.
    pub id: RunId,
    /// The workflow definition this run executes.
    pub workflow_id: Uuid,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Index of the most recently entered step.
    pub current_step: u32,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    /// Error message for runs in [`RunStatus::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Whether the overdue escalation for this run has fired.
    #[serde(default)]
    pub overdue_notified: bool,
    /// When the overdue escalation fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_notified_at: Option<Timestamp>,
    /// Threshold in minutes that triggered the overdue escalation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_threshold_minutes: Option<i64>,
}

impl ExecutionRun {
    /// Creates a new running execution for a workflow.
    pub fn new(workflow_id: Uuid, started_at: Timestamp) -> Self {
        Self {
            id: RunId::new(),
            workflow_id,
            status: RunStatus::Running,
            current_step: 0,
            started_at,
            ended_at: None,
            error_message: None,
            overdue_notified: false,
            overdue_notified_at: None,
            overdue_threshold_minutes: None,
        }
    }

    /// Marks the run completed at the given instant.
    pub fn complete(&mut self, at: Timestamp) {
        self.status = RunStatus::Completed;
        self.ended_at = Some(at);
    }

    /// Marks the run errored with a message.
    pub fn fail(&mut self, at: Timestamp, message: impl Into<String>) {
        self.status = RunStatus::Error;
        self.ended_at = Some(at);
        self.error_message = Some(message.into());
    }
}
