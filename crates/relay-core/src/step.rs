//! Step execution records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::id::{RunId, StepId};

/// Lifecycle status of a single step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    /// The node is being executed.
    Running,
    /// The step is parked pending an external reply.
    Waiting,
    /// The node finished.
    Completed,
    /// The node raised an error.
    Error,
    /// The node type was not recognized; traversal continued past it.
    UnknownStepType,
}

/// One visit to a node within a run.
///
/// A step is created at node entry and updated at completion or
/// suspension. For wait-reply nodes the persisted `Waiting` step *is*
/// the suspend point: resumption looks it up by run ID and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    /// Unique step identifier.
    pub id: StepId,
    /// The run this step belongs to.
    pub run_id: RunId,
    /// Ordinal position of this step within the run.
    pub step_index: u32,
    /// ID of the visited node in the workflow definition.
    pub node_ref: String,
    /// Node kind name, as it appeared in the workflow definition.
    pub node_kind: String,
    /// Current lifecycle status.
    pub status: StepStatus,
    /// When the node was entered.
    pub started_at: Timestamp,
    /// When the node finished or suspended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    /// Number of retry messages sent while waiting.
    #[serde(default)]
    pub retry_count: u32,
    /// When the most recent retry message was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<Timestamp>,
    /// Whether the retry-exhausted escalation has fired.
    #[serde(default)]
    pub escalation_sent: bool,
    /// When the escalation fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_sent_at: Option<Timestamp>,
    /// Retry/escalation policy for waiting steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
    /// Identifier of the party whose reply is awaited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_for: Option<String>,
}

impl StepExecution {
    /// Creates a new running step at node entry.
    pub fn new(
        run_id: RunId,
        step_index: u32,
        node_ref: impl Into<String>,
        node_kind: impl Into<String>,
        started_at: Timestamp,
    ) -> Self {
        Self {
            id: StepId::new(),
            run_id,
            step_index,
            node_ref: node_ref.into(),
            node_kind: node_kind.into(),
            status: StepStatus::Running,
            started_at,
            ended_at: None,
            retry_count: 0,
            last_retry_at: None,
            escalation_sent: false,
            escalation_sent_at: None,
            validation: None,
            waiting_for: None,
        }
    }

    /// Marks the step completed at the given instant.
    pub fn complete(&mut self, at: Timestamp) {
        self.status = StepStatus::Completed;
        self.ended_at = Some(at);
    }

    /// Returns the instant the retry clock measures from.
    ///
    /// The last retry if one was sent, otherwise the step start.
    pub fn last_activity_at(&self) -> Timestamp {
        self.last_retry_at.unwrap_or(self.started_at)
    }
}
