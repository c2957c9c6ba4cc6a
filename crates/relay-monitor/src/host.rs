//! Host collaborator traits consumed by the checks.
//!
//! The monitor never talks to a messaging channel, an import pipeline,
//! or an external data source directly. The host application supplies
//! these implementations; the checks orchestrate them.

use async_trait::async_trait;
use relay_core::recipient::ResolvedTarget;
use relay_runtime::definition::Workflow;
use uuid::Uuid;

use crate::import::{ImportOutcome, ImportSchedule};
use crate::resource::{SyncOutcome, SyncResource};

/// Boxed error returned by host collaborators.
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for host collaborator calls.
pub type HostResult<T = ()> = Result<T, HostError>;

/// Delivers retry, escalation, and overdue messages.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends a message body to one resolved target.
    async fn send(&self, target: &ResolvedTarget, content: &str) -> HostResult;
}

/// Looks up workflow definitions by ID.
///
/// The overdue check reads a run's threshold from the start node of
/// the workflow that produced it.
#[async_trait]
pub trait WorkflowProvider: Send + Sync {
    /// Returns the definition for a workflow, if it still exists.
    async fn workflow(&self, workflow_id: Uuid) -> HostResult<Option<Workflow>>;
}

/// Synchronizes one kind of external resource.
///
/// Registered per [`SourceKind`](crate::resource::SourceKind) in an
/// explicit map at scheduler construction; there is no name-based
/// dispatch at runtime.
#[async_trait]
pub trait SyncStrategy: Send + Sync {
    /// Runs one full sync of the given resource.
    async fn sync(&self, resource: &SyncResource) -> HostResult<SyncOutcome>;
}

/// Executes one scheduled import.
#[async_trait]
pub trait ImportRunner: Send + Sync {
    /// Runs the import described by a schedule.
    async fn run_import(&self, schedule: &ImportSchedule) -> HostResult<ImportOutcome>;
}
