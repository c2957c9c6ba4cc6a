//! Host-side action dispatch.

use std::collections::HashMap;

use async_trait::async_trait;
use relay_core::id::{RunId, StepId};
use relay_core::recipient::Recipient;
use relay_core::variable::VariableValue;

use crate::definition::ApiCallData;

/// Boxed error returned by host dispatchers.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for dispatch operations.
pub type DispatchResult<T = ()> = Result<T, BoxedError>;

/// Correlation context passed to every dispatch call.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The run performing the side effect.
    pub run_id: RunId,
    /// The step performing the side effect.
    pub step_id: StepId,
    /// Definition ID of the node being executed.
    pub node_ref: String,
    /// Kind name of the node being executed.
    pub node_kind: String,
}

/// Interface the executor calls to perform node side effects.
///
/// Supplied by the host application. Failures are logged by the
/// executor and do not abort traversal.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Sends a free-form message.
    async fn send_message(
        &self,
        recipient: &Recipient,
        content: &str,
        ctx: &RunContext,
    ) -> DispatchResult;

    /// Sends a pre-approved template with substitution variables.
    async fn send_template(
        &self,
        recipient: &Recipient,
        template_id: &str,
        variables: &HashMap<String, String>,
        ctx: &RunContext,
    ) -> DispatchResult;

    /// Sends a form.
    async fn send_form(
        &self,
        recipient: &Recipient,
        form_id: &str,
        ctx: &RunContext,
    ) -> DispatchResult;

    /// Calls an external API.
    async fn call_external(&self, config: &ApiCallData, ctx: &RunContext) -> DispatchResult;

    /// Runs a host-interpreted query, optionally producing a value.
    async fn run_query(&self, query: &str, ctx: &RunContext)
    -> DispatchResult<Option<VariableValue>>;
}
