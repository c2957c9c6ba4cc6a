//! Monitor error types.

use std::borrow::Cow;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type MonitorResult<T, E = MonitorError> = std::result::Result<T, E>;

/// Errors that can occur during monitoring passes.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Execution-state persistence failed.
    #[error(transparent)]
    Core(#[from] relay_core::CoreError),

    /// Workflow definition lookup or compilation failed.
    #[error(transparent)]
    Workflow(#[from] relay_runtime::WorkflowError),

    /// A host collaborator (sender, runner, strategy) failed.
    #[error("host operation failed: {message}")]
    Host {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration rejected at construction.
    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),
}

impl MonitorError {
    /// Creates a host error with a message.
    pub fn host(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Host {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a host error with a message and source.
    pub fn host_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Host {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
