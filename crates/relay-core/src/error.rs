//! Core error types.

use std::borrow::Cow;

use thiserror::Error;

use crate::id::{RunId, StepId};

/// Result type alias for core operations.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Errors that can occur in the execution data model and stores.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced run does not exist.
    #[error("run {0} not found")]
    RunNotFound(RunId),

    /// Referenced step does not exist.
    #[error("step {0} not found")]
    StepNotFound(StepId),

    /// Storage backend failure.
    #[error("store error: {message}")]
    Store {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Recipient could not be resolved to any target.
    #[error("recipient resolution failed: {0}")]
    RecipientResolution(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a store error with a message.
    pub fn store(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a store error with a message and source.
    pub fn store_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
