//! Typed run variables and their storage.

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::id::RunId;

/// A typed variable value scoped to one execution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariableValue {
    /// Free-form text.
    Text(String),
    /// Decimal number.
    Number(BigDecimal),
    /// Point in time.
    Timestamp(Timestamp),
    /// Boolean flag.
    Bool(bool),
}

impl VariableValue {
    /// Returns the value rendered as text.
    pub fn as_text(&self) -> String {
        match self {
            VariableValue::Text(s) => s.clone(),
            VariableValue::Number(n) => n.to_string(),
            VariableValue::Timestamp(ts) => ts.to_string(),
            VariableValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_owned())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Text(value)
    }
}

impl From<BigDecimal> for VariableValue {
    fn from(value: BigDecimal) -> Self {
        VariableValue::Number(value)
    }
}

impl From<Timestamp> for VariableValue {
    fn from(value: Timestamp) -> Self {
        VariableValue::Timestamp(value)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

/// Typed key/value store scoped per execution run.
///
/// Consulted by condition evaluation and node execution. The backend
/// is supplied by the host application.
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Returns the current value of a variable, if set.
    async fn get(&self, run_id: RunId, name: &str) -> Result<Option<VariableValue>>;

    /// Sets a variable for a run.
    async fn set(&self, run_id: RunId, name: &str, value: VariableValue) -> Result<()>;
}

/// In-memory variable store.
///
/// Reference implementation used for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryVariableStore {
    variables: RwLock<HashMap<(RunId, String), VariableValue>>,
}

impl MemoryVariableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VariableStore for MemoryVariableStore {
    async fn get(&self, run_id: RunId, name: &str) -> Result<Option<VariableValue>> {
        let variables = self.variables.read().await;
        Ok(variables.get(&(run_id, name.to_owned())).cloned())
    }

    async fn set(&self, run_id: RunId, name: &str, value: VariableValue) -> Result<()> {
        let mut variables = self.variables.write().await;
        variables.insert((run_id, name.to_owned()), value);
        Ok(())
    }
}
