//! Edge types for connecting nodes in a workflow definition.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::node::NodeRef;

/// An edge connecting two nodes in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(
    name = "EdgeBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct Edge {
    /// Definition-scoped edge ID.
    pub id: String,
    /// Source node ID.
    pub source: NodeRef,
    /// Target node ID.
    pub target: NodeRef,
    /// Output path label on the source node.
    ///
    /// Switch nodes route by matching the selected path against this
    /// handle; edges without a handle are followed unconditionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub source_handle: Option<String>,
}

impl EdgeBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.source.is_none() {
            return Err("source is required".into());
        }
        if self.target.is_none() {
            return Err("target is required".into());
        }
        Ok(())
    }
}

impl Edge {
    /// Creates a new edge between two nodes.
    pub fn new(id: impl Into<String>, source: impl Into<NodeRef>, target: impl Into<NodeRef>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
        }
    }

    /// Returns a builder for creating an edge.
    pub fn builder() -> EdgeBuilder {
        EdgeBuilder::default()
    }
}
