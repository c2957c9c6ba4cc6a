//! Workflow definition types.
//!
//! This module contains serializable, frontend-friendly types for
//! defining workflows. These types are designed for:
//! - Easy serialization to/from JSON
//! - Frontend consumption and editing
//! - Storage in databases
//!
//! To execute a workflow, definitions are compiled into a
//! [`RunGraph`](crate::graph::RunGraph) and walked by the
//! [`Executor`](crate::executor::Executor).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod edge;
mod node;
mod switch;

pub use edge::{Edge, EdgeBuilder};
pub use node::{
    ApiCallData, FormData, MessageData, Node, NodeKind, NodeRef, QueryData, StartData, SwitchData,
    TemplateData, WaitReplyData,
};
pub use switch::{Condition, ConditionGroup, ConditionOperator, GroupRelation};

/// Serializable workflow definition.
///
/// This is the JSON-friendly representation of a workflow graph: a flat
/// list of typed nodes and the edges connecting them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Stable identifier of this workflow definition.
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    /// Nodes in the workflow.
    pub nodes: Vec<Node>,
    /// Edges connecting nodes.
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Creates an empty workflow with a fresh ID.
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Returns a node by its definition ID.
    pub fn node(&self, id: &NodeRef) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Returns all nodes of the given kind name.
    pub fn nodes_of_kind(&self, kind: &str) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |node| node.kind_name() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_json_shape() {
        let json = r#"{
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "hello"}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "n1", "target": "n2"},
                {"id": "e2", "source": "n2", "target": "n3"}
            ]
        }"#;

        let workflow: Workflow = serde_json::from_str(json).unwrap();
        assert_eq!(workflow.nodes.len(), 3);
        assert_eq!(workflow.edges.len(), 2);
        assert_eq!(workflow.nodes_of_kind("start").count(), 1);
        assert_eq!(workflow.nodes_of_kind("end").count(), 1);

        let node = workflow.node(&"n2".into()).unwrap();
        assert!(matches!(node.kind, NodeKind::SendMessage(_)));
    }

    #[test]
    fn test_workflow_roundtrip() {
        let json = r#"{
            "nodes": [{"id": "n1", "type": "start"}, {"id": "n2", "type": "end"}],
            "edges": [{"id": "e1", "source": "n1", "target": "n2"}]
        }"#;
        let workflow: Workflow = serde_json::from_str(json).unwrap();
        let serialized = serde_json::to_string(&workflow).unwrap();
        let back: Workflow = serde_json::from_str(&serialized).unwrap();
        assert_eq!(workflow, back);
    }
}
