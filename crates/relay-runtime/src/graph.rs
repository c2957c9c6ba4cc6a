//! Compiled workflow graph.
//!
//! The serializable [`Workflow`] definition is compiled into a
//! [`RunGraph`] before execution. Internally uses petgraph's `DiGraph`
//! for efficient traversal and structure checks.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use relay_core::config::OverdueConfig;

use crate::definition::{Node, NodeKind, NodeRef, Workflow};
use crate::error::{WorkflowError, WorkflowResult};

/// Edge weight in the compiled graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EdgeLabel {
    /// Output path label on the source node, if any.
    source_handle: Option<String>,
}

/// A compiled workflow graph ready for traversal.
#[derive(Debug, Clone, Default)]
pub struct RunGraph {
    /// The underlying directed graph.
    graph: DiGraph<Node, EdgeLabel>,
    /// Mapping from definition ID to petgraph's NodeIndex.
    node_indices: HashMap<NodeRef, NodeIndex>,
}

impl RunGraph {
    /// Compiles a workflow definition into a run graph.
    ///
    /// Fails on duplicate node IDs, on edges referencing nodes that do
    /// not exist, and on cycles, since traversal would never terminate
    /// on a cyclic graph. Structural invariants beyond that are checked
    /// by [`RunGraph::validate`].
    pub fn compile(workflow: &Workflow) -> WorkflowResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &workflow.nodes {
            if node_indices.contains_key(&node.id) {
                return Err(WorkflowError::InvalidDefinition(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
            let index = graph.add_node(node.clone());
            node_indices.insert(node.id.clone(), index);
        }

        for edge in &workflow.edges {
            let source = *node_indices.get(&edge.source).ok_or_else(|| {
                WorkflowError::InvalidDefinition(format!(
                    "edge {} references missing source node {}",
                    edge.id, edge.source
                ))
            })?;
            let target = *node_indices.get(&edge.target).ok_or_else(|| {
                WorkflowError::InvalidDefinition(format!(
                    "edge {} references missing target node {}",
                    edge.id, edge.target
                ))
            })?;
            graph.add_edge(
                source,
                target,
                EdgeLabel {
                    source_handle: edge.source_handle.clone(),
                },
            );
        }

        if is_cyclic_directed(&graph) {
            return Err(WorkflowError::InvalidDefinition(
                "cycle detected in workflow graph".into(),
            ));
        }

        Ok(Self {
            graph,
            node_indices,
        })
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns a node by its definition ID.
    pub fn node(&self, id: &NodeRef) -> Option<&Node> {
        let index = self.node_indices.get(id)?;
        self.graph.node_weight(*index)
    }

    /// Returns the start node, if the graph has exactly one.
    ///
    /// A graph without a start node is executable as a no-op, so this
    /// is an `Option` rather than an error.
    pub fn start_node(&self) -> Option<&Node> {
        let mut starts = self
            .graph
            .node_weights()
            .filter(|node| node.kind.is_start());
        let first = starts.next()?;
        if starts.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Returns the number of end nodes in the graph.
    ///
    /// This count is the join barrier: a run completes only after this
    /// many end steps have completed.
    pub fn end_count(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|node| node.kind.is_end())
            .count()
    }

    /// Returns the overdue policy from the start node, if configured.
    pub fn overdue_config(&self) -> Option<&OverdueConfig> {
        match &self.start_node()?.kind {
            NodeKind::Start(data) => data.overdue.as_ref(),
            _ => None,
        }
    }

    /// Returns all successor node IDs of a node.
    pub fn successors(&self, id: &NodeRef) -> Vec<NodeRef> {
        let Some(index) = self.node_indices.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(*index, Direction::Outgoing)
            .filter_map(|edge_ref| self.graph.node_weight(edge_ref.target()))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Returns the successors reachable through the given output path.
    ///
    /// Edges whose handle matches the path are followed; when none
    /// match, unlabeled edges are followed as the fallthrough.
    pub fn successors_on_path(&self, id: &NodeRef, path: &str) -> Vec<NodeRef> {
        let Some(index) = self.node_indices.get(id) else {
            return Vec::new();
        };

        let matching: Vec<NodeRef> = self
            .graph
            .edges_directed(*index, Direction::Outgoing)
            .filter(|edge_ref| edge_ref.weight().source_handle.as_deref() == Some(path))
            .filter_map(|edge_ref| self.graph.node_weight(edge_ref.target()))
            .map(|node| node.id.clone())
            .collect();

        if !matching.is_empty() {
            return matching;
        }

        self.graph
            .edges_directed(*index, Direction::Outgoing)
            .filter(|edge_ref| edge_ref.weight().source_handle.is_none())
            .filter_map(|edge_ref| self.graph.node_weight(edge_ref.target()))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Validates the structural invariants of the graph.
    ///
    /// Checks that:
    /// - There is exactly one start node
    /// - There is at least one end node
    /// - Every node is reachable from the start node
    ///
    /// Acyclicity is already enforced by [`RunGraph::compile`].
    pub fn validate(&self) -> WorkflowResult<()> {
        let start_count = self
            .graph
            .node_weights()
            .filter(|node| node.kind.is_start())
            .count();
        if start_count != 1 {
            return Err(WorkflowError::InvalidDefinition(format!(
                "workflow must have exactly one start node, found {start_count}"
            )));
        }

        if self.end_count() == 0 {
            return Err(WorkflowError::InvalidDefinition(
                "workflow must have at least one end node".into(),
            ));
        }

        let start = self
            .start_node()
            .and_then(|node| self.node_indices.get(&node.id))
            .copied()
            .ok_or_else(|| WorkflowError::InvalidDefinition("missing start node index".into()))?;

        let mut reachable = 0usize;
        let mut bfs = Bfs::new(&self.graph, start);
        while bfs.next(&self.graph).is_some() {
            reachable += 1;
        }
        if reachable != self.graph.node_count() {
            return Err(WorkflowError::InvalidDefinition(format!(
                "{} of {} nodes are unreachable from the start node",
                self.graph.node_count() - reachable,
                self.graph.node_count()
            )));
        }

        Ok(())
    }
}
