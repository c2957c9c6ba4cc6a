//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use relay_runtime::prelude::*;
//! ```

pub use crate::condition::ConditionEvaluator;
pub use crate::definition::{
    Condition, ConditionGroup, ConditionOperator, Edge, GroupRelation, Node, NodeKind, NodeRef,
    Workflow,
};
pub use crate::dispatcher::{ActionDispatcher, DispatchResult, RunContext};
pub use crate::error::{WorkflowError, WorkflowResult};
pub use crate::executor::Executor;
pub use crate::graph::RunGraph;
