#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
mod error;
pub mod id;
pub mod recipient;
pub mod run;
pub mod step;
pub mod store;
pub mod variable;

pub use config::{
    EscalationConfig, OverdueConfig, RetryMessageConfig, ValidationConfig, ValidatorKind,
};
pub use error::{CoreError, Result};
pub use id::{RunId, StepId};
pub use recipient::{Recipient, RecipientResolver, ResolvedTarget};
pub use run::{ExecutionRun, RunStatus};
pub use step::{StepExecution, StepStatus};
pub use store::{MemoryRunStore, RunStore};
pub use variable::{MemoryVariableStore, VariableStore, VariableValue};
