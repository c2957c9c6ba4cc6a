#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod checks;
mod config;
mod error;
pub mod host;
pub mod import;
pub mod report;
pub mod resource;
pub mod scheduler;
pub mod store;

pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use host::{ImportRunner, MessageSender, SyncStrategy, WorkflowProvider};
pub use report::{CheckKind, CheckReport, CheckStatus};
pub use scheduler::MonitorScheduler;

/// Tracing target for monitor operations.
pub const TRACING_TARGET: &str = "relay_monitor";
