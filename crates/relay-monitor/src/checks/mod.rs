//! The four scheduler checks.
//!
//! Each check scans persisted state, claims due items through the
//! store before performing any side effect, and produces one
//! [`CheckReport`](crate::report::CheckReport) per pass. Checks take
//! the current instant as a parameter so tests can drive the clock.

mod import;
mod overdue;
mod retry;
mod sync;
#[cfg(test)]
pub(crate) mod testing;

pub use import::ImportCheck;
pub use overdue::OverdueCheck;
pub use retry::RetryCheck;
pub use sync::SyncCheck;
