//! Recipient descriptors and resolution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::id::RunId;

/// Abstract description of who should receive a message.
///
/// Resolution into concrete addressable targets is delegated to the
/// host application via [`RecipientResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    /// A platform user account.
    User { id: Uuid },
    /// A stored contact record.
    Contact { id: Uuid },
    /// A named group of contacts.
    Group { name: String },
    /// All contacts tagged with a hashtag.
    Hashtag { tag: String },
    /// Whoever triggered the run.
    Initiator,
    /// A raw phone number, no lookup needed.
    PhoneNumber { number: String },
}

/// A concrete addressable target produced by resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedTarget {
    /// Channel address (phone number, email, webhook URL).
    pub address: String,
    /// Display name, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ResolvedTarget {
    /// Creates a target from a bare address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
        }
    }
}

/// Resolves abstract recipients into addressable targets.
///
/// Supplied by the host application; consulted by retry, escalation,
/// and overdue dispatch.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// Resolves a recipient in the context of a run.
    ///
    /// An empty list means the recipient resolved to no one, which
    /// callers treat as a per-item failure, not a panic.
    async fn resolve(&self, run_id: RunId, recipient: &Recipient) -> Result<Vec<ResolvedTarget>>;
}
