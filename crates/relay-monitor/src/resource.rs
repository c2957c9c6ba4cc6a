//! External resources kept in sync on a schedule.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of external data source backing a resource.
///
/// Keys of the sync-strategy map; adding a kind means registering a
/// strategy for it, there is no reflective fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Contact list pulled from a spreadsheet.
    Spreadsheet,
    /// Contacts pulled from an address-book provider.
    AddressBook,
    /// Rows pulled from an HTTP endpoint.
    HttpEndpoint,
}

/// Sync lifecycle of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncStatus {
    /// No sync has ever run or the last one finished.
    Idle,
    /// A sync is in progress; the check skips the resource.
    Running,
    /// The last sync finished successfully.
    Completed,
    /// The last sync failed.
    Failed,
}

/// Counters produced by one sync pass over a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Items read from the source.
    pub total: u32,
    /// Items imported or updated.
    pub synced: u32,
    /// Items skipped or rejected.
    pub failed: u32,
}

/// An external resource the monitor keeps fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResource {
    /// Unique resource identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Which strategy syncs this resource.
    pub source: SourceKind,
    /// Whether the monitor syncs this resource automatically.
    #[serde(default)]
    pub scheduled: bool,
    /// Minutes between syncs; non-positive disables the resource.
    #[serde(default)]
    pub update_interval_minutes: i64,
    /// Current sync lifecycle state.
    pub status: SyncStatus,
    /// When the last sync finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<Timestamp>,
    /// Counters from the last sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<SyncOutcome>,
}

impl SyncResource {
    /// Creates an idle scheduled resource.
    pub fn new(name: impl Into<String>, source: SourceKind, interval_minutes: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            source,
            scheduled: true,
            update_interval_minutes: interval_minutes,
            status: SyncStatus::Idle,
            last_synced_at: None,
            last_outcome: None,
        }
    }

    /// Returns whether a sync is due at the given instant.
    ///
    /// A resource that has never synced is always due. A resource
    /// already `Running` is never due; overlapping syncs are skipped.
    pub fn is_due(&self, now: Timestamp) -> bool {
        if !self.scheduled || self.update_interval_minutes <= 0 {
            return false;
        }
        if self.status == SyncStatus::Running {
            return false;
        }
        match self.last_synced_at {
            None => true,
            Some(last) => now.duration_since(last).as_mins() >= self.update_interval_minutes,
        }
    }
}
