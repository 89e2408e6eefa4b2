//! Record types shared by both stores.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A string-keyed map of dynamically typed values.
///
/// This is the wire and storage agnostic representation of an entity.
pub type Record = serde_json::Map<String, Value>;

/// Identifier field used when none is configured.
pub const DEFAULT_ID_KEY: &str = "_id";

/// Placeholder identifier carried by entities that never completed a
/// round-trip with the remote store.
pub const UNASSIGNED_ID: &str = "-1";

/// Read the identifier of a record.
///
/// Strings are returned as-is and integral numbers are stringified. Any other
/// value, or a missing key, means the record has no identifier.
pub fn record_id(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Synchronization state of a local entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    /// Confirmed by the remote store
    Synced,
    /// Changed locally and not yet pushed
    #[default]
    Dirty,
    /// Staged for the tombstone sweep until the next pull confirms it
    Unconfirmed,
}

impl SyncState {
    /// The boolean "synchronized" flag this state projects to.
    pub fn is_synchronized(self) -> bool {
        self == SyncState::Synced
    }
}
