//! Engine configuration.

use crate::DEFAULT_ID_KEY;

/// Number of records created between intermediate commits of a bulk create.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Path segment appended to a resource path for bulk upserts.
pub const DEFAULT_BULK_SUFFIX: &str = "collection";

/// How a resource is addressed on the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Resource path on the remote store, e.g. `users`
    pub path: String,
    /// Field carrying the record identifier
    pub id_key: String,
    /// Segment appended to `path` for bulk upserts
    pub bulk_suffix: String,
}

impl SyncConfig {
    /// Configuration for the resource at `path` with default settings.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id_key: DEFAULT_ID_KEY.to_string(),
            bulk_suffix: DEFAULT_BULK_SUFFIX.to_string(),
        }
    }

    /// Use a different identifier field.
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    /// Use a different bulk upsert segment.
    pub fn with_bulk_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.bulk_suffix = suffix.into();
        self
    }

    /// Path of a single record.
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }

    /// Path of the bulk upsert endpoint.
    pub fn bulk_path(&self) -> String {
        format!("{}/{}", self.path, self.bulk_suffix)
    }
}
