//! A schemaless, record-backed entity.

use crate::{
    record::record_id, Entity, Patchable, Record, SyncState, DEFAULT_ID_KEY, UNASSIGNED_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A generic entity keeping its fields as a [`Record`].
///
/// The identifier lives under the key the document was built with,
/// [`DEFAULT_ID_KEY`] unless told otherwise. Local edits through
/// [`Document::set`] and [`Document::remove`] mark the document dirty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    id: String,
    #[serde(default = "default_id_key")]
    id_key: String,
    fields: Record,
    state: SyncState,
    snapshot: Record,
}

fn default_id_key() -> String {
    DEFAULT_ID_KEY.to_string()
}

impl Document {
    /// A new, never synchronized document keyed by [`DEFAULT_ID_KEY`].
    pub fn new(fields: Record) -> Self {
        Self::with_id_key(fields, DEFAULT_ID_KEY)
    }

    /// A new, never synchronized document keyed by `id_key`.
    pub fn with_id_key(fields: Record, id_key: impl Into<String>) -> Self {
        let id_key = id_key.into();
        let mut fields = fields;
        fields.remove(&id_key);
        Self {
            id: UNASSIGNED_ID.to_string(),
            id_key,
            fields,
            state: SyncState::Dirty,
            snapshot: Record::new(),
        }
    }

    /// Field carrying the identifier.
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field value locally.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
        self.state = SyncState::Dirty;
    }

    /// Remove a field locally.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.fields.remove(key);
        if removed.is_some() {
            self.state = SyncState::Dirty;
        }
        removed
    }

    /// All fields, without the identifier.
    pub fn fields(&self) -> &Record {
        &self.fields
    }
}

impl Entity for Document {
    fn from_record(record: &Record, id_key: &str) -> Option<Self> {
        let mut document = Document::with_id_key(record.clone(), id_key);
        if let Some(id) = record_id(record, id_key) {
            document.id = id;
            document.state = SyncState::Synced;
            document.snapshot = document.to_record();
        }
        Some(document)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Record {
        let mut record = self.fields.clone();
        if self.is_identified() {
            record.insert(self.id_key.clone(), Value::String(self.id.clone()));
        }
        record
    }

    fn update(&mut self, record: &Record) {
        for (key, value) in record {
            if *key == self.id_key {
                if let Some(id) = record_id(record, &self.id_key) {
                    self.id = id;
                }
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
        self.state = SyncState::Synced;
        self.snapshot = self.to_record();
    }

    fn sync_state(&self) -> SyncState {
        self.state
    }

    fn set_sync_state(&mut self, state: SyncState) {
        self.state = state;
    }
}

impl Patchable for Document {
    fn snapshot(&self) -> &Record {
        &self.snapshot
    }

    fn set_snapshot(&mut self, snapshot: Record) {
        self.snapshot = snapshot;
    }
}
