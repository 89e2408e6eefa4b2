//! Record storage, grouped by collection.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tidewater_engine::{record_id, transform, Record, DEFAULT_ID_KEY};

/// Field stamped with the creation time of a record.
pub const CREATED_AT: &str = "createdAt";

/// Field stamped with the last modification time of a record.
pub const UPDATED_AT: &str = "updatedAt";

/// A stored record with its insertion sequence.
#[derive(Debug, Clone)]
struct StoredRecord {
    seq: u64,
    record: Record,
}

/// All records the server holds.
///
/// Records are listed in insertion order. Identifiers live under `_id` and
/// are assigned on insert when missing.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: DashMap<(String, String), StoredRecord>,
    seq: AtomicU64,
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Check a query filter against a record. Values are compared as text.
fn matches(record: &Record, filter: &HashMap<String, String>) -> bool {
    filter.iter().all(|(key, expected)| match record.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Records of `collection` matching every `filter` pair, in insertion
    /// order.
    pub fn list(&self, collection: &str, filter: &HashMap<String, String>) -> Vec<Record> {
        let mut found: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == collection && matches(&entry.record, filter))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|stored| stored.seq);
        found.into_iter().map(|stored| stored.record).collect()
    }

    /// Number of distinct collections holding at least one record.
    pub fn collection_count(&self) -> usize {
        let mut names: Vec<String> = self.records.iter().map(|e| e.key().0.clone()).collect();
        names.sort();
        names.dedup();
        names.len()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.records
            .get(&Self::key(collection, id))
            .map(|stored| stored.record.clone())
    }

    /// Store a new record, assigning an identifier unless it carries one.
    ///
    /// An existing record with the same identifier is replaced.
    pub fn insert(&self, collection: &str, record: Record) -> Record {
        let mut record = record;
        let id = record_id(&record, DEFAULT_ID_KEY).unwrap_or_else(new_id);
        let stamp = now();
        record.insert(DEFAULT_ID_KEY.to_string(), Value::String(id.clone()));
        record.insert(CREATED_AT.to_string(), stamp.clone());
        record.insert(UPDATED_AT.to_string(), stamp);

        let stored = StoredRecord {
            seq: self.next_seq(),
            record: record.clone(),
        };
        self.records.insert(Self::key(collection, &id), stored);
        record
    }

    /// Replace the fields of an existing record.
    ///
    /// The identifier and creation time are kept. Returns `None` when no
    /// record carries `id`.
    pub fn replace(&self, collection: &str, id: &str, record: Record) -> Option<Record> {
        let mut entry = self.records.get_mut(&Self::key(collection, id))?;
        let mut record = record;
        record.insert(DEFAULT_ID_KEY.to_string(), Value::String(id.to_string()));
        if let Some(created) = entry.record.get(CREATED_AT) {
            record.insert(CREATED_AT.to_string(), created.clone());
        }
        record.insert(UPDATED_AT.to_string(), now());
        entry.record = record.clone();
        Some(record)
    }

    /// Apply a partial update to an existing record. A `null` value removes
    /// the field.
    pub fn patch(&self, collection: &str, id: &str, diff: &Record) -> Option<Record> {
        let mut entry = self.records.get_mut(&Self::key(collection, id))?;
        let mut diff = diff.clone();
        diff.remove(DEFAULT_ID_KEY);
        diff.remove(CREATED_AT);

        let mut record = transform::apply_patch(&entry.record, &diff);
        record.insert(UPDATED_AT.to_string(), now());
        entry.record = record.clone();
        Some(record)
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        self.records.remove(&Self::key(collection, id)).is_some()
    }

    /// Insert or overwrite each record, answering position by position.
    ///
    /// A record whose identifier is already stored is merged over the stored
    /// version; anything else is inserted.
    pub fn upsert_many(&self, collection: &str, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .map(|record| {
                let existing = record_id(&record, DEFAULT_ID_KEY)
                    .and_then(|id| self.get(collection, &id).map(|stored| (id, stored)));
                match existing {
                    Some((id, stored)) => {
                        let merged = transform::merge(&stored, &record);
                        self.replace(collection, &id, merged)
                            .unwrap_or_else(|| self.insert(collection, record))
                    }
                    None => self.insert(collection, record),
                }
            })
            .collect()
    }
}
