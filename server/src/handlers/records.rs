//! Record handlers - the REST surface a `HttpRemote` talks to.

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tidewater_engine::{
    config::DEFAULT_BULK_SUFFIX, record_id, remote::into_records, Record, DEFAULT_ID_KEY,
};

/// Request body of a bulk upsert.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    /// Records to insert or overwrite
    pub data: Value,
}

fn into_object(body: Value) -> Result<Record> {
    match body {
        Value::Object(record) => Ok(record),
        other => Err(AppError::BadRequest(format!("expected a JSON object, got {other}"))),
    }
}

/// Reject identifiers that collide with the bulk upsert path segment, since
/// `/{collection}/collection` would never reach such a record.
fn ensure_addressable(record: &Record) -> Result<()> {
    if record_id(record, DEFAULT_ID_KEY).as_deref() == Some(DEFAULT_BULK_SUFFIX) {
        return Err(AppError::BadRequest(format!(
            "`{DEFAULT_BULK_SUFFIX}` is reserved and cannot be used as an identifier"
        )));
    }
    Ok(())
}

fn not_found(collection: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{collection}/{id}"))
}

/// List a collection, optionally filtered by query parameters.
pub fn handle_list(
    store: &RecordStore,
    collection: &str,
    filter: &HashMap<String, String>,
) -> Vec<Record> {
    store.list(collection, filter)
}

/// Create one record.
pub fn handle_create(store: &RecordStore, collection: &str, body: Value) -> Result<Record> {
    let record = into_object(body)?;
    ensure_addressable(&record)?;
    let created = store.insert(collection, record);
    tracing::debug!(collection, id = ?created.get(DEFAULT_ID_KEY), "Record created");
    Ok(created)
}

/// Insert or overwrite a batch of records.
pub fn handle_bulk(
    store: &RecordStore,
    collection: &str,
    request: BulkRequest,
) -> Result<Vec<Record>> {
    let records = into_records(request.data)?;
    for record in &records {
        ensure_addressable(record)?;
    }
    let count = records.len();
    let answered = store.upsert_many(collection, records);
    tracing::debug!(collection, count, "Bulk upsert applied");
    Ok(answered)
}

/// Fetch one record.
pub fn handle_find(store: &RecordStore, collection: &str, id: &str) -> Result<Record> {
    store
        .get(collection, id)
        .ok_or_else(|| not_found(collection, id))
}

/// Replace one record.
pub fn handle_replace(
    store: &RecordStore,
    collection: &str,
    id: &str,
    body: Value,
) -> Result<Record> {
    let record = into_object(body)?;
    let replaced = store
        .replace(collection, id, record)
        .ok_or_else(|| not_found(collection, id))?;
    tracing::debug!(collection, id, "Record replaced");
    Ok(replaced)
}

/// Partially update one record.
pub fn handle_patch(
    store: &RecordStore,
    collection: &str,
    id: &str,
    body: Value,
) -> Result<Record> {
    let diff = into_object(body)?;
    let patched = store
        .patch(collection, id, &diff)
        .ok_or_else(|| not_found(collection, id))?;
    tracing::debug!(collection, id, fields = diff.len(), "Record patched");
    Ok(patched)
}

/// Delete one record.
pub fn handle_delete(store: &RecordStore, collection: &str, id: &str) -> Result<()> {
    if !store.remove(collection, id) {
        return Err(not_found(collection, id));
    }
    tracing::debug!(collection, id, "Record deleted");
    Ok(())
}
