//! Remote store contract and resource addressing.

use crate::{error::Result, record::record_id, transform::merge, Error, Record, SyncConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// HTTP-style request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request headers.
pub type Headers = HashMap<String, String>;

/// The single primitive the engine needs from the remote store.
///
/// Timeouts and retries belong to the implementation.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        parameters: Option<&Record>,
        headers: Option<&Headers>,
    ) -> Result<Value>;
}

/// Cast a response to a single record.
pub fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(record) => Ok(record),
        _ => Err(Error::CastingFailed("record")),
    }
}

/// Cast a response to an array of records.
pub fn into_records(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(into_record)
            .collect::<Result<_>>()
            .map_err(|_| Error::CastingFailed("array of records")),
        _ => Err(Error::CastingFailed("array of records")),
    }
}

/// A collection of records on the remote store.
///
/// Every operation speaks plain records; turning them into entities is the
/// caller's business.
#[derive(Debug)]
pub struct Resource<R> {
    remote: Arc<R>,
    config: SyncConfig,
}

impl<R> Clone for Resource<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            config: self.config.clone(),
        }
    }
}

impl<R: RemoteStore> Resource<R> {
    pub fn new(remote: Arc<R>, config: SyncConfig) -> Self {
        Self { remote, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Identifier of `record` under the configured key.
    pub fn identify(&self, record: &Record) -> Result<String> {
        record_id(record, &self.config.id_key)
            .ok_or_else(|| Error::Unidentifiable(self.config.id_key.clone()))
    }

    /// POST `path`. Returns `record` merged with the response.
    pub async fn create(&self, record: &Record) -> Result<Record> {
        let response = self
            .remote
            .request(Method::Post, &self.config.path, Some(record), None)
            .await?;
        Ok(merge(record, &into_record(response)?))
    }

    /// GET `path/id`.
    pub async fn find(&self, id: &str) -> Result<Record> {
        let path = self.config.item_path(id);
        into_record(self.remote.request(Method::Get, &path, None, None).await?)
    }

    /// GET `path`.
    pub async fn search(&self) -> Result<Vec<Record>> {
        self.search_with(None).await
    }

    /// GET `path` with query parameters, e.g. a server-side filter.
    pub async fn search_with(&self, parameters: Option<&Record>) -> Result<Vec<Record>> {
        let response = self
            .remote
            .request(Method::Get, &self.config.path, parameters, None)
            .await?;
        into_records(response)
    }

    /// PUT `path/id` with the full record. Returns `record` merged with the
    /// response.
    pub async fn update(&self, record: &Record) -> Result<Record> {
        let id = self.identify(record)?;
        let path = self.config.item_path(&id);
        let response = self
            .remote
            .request(Method::Put, &path, Some(record), None)
            .await?;
        Ok(merge(record, &into_record(response)?))
    }

    /// PATCH `path/id` with a partial record. Returns the raw response.
    pub async fn patch(&self, id: &str, diff: &Record) -> Result<Record> {
        let path = self.config.item_path(id);
        into_record(self.remote.request(Method::Patch, &path, Some(diff), None).await?)
    }

    /// DELETE `path/id`.
    pub async fn delete(&self, record: &Record) -> Result<()> {
        let id = self.identify(record)?;
        let path = self.config.item_path(&id);
        self.remote.request(Method::Delete, &path, None, None).await?;
        Ok(())
    }

    /// POST `path/<bulk suffix>` with `{"data": records}`.
    ///
    /// The response is expected to line up position by position with
    /// `records`.
    pub async fn bulk_upsert(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut body = Record::new();
        body.insert(
            "data".to_string(),
            Value::Array(records.into_iter().map(Value::Object).collect()),
        );
        let response = self
            .remote
            .request(Method::Post, &self.config.bulk_path(), Some(&body), None)
            .await?;
        into_records(response)
    }
}
