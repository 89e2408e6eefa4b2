//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tidewater_engine::{
    error::Result, record_id, Entity, Headers, Method, Record, RemoteStore, SyncState,
    DEFAULT_ID_KEY, UNASSIGNED_ID,
};

/// A request received by [`MockRemote`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub parameters: Option<Record>,
}

type Responder = Box<dyn Fn(&Call) -> Result<Value> + Send + Sync>;

/// Remote store that records every request and answers through a closure.
pub struct MockRemote {
    calls: Mutex<Vec<Call>>,
    responder: Responder,
}

impl MockRemote {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&Call) -> Result<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Answer every request with the same value.
    pub fn answering(value: Value) -> Arc<Self> {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Fail every request with the same error.
    pub fn failing(err: tidewater_engine::Error) -> Arc<Self> {
        Self::new(move |_| Err(err.clone()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        parameters: Option<&Record>,
        _headers: Option<&Headers>,
    ) -> Result<Value> {
        let call = Call {
            method,
            path: path.to_string(),
            parameters: parameters.cloned(),
        };
        self.calls.lock().unwrap().push(call.clone());
        (self.responder)(&call)
    }
}

/// Typed entity with one required field and a fixed `_id` identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub state: SyncState,
}

impl Entity for User {
    fn from_record(record: &Record, _id_key: &str) -> Option<Self> {
        let first_name = record.get("firstName")?.as_str()?.to_string();
        let last_name = record
            .get("lastName")
            .and_then(Value::as_str)
            .map(str::to_string);

        let (id, state) = match record_id(record, DEFAULT_ID_KEY) {
            Some(id) => (id, SyncState::Synced),
            None => (UNASSIGNED_ID.to_string(), SyncState::Dirty),
        };

        Some(Self {
            id,
            first_name,
            last_name,
            state,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        if self.is_identified() {
            record.insert(DEFAULT_ID_KEY.into(), Value::String(self.id.clone()));
        }
        record.insert("firstName".into(), Value::String(self.first_name.clone()));
        if let Some(last_name) = &self.last_name {
            record.insert("lastName".into(), Value::String(last_name.clone()));
        }
        record
    }

    fn update(&mut self, record: &Record) {
        if let Some(id) = record_id(record, DEFAULT_ID_KEY) {
            self.id = id;
        }
        if let Some(first_name) = record.get("firstName").and_then(Value::as_str) {
            self.first_name = first_name.to_string();
        }
        if let Some(last_name) = record.get("lastName").and_then(Value::as_str) {
            self.last_name = Some(last_name.to_string());
        }
        self.state = SyncState::Synced;
    }

    fn sync_state(&self) -> SyncState {
        self.state
    }

    fn set_sync_state(&mut self, state: SyncState) {
        self.state = state;
    }
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("test record must be an object")
}
