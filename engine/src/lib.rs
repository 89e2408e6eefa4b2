//! # Tidewater Engine
//!
//! Keeps a locally persisted collection of records eventually consistent with
//! a remote collection that is only reachable through request/response calls,
//! while sending as little data as possible.
//!
//! ## Core Concepts
//!
//! ### Records and entities
//!
//! A [`Record`] is a string-keyed map of JSON values. Local objects implement
//! [`Entity`] to convert to and from records and to carry a [`SyncState`].
//! Entities that also implement [`Patchable`] remember the record of their last
//! synchronization, which makes partial updates possible.
//!
//! ### Stores
//!
//! - [`LocalStore`]: create, search, update and delete of entities, with bulk
//!   creation committed in batches. [`MemoryStore`] is the in-memory version.
//! - [`RemoteStore`]: a single `request(method, path, parameters, headers)`
//!   primitive. [`Resource`] addresses one remote collection through it and
//!   [`HttpRemote`] speaks it over HTTP.
//!
//! ### Diff and merge
//!
//! [`transform::merge`] overlays one record on another and
//! [`transform::difference`] computes the minimal change between two records.
//! Arrays are never diffed.
//!
//! ### Synchronization
//!
//! The [`Synchronizer`] pushes local changes, pulls the remote snapshot,
//! reconciles it into the local store, and sweeps entities the remote no
//! longer has. The [`Repository`] combines both stores for single-entity
//! create, update, patch and delete.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidewater_engine::{
//!     Document, HttpConfig, HttpRemote, MemoryStore, Repository, SyncConfig,
//! };
//! use serde_json::json;
//!
//! # async fn run() -> tidewater_engine::error::Result<()> {
//! let local = Arc::new(MemoryStore::<Document>::new());
//! let remote = Arc::new(HttpRemote::new(HttpConfig::new("http://localhost:3000"))?);
//! let users = Repository::new(local, remote, SyncConfig::new("users"));
//!
//! let record = json!({"firstName": "Ada"}).as_object().cloned().unwrap();
//! let ada = users.create(record).await?;
//!
//! let report = users.synchronize().await?;
//! println!("{} created, {} deleted", report.created, report.deleted);
//! # let _ = ada;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod entity;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod index;
pub mod patch;
pub mod record;
pub mod remote;
pub mod repository;
pub mod store;
pub mod sync;
pub mod transform;

// Re-export main types at crate root
pub use config::{SyncConfig, DEFAULT_BATCH_SIZE};
pub use document::Document;
pub use entity::{Entity, Patchable};
pub use error::Error;
#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpRemote};
pub use index::KeyedIndex;
pub use record::{record_id, Record, SyncState, DEFAULT_ID_KEY, UNASSIGNED_ID};
pub use remote::{Headers, Method, RemoteStore, Resource};
pub use repository::Repository;
pub use store::{LocalStore, MemoryStore, ObjectKey, Predicate, Stored};
pub use sync::{SyncReport, Synchronizer};
