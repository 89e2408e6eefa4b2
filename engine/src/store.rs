//! Local store contract and an in-memory implementation.
//!
//! The engine only needs the operations of [`LocalStore`]. How entities are
//! persisted is up to the implementation; [`MemoryStore`] keeps them in memory
//! and is what the engine's own tests run against.

use crate::{config::DEFAULT_BATCH_SIZE, error::Result, Entity, Error, Record};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store-assigned handle of a persisted entity.
///
/// Stays the same when the remote store assigns or changes the entity's
/// identifier.
pub type ObjectKey = u64;

/// An entity as held by a local store.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<E> {
    key: ObjectKey,
    entity: E,
}

impl<E> Stored<E> {
    /// Pair an entity with its object key. Only store implementations should
    /// need this.
    pub fn new(key: ObjectKey, entity: E) -> Self {
        Self { key, entity }
    }

    /// The store-assigned object key.
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Unwrap the entity.
    pub fn into_inner(self) -> E {
        self.entity
    }
}

impl<E> Deref for Stored<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E> DerefMut for Stored<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

/// Filters understood by every local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Identifier equals the value
    IdEquals(String),
    /// Identifier is one of the values
    IdIn(Vec<String>),
    /// Synchronized flag equals the value
    Synchronized(bool),
}

impl Predicate {
    /// Evaluate the predicate against an entity.
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Predicate::IdEquals(id) => entity.id() == id,
            Predicate::IdIn(ids) => ids.iter().any(|id| entity.id() == id),
            Predicate::Synchronized(flag) => entity.is_synchronized() == *flag,
        }
    }
}

/// Operations the engine requires from the local store.
///
/// Every call commits before it resolves, except [`LocalStore::create_many`]
/// which may commit in several steps.
#[async_trait]
pub trait LocalStore: Send + Sync {
    type Entity: Entity;

    /// Create one entity from a record identified under `id_key`.
    async fn create(&self, record: Record, id_key: &str) -> Result<Stored<Self::Entity>>;

    /// Create entities in bulk. Records that do not make a valid entity are
    /// skipped.
    async fn create_many(&self, records: Vec<Record>, id_key: &str) -> Result<()>;

    /// All entities matching `predicate`, or every entity for `None`.
    async fn search(&self, predicate: Option<Predicate>) -> Result<Vec<Stored<Self::Entity>>>;

    /// Persist the current state of an entity.
    async fn update(&self, entity: Stored<Self::Entity>) -> Result<Stored<Self::Entity>>;

    /// Persist several entities in one commit.
    async fn update_many(
        &self,
        entities: Vec<Stored<Self::Entity>>,
    ) -> Result<Vec<Stored<Self::Entity>>>;

    async fn delete(&self, entity: Stored<Self::Entity>) -> Result<()>;

    async fn delete_many(&self, entities: Vec<Stored<Self::Entity>>) -> Result<()>;
}

/// Errors raised by [`MemoryStore`], surfaced wrapped in [`Error::Other`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(ObjectKey),
}

#[derive(Debug)]
struct Inner<E> {
    objects: BTreeMap<ObjectKey, E>,
    next_key: ObjectKey,
    commits: usize,
}

impl<E> Inner<E> {
    fn insert(&mut self, entity: E) -> ObjectKey {
        let key = self.next_key;
        self.next_key += 1;
        self.objects.insert(key, entity);
        key
    }

    fn ensure_present(&self, key: ObjectKey) -> Result<()> {
        if self.objects.contains_key(&key) {
            Ok(())
        } else {
            Err(Error::other(StoreError::NotFound(key)))
        }
    }
}

/// An in-memory local store.
///
/// Cloning yields another handle to the same objects. Foreground operations
/// run under the store lock and count as one commit each; bulk creation runs
/// on a background task and commits every `batch_size` records.
#[derive(Debug)]
pub struct MemoryStore<E> {
    inner: Arc<Mutex<Inner<E>>>,
    batch_size: usize,
}

impl<E> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            batch_size: self.batch_size,
        }
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                objects: BTreeMap::new(),
                next_key: 1,
                commits: 0,
            })),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Commit bulk creations every `batch_size` records.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of commits performed so far.
    pub async fn commits(&self) -> usize {
        self.inner.lock().await.commits
    }

    /// Number of stored entities.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.objects.len()
    }

    /// Check if the store holds no entities.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.objects.is_empty()
    }
}

async fn commit_staged<E>(inner: &Mutex<Inner<E>>, staged: &mut Vec<E>) {
    if staged.is_empty() {
        return;
    }
    let mut inner = inner.lock().await;
    for entity in staged.drain(..) {
        inner.insert(entity);
    }
    inner.commits += 1;
}

#[async_trait]
impl<E: Entity> LocalStore for MemoryStore<E> {
    type Entity = E;

    async fn create(&self, record: Record, id_key: &str) -> Result<Stored<E>> {
        let entity = E::from_record(&record, id_key).ok_or(Error::InitializationFailed)?;
        let mut inner = self.inner.lock().await;
        let key = inner.insert(entity.clone());
        inner.commits += 1;
        Ok(Stored::new(key, entity))
    }

    async fn create_many(&self, records: Vec<Record>, id_key: &str) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let batch_size = self.batch_size;
        let id_key = id_key.to_string();

        let task = tokio::spawn(async move {
            let mut staged = Vec::with_capacity(batch_size.min(records.len()));
            for (i, record) in records.iter().enumerate() {
                match E::from_record(record, &id_key) {
                    Some(entity) => staged.push(entity),
                    None => tracing::warn!("Skipping record that does not make an entity"),
                }
                if (i + 1) % batch_size == 0 {
                    commit_staged(&inner, &mut staged).await;
                }
            }
            commit_staged(&inner, &mut staged).await;
        });

        task.await.map_err(Error::other)
    }

    async fn search(&self, predicate: Option<Predicate>) -> Result<Vec<Stored<E>>> {
        let inner = self.inner.lock().await;
        let found = inner
            .objects
            .iter()
            .filter(|(_, entity)| predicate.as_ref().map_or(true, |p| p.matches(*entity)))
            .map(|(key, entity)| Stored::new(*key, entity.clone()))
            .collect();
        Ok(found)
    }

    async fn update(&self, entity: Stored<E>) -> Result<Stored<E>> {
        let mut inner = self.inner.lock().await;
        inner.ensure_present(entity.key)?;
        inner.objects.insert(entity.key, entity.entity.clone());
        inner.commits += 1;
        Ok(entity)
    }

    async fn update_many(&self, entities: Vec<Stored<E>>) -> Result<Vec<Stored<E>>> {
        let mut inner = self.inner.lock().await;
        for entity in &entities {
            inner.ensure_present(entity.key)?;
        }
        for entity in &entities {
            inner.objects.insert(entity.key, entity.entity.clone());
        }
        inner.commits += 1;
        Ok(entities)
    }

    async fn delete(&self, entity: Stored<E>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_present(entity.key)?;
        inner.objects.remove(&entity.key);
        inner.commits += 1;
        Ok(())
    }

    async fn delete_many(&self, entities: Vec<Stored<E>>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for entity in &entities {
            inner.objects.remove(&entity.key);
        }
        inner.commits += 1;
        Ok(())
    }
}
