//! Create, update and delete across both stores.
//!
//! The local store is always written first on the way in and last on the way
//! out. When the remote call fails the local copy is kept as it is and the
//! next synchronization run settles it; nothing is rolled back here.

use crate::{
    error::Result,
    patch,
    sync::{SyncReport, Synchronizer},
    Entity, Error, LocalStore, Patchable, Predicate, Record, RemoteStore, Resource, Stored,
    SyncConfig, SyncState,
};
use std::sync::Arc;

/// A resource kept in both the local and the remote store.
pub struct Repository<L, R> {
    local: Arc<L>,
    resource: Resource<R>,
}

impl<L, R> Clone for Repository<L, R> {
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            resource: self.resource.clone(),
        }
    }
}

type StoredEntity<L> = Stored<<L as LocalStore>::Entity>;

impl<L, R> Repository<L, R>
where
    L: LocalStore,
    R: RemoteStore,
{
    pub fn new(local: Arc<L>, remote: Arc<R>, config: SyncConfig) -> Self {
        Self {
            local,
            resource: Resource::new(remote, config),
        }
    }

    pub fn local(&self) -> &Arc<L> {
        &self.local
    }

    pub fn resource(&self) -> &Resource<R> {
        &self.resource
    }

    /// Synchronizer sharing this repository's stores.
    pub fn synchronizer(&self) -> Synchronizer<L, R> {
        Synchronizer::new(Arc::clone(&self.local), self.resource.clone())
    }

    /// Run a full synchronization.
    pub async fn synchronize(&self) -> Result<SyncReport> {
        self.synchronizer().synchronize().await
    }

    /// Create locally, then remotely, then fold the remote-assigned fields
    /// back into the local copy.
    ///
    /// If the remote call fails the entity stays in the local store,
    /// unsynchronized, and the error is returned.
    pub async fn create(&self, record: Record) -> Result<StoredEntity<L>> {
        let mut entity = self
            .local
            .create(record, &self.resource.config().id_key)
            .await?;

        let confirmed = self.resource.create(&entity.to_record()).await?;
        entity.update(&confirmed);

        self.local.update(entity).await
    }

    /// All local entities.
    pub async fn search(&self) -> Result<Vec<StoredEntity<L>>> {
        self.local.search(None).await
    }

    /// Local entities matching `predicate`.
    pub async fn search_where(&self, predicate: Predicate) -> Result<Vec<StoredEntity<L>>> {
        self.local.search(Some(predicate)).await
    }

    /// The local entity carrying `id`, if any.
    pub async fn find(&self, id: &str) -> Result<Option<StoredEntity<L>>> {
        let found = self
            .local
            .search(Some(Predicate::IdEquals(id.to_string())))
            .await?;
        Ok(found.into_iter().next())
    }

    /// Save the local mutation, send the full record, then save again with
    /// whatever the remote store added.
    ///
    /// The first save keeps the change even when the remote call fails; the
    /// entity is then left dirty for the next push.
    pub async fn update(&self, entity: StoredEntity<L>) -> Result<StoredEntity<L>> {
        let mut entity = entity;
        entity.set_sync_state(SyncState::Dirty);
        let mut entity = self.local.update(entity).await?;

        let confirmed = self.resource.update(&entity.to_record()).await?;
        entity.update(&confirmed);

        self.local.update(entity).await
    }

    /// Delete remotely, then locally.
    ///
    /// If the remote call fails the local entity is kept.
    pub async fn delete(&self, entity: StoredEntity<L>) -> Result<()> {
        self.resource.delete(&entity.to_record()).await?;
        self.local.delete(entity).await
    }
}

impl<L, R> Repository<L, R>
where
    L: LocalStore,
    L::Entity: Patchable,
    R: RemoteStore,
{
    /// Send only what changed since the last synchronization.
    ///
    /// An unchanged entity is returned as is without touching either store.
    /// An entity the remote store never identified cannot be patched; push
    /// it with [`Repository::synchronize`] or [`Repository::update`] first.
    pub async fn patch(&self, entity: StoredEntity<L>) -> Result<StoredEntity<L>> {
        if patch::compute(&*entity).is_none() {
            tracing::debug!(id = entity.id(), "Patch skipped, nothing changed");
            return Ok(entity);
        }
        if !entity.is_identified() {
            return Err(Error::Unidentifiable(self.resource.config().id_key.clone()));
        }

        let mut entity = entity;
        entity.set_sync_state(SyncState::Dirty);
        let entity = self.local.update(entity).await?;

        let key = entity.key();
        let patched = patch::patch(&self.resource, entity.into_inner()).await?;
        self.local.update(Stored::new(key, patched)).await
    }
}
