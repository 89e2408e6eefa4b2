//! Bidirectional synchronization between the local and the remote store.
//!
//! A full run goes through six phases, strictly in order. The first failure
//! aborts the run and is returned as is.
//!
//! 1. **Push**: every entity not synchronized is sent in one bulk upsert and
//!    the response is folded back position by position.
//! 2. **Unsynchronize**: every local entity is staged as unconfirmed.
//! 3. **Pull**: the remote collection is fetched. If that fails, the staging
//!    of phase 2 is undone before the error is returned, so a transient
//!    failure can never feed the sweep.
//! 4. **Match**: local entities whose identifier was pulled are updated from
//!    their remote record, which confirms them.
//! 5. **Create**: pulled records no local entity claimed become new entities.
//! 6. **Sweep**: whatever is still unconfirmed was removed remotely and is
//!    deleted locally.
//!
//! Conflicts resolve as local wins on push, remote wins on pull.
//!
//! Runs against the same local store must not overlap; the synchronizer holds
//! no lock of its own.

use crate::{
    error::Result, index::KeyedIndex, Entity, LocalStore, Predicate, Record, RemoteStore,
    Resource, Stored, SyncState,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// What a synchronization run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Entities sent in the push phase
    pub pushed: usize,
    /// Local entities confirmed and updated by the pull
    pub updated: usize,
    /// Pulled records handed to the local store as new entities
    pub created: usize,
    /// Local entities removed by the sweep
    pub deleted: usize,
}

/// Entities staged by the unsynchronize phase, with the state each had before.
struct Staged<E> {
    entities: Vec<Stored<E>>,
    prior: Vec<SyncState>,
}

/// Drives synchronization of one resource.
pub struct Synchronizer<L, R> {
    local: Arc<L>,
    resource: Resource<R>,
}

impl<L, R> Clone for Synchronizer<L, R> {
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            resource: self.resource.clone(),
        }
    }
}

impl<L, R> Synchronizer<L, R>
where
    L: LocalStore,
    R: RemoteStore,
{
    pub fn new(local: Arc<L>, resource: Resource<R>) -> Self {
        Self { local, resource }
    }

    /// Run all six phases, pulling the whole remote collection.
    pub async fn synchronize(&self) -> Result<SyncReport> {
        self.synchronize_with(self.resource.search()).await
    }

    /// Run all six phases with a custom remote search.
    ///
    /// `search` is only awaited once the push and staging phases are done.
    pub async fn synchronize_with<S>(&self, search: S) -> Result<SyncReport>
    where
        S: Future<Output = Result<Vec<Record>>>,
    {
        let pushed = self.push().await?;
        let mut report = self.pull_with(search).await?;
        report.pushed = pushed;
        report.deleted = self.sweep().await?;

        tracing::info!(
            path = %self.resource.config().path,
            pushed = report.pushed,
            updated = report.updated,
            created = report.created,
            deleted = report.deleted,
            "Synchronization finished"
        );
        Ok(report)
    }

    /// Push phase: upsert every entity that is not synchronized.
    ///
    /// Returns the number of entities sent.
    pub async fn push(&self) -> Result<usize> {
        let mut pending = self
            .local
            .search(Some(Predicate::Synchronized(false)))
            .await?;
        if pending.is_empty() {
            tracing::debug!("Nothing to push");
            return Ok(0);
        }

        let records = pending.iter().map(|entity| entity.to_record()).collect();
        let confirmed = self.resource.bulk_upsert(records).await?;
        if confirmed.len() != pending.len() {
            tracing::warn!(
                sent = pending.len(),
                received = confirmed.len(),
                "Bulk upsert response does not line up with the request"
            );
        }

        for (entity, record) in pending.iter_mut().zip(&confirmed) {
            entity.update(record);
        }

        let pushed = pending.len();
        self.local.update_many(pending).await?;
        tracing::debug!(pushed, "Push phase done");
        Ok(pushed)
    }

    /// Phases 2 to 5 against the whole remote collection, without the sweep.
    pub async fn pull(&self) -> Result<SyncReport> {
        self.pull_with(self.resource.search()).await
    }

    /// Phases 2 to 5 with a custom remote search, without the sweep.
    ///
    /// Entities the search does not return are left unconfirmed until the
    /// next [`Synchronizer::sweep`] or full run.
    pub async fn pull_with<S>(&self, search: S) -> Result<SyncReport>
    where
        S: Future<Output = Result<Vec<Record>>>,
    {
        let staged = self.unsynchronize().await?;

        let records = match search.await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "Pull failed, restoring staged entities");
                self.restore(staged).await;
                return Err(err);
            }
        };

        self.reconcile(records).await
    }

    /// Phases 4 and 5: fold pulled records into the local store.
    pub async fn reconcile(&self, records: Vec<Record>) -> Result<SyncReport> {
        let mut index = KeyedIndex::build(&records, &self.resource.config().id_key);
        let mut report = SyncReport::default();

        if !index.is_empty() {
            let candidates = self
                .local
                .search(Some(Predicate::IdIn(index.ids())))
                .await?;

            let mut matched = Vec::with_capacity(candidates.len());
            for mut entity in candidates {
                if let Some(position) = index.claim(entity.id()) {
                    entity.update(&records[position]);
                    matched.push(entity);
                }
            }

            report.updated = matched.len();
            if !matched.is_empty() {
                self.local.update_many(matched).await?;
            }
        }

        let unclaimed: HashSet<usize> = index.unclaimed().into_iter().collect();
        let fresh: Vec<Record> = records
            .into_iter()
            .enumerate()
            .filter_map(|(position, record)| unclaimed.contains(&position).then_some(record))
            .collect();

        report.created = fresh.len();
        if !fresh.is_empty() {
            self.local
                .create_many(fresh, &self.resource.config().id_key)
                .await?;
        }

        tracing::debug!(
            updated = report.updated,
            created = report.created,
            "Reconciled pulled records"
        );
        Ok(report)
    }

    /// Sweep phase: delete every entity that is not synchronized.
    ///
    /// Returns the number of entities deleted.
    pub async fn sweep(&self) -> Result<usize> {
        let stale = self
            .local
            .search(Some(Predicate::Synchronized(false)))
            .await?;
        let deleted = stale.len();
        if deleted > 0 {
            self.local.delete_many(stale).await?;
        }
        tracing::debug!(deleted, "Sweep phase done");
        Ok(deleted)
    }

    async fn unsynchronize(&self) -> Result<Staged<L::Entity>> {
        let mut entities = self.local.search(None).await?;
        let prior = entities.iter().map(|entity| entity.sync_state()).collect();
        for entity in entities.iter_mut() {
            entity.set_sync_state(SyncState::Unconfirmed);
        }

        let entities = self.local.update_many(entities).await?;
        Ok(Staged { entities, prior })
    }

    async fn restore(&self, staged: Staged<L::Entity>) {
        let Staged {
            mut entities,
            prior,
        } = staged;
        for (entity, state) in entities.iter_mut().zip(prior) {
            entity.set_sync_state(state);
        }

        if let Err(err) = self.local.update_many(entities).await {
            tracing::error!(error = %err, "Failed to restore entities after pull failure");
        }
    }
}
