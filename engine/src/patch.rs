//! Partial updates.
//!
//! A patch carries only the fields that changed since the entity's snapshot
//! memory was last refreshed, plus `null` for fields that were cleared.

use crate::{
    error::Result,
    transform::{difference, merge},
    Error, Patchable, Record, RemoteStore, Resource,
};

/// Payload of the partial update for `entity`, or `None` when nothing
/// changed since the last synchronization.
pub fn compute<E: Patchable>(entity: &E) -> Option<Record> {
    let diff = difference(entity.snapshot(), &entity.to_record());
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

/// Send the partial update of `entity` to the remote store.
///
/// When nothing changed the entity is handed back untouched and no request is
/// made. An entity without a remote identifier fails with
/// [`Error::Unidentifiable`]. Otherwise the response is merged over the
/// entity's full record, folded back with [`crate::Entity::update`], and the
/// snapshot memory is overwritten with the result.
pub async fn patch<E, R>(resource: &Resource<R>, mut entity: E) -> Result<E>
where
    E: Patchable,
    R: RemoteStore,
{
    let Some(diff) = compute(&entity) else {
        tracing::debug!(id = entity.id(), "Patch skipped, nothing changed");
        return Ok(entity);
    };
    if !entity.is_identified() {
        return Err(Error::Unidentifiable(resource.config().id_key.clone()));
    }

    tracing::debug!(id = entity.id(), fields = diff.len(), "Sending patch");
    let response = resource.patch(entity.id(), &diff).await?;
    let merged = merge(&entity.to_record(), &response);

    entity.update(&merged);
    entity.set_snapshot(entity.to_record());
    Ok(entity)
}
