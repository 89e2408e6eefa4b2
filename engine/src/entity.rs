//! Capabilities a local entity must provide to take part in synchronization.

use crate::{Record, SyncState, UNASSIGNED_ID};

/// A locally persisted object that corresponds one-to-one with a remote record.
///
/// Implementors own the conversion between their typed fields and a
/// [`Record`]. The engine never inspects fields directly.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Build an entity from a record whose identifier, if any, lives under
    /// `id_key`.
    ///
    /// Returns `None` when required fields are missing. A record carrying an
    /// identifier comes from the remote store, so the entity should start out
    /// [`SyncState::Synced`], with its snapshot memory (if any) seeded from
    /// `record`. Without an identifier it starts [`SyncState::Dirty`] and
    /// reports [`UNASSIGNED_ID`]. Entities with a fixed schema may ignore
    /// `id_key`, in which case the resource must be configured with the key
    /// they use.
    fn from_record(record: &Record, id_key: &str) -> Option<Self>;

    /// The identifier, or [`UNASSIGNED_ID`] before the first round-trip.
    fn id(&self) -> &str;

    /// Record projection of the entity. The identifier is omitted while
    /// unassigned.
    fn to_record(&self) -> Record;

    /// Fold remote-confirmed values into the entity.
    ///
    /// Only called with data that came back from a successful remote call.
    /// Must leave the entity [`SyncState::Synced`] and, for [`Patchable`]
    /// entities, overwrite the snapshot memory with the resulting record.
    fn update(&mut self, record: &Record);

    fn sync_state(&self) -> SyncState;

    fn set_sync_state(&mut self, state: SyncState);

    /// Whether the remote store has confirmed the current state.
    fn is_synchronized(&self) -> bool {
        self.sync_state().is_synchronized()
    }

    fn set_synchronized(&mut self, synchronized: bool) {
        let state = if synchronized {
            SyncState::Synced
        } else {
            SyncState::Dirty
        };
        self.set_sync_state(state);
    }

    /// Whether the remote store has assigned an identifier.
    fn is_identified(&self) -> bool {
        self.id() != UNASSIGNED_ID
    }
}

/// An entity that remembers its last synchronized record, so partial
/// updates can send only what changed.
pub trait Patchable: Entity {
    /// Record captured after the last successful synchronization.
    fn snapshot(&self) -> &Record;

    /// Overwrite the snapshot memory. Never merged.
    fn set_snapshot(&mut self, snapshot: Record);
}
