//! Identifier index over a batch of remote records.
//!
//! Built once per reconciliation pass, consumed while local entities are
//! matched, then dropped.

use crate::{record::record_id, Record};
use std::collections::HashMap;

/// Maps identifiers to positions in a slice of records.
#[derive(Debug, Clone, Default)]
pub struct KeyedIndex {
    positions: HashMap<String, usize>,
}

impl KeyedIndex {
    /// Index `records` by the value of `key`.
    ///
    /// Records without a usable identifier are skipped. When an identifier
    /// repeats, the last position wins.
    pub fn build(records: &[Record], key: &str) -> Self {
        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if let Some(id) = record_id(record, key) {
                positions.insert(id, position);
            }
        }
        Self { positions }
    }

    /// Position of the record carrying `id`, if it has not been claimed yet.
    pub fn get(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Remove `id` from the index, returning its position.
    ///
    /// Claimed identifiers no longer show up in [`KeyedIndex::unclaimed`].
    pub fn claim(&mut self, id: &str) -> Option<usize> {
        self.positions.remove(id)
    }

    /// Identifiers still present in the index.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.positions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Positions never claimed, in input order.
    pub fn unclaimed(&self) -> Vec<usize> {
        let mut positions: Vec<_> = self.positions.values().copied().collect();
        positions.sort_unstable();
        positions
    }

    /// Split `ids` into those matched by the index (with their positions)
    /// and those with no corresponding record.
    pub fn partition<'a, I>(&self, ids: I) -> (Vec<(&'a str, usize)>, Vec<&'a str>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for id in ids {
            match self.get(id) {
                Some(position) => matched.push((id, position)),
                None => unmatched.push(id),
            }
        }
        (matched, unmatched)
    }

    /// Number of identifiers in the index.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the index holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
