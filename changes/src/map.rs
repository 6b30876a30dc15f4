use std::{collections::HashMap, hash::Hash};

use crate::{ChangeAccumulator, ChangeFrame};

/// Replacement of a mapped value within one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueUpdate<V> {
    pub old: V,
    pub new: V,
}

/// The change reported for one batch of map mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapChange<K: Eq + Hash, V> {
    pub added: HashMap<K, V>,
    pub removed: HashMap<K, V>,
    pub updated: HashMap<K, ValueUpdate<V>>,
}

/// Running aggregation for keyed containers, with the same cancellation rules
/// as the set variant plus value-update tracking.
#[derive(Debug)]
pub struct MapChangeBuilder<K, V> {
    added: HashMap<K, V>,
    removed: HashMap<K, V>,
    updated: HashMap<K, ValueUpdate<V>>,
}

impl<K, V> Default for MapChangeBuilder<K, V> {
    fn default() -> Self {
        Self {
            added: HashMap::new(),
            removed: HashMap::new(),
            updated: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: PartialEq> MapChangeBuilder<K, V> {
    /// Logs the addition of a new entry.
    ///
    /// Logging an addition for a key that is pending as added or updated is a
    /// programming error; the container cannot add a key it still contains.
    pub fn log_add(&mut self, key: K, value: V) {
        assert!(
            !self.added.contains_key(&key),
            "internal error: key added twice within one batch"
        );
        assert!(
            !self.updated.contains_key(&key),
            "internal error: key added while an update is pending"
        );

        if self.removed.remove(&key).is_none() {
            self.added.insert(key, value);
        }
    }

    /// Logs the removal of an entry. A pending update for the key is
    /// discarded; removing an entry added within the same batch cancels the
    /// addition when the values match.
    pub fn log_remove(&mut self, key: K, value: V) {
        self.updated.remove(&key);

        if self.added.get(&key) == Some(&value) {
            self.added.remove(&key);
        } else {
            self.removed.insert(key, value);
        }
    }

    /// Logs the replacement of a mapped value. An update for a key added
    /// within the same batch rewrites the pending addition instead.
    pub fn log_update(&mut self, key: K, old: V, new: V) {
        assert!(
            !self.removed.contains_key(&key),
            "internal error: update logged for a removed key"
        );

        if let Some(pending) = self.added.get_mut(&key) {
            *pending = new;
            return;
        }
        self.updated.insert(key, ValueUpdate { old, new });
    }
}

impl<K: Eq + Hash, V> ChangeAccumulator for MapChangeBuilder<K, V> {
    type Change = MapChange<K, V>;

    fn finish(self) -> Option<MapChange<K, V>> {
        if self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty() {
            return None;
        }
        Some(MapChange {
            added: self.added,
            removed: self.removed,
            updated: self.updated,
        })
    }
}

impl<K: Eq + Hash, V: PartialEq> ChangeFrame<'_, MapChangeBuilder<K, V>> {
    pub fn log_add(&self, key: K, value: V) {
        self.with(|builder| builder.log_add(key, value))
    }

    pub fn log_remove(&self, key: K, value: V) {
        self.with(|builder| builder.log_remove(key, value))
    }

    pub fn log_update(&self, key: K, old: V, new: V) {
        self.with(|builder| builder.log_update(key, old, new))
    }
}
