use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use herald_changes::{
    ChangeListener, ChangePublisher, InvalidationListener, MapChange, MapChangeBuilder,
};

/// A keyed collection that reports how it changed.
///
/// Replacing a value with an equal one publishes nothing; additions, removals
/// and value updates aggregate per batch with cancellation.
#[derive(Debug)]
pub struct ObservableMap<K: Clone + Eq + Hash, V: Clone + PartialEq> {
    items: Mutex<HashMap<K, V>>,
    publisher: ChangePublisher<MapChangeBuilder<K, V>>,
}

impl<K: Clone + Eq + Hash, V: Clone + PartialEq> Default for ObservableMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash, V: Clone + PartialEq> From<HashMap<K, V>> for ObservableMap<K, V> {
    fn from(items: HashMap<K, V>) -> Self {
        Self {
            items: Mutex::new(items),
            publisher: ChangePublisher::new(),
        }
    }
}

impl<K: Clone + Eq + Hash, V: Clone + PartialEq> ObservableMap<K, V> {
    pub fn new() -> Self {
        HashMap::new().into()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.items.lock().contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.items.lock().get(key).cloned()
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.items.lock().clone()
    }

    /// Maps `key` to `value`, returning the previous value.
    ///
    /// A fresh key is reported as an addition, a changed value as an update,
    /// and an unchanged value not at all.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self.items.lock().insert(key.clone(), value.clone());

        match &previous {
            Some(old) if *old == value => {}
            Some(old) => {
                let frame = self.publisher.begin_change();
                frame.log_update(key, old.clone(), value);
            }
            None => {
                let frame = self.publisher.begin_change();
                frame.log_add(key, value);
            }
        }

        previous
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.items.lock().remove(key);

        if let Some(value) = &removed {
            let frame = self.publisher.begin_change();
            frame.log_remove(key.clone(), value.clone());
        }

        removed
    }

    /// Inserts all `entries`, as a single batch.
    pub fn extend(&self, entries: impl IntoIterator<Item = (K, V)>) {
        let _frame = self.publisher.begin_change();
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Removes all entries, as a single batch.
    pub fn clear(&self) {
        let removed: Vec<(K, V)> = {
            let mut items = self.items.lock();
            items.drain().collect()
        };
        if removed.is_empty() {
            return;
        }

        let frame = self.publisher.begin_change();
        for (key, value) in removed {
            frame.log_remove(key, value);
        }
    }

    /// Runs `f` as one batch: every mutation performed inside is published as
    /// a single change.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _frame = self.publisher.begin_change();
        f(self)
    }

    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener<MapChange<K, V>>>) -> bool {
        self.publisher.add_change_listener(listener)
    }

    pub fn remove_change_listener(
        &self,
        listener: &Arc<dyn ChangeListener<MapChange<K, V>>>,
    ) -> bool {
        self.publisher.remove_change_listener(listener)
    }

    pub fn add_invalidation_listener(&self, listener: Arc<dyn InvalidationListener>) -> bool {
        self.publisher.add_invalidation_listener(listener)
    }

    pub fn remove_invalidation_listener(&self, listener: &Arc<dyn InvalidationListener>) -> bool {
        self.publisher.remove_invalidation_listener(listener)
    }
}
