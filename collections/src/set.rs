use std::{collections::HashSet, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use herald_changes::{
    ChangeListener, ChangePublisher, InvalidationListener, SetChange, SetChangeBuilder,
};

/// An unordered collection of unique elements that reports how it changed.
///
/// Mutations that do not modify the set publish nothing; additions and
/// removals that cancel out within one batch are never reported.
#[derive(Debug)]
pub struct ObservableSet<T: Clone + Eq + Hash> {
    items: Mutex<HashSet<T>>,
    publisher: ChangePublisher<SetChangeBuilder<T>>,
}

impl<T: Clone + Eq + Hash> Default for ObservableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> From<HashSet<T>> for ObservableSet<T> {
    fn from(items: HashSet<T>) -> Self {
        Self {
            items: Mutex::new(items),
            publisher: ChangePublisher::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> ObservableSet<T> {
    pub fn new() -> Self {
        HashSet::new().into()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.items.lock().contains(element)
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> HashSet<T> {
        self.items.lock().clone()
    }

    /// Adds `element`. Returns whether the set was modified.
    pub fn insert(&self, element: T) -> bool {
        let inserted = self.items.lock().insert(element.clone());
        if inserted {
            let frame = self.publisher.begin_change();
            frame.log_add(element);
        }
        inserted
    }

    /// Removes `element`. Returns whether the set was modified.
    pub fn remove(&self, element: &T) -> bool {
        let removed = self.items.lock().take(element);
        match removed {
            Some(element) => {
                let frame = self.publisher.begin_change();
                frame.log_remove(element);
                true
            }
            None => false,
        }
    }

    /// Adds all `elements`, as a single batch.
    pub fn extend(&self, elements: impl IntoIterator<Item = T>) {
        let _frame = self.publisher.begin_change();
        for element in elements {
            self.insert(element);
        }
    }

    /// Removes all elements, as a single batch.
    pub fn clear(&self) {
        let removed: Vec<T> = {
            let mut items = self.items.lock();
            items.drain().collect()
        };
        if removed.is_empty() {
            return;
        }

        let frame = self.publisher.begin_change();
        for element in removed {
            frame.log_remove(element);
        }
    }

    /// Runs `f` as one batch: every mutation performed inside is published as
    /// a single change.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _frame = self.publisher.begin_change();
        f(self)
    }

    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener<SetChange<T>>>) -> bool {
        self.publisher.add_change_listener(listener)
    }

    pub fn remove_change_listener(&self, listener: &Arc<dyn ChangeListener<SetChange<T>>>) -> bool {
        self.publisher.remove_change_listener(listener)
    }

    pub fn add_invalidation_listener(&self, listener: Arc<dyn InvalidationListener>) -> bool {
        self.publisher.add_invalidation_listener(listener)
    }

    pub fn remove_invalidation_listener(&self, listener: &Arc<dyn InvalidationListener>) -> bool {
        self.publisher.remove_invalidation_listener(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_an_addition() {
        let set = ObservableSet::new();
        let changes = record(&set);

        assert!(set.insert("a"));

        let recorded = changes.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].added, HashSet::from(["a"]));
        assert!(recorded[0].removed.is_empty());
    }

    #[test]
    fn redundant_insert_publishes_nothing() {
        let set = ObservableSet::new();
        set.insert("a");
        let changes = record(&set);

        assert!(!set.insert("a"));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn removing_an_absent_element_publishes_nothing() {
        let set: ObservableSet<&str> = ObservableSet::new();
        let changes = record(&set);

        assert!(!set.remove(&"a"));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn batched_insert_and_remove_cancel() {
        let set = ObservableSet::new();
        let changes = record(&set);

        set.batch(|set| {
            set.insert("a");
            set.remove(&"a");
        });

        assert!(!set.contains(&"a"));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn batched_remove_and_reinsert_cancel() {
        let set = ObservableSet::new();
        set.insert("a");
        let changes = record(&set);

        set.batch(|set| {
            set.remove(&"a");
            set.insert("a");
        });

        assert!(set.contains(&"a"));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn clear_reports_all_removals_at_once() {
        let set = ObservableSet::new();
        set.extend(["a", "b"]);
        let changes = record(&set);

        set.clear();

        assert!(set.is_empty());
        let recorded = changes.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].removed, HashSet::from(["a", "b"]));
    }

    fn record(set: &ObservableSet<&'static str>) -> Arc<Mutex<Vec<SetChange<&'static str>>>> {
        let changes: Arc<Mutex<Vec<SetChange<&'static str>>>> = Arc::default();
        {
            let changes = changes.clone();
            set.add_change_listener(Arc::new(move |change: &SetChange<&'static str>| {
                changes.lock().push(change.clone())
            }));
        }
        changes
    }
}
