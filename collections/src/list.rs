use std::{cmp::Ordering, hash::Hash, mem, sync::Arc};

use anyhow::{Result, bail};
use log::trace;
use parking_lot::Mutex;

use herald_changes::{
    ChangeFrame, ChangeListener, ChangePublisher, InvalidationListener, ListChange,
    ListChangeBuilder,
};

/// An ordered sequence that reports how it changed.
///
/// Every mutating operation batches its primitive changes and publishes one
/// [`ListChange`] when the outermost operation completes: a permutation for
/// pure reorderings, compressed insertion / removal / update runs otherwise.
#[derive(Debug)]
pub struct ObservableList<T: Clone + Eq + Hash> {
    items: Mutex<Vec<T>>,
    publisher: ChangePublisher<ListChangeBuilder<T>>,
}

impl<T: Clone + Eq + Hash> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> From<Vec<T>> for ObservableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
            publisher: ChangePublisher::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> ObservableList<T> {
    pub fn new() -> Self {
        Vec::new().into()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.lock().get(index).cloned()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.items.lock().contains(element)
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    /// Appends `element` at the end.
    pub fn push(&self, element: T) {
        let at = {
            let mut items = self.items.lock();
            items.push(element.clone());
            items.len() - 1
        };

        let frame = self.open_frame(-1);
        frame.log_insertion(at, [element]);
    }

    /// Inserts `element` before the element at `index`.
    pub fn insert(&self, index: usize, element: T) -> Result<()> {
        {
            let mut items = self.items.lock();
            if index > items.len() {
                bail!(
                    "invalid insertion index: {} (length: {})",
                    index,
                    items.len()
                );
            }
            items.insert(index, element.clone());
        }

        let frame = self.open_frame(-1);
        frame.log_insertion(index, [element]);
        Ok(())
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&self, index: usize) -> Result<T> {
        let removed = {
            let mut items = self.items.lock();
            if index >= items.len() {
                bail!("invalid removal index: {} (length: {})", index, items.len());
            }
            items.remove(index)
        };

        let frame = self.open_frame(1);
        frame.log_removal(index, [removed.clone()]);
        Ok(removed)
    }

    /// Replaces the element at `index`, returning the previous element.
    pub fn set(&self, index: usize, element: T) -> Result<T> {
        let old = {
            let mut items = self.items.lock();
            if index >= items.len() {
                bail!("invalid update index: {} (length: {})", index, items.len());
            }
            mem::replace(&mut items[index], element.clone())
        };

        let frame = self.open_frame(0);
        frame.log_update(index, [old.clone()], [element]);
        Ok(old)
    }

    /// Appends all `elements` at the end, as a single batch.
    pub fn extend(&self, elements: impl IntoIterator<Item = T>) {
        let elements: Vec<T> = elements.into_iter().collect();
        if elements.is_empty() {
            return;
        }

        let from = {
            let mut items = self.items.lock();
            let from = items.len();
            items.extend(elements.iter().cloned());
            from
        };

        let frame = self.open_frame(-(elements.len() as isize));
        frame.log_insertion(from, elements);
    }

    /// Removes all elements, as a single batch.
    pub fn clear(&self) {
        let removed = mem::take(&mut *self.items.lock());
        if removed.is_empty() {
            return;
        }

        let frame = self.open_frame(removed.len() as isize);
        frame.log_removal(0, removed);
    }

    /// Replaces the whole content. Returns `false` and publishes nothing when
    /// the new elements already equal the current content.
    pub fn set_all(&self, elements: Vec<T>) -> bool {
        if *self.items.lock() == elements {
            trace!("set_all skipped, contents already equal");
            return false;
        }

        let _frame = self.open_frame(0);
        self.clear();
        self.extend(elements);
        true
    }

    /// Sorts the list. A non-trivial reordering is published as a
    /// permutation.
    pub fn sort(&self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp)
    }

    /// Sorts the list with a comparator, stable with respect to equal
    /// elements.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
        let frame = self.open_frame(0);

        let (old, new) = {
            let mut items = self.items.lock();
            let old = items.clone();
            items.sort_by(compare);
            (old, items.clone())
        };

        frame.log_removal(0, old);
        frame.log_insertion(0, new);
    }

    /// Runs `f` as one batch: every mutation performed inside is published as
    /// a single change.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _frame = self.open_frame(0);
        f(self)
    }

    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener<ListChange<T>>>) -> bool {
        self.publisher.add_change_listener(listener)
    }

    pub fn remove_change_listener(
        &self,
        listener: &Arc<dyn ChangeListener<ListChange<T>>>,
    ) -> bool {
        self.publisher.remove_change_listener(listener)
    }

    pub fn add_invalidation_listener(&self, listener: Arc<dyn InvalidationListener>) -> bool {
        self.publisher.add_invalidation_listener(listener)
    }

    pub fn remove_invalidation_listener(&self, listener: &Arc<dyn InvalidationListener>) -> bool {
        self.publisher.remove_invalidation_listener(listener)
    }

    /// Opens the list's change frame. When the frame materializes here, the
    /// only mutation not yet logged is the caller's own; `len_adjustment`
    /// undoes it to recover the length at the start of the batch.
    fn open_frame(&self, len_adjustment: isize) -> ChangeFrame<'_, ListChangeBuilder<T>> {
        self.publisher.begin_change_with(|| {
            let initial_len = self
                .items
                .lock()
                .len()
                .checked_add_signed(len_adjustment)
                .expect("internal error: implausible batch length adjustment");
            ListChangeBuilder::new(initial_len)
        })
    }
}

#[cfg(test)]
mod tests {
    use herald_changes::LocalChange;

    use super::*;

    #[test]
    fn push_reports_an_insertion() {
        let list = list(&["a"]);
        let changes = record(&list);

        list.push("b".to_string());

        assert_eq!(
            *changes.lock(),
            [ListChange::Local(vec![LocalChange::Insertion {
                index: 1,
                elements: owned(&["b"]),
            }])]
        );
    }

    #[test]
    fn set_reports_an_update() {
        let list = list(&["a", "b", "c", "d"]);
        let changes = record(&list);

        let old = list.set(1, "x".to_string()).unwrap();

        assert_eq!(old, "b");
        assert_eq!(list.snapshot(), owned(&["a", "x", "c", "d"]));
        assert_eq!(
            *changes.lock(),
            [ListChange::Local(vec![LocalChange::Update {
                index: 1,
                old: owned(&["b"]),
                new: owned(&["x"]),
            }])]
        );
    }

    #[test]
    fn batched_move_reports_a_permutation() {
        let list = list(&["a", "b", "c"]);
        let changes = record(&list);

        list.batch(|list| {
            let tail = list.remove(2).unwrap();
            list.insert(0, tail).unwrap();
        });

        assert_eq!(list.snapshot(), owned(&["c", "a", "b"]));
        assert_eq!(*changes.lock(), [ListChange::Permutation(vec![1, 2, 0])]);
    }

    #[test]
    fn sort_reports_a_permutation() {
        let list = list(&["foo", "bar", "blub", "dup"]);
        let changes = record(&list);

        list.sort();

        assert_eq!(list.snapshot(), owned(&["bar", "blub", "dup", "foo"]));
        assert_eq!(*changes.lock(), [ListChange::Permutation(vec![3, 0, 1, 2])]);
    }

    #[test]
    fn sorting_a_sorted_list_publishes_nothing() {
        let list = list(&["a", "b", "c"]);
        let changes = record(&list);

        list.sort();

        assert!(changes.lock().is_empty());
    }

    #[test]
    fn clear_reports_one_removal_run() {
        let list = list(&["a", "b", "c"]);
        let changes = record(&list);

        list.clear();

        assert!(list.is_empty());
        assert_eq!(
            *changes.lock(),
            [ListChange::Local(vec![LocalChange::Removal {
                index: 0,
                elements: owned(&["a", "b", "c"]),
            }])]
        );
    }

    #[test]
    fn extend_reports_one_insertion_run() {
        let list = list(&["a"]);
        let changes = record(&list);

        list.extend(owned(&["b", "c"]));

        assert_eq!(
            *changes.lock(),
            [ListChange::Local(vec![LocalChange::Insertion {
                index: 1,
                elements: owned(&["b", "c"]),
            }])]
        );
    }

    #[test]
    fn set_all_with_equal_contents_publishes_nothing() {
        let list = list(&["a", "b"]);
        let changes = record(&list);

        assert!(!list.set_all(owned(&["a", "b"])));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn set_all_reports_one_change() {
        let list = list(&["a", "b"]);
        let changes = record(&list);

        assert!(list.set_all(owned(&["d", "e", "f"])));

        assert_eq!(list.snapshot(), owned(&["d", "e", "f"]));
        assert_eq!(
            *changes.lock(),
            [ListChange::Local(vec![
                LocalChange::Removal {
                    index: 0,
                    elements: owned(&["a", "b"]),
                },
                LocalChange::Insertion {
                    index: 0,
                    elements: owned(&["d", "e", "f"]),
                },
            ])]
        );
    }

    #[test]
    fn set_all_with_reordered_contents_reports_a_permutation() {
        let list = list(&["a", "b", "c"]);
        let changes = record(&list);

        assert!(list.set_all(owned(&["c", "a", "b"])));
        assert_eq!(*changes.lock(), [ListChange::Permutation(vec![1, 2, 0])]);
    }

    #[test]
    fn insert_rejects_an_out_of_range_index() {
        let list = list(&["a"]);
        let changes = record(&list);

        assert!(list.insert(5, "x".to_string()).is_err());
        assert_eq!(list.snapshot(), owned(&["a"]));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn batch_of_cancelling_operations_publishes_nothing() {
        let list = list(&["a", "b"]);
        let changes = record(&list);

        list.batch(|list| {
            list.insert(1, "x".to_string()).unwrap();
            list.remove(1).unwrap();
        });

        assert_eq!(list.snapshot(), owned(&["a", "b"]));
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn invalidation_listeners_are_notified_per_batch() {
        let list = list(&[]);
        let invalidations: Arc<Mutex<usize>> = Arc::default();
        {
            let invalidations = invalidations.clone();
            list.add_invalidation_listener(Arc::new(move || *invalidations.lock() += 1));
        }

        list.push("a".to_string());
        list.batch(|list| {
            list.push("b".to_string());
            list.push("c".to_string());
        });

        assert_eq!(*invalidations.lock(), 2);
    }

    #[test]
    fn listener_registration_reports_duplicates() {
        let list = list(&[]);
        let listener: Arc<dyn ChangeListener<ListChange<String>>> =
            Arc::new(|_: &ListChange<String>| {});

        assert!(list.add_change_listener(listener.clone()));
        assert!(!list.add_change_listener(listener.clone()));
        assert!(list.remove_change_listener(&listener));
        assert!(!list.remove_change_listener(&listener));
    }

    fn list(elements: &[&str]) -> ObservableList<String> {
        ObservableList::from(owned(elements))
    }

    fn owned(elements: &[&str]) -> Vec<String> {
        elements.iter().map(|element| element.to_string()).collect()
    }

    fn record(list: &ObservableList<String>) -> Arc<Mutex<Vec<ListChange<String>>>> {
        let changes: Arc<Mutex<Vec<ListChange<String>>>> = Arc::default();
        {
            let changes = changes.clone();
            list.add_change_listener(Arc::new(move |change: &ListChange<String>| {
                changes.lock().push(change.clone())
            }));
        }
        changes
    }
}
