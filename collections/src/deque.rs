use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use herald_changes::{
    ChangeListener, ChangePublisher, DequeChange, DequeChangeBuilder, InvalidationListener, Site,
};

/// A double-ended queue that reports how it changed.
///
/// Changes carry the end they happened at ([`Site::Head`] or [`Site::Tail`]);
/// mutations that cannot be attributed to one end, like a full clear, report
/// [`Site::Opaque`].
#[derive(Debug)]
pub struct ObservableDeque<T: Clone> {
    items: Mutex<VecDeque<T>>,
    publisher: ChangePublisher<DequeChangeBuilder<T>>,
}

impl<T: Clone> Default for ObservableDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> From<VecDeque<T>> for ObservableDeque<T> {
    fn from(items: VecDeque<T>) -> Self {
        Self {
            items: Mutex::new(items),
            publisher: ChangePublisher::new(),
        }
    }
}

impl<T: Clone> ObservableDeque<T> {
    pub fn new() -> Self {
        VecDeque::new().into()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn front(&self) -> Option<T> {
        self.items.lock().front().cloned()
    }

    pub fn back(&self) -> Option<T> {
        self.items.lock().back().cloned()
    }

    /// A copy of the current contents, front to back.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }

    pub fn push_front(&self, element: T) {
        self.items.lock().push_front(element.clone());

        let frame = self.publisher.begin_change();
        frame.log_insertion(Site::Head, element);
    }

    pub fn push_back(&self, element: T) {
        self.items.lock().push_back(element.clone());

        let frame = self.publisher.begin_change();
        frame.log_insertion(Site::Tail, element);
    }

    pub fn pop_front(&self) -> Option<T> {
        let popped = self.items.lock().pop_front();

        if let Some(element) = &popped {
            let frame = self.publisher.begin_change();
            frame.log_removal(Site::Head, element.clone());
        }

        popped
    }

    pub fn pop_back(&self) -> Option<T> {
        let popped = self.items.lock().pop_back();

        if let Some(element) = &popped {
            let frame = self.publisher.begin_change();
            frame.log_removal(Site::Tail, element.clone());
        }

        popped
    }

    /// Appends all `elements` at the tail, as a single batch.
    pub fn extend(&self, elements: impl IntoIterator<Item = T>) {
        let _frame = self.publisher.begin_change();
        for element in elements {
            self.push_back(element);
        }
    }

    /// Removes all elements, as a single batch reported at [`Site::Opaque`].
    pub fn clear(&self) {
        let removed: Vec<T> = self.items.lock().drain(..).collect();
        if removed.is_empty() {
            return;
        }

        let frame = self.publisher.begin_change();
        for element in removed {
            frame.log_removal(Site::Opaque, element);
        }
    }

    /// Runs `f` as one batch: every mutation performed inside is published as
    /// a single change.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _frame = self.publisher.begin_change();
        f(self)
    }

    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener<DequeChange<T>>>) -> bool {
        self.publisher.add_change_listener(listener)
    }

    pub fn remove_change_listener(
        &self,
        listener: &Arc<dyn ChangeListener<DequeChange<T>>>,
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
