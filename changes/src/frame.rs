use std::{fmt, sync::Arc};

use log::trace;
use parking_lot::Mutex;

use crate::{ChangeListener, InvalidationListener, ListenerSet};

/// Collects the primitive changes of one batch and reduces them to the
/// published change when the batch commits.
pub trait ChangeAccumulator {
    type Change;

    /// Reduces everything logged into this accumulator to the change that is
    /// dispatched to listeners. `None` when the batch nets to nothing.
    fn finish(self) -> Option<Self::Change>;
}

#[derive(Debug)]
struct Frame<A> {
    accumulator: A,
    /// Reentrancy depth, never zero while the frame is in its slot.
    depth: usize,
}

/// The batching and dispatch half that every observable container shares: a
/// single optional open frame plus the registered listeners.
///
/// A mutating operation opens the frame with [`Self::begin_change`], logs its
/// primitive changes through the returned guard and lets the guard go out of
/// scope. Nested acquisitions append into the same frame; only the outermost
/// release commits the batch and notifies listeners. Committing a batch that
/// logged nothing notifies nobody.
pub struct ChangePublisher<A: ChangeAccumulator> {
    frame: Mutex<Option<Frame<A>>>,
    change_listeners: ListenerSet<dyn ChangeListener<A::Change>>,
    invalidation_listeners: ListenerSet<dyn InvalidationListener>,
}

impl<A: ChangeAccumulator> Default for ChangePublisher<A> {
    fn default() -> Self {
        Self {
            frame: Mutex::new(None),
            change_listeners: ListenerSet::default(),
            invalidation_listeners: ListenerSet::default(),
        }
    }
}

impl<A: ChangeAccumulator> fmt::Debug for ChangePublisher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePublisher")
            .field("change_listeners", &self.change_listeners.len())
            .field(
                "invalidation_listeners",
                &self.invalidation_listeners.len(),
            )
            .finish()
    }
}

impl<A: ChangeAccumulator> ChangePublisher<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the container's single active frame and increments its depth.
    pub fn begin_change(&self) -> ChangeFrame<'_, A>
    where
        A: Default,
    {
        self.begin_change_with(A::default)
    }

    /// Opens the container's single active frame, seeding the accumulator
    /// with `init` when this is the outermost acquisition.
    ///
    /// `init` runs at most once per batch; nested acquisitions join the
    /// existing frame.
    pub fn begin_change_with(&self, init: impl FnOnce() -> A) -> ChangeFrame<'_, A> {
        let mut slot = self.frame.lock();
        let frame = slot.get_or_insert_with(|| Frame {
            accumulator: init(),
            depth: 0,
        });
        frame.depth += 1;
        drop(slot);

        ChangeFrame { publisher: self }
    }

    /// Registers a change listener. Returns `false` if it is already
    /// registered.
    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener<A::Change>>) -> bool {
        self.change_listeners.add(listener)
    }

    /// Removes a change listener. Returns `false` if it is not registered.
    pub fn remove_change_listener(&self, listener: &Arc<dyn ChangeListener<A::Change>>) -> bool {
        self.change_listeners.remove(listener)
    }

    /// Registers an invalidation listener. Returns `false` if it is already
    /// registered.
    pub fn add_invalidation_listener(&self, listener: Arc<dyn InvalidationListener>) -> bool {
        self.invalidation_listeners.add(listener)
    }

    /// Removes an invalidation listener. Returns `false` if it is not
    /// registered.
    pub fn remove_invalidation_listener(&self, listener: &Arc<dyn InvalidationListener>) -> bool {
        self.invalidation_listeners.remove(listener)
    }

    fn end_change(&self) {
        let committed = {
            let mut slot = self.frame.lock();
            let frame = slot
                .as_mut()
                .unwrap_or_else(|| panic!("internal error: change frame released while none is open"));
            assert!(frame.depth > 0, "internal error: change frame depth underflow");
            frame.depth -= 1;

            if frame.depth == 0 {
                // Clear the slot before dispatching, so that listener
                // callbacks mutating the container open a fresh batch.
                slot.take().map(|frame| frame.accumulator)
            } else {
                None
            }
        };

        if let Some(accumulator) = committed
            && let Some(change) = accumulator.finish()
        {
            trace!("batch committed, notifying listeners");
            self.dispatch(&change);
        }
    }

    fn dispatch(&self, change: &A::Change) {
        self.change_listeners
            .notify(|l| l.is_invalid(), |l| l.on_change(change));
        self.invalidation_listeners
            .notify(|l| l.is_invalid(), |l| l.on_invalidation());
    }
}

/// Scoped handle to a container's active change frame.
///
/// Dropping the handle releases the frame. Release happens on every exit
/// path, including unwinding, and only the outermost release commits.
#[must_use = "dropping the frame immediately commits an empty batch"]
pub struct ChangeFrame<'a, A: ChangeAccumulator> {
    publisher: &'a ChangePublisher<A>,
}

impl<A: ChangeAccumulator> ChangeFrame<'_, A> {
    /// Gives access to the batch accumulator, to log a primitive change.
    pub fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        let mut slot = self.publisher.frame.lock();
        let frame = slot
            .as_mut()
            .unwrap_or_else(|| panic!("internal error: logging into a released change frame"));
        f(&mut frame.accumulator)
    }
}

impl<A: ChangeAccumulator> Drop for ChangeFrame<'_, A> {
    fn drop(&mut self) {
        self.publisher.end_change();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{SetChange, SetChangeBuilder};

    #[test]
    fn nested_frames_commit_once() {
        let publisher = publisher();
        let changes = record_changes(&publisher);

        {
            let outer = publisher.begin_change();
            outer.log_add(1);
            {
                let inner = publisher.begin_change();
                inner.log_add(2);
            }
            // The nested release must not have dispatched anything yet.
            assert!(changes.lock().is_empty());
        }

        let recorded = changes.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].added, HashSet::from([1, 2]));
    }

    #[test]
    fn empty_batch_is_not_dispatched() {
        let publisher = publisher();
        let changes = record_changes(&publisher);
        let invalidations: Arc<Mutex<usize>> = Arc::default();
        {
            let invalidations = invalidations.clone();
            publisher.add_invalidation_listener(Arc::new(move || *invalidations.lock() += 1));
        }

        drop(publisher.begin_change());

        assert!(changes.lock().is_empty());
        assert_eq!(*invalidations.lock(), 0);
    }

    #[test]
    fn cancelled_batch_is_not_dispatched() {
        let publisher = publisher();
        let changes = record_changes(&publisher);

        {
            let frame = publisher.begin_change();
            frame.log_add(1);
            frame.log_remove(1);
        }

        assert!(changes.lock().is_empty());
    }

    #[test]
    fn change_listeners_run_before_invalidation_listeners() {
        let publisher = publisher();
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();

        {
            let order = order.clone();
            publisher
                .add_change_listener(Arc::new(move |_: &SetChange<i32>| order.lock().push("change")));
        }
        {
            let order = order.clone();
            publisher.add_invalidation_listener(Arc::new(move || order.lock().push("invalidation")));
        }

        publisher.begin_change().log_add(1);

        assert_eq!(*order.lock(), ["change", "invalidation"]);
    }

    #[test]
    fn listener_may_start_a_new_batch() {
        let publisher = Arc::new(publisher());
        let changes = record_changes(&publisher);

        {
            let inner = publisher.clone();
            publisher.add_change_listener(Arc::new(move |change: &SetChange<i32>| {
                // React to the first batch by publishing a follow-up.
                if change.added.contains(&1) {
                    inner.begin_change().log_add(2);
                }
            }));
        }

        publisher.begin_change().log_add(1);

        let recorded = changes.lock();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].added, HashSet::from([1]));
        assert_eq!(recorded[1].added, HashSet::from([2]));
    }

    #[test]
    fn listener_invalidated_during_dispatch_is_dropped() {
        struct OneShotListener {
            calls: AtomicUsize,
            invalid: AtomicBool,
        }

        impl ChangeListener<SetChange<i32>> for OneShotListener {
            fn on_change(&self, _change: &SetChange<i32>) {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.invalid.store(true, Ordering::SeqCst);
            }

            fn is_invalid(&self) -> bool {
                self.invalid.load(Ordering::SeqCst)
            }
        }

        let publisher = publisher();
        let listener = Arc::new(OneShotListener {
            calls: AtomicUsize::new(0),
            invalid: AtomicBool::new(false),
        });
        publisher.add_change_listener(listener.clone());

        publisher.begin_change().log_add(1);
        publisher.begin_change().log_add(2);

        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }

    fn publisher() -> ChangePublisher<SetChangeBuilder<i32>> {
        ChangePublisher::new()
    }

    fn record_changes(
        publisher: &ChangePublisher<SetChangeBuilder<i32>>,
    ) -> Arc<Mutex<Vec<SetChange<i32>>>> {
        let changes: Arc<Mutex<Vec<SetChange<i32>>>> = Arc::default();
        {
            let changes = changes.clone();
            publisher.add_change_listener(Arc::new(move |change: &SetChange<i32>| {
                changes.lock().push(change.clone())
            }));
        }
        changes
    }
}
