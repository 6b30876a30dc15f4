use std::{fmt, sync::Arc};

use log::debug;
use parking_lot::Mutex;

/// A listener receiving the full description of every committed batch.
pub trait ChangeListener<C> {
    fn on_change(&self, change: &C);

    /// Whether this listener should be dropped from the registry.
    ///
    /// Once this returned `true`, it must never return `false` again for the
    /// same listener.
    fn is_invalid(&self) -> bool {
        false
    }
}

impl<C, F: Fn(&C)> ChangeListener<C> for F {
    fn on_change(&self, change: &C) {
        self(change)
    }
}

/// A listener notified only that *something* changed, without details.
pub trait InvalidationListener {
    fn on_invalidation(&self);

    /// See [`ChangeListener::is_invalid`].
    fn is_invalid(&self) -> bool {
        false
    }
}

impl<F: Fn()> InvalidationListener for F {
    fn on_invalidation(&self) {
        self()
    }
}

/// Registered listeners in registration order, compared by pointer identity.
///
/// Iteration works on a snapshot, so callbacks are free to register or remove
/// listeners, themselves included, while a dispatch is in progress.
pub struct ListenerSet<L: ?Sized> {
    entries: Mutex<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerSet<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerSet")
            .field(&self.entries.lock().len())
            .finish()
    }
}

impl<L: ?Sized> ListenerSet<L> {
    /// Registers a listener. Returns `false` if it is already registered.
    pub fn add(&self, listener: Arc<L>) -> bool {
        let mut entries = self.entries.lock();
        if entries.iter().any(|entry| Arc::ptr_eq(entry, &listener)) {
            return false;
        }
        entries.push(listener);
        true
    }

    /// Removes a listener. Returns `false` if it is not registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|entry| Arc::ptr_eq(entry, listener)) {
            Some(at) => {
                entries.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Notifies every valid listener in registration order.
    ///
    /// An entry reporting itself invalid is pruned and skipped. After each
    /// callback the entry is checked again, so invalidation caused by the
    /// callback itself takes effect before any later dispatch.
    pub fn notify(&self, is_invalid: impl Fn(&L) -> bool, call: impl Fn(&L)) {
        let snapshot: Vec<Arc<L>> = self.entries.lock().clone();

        for listener in snapshot {
            if is_invalid(&listener) {
                debug!("pruning invalid listener before notification");
                self.remove(&listener);
                continue;
            }

            call(&listener);

            if is_invalid(&listener) {
                debug!("pruning listener invalidated by its own callback");
                self.remove(&listener);
            }
        }
    }
}
