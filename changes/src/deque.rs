use crate::{ChangeAccumulator, ChangeFrame};

/// The region of a deque a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Head,
    Tail,
    /// The change cannot be attributed to either end, e.g. a full clear.
    Opaque,
}

/// One contiguous run of deque mutations at a single site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DequeLocalChange<T> {
    Insertion { site: Site, elements: Vec<T> },
    Removal { site: Site, elements: Vec<T> },
}

/// The change reported for one batch of deque mutations: runs in the order
/// they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DequeChange<T> {
    pub changes: Vec<DequeLocalChange<T>>,
}

/// Accumulates deque mutations, extending the trailing run while kind and
/// site keep matching.
#[derive(Debug)]
pub struct DequeChangeBuilder<T> {
    changes: Vec<DequeLocalChange<T>>,
}

impl<T> Default for DequeChangeBuilder<T> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<T> DequeChangeBuilder<T> {
    pub fn log_insertion(&mut self, site: Site, element: T) {
        if let Some(DequeLocalChange::Insertion {
            site: last_site,
            elements,
        }) = self.changes.last_mut()
            && *last_site == site
        {
            elements.push(element);
            return;
        }

        self.changes.push(DequeLocalChange::Insertion {
            site,
            elements: vec![element],
        });
    }

    pub fn log_removal(&mut self, site: Site, element: T) {
        if let Some(DequeLocalChange::Removal {
            site: last_site,
            elements,
        }) = self.changes.last_mut()
            && *last_site == site
        {
            elements.push(element);
            return;
        }

        self.changes.push(DequeLocalChange::Removal {
            site,
            elements: vec![element],
        });
    }
}

impl<T> ChangeAccumulator for DequeChangeBuilder<T> {
    type Change = DequeChange<T>;

    fn finish(self) -> Option<DequeChange<T>> {
        if self.changes.is_empty() {
            return None;
        }
        Some(DequeChange {
            changes: self.changes,
        })
    }
}

impl<T> ChangeFrame<'_, DequeChangeBuilder<T>> {
    pub fn log_insertion(&self, site: Site, element: T) {
        self.with(|builder| builder.log_insertion(site, element))
    }

    pub fn log_removal(&self, site: Site, element: T) {
        self.with(|builder| builder.log_removal(site, element))
    }
}
