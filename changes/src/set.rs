use std::{collections::HashSet, hash::Hash};

use crate::{ChangeAccumulator, ChangeFrame};

/// The change reported for one batch of set mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChange<T: Eq + Hash> {
    pub added: HashSet<T>,
    pub removed: HashSet<T>,
}

/// Running aggregation for unordered element containers.
///
/// Adding and removing the same element within one batch cancels out, so
/// spurious operations never reach listeners.
#[derive(Debug)]
pub struct SetChangeBuilder<T> {
    added: HashSet<T>,
    removed: HashSet<T>,
}

impl<T> Default for SetChangeBuilder<T> {
    fn default() -> Self {
        Self {
            added: HashSet::new(),
            removed: HashSet::new(),
        }
    }
}

impl<T: Eq + Hash> SetChangeBuilder<T> {
    /// Logs the addition of `element`.
    pub fn log_add(&mut self, element: T) {
        if !self.removed.remove(&element) {
            self.added.insert(element);
        }
    }

    /// Logs the removal of `element`.
    pub fn log_remove(&mut self, element: T) {
        if !self.added.remove(&element) {
            self.removed.insert(element);
        }
    }
}

impl<T: Eq + Hash> ChangeAccumulator for SetChangeBuilder<T> {
    type Change = SetChange<T>;

    fn finish(self) -> Option<SetChange<T>> {
        if self.added.is_empty() && self.removed.is_empty() {
            return None;
        }
        Some(SetChange {
            added: self.added,
            removed: self.removed,
        })
    }
}

impl<T: Eq + Hash> ChangeFrame<'_, SetChangeBuilder<T>> {
    pub fn log_add(&self, element: T) {
        self.with(|builder| builder.log_add(element))
    }

    pub fn log_remove(&self, element: T) {
        self.with(|builder| builder.log_remove(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove_cancels() {
        let mut builder = SetChangeBuilder::default();
        builder.log_add("a");
        builder.log_remove("a");

        assert_eq!(builder.finish(), None);
    }

    #[test]
    fn remove_then_add_cancels() {
        let mut builder = SetChangeBuilder::default();
        builder.log_remove("a");
        builder.log_add("a");

        assert_eq!(builder.finish(), None);
    }

    #[test]
    fn net_changes_survive() {
        let mut builder = SetChangeBuilder::default();
        builder.log_add("a");
        builder.log_add("b");
        builder.log_remove("b");
        builder.log_remove("c");

        let change = builder.finish().unwrap();
        assert_eq!(change.added, HashSet::from(["a"]));
        assert_eq!(change.removed, HashSet::from(["c"]));
    }

    #[test]
    fn empty_aggregation_yields_nothing() {
        let builder: SetChangeBuilder<&str> = SetChangeBuilder::default();
        assert_eq!(builder.finish(), None);
    }
}
