use derive_more::From;

/// A compressed, contiguous edit to one region of a sequence.
///
/// The local changes of a [`ListChange::Local`] batch are meant to be applied
/// left to right: insertions and removals shift the positions every change
/// after them refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalChange<T> {
    /// `elements` were inserted before the element previously at `index`.
    Insertion { index: usize, elements: Vec<T> },
    /// `elements` were removed, the first of which lived at `index`.
    Removal { index: usize, elements: Vec<T> },
    /// The `old` elements starting at `index` were replaced in place by
    /// `new`. Always the same number of elements on both sides.
    Update {
        index: usize,
        old: Vec<T>,
        new: Vec<T>,
    },
}

impl<T> LocalChange<T> {
    /// The index of the first element affected by this change.
    pub fn index(&self) -> usize {
        match self {
            LocalChange::Insertion { index, .. }
            | LocalChange::Removal { index, .. }
            | LocalChange::Update { index, .. } => *index,
        }
    }
}

/// The change reported for one batch of sequence mutations.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum ListChange<T> {
    /// The batch was a pure reordering: element count and multiset are
    /// unchanged. `mapping[original] = current` for every element.
    Permutation(Vec<usize>),
    /// Everything else: an ordered list of local edits.
    Local(Vec<LocalChange<T>>),
}
