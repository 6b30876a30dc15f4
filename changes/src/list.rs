use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
};

use crate::{ChangeAccumulator, ChangeFrame, ListChange, LocalChange};

/// Raw record of one primitive sequence mutation, in the coordinates of the
/// moment it happened. Append-only; consumed once when the batch commits.
#[derive(Debug, Clone)]
enum RawChange<T> {
    Insertion { from: usize, elements: Vec<T> },
    Removal { from: usize, elements: Vec<T> },
}

/// Accumulates the primitive mutations of one sequence batch and reduces them
/// to the smallest faithful description on commit: a permutation when the
/// batch is a pure reordering, an ordered list of insertion / removal /
/// update runs otherwise.
#[derive(Debug)]
pub struct ListChangeBuilder<T> {
    /// Length of the sequence when the batch began. The emitted permutation
    /// covers untouched elements too, so the full extent must be known.
    initial_len: usize,
    raw: Vec<RawChange<T>>,
    /// Sum of insertion lengths minus removal lengths.
    size_delta: isize,
}

impl<T> ListChangeBuilder<T> {
    pub fn new(initial_len: usize) -> Self {
        Self {
            initial_len,
            raw: Vec::new(),
            size_delta: 0,
        }
    }

    /// Logs the insertion of `elements` before the element previously at
    /// `from`.
    pub fn log_insertion(&mut self, from: usize, elements: Vec<T>) {
        if elements.is_empty() {
            return;
        }
        debug_assert!(from as isize <= self.initial_len as isize + self.size_delta);
        self.size_delta += elements.len() as isize;
        self.raw.push(RawChange::Insertion { from, elements });
    }

    /// Logs the removal of `elements`, the first of which lived at `from`.
    pub fn log_removal(&mut self, from: usize, elements: Vec<T>) {
        if elements.is_empty() {
            return;
        }
        debug_assert!(
            (from + elements.len()) as isize <= self.initial_len as isize + self.size_delta
        );
        self.size_delta -= elements.len() as isize;
        self.raw.push(RawChange::Removal { from, elements });
    }

    /// Logs an in-place replacement as removal plus insertion; compression
    /// fuses the pair back into a single update.
    pub fn log_update(&mut self, index: usize, old: Vec<T>, new: Vec<T>) {
        self.log_removal(index, old);
        self.log_insertion(index, new);
    }
}

impl<T: Clone + Eq + Hash> ChangeAccumulator for ListChangeBuilder<T> {
    type Change = ListChange<T>;

    fn finish(self) -> Option<ListChange<T>> {
        if self.raw.is_empty() {
            return None;
        }

        // A permutation requires the element count to be unchanged; anything
        // else goes straight to run compression.
        if self.size_delta == 0 {
            match try_permutation(self.initial_len, &self.raw) {
                PermutationOutcome::Identity => return None,
                PermutationOutcome::Permutation(mapping) => return Some(mapping.into()),
                PermutationOutcome::NotAPermutation => {}
            }
        }

        let local = compress(self.raw);
        debug_assert!(!local.is_empty());
        Some(local.into())
    }
}

impl<T: Clone + Eq + Hash> ChangeFrame<'_, ListChangeBuilder<T>> {
    pub fn log_insertion(&self, from: usize, elements: impl IntoIterator<Item = T>) {
        self.with(|builder| builder.log_insertion(from, elements.into_iter().collect()))
    }

    pub fn log_removal(&self, from: usize, elements: impl IntoIterator<Item = T>) {
        self.with(|builder| builder.log_removal(from, elements.into_iter().collect()))
    }

    pub fn log_update(
        &self,
        index: usize,
        old: impl IntoIterator<Item = T>,
        new: impl IntoIterator<Item = T>,
    ) {
        self.with(|builder| {
            builder.log_update(
                index,
                old.into_iter().collect(),
                new.into_iter().collect(),
            )
        })
    }
}

enum PermutationOutcome {
    /// Every element ended up where it started; nothing to report.
    Identity,
    Permutation(Vec<usize>),
    NotAPermutation,
}

/// Entry of the working array mapping current position to provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Occupied by the element that began the batch at this original index.
    Original(usize),
    /// Occupied by an element inserted during the batch that has not (yet)
    /// been matched against a removal.
    Unmatched(u64),
}

/// Replays the raw log, pairing removals and insertions of equal values in
/// FIFO order. The batch is a pure reordering exactly when every removal was
/// matched by a later insertion and vice versa.
fn try_permutation<T: Eq + Hash>(initial_len: usize, raw: &[RawChange<T>]) -> PermutationOutcome {
    let mut slots: Vec<Slot> = (0..initial_len).map(Slot::Original).collect();
    // Values removed but not yet reinserted: original indices, FIFO. Multiple
    // equal values may be in flight at once, hence queues.
    let mut pending_removals: HashMap<&T, VecDeque<usize>> = HashMap::new();
    // Values inserted but not yet matched by a removal: slot tokens, FIFO.
    let mut pending_insertions: HashMap<&T, VecDeque<u64>> = HashMap::new();
    let mut next_token = 0u64;

    for change in raw {
        match change {
            RawChange::Insertion { from, elements } => {
                for (offset, element) in elements.iter().enumerate() {
                    let position = from + offset;
                    if position > slots.len() {
                        return PermutationOutcome::NotAPermutation;
                    }
                    match pending_removals
                        .get_mut(element)
                        .and_then(VecDeque::pop_front)
                    {
                        // A value removed earlier came back: a move.
                        Some(original) => slots.insert(position, Slot::Original(original)),
                        None => {
                            let token = next_token;
                            next_token += 1;
                            pending_insertions.entry(element).or_default().push_back(token);
                            slots.insert(position, Slot::Unmatched(token));
                        }
                    }
                }
            }
            RawChange::Removal { from, elements } => {
                for element in elements {
                    if *from >= slots.len() {
                        return PermutationOutcome::NotAPermutation;
                    }
                    match slots.remove(*from) {
                        Slot::Original(original) => {
                            match pending_insertions
                                .get_mut(element)
                                .and_then(VecDeque::pop_front)
                            {
                                // An equal value was inserted earlier; that
                                // insertion becomes this element's new home.
                                Some(token) => {
                                    let target = slots
                                        .iter()
                                        .position(|slot| *slot == Slot::Unmatched(token))
                                        .expect("internal error: unmatched insertion slot lost");
                                    slots[target] = Slot::Original(original);
                                }
                                None => pending_removals
                                    .entry(element)
                                    .or_default()
                                    .push_back(original),
                            }
                        }
                        // The batch removed an element it inserted itself;
                        // the two records cancel.
                        Slot::Unmatched(token) => {
                            let queue = pending_insertions
                                .get_mut(element)
                                .expect("internal error: unmatched insertion not queued");
                            let at = queue
                                .iter()
                                .position(|queued| *queued == token)
                                .expect("internal error: unmatched insertion not queued");
                            queue.remove(at);
                        }
                    }
                }
            }
        }
    }

    let matched = pending_removals.values().all(VecDeque::is_empty)
        && pending_insertions.values().all(VecDeque::is_empty);
    if !matched || slots.len() != initial_len {
        return PermutationOutcome::NotAPermutation;
    }

    let mut mapping = vec![0; initial_len];
    for (current, slot) in slots.iter().enumerate() {
        match slot {
            Slot::Original(original) => mapping[*original] = current,
            // With both queues drained, no unmatched slot can remain.
            Slot::Unmatched(_) => {
                unreachable!("internal error: unmatched slot after full pairing")
            }
        }
    }

    if mapping.iter().enumerate().all(|(original, current)| original == *current) {
        PermutationOutcome::Identity
    } else {
        PermutationOutcome::Permutation(mapping)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum RunKind {
    Insertion,
    Removal,
}

/// An open insertion or removal run during compression.
#[derive(Debug)]
struct Run<T> {
    kind: RunKind,
    from: usize,
    elements: Vec<T>,
}

/// An open in-place replacement run during compression.
#[derive(Debug)]
struct UpdateRun<T> {
    from: usize,
    old: Vec<T>,
    new: Vec<T>,
}

/// Walks the raw log left to right, merging adjacent or overlapping changes
/// of one kind into runs and fusing same-position remove/insert pairs into
/// updates. At most one update run and one insertion-or-removal run are open
/// at a time; the update run always predates the other, so flushing the
/// update first preserves the order in which the changes happened.
fn compress<T: Clone>(raw: Vec<RawChange<T>>) -> Vec<LocalChange<T>> {
    let mut out = Vec::new();
    let mut update: Option<UpdateRun<T>> = None;
    let mut run: Option<Run<T>> = None;

    for change in raw {
        match change {
            RawChange::Insertion { from, elements } => match run.take() {
                // Remove-then-insert at the same spot with matching lengths
                // is an in-place replacement.
                Some(prior)
                    if prior.kind == RunKind::Removal
                        && prior.from == from
                        && prior.elements.len() == elements.len() =>
                {
                    fuse_update(
                        &mut out,
                        &mut update,
                        UpdateRun {
                            from,
                            old: prior.elements,
                            new: elements,
                        },
                    );
                }
                // The insertion lands inside or at the edges of the open
                // insertion run; splice it in at the relative offset.
                Some(mut prior)
                    if prior.kind == RunKind::Insertion
                        && prior.from <= from
                        && from <= prior.from + prior.elements.len() =>
                {
                    let offset = from - prior.from;
                    prior.elements.splice(offset..offset, elements);
                    run = Some(prior);
                }
                prior => {
                    if let Some(prior) = prior {
                        flush(&mut out, &mut update, Some(prior));
                    }
                    run = Some(Run {
                        kind: RunKind::Insertion,
                        from,
                        elements,
                    });
                }
            },
            RawChange::Removal { from, elements } => match run.take() {
                // Insert-then-remove at the same spot with matching lengths;
                // the mirrored replacement case.
                Some(prior)
                    if prior.kind == RunKind::Insertion
                        && prior.from == from
                        && prior.elements.len() == elements.len() =>
                {
                    fuse_update(
                        &mut out,
                        &mut update,
                        UpdateRun {
                            from,
                            old: elements,
                            new: prior.elements,
                        },
                    );
                }
                // The removal span touches the run's gap position; the
                // previously removed elements slot in at the offset where
                // the gap sits inside the newly removed range.
                Some(prior)
                    if prior.kind == RunKind::Removal
                        && from <= prior.from
                        && prior.from <= from + elements.len() =>
                {
                    let offset = prior.from - from;
                    let mut elements = elements;
                    elements.splice(offset..offset, prior.elements);
                    run = Some(Run {
                        kind: RunKind::Removal,
                        from,
                        elements,
                    });
                }
                prior => {
                    if let Some(prior) = prior {
                        flush(&mut out, &mut update, Some(prior));
                    }
                    run = Some(Run {
                        kind: RunKind::Removal,
                        from,
                        elements,
                    });
                }
            },
        }
    }

    flush(&mut out, &mut update, run);
    out
}

/// Merges a freshly fused update run into the pending one when their ranges
/// touch; otherwise the pending run is flushed and replaced.
fn fuse_update<T: Clone>(
    out: &mut Vec<LocalChange<T>>,
    pending: &mut Option<UpdateRun<T>>,
    next: UpdateRun<T>,
) {
    match pending.take() {
        Some(prior)
            if next.from <= prior.from + prior.new.len()
                && prior.from <= next.from + next.new.len() =>
        {
            *pending = Some(merge_updates(prior, next));
        }
        prior => {
            if let Some(prior) = prior {
                out.push(complete_update(prior));
            }
            *pending = Some(next);
        }
    }
}

/// Composes two touching update runs. Where they overlap, the first run's
/// `old` is the true pre-batch value and the second run's `new` is the
/// latest replacement.
fn merge_updates<T: Clone>(first: UpdateRun<T>, second: UpdateRun<T>) -> UpdateRun<T> {
    let from = first.from.min(second.from);
    let to = (first.from + first.new.len()).max(second.from + second.new.len());

    let mut old = Vec::with_capacity(to - from);
    let mut new = Vec::with_capacity(to - from);
    for position in from..to {
        let in_first = position >= first.from && position < first.from + first.new.len();
        let in_second = position >= second.from && position < second.from + second.new.len();

        old.push(if in_first {
            first.old[position - first.from].clone()
        } else {
            second.old[position - second.from].clone()
        });
        new.push(if in_second {
            second.new[position - second.from].clone()
        } else {
            first.new[position - first.from].clone()
        });
    }

    UpdateRun { from, old, new }
}

/// Emits the open runs, pending update first.
fn flush<T>(out: &mut Vec<LocalChange<T>>, update: &mut Option<UpdateRun<T>>, run: Option<Run<T>>) {
    if let Some(update) = update.take() {
        out.push(complete_update(update));
    }
    if let Some(run) = run {
        out.push(match run.kind {
            RunKind::Insertion => LocalChange::Insertion {
                index: run.from,
                elements: run.elements,
            },
            RunKind::Removal => LocalChange::Removal {
                index: run.from,
                elements: run.elements,
            },
        });
    }
}

fn complete_update<T>(update: UpdateRun<T>) -> LocalChange<T> {
    LocalChange::Update {
        index: update.from,
        old: update.old,
        new: update.new,
    }
}
