//! Change aggregation and compression for observable collections.
//!
//! Mutable collections publish structured descriptions of how they changed,
//! so that dependents can react incrementally instead of re-scanning the
//! whole collection. This crate is the engine behind that: collections log
//! primitive mutations into a change frame, and the frame reduces the batch
//! to the smallest faithful description when the outermost operation
//! completes.
//!
//! What's important about this design is:
//! - A compound operation built from several primitive mutations reports
//!   exactly one change. Frames nest by depth, not by stacking independent
//!   logs, so everything a nested operation logs lands in the same batch.
//! - Sequence batches are compressed. A batch that turns out to be a pure
//!   reordering is reported as a single permutation; everything else becomes
//!   an ordered list of insertion, removal and update runs, with adjacent
//!   primitive changes merged and remove-then-reinsert pairs fused into
//!   in-place updates.
//! - Unordered containers aggregate instead: additions and removals of the
//!   same element within one batch cancel out, so listeners never see work
//!   that was undone before it was published.
//! - Listeners remove themselves by reporting invalidity. The registry prunes
//!   them during dispatch and tolerates listeners registering or removing
//!   listeners from within their own callbacks.
//!
//! Batches live in memory for the duration of one logical operation and are
//! discarded after dispatch; this is not a persistent change log.

mod deque;
mod frame;
mod list;
mod listener;
mod local_change;
mod map;
mod set;

pub use deque::{DequeChange, DequeChangeBuilder, DequeLocalChange, Site};
pub use frame::{ChangeAccumulator, ChangeFrame, ChangePublisher};
pub use list::ListChangeBuilder;
pub use listener::{ChangeListener, InvalidationListener, ListenerSet};
pub use local_change::{ListChange, LocalChange};
pub use map::{MapChange, MapChangeBuilder, ValueUpdate};
pub use set::{SetChange, SetChangeBuilder};
