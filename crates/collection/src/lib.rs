//! Thread-marshaled notifying list.
//!
//! [`NotifyingList`] is the view-model side of a bound item list: every
//! mutating call is marshaled onto the [`Dispatcher`]'s affinity thread, and
//! subscribers see a `Changing` / `Changed` pair for each mutation.
//!
//! Batch operations ([`NotifyingList::add_range`],
//! [`NotifyingList::remove_range`], [`NotifyingList::refresh`]) suppress the
//! per-item events and raise a single [`CollectionChange::Reset`] pair, so a
//! bound view rebuilds once instead of once per element.
//!
//! ```text
//! any thread ──mutate──► Dispatcher::send ──► affinity thread
//!                                              ├─ Changing(delta)
//!                                              ├─ apply to Vec<T>
//!                                              ├─ PropertyChanged(Count / Indexer)
//!                                              └─ Changed(delta)   (reentrancy-guarded)
//! ```
//!
//! [`Dispatcher`]: tether_dispatch::Dispatcher

mod change;
mod error;
mod list;
mod subscription;

#[cfg(test)]
mod tests;

pub use change::{ChangeKind, CollectionChange, ListEvent, ListProperty};
pub use error::CollectionError;
pub use list::NotifyingList;
pub use subscription::Subscription;
