//! Handle resource managers.
//!
//! Three flavors share one [`SlotTable`](slot) core:
//!
//! | Manager                          | Index chosen by | Extra limit            |
//! |----------------------------------|-----------------|------------------------|
//! | [`LimitedHandleResource`]        | first-fit scan  | capacity `N`           |
//! | [`IndexedHandleResource`]        | caller          | capacity `N`           |
//! | [`LimitedIndexedHandleResource`] | caller          | `N` and live ceiling   |
//!
//! Allocate and free hold the manager's mutex for the whole operation.
//! Lookups take the same lock only long enough to validate the handle and
//! clone the slot's `Arc`, so a concurrent free can never pull a resource
//! out from under a caller that already resolved it.

mod indexed;
mod limited;
mod limited_indexed;
pub(crate) mod slot;

pub use indexed::IndexedHandleResource;
pub use limited::LimitedHandleResource;
pub use limited_indexed::LimitedIndexedHandleResource;
pub use slot::INITIAL_GENERATION;

use cobalt_common::hal::handle::HandleKind;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Uniform view of a manager, used by the registry for diagnostics and reset.
pub trait HandleResource: Send + Sync {
    /// Resource kind stamped into this manager's handles.
    fn kind(&self) -> HandleKind;

    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Number of occupied slots.
    fn live_count(&self) -> usize;

    /// Free every slot. Outstanding handles become stale.
    fn reset(&self);
}

/// Lock a manager table.
///
/// Slot state is consistent at every point a panic could unwind through, so
/// a poisoned lock is recovered instead of propagated.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
