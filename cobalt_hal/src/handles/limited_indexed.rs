//! Limited-indexed manager: caller-chosen index plus a live-count ceiling.
//!
//! Models hardware banks where more channels exist than can be active at
//! once (e.g. a shared interrupt controller).

use std::fmt;
use std::sync::{Arc, Mutex};

use cobalt_common::hal::handle::{HandleKind, ResourceKind, TypedHandle};
use cobalt_common::hal::status::HalError;

use super::slot::SlotTable;
use super::{HandleResource, lock};

/// `N` channel-addressed resources of kind `K`, at most `max_live` at once.
pub struct LimitedIndexedHandleResource<K: ResourceKind, T, const N: usize> {
    table: Mutex<SlotTable<K, T, N>>,
    max_live: usize,
}

impl<K: ResourceKind, T, const N: usize> LimitedIndexedHandleResource<K, T, N> {
    /// Create an empty manager. `max_live` is clamped to `[1, N]`.
    pub fn new(max_live: usize) -> Self {
        Self {
            table: Mutex::new(SlotTable::new()),
            max_live: max_live.clamp(1, N),
        }
    }

    /// Live-count ceiling.
    #[inline]
    pub fn max_live(&self) -> usize {
        self.max_live
    }

    /// Store `resource` at channel `index`.
    ///
    /// # Errors
    /// - `HalError::ChannelIndexOutOfRange` if `index >= N`
    /// - `HalError::ResourceAlreadyAllocated` if the channel is in use
    /// - `HalError::ResourceExhausted` if `max_live` resources are live
    pub fn allocate(&self, index: usize, resource: T) -> Result<TypedHandle<K>, HalError> {
        if index >= N {
            return Err(HalError::ChannelIndexOutOfRange { index, capacity: N });
        }
        let mut table = lock(&self.table);
        if !table.is_free(index) {
            return Err(HalError::ResourceAlreadyAllocated { index });
        }
        if table.live() >= self.max_live {
            return Err(HalError::ResourceExhausted {
                limit: self.max_live,
            });
        }
        Ok(table.occupy(index, 0, resource))
    }

    /// Resolve a handle.
    ///
    /// # Errors
    /// `HalError::InvalidHandle` for stale, foreign or out-of-range handles.
    pub fn get(&self, handle: TypedHandle<K>) -> Result<Arc<T>, HalError> {
        lock(&self.table).get(handle).ok_or(HalError::InvalidHandle)
    }

    /// Free a handle and return the resource it owned.
    ///
    /// Freeing a stale or already-freed handle is a no-op returning `None`.
    pub fn free(&self, handle: TypedHandle<K>) -> Option<Arc<T>> {
        lock(&self.table).release(handle)
    }
}

impl<K: ResourceKind, T: Send + Sync, const N: usize> HandleResource
    for LimitedIndexedHandleResource<K, T, N>
{
    fn kind(&self) -> HandleKind {
        K::KIND
    }

    fn capacity(&self) -> usize {
        N
    }

    fn live_count(&self) -> usize {
        lock(&self.table).live()
    }

    fn reset(&self) {
        let removed = lock(&self.table).clear();
        drop(removed);
    }
}

impl<K: ResourceKind, T, const N: usize> fmt::Debug for LimitedIndexedHandleResource<K, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimitedIndexedHandleResource")
            .field("kind", &K::KIND)
            .field("capacity", &N)
            .field("max_live", &self.max_live)
            .field("live", &lock(&self.table).live())
            .finish()
    }
}
