//! Indexed manager: the caller supplies the index (a hardware channel).

use std::fmt;
use std::sync::{Arc, Mutex};

use cobalt_common::hal::handle::{HandleKind, ResourceKind, TypedHandle};
use cobalt_common::hal::status::HalError;

use super::slot::SlotTable;
use super::{HandleResource, lock};

/// `N` channel-addressed resources of kind `K`.
pub struct IndexedHandleResource<K: ResourceKind, T, const N: usize> {
    table: Mutex<SlotTable<K, T, N>>,
}

impl<K: ResourceKind, T, const N: usize> IndexedHandleResource<K, T, N> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(SlotTable::new()),
        }
    }

    /// Store `resource` at channel `index`.
    ///
    /// # Errors
    /// - `HalError::ChannelIndexOutOfRange` if `index >= N`
    /// - `HalError::ResourceAlreadyAllocated` if the channel is in use
    pub fn allocate(&self, index: usize, resource: T) -> Result<TypedHandle<K>, HalError> {
        self.allocate_pair(index, 0, resource)
    }

    /// Store `resource` at channel `index`, tagging the handle with a
    /// secondary index. Lookups require both indices to match.
    ///
    /// # Errors
    /// Same as [`allocate`](Self::allocate).
    pub fn allocate_pair(
        &self,
        index: usize,
        index2: u8,
        resource: T,
    ) -> Result<TypedHandle<K>, HalError> {
        if index >= N {
            return Err(HalError::ChannelIndexOutOfRange { index, capacity: N });
        }
        let mut table = lock(&self.table);
        if !table.is_free(index) {
            return Err(HalError::ResourceAlreadyAllocated { index });
        }
        Ok(table.occupy(index, index2, resource))
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

    /// Whether channel `index` is currently allocated.
    pub fn is_allocated(&self, index: usize) -> bool {
        index < N && !lock(&self.table).is_free(index)
    }

    /// Handles and resources of every occupied slot.
    pub fn live_entries(&self) -> Vec<(TypedHandle<K>, Arc<T>)> {
        lock(&self.table).live_entries()
    }
}

impl<K: ResourceKind, T, const N: usize> Default for IndexedHandleResource<K, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ResourceKind, T: Send + Sync, const N: usize> HandleResource
    for IndexedHandleResource<K, T, N>
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

impl<K: ResourceKind, T, const N: usize> fmt::Debug for IndexedHandleResource<K, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedHandleResource")
            .field("kind", &K::KIND)
            .field("capacity", &N)
            .field("live", &lock(&self.table).live())
            .finish()
    }
}
