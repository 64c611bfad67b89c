//! Simple manager: the manager picks the index (first fit).

use std::fmt;
use std::sync::{Arc, Mutex};

use cobalt_common::hal::handle::{HandleKind, ResourceKind, TypedHandle};
use cobalt_common::hal::status::HalError;

use super::slot::SlotTable;
use super::{HandleResource, lock};

/// Up to `N` resources of kind `K`, index chosen by first-fit scan.
pub struct LimitedHandleResource<K: ResourceKind, T, const N: usize> {
    table: Mutex<SlotTable<K, T, N>>,
}

impl<K: ResourceKind, T, const N: usize> LimitedHandleResource<K, T, N> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(SlotTable::new()),
        }
    }

    /// Store `resource` in the lowest free slot.
    ///
    /// # Errors
    /// `HalError::NoAvailableResources` when all `N` slots are occupied.
    pub fn allocate(&self, resource: T) -> Result<TypedHandle<K>, HalError> {
        let mut table = lock(&self.table);
        let index = table
            .first_free()
            .ok_or(HalError::NoAvailableResources { capacity: N })?;
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

    /// Free every slot, calling `on_removed` for each resource while the
    /// table is still locked. No allocation interleaves with the calls.
    pub fn reset_with(&self, mut on_removed: impl FnMut(&T)) -> Vec<Arc<T>> {
        let mut table = lock(&self.table);
        let removed = table.clear();
        for resource in &removed {
            on_removed(resource);
        }
        removed
    }

    /// Handles and resources of every occupied slot.
    pub fn live_entries(&self) -> Vec<(TypedHandle<K>, Arc<T>)> {
        lock(&self.table).live_entries()
    }
}

impl<K: ResourceKind, T, const N: usize> Default for LimitedHandleResource<K, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ResourceKind, T: Send + Sync, const N: usize> HandleResource
    for LimitedHandleResource<K, T, N>
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
        // Resources drop after the lock is released.
        let removed = lock(&self.table).clear();
        drop(removed);
    }
}

impl<K: ResourceKind, T, const N: usize> fmt::Debug for LimitedHandleResource<K, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimitedHandleResource")
            .field("kind", &K::KIND)
            .field("capacity", &N)
            .field("live", &lock(&self.table).live())
            .finish()
    }
}
