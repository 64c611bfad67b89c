//! Fixed-capacity slot table with per-slot generation counters.
//!
//! The table is the unlocked core shared by all three manager flavors.
//! Managers wrap it in a `Mutex`; nothing in here synchronizes.

use std::marker::PhantomData;
use std::sync::Arc;

use cobalt_common::hal::handle::{MAX_HANDLE_INDEX, ResourceKind, TypedHandle, next_generation};

/// Generation stamped into a slot before its first allocation.
pub const INITIAL_GENERATION: u8 = 1;

/// One resource slot.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    resource: Option<Arc<T>>,
    generation: u8,
    index2: u8,
}

impl<T> Slot<T> {
    const fn vacant() -> Self {
        Self {
            resource: None,
            generation: INITIAL_GENERATION,
            index2: 0,
        }
    }

    #[inline]
    fn is_occupied(&self) -> bool {
        self.resource.is_some()
    }
}

/// `N` slots holding resources of kind `K`.
#[derive(Debug)]
pub(crate) struct SlotTable<K: ResourceKind, T, const N: usize> {
    slots: [Slot<T>; N],
    live: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind, T, const N: usize> SlotTable<K, T, N> {
    pub(crate) fn new() -> Self {
        const {
            assert!(N > 0 && N <= MAX_HANDLE_INDEX + 1, "slot capacity must fit a handle index");
        }
        Self {
            slots: std::array::from_fn(|_| Slot::vacant()),
            live: 0,
            _kind: PhantomData,
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub(crate) fn is_free(&self, index: usize) -> bool {
        !self.slots[index].is_occupied()
    }

    /// Lowest free index.
    pub(crate) fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.is_occupied())
    }

    /// Current generation of a slot (test and diagnostics only).
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn generation(&self, index: usize) -> u8 {
        self.slots[index].generation
    }

    /// Place `resource` in a free slot and stamp the returned handle.
    ///
    /// Caller guarantees `index < N` and that the slot is free.
    pub(crate) fn occupy(&mut self, index: usize, index2: u8, resource: T) -> TypedHandle<K> {
        debug_assert!(self.is_free(index));
        let slot = &mut self.slots[index];
        slot.resource = Some(Arc::new(resource));
        slot.index2 = index2;
        self.live += 1;
        // Generation is never 0, so encoding cannot fail.
        match TypedHandle::encode(index as u8, index2, slot.generation) {
            Some(handle) => handle,
            None => unreachable!("slot generation is never 0"),
        }
    }

    /// Slot index of a handle if it refers to the current occupant.
    fn resolve(&self, handle: TypedHandle<K>) -> Option<usize> {
        let decoded = handle.decoded();
        let index = decoded.index as usize;
        let slot = self.slots.get(index)?;
        (slot.is_occupied()
            && slot.generation == decoded.generation
            && slot.index2 == decoded.index2)
            .then_some(index)
    }

    /// Shared reference to the occupant, if the handle is current.
    pub(crate) fn get(&self, handle: TypedHandle<K>) -> Option<Arc<T>> {
        let index = self.resolve(handle)?;
        self.slots[index].resource.clone()
    }

    /// Vacate the slot a current handle refers to and advance its
    /// generation. Stale or foreign handles return `None` and change nothing.
    pub(crate) fn release(&mut self, handle: TypedHandle<K>) -> Option<Arc<T>> {
        let index = self.resolve(handle)?;
        Some(self.vacate(index))
    }

    fn vacate(&mut self, index: usize) -> Arc<T> {
        let slot = &mut self.slots[index];
        let resource = slot.resource.take();
        slot.generation = next_generation(slot.generation);
        slot.index2 = 0;
        self.live -= 1;
        match resource {
            Some(resource) => resource,
            None => unreachable!("vacate called on a free slot"),
        }
    }

    /// Vacate every occupied slot. Generations advance exactly as for a
    /// free, so handles issued before the clear stay invalid afterwards.
    pub(crate) fn clear(&mut self) -> Vec<Arc<T>> {
        let occupied: Vec<usize> = (0..N).filter(|&i| !self.is_free(i)).collect();
        occupied.into_iter().map(|i| self.vacate(i)).collect()
    }

    /// Handles and resources of every occupied slot, in index order.
    pub(crate) fn live_entries(&self) -> Vec<(TypedHandle<K>, Arc<T>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let resource = slot.resource.clone()?;
                let handle = TypedHandle::encode(index as u8, slot.index2, slot.generation)?;
                Some((handle, resource))
            })
            .collect()
    }
}
