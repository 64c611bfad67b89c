//! Up counters.

use std::sync::atomic::{AtomicI64, Ordering};

use cobalt_common::hal::status::HalError;

use crate::registry::{CounterHandle, HandleRegistry};

/// Counter resource.
#[derive(Debug, Default)]
pub struct CounterState {
    count: AtomicI64,
}

impl HandleRegistry {
    /// Allocate a counter in the first free slot.
    ///
    /// # Errors
    /// `HalError::NoAvailableResources` when every counter is in use.
    pub fn initialize_counter(&self) -> Result<CounterHandle, HalError> {
        self.counters.allocate(CounterState::default())
    }

    /// Add one and return the new count.
    pub fn increment_counter(&self, handle: CounterHandle) -> Result<i64, HalError> {
        Ok(self.counters.get(handle)?.count.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Current count.
    pub fn get_counter(&self, handle: CounterHandle) -> Result<i64, HalError> {
        Ok(self.counters.get(handle)?.count.load(Ordering::Acquire))
    }

    /// Zero the count.
    pub fn reset_counter(&self, handle: CounterHandle) -> Result<(), HalError> {
        self.counters.get(handle)?.count.store(0, Ordering::Release);
        Ok(())
    }

    /// Release a counter. Stale handles are ignored.
    pub fn free_counter(&self, handle: CounterHandle) {
        self.counters.free(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobalt_common::hal::consts::NUM_COUNTERS;

    #[test]
    fn counts_and_resets() {
        let reg = HandleRegistry::default();
        let h = reg.initialize_counter().unwrap();
        assert_eq!(reg.increment_counter(h).unwrap(), 1);
        assert_eq!(reg.increment_counter(h).unwrap(), 2);
        reg.reset_counter(h).unwrap();
        assert_eq!(reg.get_counter(h).unwrap(), 0);
    }

    #[test]
    fn exhaustion_then_reuse_lowest_slot() {
        let reg = HandleRegistry::default();
        let handles: Vec<_> = (0..NUM_COUNTERS)
            .map(|_| reg.initialize_counter().unwrap())
            .collect();
        assert_eq!(
            reg.initialize_counter(),
            Err(HalError::NoAvailableResources {
                capacity: NUM_COUNTERS
            })
        );
        reg.free_counter(handles[2]);
        let again = reg.initialize_counter().unwrap();
        assert_eq!(again.index(), 2);
        assert_ne!(again, handles[2]);
    }
}
