//! Digital interrupts.
//!
//! Interrupts live on the limited-indexed manager: any of the slots may be
//! addressed, but only a configured number may be live at once.

use std::sync::atomic::{AtomicU64, Ordering};

use cobalt_common::hal::status::HalError;
use tracing::debug;

use crate::registry::{HandleRegistry, InterruptHandle};

/// Interrupt resource.
#[derive(Debug)]
pub struct InterruptPort {
    channel: u8,
    fired: AtomicU64,
    last_fire_us: AtomicU64,
}

impl InterruptPort {
    /// Channel number.
    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl HandleRegistry {
    /// Claim an interrupt on `channel`.
    ///
    /// # Errors
    /// `ChannelIndexOutOfRange`, `ResourceAlreadyAllocated` or
    /// `ResourceExhausted` once the live ceiling is reached.
    pub fn initialize_interrupt(&self, channel: usize) -> Result<InterruptHandle, HalError> {
        let handle = self.interrupts.allocate(
            channel,
            InterruptPort {
                channel: channel as u8,
                fired: AtomicU64::new(0),
                last_fire_us: AtomicU64::new(0),
            },
        )?;
        debug!(?handle, "interrupt initialized");
        Ok(handle)
    }

    /// Record an edge on the interrupt (simulation side).
    pub fn sim_fire_interrupt(&self, handle: InterruptHandle) -> Result<(), HalError> {
        let port = self.interrupts.get(handle)?;
        port.last_fire_us.store(self.hal_time_us(), Ordering::Release);
        port.fired.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Edges recorded since allocation.
    pub fn interrupt_count(&self, handle: InterruptHandle) -> Result<u64, HalError> {
        Ok(self.interrupts.get(handle)?.fired.load(Ordering::Acquire))
    }

    /// HAL time of the most recent edge, `0` if none.
    pub fn interrupt_last_fire_us(&self, handle: InterruptHandle) -> Result<u64, HalError> {
        Ok(self.interrupts.get(handle)?.last_fire_us.load(Ordering::Acquire))
    }

    /// Release an interrupt. Stale handles are ignored.
    pub fn free_interrupt(&self, handle: InterruptHandle) {
        self.interrupts.free(handle);
    }
}
