//! Digital I/O channels.

use std::sync::atomic::{AtomicBool, Ordering};

use cobalt_common::hal::status::HalError;
use tracing::{debug, warn};

use crate::registry::{DioHandle, HandleRegistry};

/// One digital channel.
#[derive(Debug)]
pub struct DigitalPort {
    channel: u8,
    input: bool,
    value: AtomicBool,
}

impl DigitalPort {
    /// Channel number.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Whether the channel is configured as an input.
    pub fn is_input(&self) -> bool {
        self.input
    }
}

impl HandleRegistry {
    /// Claim a digital channel as input or output.
    ///
    /// # Errors
    /// `ChannelIndexOutOfRange` or `ResourceAlreadyAllocated`.
    pub fn initialize_dio_port(&self, channel: usize, input: bool) -> Result<DioHandle, HalError> {
        let port = DigitalPort {
            channel: channel as u8,
            input,
            value: AtomicBool::new(false),
        };
        let handle = self.dio.allocate(channel, port)?;
        debug!(?handle, input, "dio port initialized");
        Ok(handle)
    }

    /// Drive an output. Writes to an input are ignored.
    pub fn set_dio(&self, handle: DioHandle, value: bool) -> Result<(), HalError> {
        let port = self.dio.get(handle)?;
        if port.input {
            warn!(channel = port.channel, "write to dio input ignored");
            return Ok(());
        }
        port.value.store(value, Ordering::Release);
        Ok(())
    }

    /// Set the level seen on an input (simulation side).
    pub fn sim_set_dio_input(&self, handle: DioHandle, value: bool) -> Result<(), HalError> {
        let port = self.dio.get(handle)?;
        port.value.store(value, Ordering::Release);
        Ok(())
    }

    /// Read the current level.
    pub fn get_dio(&self, handle: DioHandle) -> Result<bool, HalError> {
        Ok(self.dio.get(handle)?.value.load(Ordering::Acquire))
    }

    /// Release a channel. Stale handles are ignored.
    pub fn free_dio_port(&self, handle: DioHandle) {
        self.dio.free(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_round_trip() {
        let reg = HandleRegistry::default();
        let h = reg.initialize_dio_port(4, false).unwrap();
        reg.set_dio(h, true).unwrap();
        assert!(reg.get_dio(h).unwrap());
    }

    #[test]
    fn writes_to_input_are_ignored() {
        let reg = HandleRegistry::default();
        let h = reg.initialize_dio_port(0, true).unwrap();
        reg.set_dio(h, true).unwrap();
        assert!(!reg.get_dio(h).unwrap());
        reg.sim_set_dio_input(h, true).unwrap();
        assert!(reg.get_dio(h).unwrap());
    }

    #[test]
    fn freed_port_rejects_access() {
        let reg = HandleRegistry::default();
        let h = reg.initialize_dio_port(1, false).unwrap();
        reg.free_dio_port(h);
        reg.free_dio_port(h);
        assert_eq!(reg.get_dio(h), Err(HalError::InvalidHandle));
        assert!(reg.initialize_dio_port(1, false).is_ok());
    }
}
