//! Analog inputs.

use std::sync::atomic::{AtomicU64, Ordering};

use cobalt_common::hal::status::HalError;

use crate::registry::{AnalogInputHandle, HandleRegistry};

/// Analog input channel. Voltage is stored as `f64` bits.
#[derive(Debug)]
pub struct AnalogInputPort {
    channel: u8,
    voltage_bits: AtomicU64,
}

impl AnalogInputPort {
    /// Channel number.
    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl HandleRegistry {
    /// Claim an analog input channel (reads 0 V until driven).
    pub fn initialize_analog_input(&self, channel: usize) -> Result<AnalogInputHandle, HalError> {
        self.analog_inputs.allocate(
            channel,
            AnalogInputPort {
                channel: channel as u8,
                voltage_bits: AtomicU64::new(0f64.to_bits()),
            },
        )
    }

    /// Drive the voltage seen on a channel (simulation side).
    pub fn sim_set_analog_voltage(
        &self,
        handle: AnalogInputHandle,
        volts: f64,
    ) -> Result<(), HalError> {
        self.analog_inputs
            .get(handle)?
            .voltage_bits
            .store(volts.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Current voltage.
    pub fn get_analog_voltage(&self, handle: AnalogInputHandle) -> Result<f64, HalError> {
        let bits = self.analog_inputs.get(handle)?.voltage_bits.load(Ordering::Acquire);
        Ok(f64::from_bits(bits))
    }

    /// Release a channel. Stale handles are ignored.
    pub fn free_analog_input(&self, handle: AnalogInputHandle) {
        self.analog_inputs.free(handle);
    }
}
