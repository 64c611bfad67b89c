//! PWM outputs.

use std::sync::atomic::{AtomicU64, Ordering};

use cobalt_common::hal::status::HalError;

use crate::registry::{HandleRegistry, PwmHandle};

/// One PWM channel. Speed is stored as `f64` bits.
#[derive(Debug)]
pub struct PwmPort {
    channel: u8,
    speed_bits: AtomicU64,
}

impl PwmPort {
    /// Channel number.
    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl HandleRegistry {
    /// Claim a PWM channel (speed starts at 0).
    pub fn initialize_pwm_port(&self, channel: usize) -> Result<PwmHandle, HalError> {
        self.pwm.allocate(
            channel,
            PwmPort {
                channel: channel as u8,
                speed_bits: AtomicU64::new(0f64.to_bits()),
            },
        )
    }

    /// Set speed, clamped to `[-1, 1]`. NaN is treated as 0.
    pub fn set_pwm_speed(&self, handle: PwmHandle, speed: f64) -> Result<(), HalError> {
        let speed = if speed.is_nan() { 0.0 } else { speed.clamp(-1.0, 1.0) };
        self.pwm
            .get(handle)?
            .speed_bits
            .store(speed.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Current speed.
    pub fn get_pwm_speed(&self, handle: PwmHandle) -> Result<f64, HalError> {
        let bits = self.pwm.get(handle)?.speed_bits.load(Ordering::Acquire);
        Ok(f64::from_bits(bits))
    }

    /// Release a channel. Stale handles are ignored.
    pub fn free_pwm_port(&self, handle: PwmHandle) {
        self.pwm.free(handle);
    }
}
