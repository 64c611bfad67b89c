//! HAL configuration.
//!
//! ```toml
//! [hal]
//! interrupt_max_live = 8
//! ```

use serde::{Deserialize, Serialize};

use super::consts::{DEFAULT_INTERRUPT_MAX_LIVE, NUM_INTERRUPTS};
use crate::config::ConfigError;

/// Handle registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HalConfig {
    /// Ceiling on concurrently allocated interrupts (shared hardware bank).
    #[serde(default = "default_interrupt_max_live")]
    pub interrupt_max_live: usize,
}

fn default_interrupt_max_live() -> usize {
    DEFAULT_INTERRUPT_MAX_LIVE
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            interrupt_max_live: DEFAULT_INTERRUPT_MAX_LIVE,
        }
    }
}

impl HalConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `interrupt_max_live` is 0
    /// or larger than the interrupt slot count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interrupt_max_live == 0 || self.interrupt_max_live > NUM_INTERRUPTS {
            return Err(ConfigError::ValidationError(format!(
                "hal.interrupt_max_live must be in [1, {NUM_INTERRUPTS}], got {}",
                self.interrupt_max_live
            )));
        }
        Ok(())
    }
}
