//! Command scheduler configuration.
//!
//! ```toml
//! [scheduler]
//! period_ms = 20
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ConfigError;
use crate::consts::DEFAULT_TICK_PERIOD_MS;

/// Scheduler tick configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Nominal control-loop period [ms]. A tick taking longer is an overrun.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

fn default_period_ms() -> u64 {
    DEFAULT_TICK_PERIOD_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_TICK_PERIOD_MS,
        }
    }
}

impl SchedulerConfig {
    /// Tick period as Duration.
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `period_ms` is 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.period_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
