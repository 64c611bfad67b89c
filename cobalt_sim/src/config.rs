//! `robot.toml` for the simulation runner.
//!
//! ```toml
//! [shared]
//! service_name = "cobalt-sim"
//! log_level = "info"
//!
//! [hal]
//! interrupt_max_live = 8
//!
//! [scheduler]
//! period_ms = 20
//!
//! [sim]
//! runs = 2
//! ticks_per_run = 150
//! realtime = true
//! ```
//!
//! Every section is optional and falls back to its defaults.

use cobalt_common::config::{ConfigError, SharedConfig};
use cobalt_common::hal::config::HalConfig;
use cobalt_common::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Default number of runs.
pub const DEFAULT_RUNS: u32 = 2;
/// Default ticks per run (3 s at 50 Hz).
pub const DEFAULT_TICKS_PER_RUN: u64 = 150;

/// Whole runner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub hal: HalConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sim: SimSection,
}

/// `[sim]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimSection {
    /// Robot program restarts; handles are reset between runs.
    #[serde(default = "default_runs")]
    pub runs: u32,
    /// Scheduler ticks per run.
    #[serde(default = "default_ticks_per_run")]
    pub ticks_per_run: u64,
    /// Pace ticks to the scheduler period on the wall clock. When false,
    /// ticks run back to back on a manual clock advanced by one period each.
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

fn default_runs() -> u32 {
    DEFAULT_RUNS
}

fn default_ticks_per_run() -> u64 {
    DEFAULT_TICKS_PER_RUN
}

fn default_realtime() -> bool {
    true
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            runs: DEFAULT_RUNS,
            ticks_per_run: DEFAULT_TICKS_PER_RUN,
            realtime: true,
        }
    }
}

impl SimConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// The first section's `ConfigError::ValidationError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.hal.validate()?;
        self.scheduler.validate()?;
        if self.sim.runs == 0 {
            return Err(ConfigError::ValidationError(
                "sim.runs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
