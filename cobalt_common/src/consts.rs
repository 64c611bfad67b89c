//! System-wide constants for the Cobalt workspace.
//!
//! Single source of truth for default periods and paths.

use std::time::Duration;

/// Default scheduler tick period in milliseconds (50 Hz control loop).
pub const DEFAULT_TICK_PERIOD_MS: u64 = 20;

/// Default scheduler tick period as Duration.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(DEFAULT_TICK_PERIOD_MS);

/// Default configuration file path for the simulation runner.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cobalt/robot.toml";

/// Canonical service name used in logs when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "cobalt";
