//! Runner errors.

use cobalt_command::{CommandError, ScheduleError};
use cobalt_common::hal::status::HalError;
use cobalt_hal::NotifierError;
use thiserror::Error;

/// Failure while building or starting the robot program.
#[derive(Debug, Error)]
pub enum SimError {
    /// A HAL resource could not be allocated.
    #[error("HAL resource: {0}")]
    Hal(#[from] HalError),

    /// A notifier could not be started.
    #[error("notifier: {0}")]
    Notifier(#[from] NotifierError),

    /// A command group could not be composed.
    #[error("command setup: {0}")]
    Command(#[from] CommandError),

    /// A command or subsystem was rejected by the scheduler.
    #[error("scheduler: {0}")]
    Schedule(#[from] ScheduleError),
}
