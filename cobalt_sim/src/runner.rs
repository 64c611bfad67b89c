//! One simulation run: build the robot, tick the scheduler, report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use cobalt_command::{Clock, CommandEvent, CommandScheduler, Subsystem, TickStats};
use cobalt_hal::{HandleRegistry, RegistrySnapshot};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::robot::{Robot, RobotReport};

/// Tick timing of one run, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub ticks: u64,
    pub max_us: u64,
    pub avg_us: u64,
    pub overruns: u64,
}

impl From<TickStats> for TickSummary {
    fn from(stats: TickStats) -> Self {
        Self {
            ticks: stats.ticks,
            max_us: stats.max.as_micros() as u64,
            avg_us: stats.average().as_micros() as u64,
            overruns: stats.overruns,
        }
    }
}

/// Everything printed after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run: u32,
    /// Stopped early by a shutdown signal.
    pub interrupted: bool,
    pub timing: TickSummary,
    pub robot: RobotReport,
    /// Command owning the drive when the run ended.
    pub drive_owner: Option<String>,
    /// Command owning the intake when the run ended.
    pub intake_owner: Option<String>,
    /// Registry occupancy before the reset that follows the run.
    pub handles: RegistrySnapshot,
}

/// Run the robot program for up to `ticks_per_run` ticks.
///
/// Leaves the robot's HAL handles allocated; the caller resets the
/// registry before the next run.
///
/// # Errors
/// [`SimError`] if the robot cannot be built or started.
pub fn run_once(
    run: u32,
    registry: &Arc<HandleRegistry>,
    config: &SimConfig,
    running: &AtomicBool,
) -> Result<RunSummary, SimError> {
    let clock = if config.sim.realtime {
        Clock::monotonic()
    } else {
        Clock::manual()
    };
    let scheduler = CommandScheduler::new(&config.scheduler);
    scheduler.on_command_event(CommandEvent::all(), |command, event| {
        debug!(command = command.name(), ?event, "command event");
    });

    let robot = Robot::new(Arc::clone(registry), &scheduler, &clock)?;
    robot.start_autonomous(&scheduler)?;

    let period = scheduler.period();
    let mut deadline = Instant::now();
    let mut interrupted = false;
    for _ in 0..config.sim.ticks_per_run {
        if !running.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }
        scheduler.run();
        if config.sim.realtime {
            deadline += period;
            if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        } else {
            clock.advance(period);
        }
    }

    let owner = |subsystem: &Subsystem| scheduler.requiring(subsystem).map(|c| c.name().to_string());
    let summary = RunSummary {
        run,
        interrupted,
        timing: scheduler.stats().into(),
        robot: robot.report(),
        drive_owner: owner(robot.drive()),
        intake_owner: owner(robot.intake()),
        handles: registry.snapshot(),
    };
    scheduler.cancel_all();

    info!(
        run,
        ticks = summary.timing.ticks,
        pieces = summary.robot.pieces,
        overruns = summary.timing.overruns,
        "run complete"
    );
    Ok(summary)
}
