//! Demo robot program.
//!
//! A two-motor drive base with an encoder and a roller intake with a
//! beam-break sensor, wired to HAL handles. Subsystem periodic callbacks
//! play the part of the physical world: the drive encoder integrates motor
//! output and a game piece reaches the beam break after the roller has
//! spun for [`PIECE_TICKS`] ticks.
//!
//! The autonomous routine drives [`AUTO_DISTANCE`] counts (with a timeout),
//! then runs the intake until the beam breaks. A HAL notifier blinks the
//! status LED through a trigger binding.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use cobalt_command::{
    Clock, Command, CommandScheduler, FunctionalCommand, RunCommand, StartEndCommand, Subsystem,
    Trigger,
};
use cobalt_common::hal::status::HalError;
use cobalt_hal::registry::{
    CounterHandle, DioHandle, EncoderHandle, InterruptHandle, PwmHandle,
};
use cobalt_hal::{AlarmFlag, HandleRegistry, Notifier};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SimError;

// ─── Wiring ─────────────────────────────────────────────────────────

const LEFT_PWM: usize = 0;
const RIGHT_PWM: usize = 1;
const ROLLER_PWM: usize = 2;
const ENCODER_A: usize = 0;
const ENCODER_B: usize = 1;
const BEAM_DIO: usize = 2;
const LED_DIO: usize = 3;
const BEAM_INTERRUPT: usize = 0;

/// Encoder counts per tick at full drive output.
const COUNTS_PER_TICK: f64 = 20.0;
/// Roller ticks until a piece reaches the beam break.
pub const PIECE_TICKS: u32 = 15;
/// Autonomous drive distance [encoder counts].
pub const AUTO_DISTANCE: i64 = 200;
/// Autonomous drive output.
const AUTO_SPEED: f64 = 0.5;
/// Autonomous drive timeout.
const AUTO_TIMEOUT: Duration = Duration::from_secs(2);
/// Status LED blink period.
const HEARTBEAT_PERIOD: Duration = Duration::from_millis(250);

/// Log a failed HAL call and turn it into `None`.
fn hal<T>(result: Result<T, HalError>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(what, code = e.code(), "HAL call failed: {e}");
            None
        }
    }
}

/// HAL handles of the robot. Nothing frees them explicitly: the registry
/// reset between runs reclaims every one.
struct Io {
    registry: Arc<HandleRegistry>,
    left: PwmHandle,
    right: PwmHandle,
    roller: PwmHandle,
    encoder: EncoderHandle,
    beam: DioHandle,
    led: DioHandle,
    beam_edges: InterruptHandle,
    pieces: CounterHandle,
}

impl Io {
    fn open(registry: Arc<HandleRegistry>) -> Result<Self, HalError> {
        Ok(Self {
            left: registry.initialize_pwm_port(LEFT_PWM)?,
            right: registry.initialize_pwm_port(RIGHT_PWM)?,
            roller: registry.initialize_pwm_port(ROLLER_PWM)?,
            encoder: registry.initialize_encoder(ENCODER_A, ENCODER_B)?,
            beam: registry.initialize_dio_port(BEAM_DIO, true)?,
            led: registry.initialize_dio_port(LED_DIO, false)?,
            beam_edges: registry.initialize_interrupt(BEAM_INTERRUPT)?,
            pieces: registry.initialize_counter()?,
            registry,
        })
    }

    fn set_drive(&self, speed: f64) {
        hal(self.registry.set_pwm_speed(self.left, speed), "left drive");
        hal(self.registry.set_pwm_speed(self.right, speed), "right drive");
    }

    fn set_roller(&self, speed: f64) {
        hal(self.registry.set_pwm_speed(self.roller, speed), "roller");
    }

    fn distance(&self) -> i64 {
        hal(self.registry.get_encoder_count(self.encoder), "encoder").unwrap_or_default()
    }

    fn beam_broken(&self) -> bool {
        hal(self.registry.get_dio(self.beam), "beam break").unwrap_or(false)
    }
}

// ─── Simulated World ────────────────────────────────────────────────

fn simulate_drive(io: &Io) {
    let Some(speed) = hal(io.registry.get_pwm_speed(io.left), "left drive") else {
        return;
    };
    let moved = (speed * COUNTS_PER_TICK).round() as i64;
    if moved != 0 {
        hal(
            io.registry.set_encoder_count(io.encoder, io.distance() + moved),
            "encoder",
        );
    }
}

fn simulate_intake(io: &Io, spun: &Cell<u32>) {
    let running = hal(io.registry.get_pwm_speed(io.roller), "roller").is_some_and(|s| s > 0.0);
    let before = spun.get() >= PIECE_TICKS;
    spun.set(if running { spun.get().saturating_add(1) } else { 0 });
    let after = spun.get() >= PIECE_TICKS;
    if after != before {
        hal(io.registry.sim_set_dio_input(io.beam, after), "beam break");
        if after {
            hal(io.registry.sim_fire_interrupt(io.beam_edges), "beam interrupt");
        }
    }
}

// ─── Robot ──────────────────────────────────────────────────────────

/// End-of-run observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RobotReport {
    /// Drive encoder count.
    pub distance: i64,
    /// Pieces counted by the beam-break binding.
    pub pieces: i64,
    /// Beam-break interrupt edges.
    pub beam_edges: u64,
    /// Status LED toggles.
    pub heartbeats: u64,
}

/// Subsystems, commands and bindings of the demo robot.
pub struct Robot {
    drive: Subsystem,
    intake: Subsystem,
    io: Rc<Io>,
    autonomous: Command,
    heartbeats: Rc<Cell<u64>>,
    _heartbeat: Notifier,
}

impl Robot {
    /// Claim the robot's HAL resources and register its subsystems and
    /// bindings with `scheduler`.
    ///
    /// # Errors
    /// [`SimError::Hal`] if a channel is still held (the registry was not
    /// reset since the previous run).
    pub fn new(
        registry: Arc<HandleRegistry>,
        scheduler: &CommandScheduler,
        clock: &Clock,
    ) -> Result<Self, SimError> {
        let io = Rc::new(Io::open(Arc::clone(&registry))?);

        let drive = {
            let io = Rc::clone(&io);
            Subsystem::with_periodic("drive", move || simulate_drive(&io))
        };
        let intake = {
            let io = Rc::clone(&io);
            let spun = Cell::new(0);
            Subsystem::with_periodic("intake", move || simulate_intake(&io, &spun))
        };
        scheduler.register_subsystem(&intake)?;

        let idle = {
            let io = Rc::clone(&io);
            Command::builder("drive idle")
                .requires(&drive)
                .build(RunCommand::new(move || io.set_drive(0.0)))
        };
        scheduler.set_default_command(&drive, idle)?;

        let autonomous = Self::autonomous(&io, &drive, &intake, clock)?;

        // Count each piece once, on the beam-break edge.
        let beam = {
            let io = Rc::clone(&io);
            Trigger::new(move || io.beam_broken())
        };
        {
            let io = Rc::clone(&io);
            scheduler.bind_action(beam.rising(), move || {
                if let Some(count) = hal(io.registry.increment_counter(io.pieces), "pieces") {
                    info!(pieces = count, "piece collected");
                }
            });
        }

        let alarm = AlarmFlag::new();
        let heartbeat = {
            let alarm = alarm.clone();
            Notifier::new(registry, "heartbeat", move || alarm.raise())?
        };
        heartbeat.start_periodic(HEARTBEAT_PERIOD)?;
        let heartbeats = Rc::new(Cell::new(0));
        {
            let io = Rc::clone(&io);
            let heartbeats = Rc::clone(&heartbeats);
            scheduler.bind_action(Trigger::new(move || alarm.take()), move || {
                let lit = hal(io.registry.get_dio(io.led), "status LED").unwrap_or(false);
                hal(io.registry.set_dio(io.led, !lit), "status LED");
                heartbeats.set(heartbeats.get() + 1);
            });
        }

        debug!("robot program built");
        Ok(Self {
            drive,
            intake,
            io,
            autonomous,
            heartbeats,
            _heartbeat: heartbeat,
        })
    }

    /// Drive forward, then intake until a piece arrives.
    fn autonomous(
        io: &Rc<Io>,
        drive: &Subsystem,
        intake: &Subsystem,
        clock: &Clock,
    ) -> Result<Command, SimError> {
        let forward = {
            let (reset, run, stop, done) = (Rc::clone(io), Rc::clone(io), Rc::clone(io), Rc::clone(io));
            Command::builder("drive forward")
                .requires(drive)
                .build(FunctionalCommand::new(
                    move || {
                        hal(reset.registry.set_encoder_count(reset.encoder, 0), "encoder");
                    },
                    move || run.set_drive(AUTO_SPEED),
                    move |_interrupted| stop.set_drive(0.0),
                    move || done.distance() >= AUTO_DISTANCE,
                ))
                .with_timeout(AUTO_TIMEOUT, clock)?
        };

        let collect = {
            let (start, stop, sensor) = (Rc::clone(io), Rc::clone(io), Rc::clone(io));
            Command::builder("collect")
                .requires(intake)
                .build(StartEndCommand::new(
                    move || start.set_roller(1.0),
                    move || stop.set_roller(0.0),
                ))
                .until(move || sensor.beam_broken())?
        };

        Ok(forward.and_then(collect)?)
    }

    /// Schedule the autonomous routine.
    ///
    /// # Errors
    /// [`SimError::Schedule`] if it is already running or the scheduler is
    /// disabled.
    pub fn start_autonomous(&self, scheduler: &CommandScheduler) -> Result<(), SimError> {
        scheduler.schedule(&self.autonomous)?;
        info!(command = self.autonomous.name(), "autonomous started");
        Ok(())
    }

    /// Drive subsystem.
    pub fn drive(&self) -> &Subsystem {
        &self.drive
    }

    /// Intake subsystem.
    pub fn intake(&self) -> &Subsystem {
        &self.intake
    }

    /// Current observations.
    pub fn report(&self) -> RobotReport {
        let io = &self.io;
        RobotReport {
            distance: io.distance(),
            pieces: hal(io.registry.get_counter(io.pieces), "pieces").unwrap_or_default(),
            beam_edges: hal(io.registry.interrupt_count(io.beam_edges), "beam interrupt")
                .unwrap_or_default(),
            heartbeats: self.heartbeats.get(),
        }
    }
}
