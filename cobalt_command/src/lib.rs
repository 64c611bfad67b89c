//! # Cobalt Command
//!
//! Cooperative, tick-driven command framework for robot control code.
//!
//! Robot behavior is split into [`Command`]s that require [`Subsystem`]s.
//! The [`CommandScheduler`] runs once per control period: it polls
//! [`Trigger`] bindings, advances every scheduled command by one step and
//! keeps each subsystem's default command running whenever nothing else
//! owns it. Everything runs on the caller's thread; nothing here blocks.
//!
//! # Module Structure
//!
//! - [`command`] - commands, the behavior trait, groups and decorators
//! - [`scheduler`] - [`CommandScheduler`], lifecycle events, tick statistics
//! - [`subsystem`] - [`Subsystem`] ownership domains
//! - [`trigger`] - polled conditions with edge and debounce combinators
//! - [`clock`] - monotonic and manual time sources
//! - [`error`] - composition and scheduling errors
//!
//! # Example
//!
//! ```rust
//! use cobalt_command::{Command, CommandScheduler, InstantCommand, RunCommand, Subsystem};
//!
//! let scheduler = CommandScheduler::default();
//! let drive = Subsystem::new("drive");
//! let idle = Command::builder("idle")
//!     .requires(&drive)
//!     .build(RunCommand::new(|| {}));
//! scheduler.set_default_command(&drive, idle.clone()).unwrap();
//!
//! scheduler.run();
//! assert_eq!(scheduler.requiring(&drive), Some(idle));
//!
//! let stop = Command::builder("stop")
//!     .requires(&drive)
//!     .build(InstantCommand::new(|| {}));
//! scheduler.schedule(&stop).unwrap();
//! assert_eq!(scheduler.requiring(&drive), Some(stop));
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod command;
pub mod error;
pub mod scheduler;
pub mod subsystem;
pub mod trigger;

pub use crate::clock::Clock;
pub use crate::command::{
    Command, CommandBehavior, CommandBuilder, CommandKind, CommandState, FunctionalCommand,
    InstantCommand, InterruptionBehavior, RunCommand, StartEndCommand, WaitCommand,
    WaitUntilCommand,
};
pub use crate::error::{CommandError, ScheduleError};
pub use crate::scheduler::{CommandEvent, CommandScheduler, TickStats};
pub use crate::subsystem::Subsystem;
pub use crate::trigger::{DebounceKind, Trigger};
