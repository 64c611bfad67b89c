//! Error types for command composition and scheduling.
//!
//! Both are misuse signals: they fail the one offending call and leave the
//! scheduler untouched. Re-entrant structural modification of a running
//! scheduler is not an error value; it panics.

use thiserror::Error;

/// Errors raised while composing commands into groups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The child already belongs to a group (or appears twice in this one).
    #[error("command `{command}` is already part of a group")]
    AlreadyComposed {
        /// Child name.
        command: String,
    },

    /// The child is currently scheduled on its own.
    #[error("command `{command}` is scheduled and cannot be composed")]
    ChildScheduled {
        /// Child name.
        command: String,
    },

    /// Two children of a concurrent group require the same subsystem.
    #[error("commands `{first}` and `{second}` both require subsystem `{subsystem}`")]
    RequirementOverlap {
        /// Earlier child.
        first: String,
        /// Later child.
        second: String,
        /// Shared subsystem.
        subsystem: String,
    },
}

/// Errors returned by [`CommandScheduler`](crate::CommandScheduler) calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Grouped commands run only through their group.
    #[error("command `{command}` is part of a group and cannot be scheduled on its own")]
    Composed {
        /// Command name.
        command: String,
    },

    /// The command is already running.
    #[error("command `{command}` is already scheduled")]
    AlreadyScheduled {
        /// Command name.
        command: String,
    },

    /// A required subsystem is held by a command that refuses interruption.
    #[error("command `{command}` needs `{subsystem}`, held by non-interruptible `{owner}`")]
    Conflict {
        /// Rejected command.
        command: String,
        /// Contested subsystem.
        subsystem: String,
        /// Current owner.
        owner: String,
    },

    /// The scheduler is disabled and the command does not run when disabled.
    #[error("command `{command}` does not run while disabled")]
    Disabled {
        /// Command name.
        command: String,
    },

    /// Subsystem names are unique per scheduler.
    #[error("a subsystem named `{name}` is already registered")]
    DuplicateSubsystem {
        /// Subsystem name.
        name: String,
    },

    /// A default command must require its subsystem.
    #[error("default command `{command}` does not require subsystem `{subsystem}`")]
    MissingRequirement {
        /// Command name.
        command: String,
        /// Subsystem name.
        subsystem: String,
    },
}
