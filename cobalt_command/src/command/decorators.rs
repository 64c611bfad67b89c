//! Decorators: shorthand for wrapping a command in a group.
//!
//! Each consumes the receiver (clone it first to keep a handle) and fails
//! the same way the underlying group constructor does.

use std::time::Duration;

use super::{Command, WaitCommand, WaitUntilCommand};
use crate::clock::Clock;
use crate::error::CommandError;

impl Command {
    /// Interrupt the command once `timeout` has passed on `clock`.
    pub fn with_timeout(self, timeout: Duration, clock: &Clock) -> Result<Command, CommandError> {
        let name = format!("{} (timeout {timeout:?})", self.name());
        let wait = Command::builder(format!("{} timer", self.name()))
            .runs_when_disabled(true)
            .build(WaitCommand::new(timeout, clock));
        Command::race(name, [self, wait])
    }

    /// Interrupt the command once `condition` returns true.
    pub fn until(self, condition: impl FnMut() -> bool + 'static) -> Result<Command, CommandError> {
        let name = format!("{} (until)", self.name());
        let wait = Command::builder(format!("{} condition", self.name()))
            .runs_when_disabled(true)
            .build(WaitUntilCommand::new(condition));
        Command::race(name, [self, wait])
    }

    /// Run `next` after this command finishes.
    pub fn and_then(self, next: Command) -> Result<Command, CommandError> {
        let name = format!("{} -> {}", self.name(), next.name());
        Command::sequence(name, [self, next])
    }

    /// Run `other` alongside; finish when both have.
    pub fn along_with(self, other: Command) -> Result<Command, CommandError> {
        let name = format!("{} & {}", self.name(), other.name());
        Command::parallel(name, [self, other])
    }

    /// Run `other` alongside; finish when either does.
    pub fn race_with(self, other: Command) -> Result<Command, CommandError> {
        let name = format!("{} | {}", self.name(), other.name());
        Command::race(name, [self, other])
    }

    /// Run `other` alongside until this command finishes.
    pub fn deadline_with(self, other: Command) -> Result<Command, CommandError> {
        let name = format!("{} deadline {}", self.name(), other.name());
        Command::deadline(name, self, [other])
    }
}
