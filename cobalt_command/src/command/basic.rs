//! Stock behaviors for the common command shapes.

use std::time::Duration;

use super::CommandBehavior;
use crate::clock::Clock;

/// Runs an action once in `initialize` and finishes immediately.
pub struct InstantCommand<F> {
    action: F,
}

impl<F: FnMut()> InstantCommand<F> {
    /// Wrap `action`.
    pub fn new(action: F) -> Self {
        Self { action }
    }
}

impl<F: FnMut()> CommandBehavior for InstantCommand<F> {
    fn initialize(&mut self) {
        (self.action)();
    }

    fn is_finished(&mut self) -> bool {
        true
    }
}

/// Runs an action every tick until canceled.
pub struct RunCommand<F> {
    action: F,
}

impl<F: FnMut()> RunCommand<F> {
    /// Wrap `action`.
    pub fn new(action: F) -> Self {
        Self { action }
    }
}

impl<F: FnMut()> CommandBehavior for RunCommand<F> {
    fn execute(&mut self) {
        (self.action)();
    }
}

/// Runs `start` on initialize and `end` on end; never finishes by itself.
pub struct StartEndCommand<S, E> {
    start: S,
    end: E,
}

impl<S: FnMut(), E: FnMut()> StartEndCommand<S, E> {
    /// Wrap the two actions.
    pub fn new(start: S, end: E) -> Self {
        Self { start, end }
    }
}

impl<S: FnMut(), E: FnMut()> CommandBehavior for StartEndCommand<S, E> {
    fn initialize(&mut self) {
        (self.start)();
    }

    fn end(&mut self, _interrupted: bool) {
        (self.end)();
    }
}

/// All four lifecycle callbacks supplied as closures.
pub struct FunctionalCommand<I, X, E, F> {
    on_init: I,
    on_execute: X,
    on_end: E,
    finished: F,
}

impl<I, X, E, F> FunctionalCommand<I, X, E, F>
where
    I: FnMut(),
    X: FnMut(),
    E: FnMut(bool),
    F: FnMut() -> bool,
{
    /// Wrap the callbacks.
    pub fn new(on_init: I, on_execute: X, on_end: E, finished: F) -> Self {
        Self {
            on_init,
            on_execute,
            on_end,
            finished,
        }
    }
}

impl<I, X, E, F> CommandBehavior for FunctionalCommand<I, X, E, F>
where
    I: FnMut(),
    X: FnMut(),
    E: FnMut(bool),
    F: FnMut() -> bool,
{
    fn initialize(&mut self) {
        (self.on_init)();
    }

    fn execute(&mut self) {
        (self.on_execute)();
    }

    fn end(&mut self, interrupted: bool) {
        (self.on_end)(interrupted);
    }

    fn is_finished(&mut self) -> bool {
        (self.finished)()
    }
}

/// Finishes once `duration` has passed on its clock since initialize.
#[derive(Debug)]
pub struct WaitCommand {
    duration: Duration,
    clock: Clock,
    started: Duration,
}

impl WaitCommand {
    /// Wait `duration` measured on `clock`.
    pub fn new(duration: Duration, clock: &Clock) -> Self {
        Self {
            duration,
            clock: clock.clone(),
            started: Duration::ZERO,
        }
    }
}

impl CommandBehavior for WaitCommand {
    fn initialize(&mut self) {
        self.started = self.clock.now();
    }

    fn is_finished(&mut self) -> bool {
        self.clock.now().saturating_sub(self.started) >= self.duration
    }
}

/// Finishes when `condition` returns true.
pub struct WaitUntilCommand<C> {
    condition: C,
}

impl<C: FnMut() -> bool> WaitUntilCommand<C> {
    /// Wait on `condition`.
    pub fn new(condition: C) -> Self {
        Self { condition }
    }
}

impl<C: FnMut() -> bool> CommandBehavior for WaitUntilCommand<C> {
    fn is_finished(&mut self) -> bool {
        (self.condition)()
    }
}
