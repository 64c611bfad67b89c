//! The command scheduler.
//!
//! Single-threaded and tick-driven: the robot's periodic loop calls
//! [`CommandScheduler::run`] once per period. A tick runs, in order:
//!
//! 1. every registered subsystem's periodic callback;
//! 2. every trigger binding, in registration order (commands scheduled
//!    here initialize at once and execute in step 3 of the same tick);
//! 3. one `execute` + `is_finished` per scheduled command, in scheduling
//!    order, retiring finished commands with `end(false)`;
//! 4. schedule and cancel requests queued during step 3;
//! 5. default commands of subsystems left without an owner.
//!
//! # Conflicts
//!
//! Scheduling is all-or-nothing. Every requirement is inspected before any
//! is claimed: if one owner refuses interruption the newcomer is rejected
//! and nothing changes; otherwise every displaced owner is ended with
//! `end(true)` before the newcomer's `initialize`.
//!
//! # Re-entrancy
//!
//! [`schedule`](CommandScheduler::schedule) and
//! [`cancel`](CommandScheduler::cancel) may be called from any command or
//! trigger callback. While the scheduler is iterating its commands (or is
//! in the middle of a schedule or cancel) a schedule is checked against the
//! command's state at once, so misuse is still reported to the caller, and
//! then queued until the iteration completes. A cancel takes effect
//! immediately unless it targets the command whose callback is running,
//! which is queued the same way. Structural changes (bindings, subsystems,
//! default commands) and nested `run` calls are programming errors while a
//! tick is in progress and panic.

mod binding;
mod stats;

pub use stats::TickStats;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use cobalt_common::scheduler::SchedulerConfig;
use tracing::{debug, info, trace, warn};

use crate::command::{Command, CommandState, InterruptionBehavior};
use crate::error::ScheduleError;
use crate::subsystem::Subsystem;
use crate::trigger::Trigger;
use binding::{Action, Binding};

bitflags! {
    /// Command lifecycle events reported to listeners.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandEvent: u8 {
        /// `initialize` has run.
        const INITIALIZE = 0x01;
        /// `execute` has run.
        const EXECUTE    = 0x02;
        /// The command finished on its own.
        const FINISH     = 0x04;
        /// The command was canceled or displaced.
        const INTERRUPT  = 0x08;
    }
}

type Listener = Rc<dyn Fn(&Command, CommandEvent)>;

struct SchedulerState {
    scheduled: Vec<Command>,
    subsystems: Vec<Subsystem>,
    defaults: Vec<(Subsystem, Command)>,
    pending_schedule: Vec<Command>,
    pending_cancel: Vec<Command>,
    enabled: bool,
    stats: TickStats,
}

/// Cooperative scheduler for commands, subsystems and trigger bindings.
///
/// Every method takes `&self`, so commands and triggers may hold an
/// `Rc<CommandScheduler>` and call back into it.
pub struct CommandScheduler {
    state: RefCell<SchedulerState>,
    bindings: RefCell<Vec<Binding>>,
    listeners: RefCell<Vec<(CommandEvent, Listener)>>,
    /// Nesting depth of passes during which schedule/cancel are queued.
    deferring: Cell<u32>,
    running: Cell<bool>,
    period: Duration,
}

impl CommandScheduler {
    /// Enabled scheduler expecting one tick per `config.period()`.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            state: RefCell::new(SchedulerState {
                scheduled: Vec::new(),
                subsystems: Vec::new(),
                defaults: Vec::new(),
                pending_schedule: Vec::new(),
                pending_cancel: Vec::new(),
                enabled: true,
                stats: TickStats::default(),
            }),
            bindings: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            deferring: Cell::new(0),
            running: Cell::new(false),
            period: config.period(),
        }
    }

    // ─── Scheduling ─────────────────────────────────────────────────

    /// Schedule `command`, displacing interruptible owners of its
    /// requirements.
    ///
    /// Called while the scheduler is iterating, the command's own state is
    /// checked at once and the request is queued; conflicts are resolved
    /// when the queue drains and a queued request rejected then is logged.
    ///
    /// # Errors
    /// - [`ScheduleError::Composed`] for a command inside a group
    /// - [`ScheduleError::AlreadyScheduled`] if it is running or queued
    /// - [`ScheduleError::Disabled`] while disabled, unless it runs when disabled
    /// - [`ScheduleError::Conflict`] if a requirement is held by a
    ///   [`CancelIncoming`](InterruptionBehavior::CancelIncoming) command
    pub fn schedule(&self, command: &Command) -> Result<(), ScheduleError> {
        if command.is_composed() {
            warn!(
                command = command.name(),
                "refusing to schedule a command that belongs to a group"
            );
        }
        self.check_schedulable(command)?;
        if self.deferring.get() > 0 {
            let mut state = self.state.borrow_mut();
            if state.pending_schedule.contains(command) {
                return Err(ScheduleError::AlreadyScheduled {
                    command: command.name().to_string(),
                });
            }
            trace!(command = command.name(), "schedule deferred");
            state.pending_schedule.push(command.clone());
            return Ok(());
        }
        self.deferred(|| self.schedule_now(command))
    }

    /// Cancel `command` if it is scheduled. `end(true)` has run by the time
    /// this returns, and a queued schedule of `command` is withdrawn.
    /// Canceling an unscheduled command does nothing.
    ///
    /// The one exception is a command canceling itself (or a group canceled
    /// from one of its children) from inside its own callback: that cancel
    /// is queued and applied as soon as the callback returns.
    pub fn cancel(&self, command: &Command) {
        if self.deferring.get() > 0 {
            let withdrawn = {
                let mut state = self.state.borrow_mut();
                let before = state.pending_schedule.len();
                state.pending_schedule.retain(|c| c != command);
                state.pending_schedule.len() != before
            };
            if withdrawn {
                trace!(command = command.name(), "queued schedule withdrawn");
            }
            if command.in_callback() {
                trace!(command = command.name(), "cancel deferred");
                self.state.borrow_mut().pending_cancel.push(command.clone());
                return;
            }
            self.cancel_now(command);
            return;
        }
        self.deferred(|| self.cancel_now(command));
    }

    /// Cancel every scheduled command.
    pub fn cancel_all(&self) {
        let scheduled = self.state.borrow().scheduled.clone();
        for command in &scheduled {
            self.cancel(command);
        }
    }

    /// Whether `command` is currently scheduled.
    pub fn is_scheduled(&self, command: &Command) -> bool {
        matches!(
            command.state(),
            CommandState::Initializing | CommandState::Running
        ) && self.state.borrow().scheduled.contains(command)
    }

    /// Scheduled commands in scheduling order.
    pub fn scheduled(&self) -> Vec<Command> {
        self.state.borrow().scheduled.clone()
    }

    /// Command currently owning `subsystem`.
    pub fn requiring(&self, subsystem: &Subsystem) -> Option<Command> {
        subsystem.current_command()
    }

    /// Enable or disable. While disabled, commands that do not run when
    /// disabled cannot be scheduled and are interrupted on the next tick.
    pub fn set_enabled(&self, enabled: bool) {
        let changed = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.enabled, enabled) != enabled
        };
        if changed {
            info!(enabled, "command scheduler {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    /// Whether the scheduler is enabled.
    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    // ─── Subsystems ─────────────────────────────────────────────────

    /// Register a subsystem so its periodic callback runs and its default
    /// command is maintained.
    ///
    /// # Errors
    /// [`ScheduleError::DuplicateSubsystem`] if another subsystem with the
    /// same name is registered. Registering the same subsystem twice is a
    /// no-op.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn register_subsystem(&self, subsystem: &Subsystem) -> Result<(), ScheduleError> {
        self.assert_idle("register_subsystem");
        let mut state = self.state.borrow_mut();
        if state.subsystems.contains(subsystem) {
            return Ok(());
        }
        if state.subsystems.iter().any(|s| s.name() == subsystem.name()) {
            return Err(ScheduleError::DuplicateSubsystem {
                name: subsystem.name().to_string(),
            });
        }
        debug!(subsystem = subsystem.name(), "subsystem registered");
        state.subsystems.push(subsystem.clone());
        Ok(())
    }

    /// Unregister a subsystem and drop its default command. A command
    /// owning it keeps running.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn unregister_subsystem(&self, subsystem: &Subsystem) {
        self.assert_idle("unregister_subsystem");
        let mut state = self.state.borrow_mut();
        state.subsystems.retain(|s| s != subsystem);
        state.defaults.retain(|(s, _)| s != subsystem);
    }

    /// Set the command that runs whenever `subsystem` has no other owner.
    /// Registers the subsystem if needed. The default is scheduled by the
    /// next tick's default-command step.
    ///
    /// # Errors
    /// - [`ScheduleError::Composed`] if `command` belongs to a group
    /// - [`ScheduleError::MissingRequirement`] if it does not require `subsystem`
    /// - [`ScheduleError::DuplicateSubsystem`] from implicit registration
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn set_default_command(
        &self,
        subsystem: &Subsystem,
        command: Command,
    ) -> Result<(), ScheduleError> {
        self.assert_idle("set_default_command");
        if command.is_composed() {
            return Err(ScheduleError::Composed {
                command: command.name().to_string(),
            });
        }
        if !command.requires(subsystem) {
            return Err(ScheduleError::MissingRequirement {
                command: command.name().to_string(),
                subsystem: subsystem.name().to_string(),
            });
        }
        if command.interruption() == InterruptionBehavior::CancelIncoming {
            warn!(
                command = command.name(),
                subsystem = subsystem.name(),
                "default command refuses interruption; nothing else can claim the subsystem"
            );
        }
        self.register_subsystem(subsystem)?;

        let mut state = self.state.borrow_mut();
        match state.defaults.iter_mut().find(|(s, _)| s == subsystem) {
            Some((_, existing)) => *existing = command,
            None => state.defaults.push((subsystem.clone(), command)),
        }
        Ok(())
    }

    /// Remove and return the default command of `subsystem`.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn remove_default_command(&self, subsystem: &Subsystem) -> Option<Command> {
        self.assert_idle("remove_default_command");
        let mut state = self.state.borrow_mut();
        let index = state.defaults.iter().position(|(s, _)| s == subsystem)?;
        Some(state.defaults.remove(index).1)
    }

    /// Default command of `subsystem`.
    pub fn default_command(&self, subsystem: &Subsystem) -> Option<Command> {
        self.state
            .borrow()
            .defaults
            .iter()
            .find(|(s, _)| s == subsystem)
            .map(|(_, c)| c.clone())
    }

    // ─── Bindings ───────────────────────────────────────────────────

    /// Schedule `on_true` when `trigger` becomes true and `on_false`, if
    /// given, when it becomes false.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn bind(&self, trigger: Trigger, on_true: Command, on_false: Option<Command>) {
        self.add_binding(trigger, Action::OnChange { on_true, on_false });
    }

    /// Schedule `command` when `trigger` becomes true; cancel it when the
    /// trigger becomes false.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn bind_while_true(&self, trigger: Trigger, command: Command) {
        self.add_binding(trigger, Action::WhileTrue(command));
    }

    /// Toggle `command` each time `trigger` becomes true.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn bind_toggle_on_true(&self, trigger: Trigger, command: Command) {
        self.add_binding(trigger, Action::ToggleOnTrue(command));
    }

    /// Run `action` on every tick where `trigger` polls true.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn bind_action(&self, trigger: Trigger, action: impl FnMut() + 'static) {
        self.add_binding(trigger, Action::Run(Box::new(action)));
    }

    /// Drop every trigger binding.
    ///
    /// # Panics
    /// If called while a tick is in progress (concurrent modification).
    pub fn clear_bindings(&self) {
        self.assert_idle("clear_bindings");
        self.bindings.borrow_mut().clear();
    }

    fn add_binding(&self, trigger: Trigger, action: Action) {
        self.assert_idle("bind");
        self.bindings.borrow_mut().push(Binding::new(trigger, action));
    }

    // ─── Events and Stats ───────────────────────────────────────────

    /// Call `callback` for every event in `mask`.
    pub fn on_command_event(
        &self,
        mask: CommandEvent,
        callback: impl Fn(&Command, CommandEvent) + 'static,
    ) {
        self.listeners.borrow_mut().push((mask, Rc::new(callback)));
    }

    /// Tick timing so far.
    pub fn stats(&self) -> TickStats {
        self.state.borrow().stats
    }

    /// Expected tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Run one tick.
    ///
    /// # Panics
    /// If called from inside a tick (concurrent modification).
    pub fn run(&self) {
        if self.running.replace(true) {
            panic!("concurrent modification: CommandScheduler::run called during a tick");
        }
        let started = Instant::now();

        let subsystems = self.state.borrow().subsystems.clone();
        for subsystem in &subsystems {
            subsystem.run_periodic();
        }

        self.poll_bindings();
        self.deferred(|| self.execute_pass());
        self.schedule_defaults();

        let elapsed = started.elapsed();
        let (overrun, ticks) = {
            let mut state = self.state.borrow_mut();
            let overrun = state.stats.record(elapsed, self.period);
            (overrun, state.stats.ticks)
        };
        if overrun {
            warn!(
                tick = ticks,
                elapsed_us = elapsed.as_micros() as u64,
                period_us = self.period.as_micros() as u64,
                "scheduler tick overran its period"
            );
        }
        self.running.set(false);
    }

    fn poll_bindings(&self) {
        // Structural changes panic during a tick, so the list cannot grow
        // while it is taken out.
        let mut bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        for binding in &mut bindings {
            binding.poll(self);
        }
        *self.bindings.borrow_mut() = bindings;
    }

    fn execute_pass(&self) {
        let (snapshot, enabled) = {
            let state = self.state.borrow();
            (state.scheduled.clone(), state.enabled)
        };
        for command in &snapshot {
            if command.state() != CommandState::Running {
                continue;
            }
            if !enabled && !command.runs_when_disabled() {
                self.cancel_now(command);
                continue;
            }
            command.execute();
            self.emit(command, CommandEvent::EXECUTE);
            if command.is_finished() {
                command.set_state(CommandState::Ended);
                command.end(false);
                self.retire(command);
                debug!(command = command.name(), "command finished");
                self.emit(command, CommandEvent::FINISH);
            }
        }
    }

    fn schedule_defaults(&self) {
        let defaults = self.state.borrow().defaults.clone();
        for (subsystem, command) in &defaults {
            if subsystem.current_command().is_some() {
                continue;
            }
            if let Err(e) = self.schedule(command) {
                trace!(subsystem = subsystem.name(), "default command not scheduled: {e}");
            }
        }
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Run `f` with schedule/cancel queued, then drain the queues.
    fn deferred<R>(&self, f: impl FnOnce() -> R) -> R {
        self.deferring.set(self.deferring.get() + 1);
        let result = f();
        self.deferring.set(self.deferring.get() - 1);
        if self.deferring.get() == 0 {
            self.flush_pending();
        }
        result
    }

    fn flush_pending(&self) {
        loop {
            let (schedule, cancel) = {
                let mut state = self.state.borrow_mut();
                (
                    std::mem::take(&mut state.pending_schedule),
                    std::mem::take(&mut state.pending_cancel),
                )
            };
            if schedule.is_empty() && cancel.is_empty() {
                return;
            }
            self.deferring.set(self.deferring.get() + 1);
            for command in &schedule {
                if let Err(e) = self.schedule_now(command) {
                    debug!(command = command.name(), "queued schedule failed: {e}");
                }
            }
            for command in &cancel {
                self.cancel_now(command);
            }
            self.deferring.set(self.deferring.get() - 1);
        }
    }

    /// Checks that depend only on the command and the enabled flag.
    fn check_schedulable(&self, command: &Command) -> Result<(), ScheduleError> {
        let name = || command.name().to_string();
        if command.is_composed() {
            return Err(ScheduleError::Composed { command: name() });
        }
        if command.state() != CommandState::Disjoint {
            return Err(ScheduleError::AlreadyScheduled { command: name() });
        }
        if !self.state.borrow().enabled && !command.runs_when_disabled() {
            return Err(ScheduleError::Disabled { command: name() });
        }
        Ok(())
    }

    fn schedule_now(&self, command: &Command) -> Result<(), ScheduleError> {
        let name = || command.name().to_string();
        self.check_schedulable(command)?;

        // Inspect every requirement before touching any.
        let mut displaced: Vec<Command> = Vec::new();
        for subsystem in command.requirements() {
            let Some(owner) = subsystem.current_command() else {
                continue;
            };
            if owner.interruption() == InterruptionBehavior::CancelIncoming {
                debug!(
                    command = command.name(),
                    subsystem = subsystem.name(),
                    owner = owner.name(),
                    "schedule rejected by non-interruptible owner"
                );
                return Err(ScheduleError::Conflict {
                    command: name(),
                    subsystem: subsystem.name().to_string(),
                    owner: owner.name().to_string(),
                });
            }
            if !displaced.contains(&owner) {
                displaced.push(owner);
            }
        }

        for owner in &displaced {
            self.cancel_now(owner);
        }
        for subsystem in command.requirements() {
            subsystem.claim(command);
        }
        self.state.borrow_mut().scheduled.push(command.clone());

        command.set_state(CommandState::Initializing);
        command.initialize();
        command.set_state(CommandState::Running);
        debug!(command = command.name(), "command scheduled");
        self.emit(command, CommandEvent::INITIALIZE);
        Ok(())
    }

    fn cancel_now(&self, command: &Command) {
        if command.state() != CommandState::Running {
            return;
        }
        command.set_state(CommandState::Ended);
        command.end(true);
        self.retire(command);
        debug!(command = command.name(), "command interrupted");
        self.emit(command, CommandEvent::INTERRUPT);
    }

    /// Release requirements and drop from the scheduled set.
    fn retire(&self, command: &Command) {
        for subsystem in command.requirements() {
            subsystem.release(command);
        }
        self.state.borrow_mut().scheduled.retain(|c| c != command);
        command.set_state(CommandState::Disjoint);
    }

    fn emit(&self, command: &Command, event: CommandEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(mask, _)| mask.contains(event))
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(command, event);
        }
    }

    fn assert_idle(&self, operation: &str) {
        if self.running.get() {
            panic!("concurrent modification: {operation} called during a scheduler tick");
        }
    }
}

impl Default for CommandScheduler {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}

impl std::fmt::Debug for CommandScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CommandScheduler")
            .field("enabled", &state.enabled)
            .field(
                "scheduled",
                &state.scheduled.iter().map(Command::name).collect::<Vec<_>>(),
            )
            .field("subsystems", &state.subsystems.len())
            .field("bindings", &self.bindings.borrow().len())
            .field("stats", &state.stats)
            .finish()
    }
}
