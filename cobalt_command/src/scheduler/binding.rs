//! Trigger bindings polled at the start of every tick.

use tracing::debug;

use super::CommandScheduler;
use crate::command::Command;
use crate::trigger::Trigger;

pub(super) enum Action {
    /// Schedule on the rising edge, and optionally another on the falling edge.
    OnChange {
        on_true: Command,
        on_false: Option<Command>,
    },
    /// Schedule on the rising edge, cancel on the falling edge.
    WhileTrue(Command),
    /// Flip scheduled/unscheduled on every rising edge.
    ToggleOnTrue(Command),
    /// Run on every poll that reads true.
    Run(Box<dyn FnMut()>),
}

pub(super) struct Binding {
    trigger: Trigger,
    /// Last polled value; a trigger that is already true when bound fires
    /// on its first poll.
    last: bool,
    action: Action,
}

impl Binding {
    pub(super) fn new(trigger: Trigger, action: Action) -> Self {
        Self {
            trigger,
            last: false,
            action,
        }
    }

    pub(super) fn poll(&mut self, scheduler: &CommandScheduler) {
        let now = self.trigger.poll();
        let rising = now && !self.last;
        let falling = !now && self.last;
        self.last = now;

        match &mut self.action {
            Action::OnChange { on_true, on_false } => {
                if rising {
                    start(scheduler, on_true);
                }
                if falling {
                    if let Some(command) = on_false {
                        start(scheduler, command);
                    }
                }
            }
            Action::WhileTrue(command) => {
                if rising {
                    start(scheduler, command);
                } else if falling {
                    scheduler.cancel(command);
                }
            }
            Action::ToggleOnTrue(command) => {
                if rising {
                    if scheduler.is_scheduled(command) {
                        scheduler.cancel(command);
                    } else {
                        start(scheduler, command);
                    }
                }
            }
            Action::Run(action) => {
                if now {
                    action();
                }
            }
        }
    }
}

fn start(scheduler: &CommandScheduler, command: &Command) {
    if let Err(e) = scheduler.schedule(command) {
        debug!(command = command.name(), "binding did not schedule: {e}");
    }
}
