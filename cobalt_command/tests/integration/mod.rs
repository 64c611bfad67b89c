//! Shared probes for the integration tests.

mod groups;
mod scheduling;
mod triggers;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cobalt_command::{Command, CommandBehavior, InterruptionBehavior, Subsystem};

/// Ordered record of lifecycle calls, shared by every probe in a test.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Command behavior that logs each callback as `"<name>.<callback>"` and
/// finishes after `finish_after` executes (`None` = never).
pub struct Probe {
    name: String,
    log: Log,
    finish_after: Option<u32>,
    executes: u32,
}

impl Probe {
    pub fn new(name: &str, log: &Log, finish_after: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            log: Rc::clone(log),
            finish_after,
            executes: 0,
        }
    }

    fn record(&self, what: &str) {
        self.log.borrow_mut().push(format!("{}.{what}", self.name));
    }
}

impl CommandBehavior for Probe {
    fn initialize(&mut self) {
        self.executes = 0;
        self.record("init");
    }

    fn execute(&mut self) {
        self.executes += 1;
        self.record("exec");
    }

    fn end(&mut self, interrupted: bool) {
        self.record(if interrupted { "end(true)" } else { "end(false)" });
    }

    fn is_finished(&mut self) -> bool {
        self.finish_after.is_some_and(|n| self.executes >= n)
    }
}

/// Probe command requiring `requires`.
pub fn probe(
    name: &str,
    log: &Log,
    finish_after: Option<u32>,
    requires: &[&Subsystem],
) -> Command {
    Command::builder(name)
        .requires_all(requires.iter().copied())
        .build(Probe::new(name, log, finish_after))
}

/// Probe command that refuses interruption.
pub fn stubborn(name: &str, log: &Log, requires: &[&Subsystem]) -> Command {
    Command::builder(name)
        .requires_all(requires.iter().copied())
        .interruption(InterruptionBehavior::CancelIncoming)
        .build(Probe::new(name, log, None))
}

/// Shared boolean driving a trigger.
pub fn switch() -> Rc<Cell<bool>> {
    Rc::new(Cell::new(false))
}
