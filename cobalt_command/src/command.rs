//! Commands.
//!
//! A [`Command`] is a shared handle to one unit of robot behavior: a
//! [`CommandBehavior`] (or a group of child commands) plus the subsystems
//! it requires and its interruption policy. The scheduler drives it
//! through `initialize → execute* → end(interrupted)` and tracks where it
//! is in that lifecycle with [`CommandState`].
//!
//! # Variants
//!
//! | Kind         | Built by                       | Finishes when               |
//! |--------------|--------------------------------|-----------------------------|
//! | `Atomic`     | [`Command::builder`]           | behavior says so            |
//! | `Sequential` | [`Command::sequence`]          | last child finishes         |
//! | `Parallel`   | [`Command::parallel`]          | every child finishes        |
//! | `Race`       | [`Command::race`]              | any child finishes          |
//! | `Deadline`   | [`Command::deadline`]          | the first child finishes    |
//!
//! Once a command is placed in a group it is *composed*: it runs only
//! through that group and can neither be scheduled alone nor grouped again.

mod basic;
mod decorators;
mod group;

pub use basic::{
    FunctionalCommand, InstantCommand, RunCommand, StartEndCommand, WaitCommand, WaitUntilCommand,
};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::subsystem::Subsystem;
use group::GroupState;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle callbacks of an atomic command.
///
/// Every method has a no-op default; a command that never overrides
/// [`is_finished`](Self::is_finished) runs until it is canceled.
pub trait CommandBehavior {
    /// Called once when the command is scheduled.
    fn initialize(&mut self) {}

    /// Called once per tick while scheduled.
    fn execute(&mut self) {}

    /// Called exactly once per run, when it finishes (`false`) or is
    /// canceled (`true`).
    fn end(&mut self, interrupted: bool) {
        let _ = interrupted;
    }

    /// Polled after every `execute`.
    fn is_finished(&mut self) -> bool {
        false
    }
}

/// What happens when another command needs a subsystem this one owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptionBehavior {
    /// This command is canceled and the newcomer takes over.
    #[default]
    CancelSelf,
    /// The newcomer is rejected.
    CancelIncoming,
}

/// Scheduler-side lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Not scheduled.
    Disjoint,
    /// Inside `initialize`.
    Initializing,
    /// Scheduled and executing each tick.
    Running,
    /// Inside `end`.
    Ended,
}

/// Structural variant of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Leaf command wrapping a behavior.
    Atomic,
    /// Children one after another.
    Sequential,
    /// Children together, until all finish.
    Parallel,
    /// Children together, until one finishes.
    Race,
    /// Children together, until the first child finishes.
    Deadline,
}

enum Body {
    Atomic(Box<dyn CommandBehavior>),
    Group(GroupState),
}

struct CommandInner {
    id: u64,
    name: String,
    kind: CommandKind,
    requirements: Vec<Subsystem>,
    interruption: InterruptionBehavior,
    runs_when_disabled: bool,
    composed: Cell<bool>,
    state: Cell<CommandState>,
    children: Vec<Command>,
    body: RefCell<Body>,
}

/// Shared handle to a command. Clones refer to the same command.
#[derive(Clone)]
pub struct Command(Rc<CommandInner>);

/// Non-owning reference held by a subsystem for its current owner.
#[derive(Clone)]
pub(crate) struct WeakCommand(Weak<CommandInner>);

impl WeakCommand {
    pub(crate) fn upgrade(&self) -> Option<Command> {
        self.0.upgrade().map(Command)
    }

    pub(crate) fn is(&self, command: &Command) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&command.0))
    }
}

/// Builder for atomic commands.
#[derive(Debug)]
#[must_use]
pub struct CommandBuilder {
    name: String,
    requirements: Vec<Subsystem>,
    interruption: InterruptionBehavior,
    runs_when_disabled: bool,
}

impl CommandBuilder {
    /// Add a required subsystem. Duplicates are ignored.
    pub fn requires(mut self, subsystem: &Subsystem) -> Self {
        if !self.requirements.contains(subsystem) {
            self.requirements.push(subsystem.clone());
        }
        self
    }

    /// Add several required subsystems.
    pub fn requires_all<'a>(mut self, subsystems: impl IntoIterator<Item = &'a Subsystem>) -> Self {
        for subsystem in subsystems {
            self = self.requires(subsystem);
        }
        self
    }

    /// Set the interruption policy.
    pub fn interruption(mut self, behavior: InterruptionBehavior) -> Self {
        self.interruption = behavior;
        self
    }

    /// Allow the command to run while the scheduler is disabled.
    pub fn runs_when_disabled(mut self, runs: bool) -> Self {
        self.runs_when_disabled = runs;
        self
    }

    /// Finish the command with its behavior.
    pub fn build(self, behavior: impl CommandBehavior + 'static) -> Command {
        Command::from_parts(
            self.name,
            CommandKind::Atomic,
            self.requirements,
            self.interruption,
            self.runs_when_disabled,
            Vec::new(),
            Body::Atomic(Box::new(behavior)),
        )
    }
}

impl Command {
    /// Start building an atomic command.
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            requirements: Vec::new(),
            interruption: InterruptionBehavior::default(),
            runs_when_disabled: false,
        }
    }

    fn from_parts(
        name: String,
        kind: CommandKind,
        requirements: Vec<Subsystem>,
        interruption: InterruptionBehavior,
        runs_when_disabled: bool,
        children: Vec<Command>,
        body: Body,
    ) -> Self {
        Self(Rc::new(CommandInner {
            id: NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed),
            name,
            kind,
            requirements,
            interruption,
            runs_when_disabled,
            composed: Cell::new(false),
            state: Cell::new(CommandState::Disjoint),
            children,
            body: RefCell::new(body),
        }))
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Structural variant.
    pub fn kind(&self) -> CommandKind {
        self.0.kind
    }

    /// Required subsystems. For groups, the union over all children.
    pub fn requirements(&self) -> &[Subsystem] {
        &self.0.requirements
    }

    /// Whether `subsystem` is required.
    pub fn requires(&self, subsystem: &Subsystem) -> bool {
        self.0.requirements.contains(subsystem)
    }

    /// Interruption policy.
    pub fn interruption(&self) -> InterruptionBehavior {
        self.0.interruption
    }

    /// Whether the command may run while the scheduler is disabled.
    pub fn runs_when_disabled(&self) -> bool {
        self.0.runs_when_disabled
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CommandState {
        self.0.state.get()
    }

    /// Whether the command belongs to a group.
    pub fn is_composed(&self) -> bool {
        self.0.composed.get()
    }

    /// Children of a group, in order. Empty for atomic commands.
    pub fn children(&self) -> &[Command] {
        &self.0.children
    }

    pub(crate) fn set_state(&self, state: CommandState) {
        self.0.state.set(state);
    }

    pub(crate) fn downgrade(&self) -> WeakCommand {
        WeakCommand(Rc::downgrade(&self.0))
    }

    // Lifecycle dispatch. The scheduler never calls these for a command
    // already inside one of them, so the body borrow cannot overlap.

    /// Whether one of this command's callbacks is on the stack.
    pub(crate) fn in_callback(&self) -> bool {
        self.0.body.try_borrow_mut().is_err()
    }

    pub(crate) fn initialize(&self) {
        match &mut *self.0.body.borrow_mut() {
            Body::Atomic(behavior) => behavior.initialize(),
            Body::Group(group) => group.initialize(&self.0.children),
        }
    }

    pub(crate) fn execute(&self) {
        match &mut *self.0.body.borrow_mut() {
            Body::Atomic(behavior) => behavior.execute(),
            Body::Group(group) => group.execute(&self.0.children),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        match &mut *self.0.body.borrow_mut() {
            Body::Atomic(behavior) => behavior.is_finished(),
            Body::Group(group) => group.is_finished(),
        }
    }

    pub(crate) fn end(&self, interrupted: bool) {
        match &mut *self.0.body.borrow_mut() {
            Body::Atomic(behavior) => behavior.end(interrupted),
            Body::Group(group) => group.end(&self.0.children, interrupted),
        }
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Command {}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("state", &self.0.state.get())
            .finish()
    }
}
