//! Subsystems: mutual-exclusion domains for commands.
//!
//! A subsystem stands for one physical mechanism. At most one scheduled
//! command owns it at a time; the owner is recorded here as a weak
//! back-reference so a subsystem never keeps a finished command alive.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::{Command, WeakCommand};

static NEXT_SUBSYSTEM_ID: AtomicU64 = AtomicU64::new(1);

type Periodic = Box<dyn FnMut()>;

struct SubsystemInner {
    id: u64,
    name: String,
    owner: RefCell<Option<WeakCommand>>,
    periodic: RefCell<Option<Periodic>>,
}

/// Shared handle to a subsystem. Clones refer to the same subsystem.
#[derive(Clone)]
pub struct Subsystem(Rc<SubsystemInner>);

impl Subsystem {
    /// New subsystem with no periodic callback.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(SubsystemInner {
            id: NEXT_SUBSYSTEM_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            owner: RefCell::new(None),
            periodic: RefCell::new(None),
        }))
    }

    /// New subsystem whose `periodic` runs at the start of every tick.
    pub fn with_periodic(name: impl Into<String>, periodic: impl FnMut() + 'static) -> Self {
        let subsystem = Self::new(name);
        subsystem.set_periodic(periodic);
        subsystem
    }

    /// Replace the periodic callback.
    pub fn set_periodic(&self, periodic: impl FnMut() + 'static) {
        *self.0.periodic.borrow_mut() = Some(Box::new(periodic));
    }

    /// Name, unique within a scheduler.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Command currently owning this subsystem.
    pub fn current_command(&self) -> Option<Command> {
        self.0.owner.borrow().as_ref().and_then(WeakCommand::upgrade)
    }

    pub(crate) fn claim(&self, command: &Command) {
        *self.0.owner.borrow_mut() = Some(command.downgrade());
    }

    /// Clear the owner if it is `command`.
    pub(crate) fn release(&self, command: &Command) {
        let mut owner = self.0.owner.borrow_mut();
        if owner.as_ref().is_some_and(|weak| weak.is(command)) {
            *owner = None;
        }
    }

    pub(crate) fn run_periodic(&self) {
        // Taken out for the call so the callback may replace itself.
        let taken = self.0.periodic.borrow_mut().take();
        if let Some(mut periodic) = taken {
            periodic();
            let mut slot = self.0.periodic.borrow_mut();
            if slot.is_none() {
                *slot = Some(periodic);
            }
        }
    }
}

impl PartialEq for Subsystem {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Subsystem {}

impl Hash for Subsystem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subsystem")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .field(
                "owner",
                &self.current_command().map(|c| c.name().to_string()),
            )
            .finish()
    }
}
