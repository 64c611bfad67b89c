//! Command groups.
//!
//! A group forwards its lifecycle to its children. Children are driven
//! directly by the group, never by the scheduler, so their own
//! [`CommandState`] stays `Disjoint` throughout.

use super::{Body, Command, CommandKind, CommandState, InterruptionBehavior};
use crate::error::CommandError;
use crate::subsystem::Subsystem;

/// Run-time state of a group.
pub(crate) enum GroupState {
    /// Index of the running child; `len` when done.
    Sequential { current: usize, len: usize },
    /// Per-child "still running".
    Parallel { running: Vec<bool> },
    /// Per-child "finished on its own", plus whether any has.
    Race { finished: Vec<bool>, done: bool },
    /// Per-child "still running"; child 0 is the deadline.
    Deadline { running: Vec<bool> },
}

impl GroupState {
    fn for_kind(kind: CommandKind, len: usize) -> Self {
        match kind {
            CommandKind::Parallel => Self::Parallel {
                running: vec![false; len],
            },
            CommandKind::Race => Self::Race {
                finished: vec![false; len],
                done: true,
            },
            CommandKind::Deadline => Self::Deadline {
                running: vec![false; len],
            },
            CommandKind::Sequential | CommandKind::Atomic => Self::Sequential { current: len, len },
        }
    }

    pub(super) fn initialize(&mut self, children: &[Command]) {
        match self {
            Self::Sequential { current, .. } => {
                *current = 0;
                if let Some(first) = children.first() {
                    first.initialize();
                }
            }
            Self::Parallel { running } | Self::Deadline { running } => {
                running.fill(true);
                children.iter().for_each(Command::initialize);
            }
            Self::Race { finished, done } => {
                finished.fill(false);
                // An empty race has nothing to wait for.
                *done = children.is_empty();
                children.iter().for_each(Command::initialize);
            }
        }
    }

    pub(super) fn execute(&mut self, children: &[Command]) {
        match self {
            Self::Sequential { current, .. } => {
                let Some(child) = children.get(*current) else {
                    return;
                };
                child.execute();
                if child.is_finished() {
                    child.end(false);
                    *current += 1;
                    if let Some(next) = children.get(*current) {
                        next.initialize();
                    }
                }
            }
            Self::Parallel { running } | Self::Deadline { running } => {
                for (child, running) in children.iter().zip(running.iter_mut()) {
                    if !*running {
                        continue;
                    }
                    child.execute();
                    if child.is_finished() {
                        child.end(false);
                        *running = false;
                    }
                }
            }
            Self::Race { finished, done } => {
                for (child, finished) in children.iter().zip(finished.iter_mut()) {
                    child.execute();
                    if child.is_finished() {
                        *finished = true;
                        *done = true;
                    }
                }
            }
        }
    }

    pub(super) fn is_finished(&self) -> bool {
        match self {
            Self::Sequential { current, len } => *current >= *len,
            Self::Parallel { running } => !running.iter().any(|r| *r),
            Self::Race { done, .. } => *done,
            Self::Deadline { running } => !running.first().copied().unwrap_or(false),
        }
    }

    pub(super) fn end(&mut self, children: &[Command], interrupted: bool) {
        match self {
            Self::Sequential { current, len } => {
                if interrupted {
                    if let Some(child) = children.get(*current) {
                        child.end(true);
                    }
                }
                *current = *len;
            }
            Self::Parallel { running } | Self::Deadline { running } => {
                for (child, running) in children.iter().zip(running.iter_mut()) {
                    if *running {
                        child.end(true);
                        *running = false;
                    }
                }
            }
            Self::Race { finished, done } => {
                for (child, finished) in children.iter().zip(finished.iter()) {
                    child.end(!*finished);
                }
                *done = true;
            }
        }
    }
}

impl Command {
    /// Run `children` one after another.
    ///
    /// # Errors
    /// [`CommandError`] if a child is already composed or scheduled.
    pub fn sequence(
        name: impl Into<String>,
        children: impl IntoIterator<Item = Command>,
    ) -> Result<Command, CommandError> {
        compose(name.into(), CommandKind::Sequential, children.into_iter().collect())
    }

    /// Run `children` together until all have finished.
    ///
    /// # Errors
    /// [`CommandError`] if a child is already composed or scheduled, or two
    /// children share a requirement.
    pub fn parallel(
        name: impl Into<String>,
        children: impl IntoIterator<Item = Command>,
    ) -> Result<Command, CommandError> {
        compose(name.into(), CommandKind::Parallel, children.into_iter().collect())
    }

    /// Run `children` together until any one finishes; the rest are
    /// interrupted.
    ///
    /// # Errors
    /// Same as [`parallel`](Self::parallel).
    pub fn race(
        name: impl Into<String>,
        children: impl IntoIterator<Item = Command>,
    ) -> Result<Command, CommandError> {
        compose(name.into(), CommandKind::Race, children.into_iter().collect())
    }

    /// Run `deadline` and `others` together until `deadline` finishes; the
    /// others still running are interrupted.
    ///
    /// # Errors
    /// Same as [`parallel`](Self::parallel).
    pub fn deadline(
        name: impl Into<String>,
        deadline: Command,
        others: impl IntoIterator<Item = Command>,
    ) -> Result<Command, CommandError> {
        let children = std::iter::once(deadline).chain(others).collect();
        compose(name.into(), CommandKind::Deadline, children)
    }
}

fn compose(name: String, kind: CommandKind, children: Vec<Command>) -> Result<Command, CommandError> {
    let concurrent = kind != CommandKind::Sequential;
    validate(&children, concurrent)?;

    // Validation passed for every child; only now mark them.
    for child in &children {
        child.0.composed.set(true);
    }

    let mut requirements: Vec<Subsystem> = Vec::new();
    for subsystem in children.iter().flat_map(Command::requirements) {
        if !requirements.contains(subsystem) {
            requirements.push(subsystem.clone());
        }
    }
    let interruption = if children
        .iter()
        .any(|c| c.interruption() == InterruptionBehavior::CancelIncoming)
    {
        InterruptionBehavior::CancelIncoming
    } else {
        InterruptionBehavior::CancelSelf
    };
    let runs_when_disabled = children.iter().all(Command::runs_when_disabled);

    let state = GroupState::for_kind(kind, children.len());

    Ok(Command::from_parts(
        name,
        kind,
        requirements,
        interruption,
        runs_when_disabled,
        children,
        Body::Group(state),
    ))
}

fn validate(children: &[Command], concurrent: bool) -> Result<(), CommandError> {
    for (i, child) in children.iter().enumerate() {
        let earlier = &children[..i];
        if child.is_composed() || earlier.contains(child) {
            return Err(CommandError::AlreadyComposed {
                command: child.name().to_string(),
            });
        }
        if child.state() != CommandState::Disjoint {
            return Err(CommandError::ChildScheduled {
                command: child.name().to_string(),
            });
        }
        if !concurrent {
            continue;
        }
        for other in earlier {
            if let Some(shared) = child.requirements().iter().find(|s| other.requires(s)) {
                return Err(CommandError::RequirementOverlap {
                    first: other.name().to_string(),
                    second: child.name().to_string(),
                    subsystem: shared.name().to_string(),
                });
            }
        }
    }
    Ok(())
}
