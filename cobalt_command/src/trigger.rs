//! Polled boolean conditions.
//!
//! A [`Trigger`] evaluates its condition exactly once per [`poll`](Trigger::poll).
//! Combinators that keep state (edges, debounce) update that state on
//! every poll, and [`and`](Trigger::and)/[`or`](Trigger::or) always poll
//! both operands so stateful operands never miss a sample.
//!
//! Triggers are cheap `Rc` handles: clones share one condition and its
//! state. Polling a trigger from inside its own condition panics.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;

/// Which transitions a debounced trigger delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceKind {
    /// Delay false → true; drop to false at once.
    #[default]
    Rising,
    /// Delay true → false; rise to true at once.
    Falling,
    /// Delay both transitions.
    Both,
}

type Condition = Rc<RefCell<dyn FnMut() -> bool>>;

/// Shared, polled boolean condition.
#[derive(Clone)]
pub struct Trigger {
    condition: Condition,
}

impl Trigger {
    /// Wrap a condition.
    pub fn new(condition: impl FnMut() -> bool + 'static) -> Self {
        Self {
            condition: Rc::new(RefCell::new(condition)),
        }
    }

    /// Trigger that never fires.
    pub fn never() -> Self {
        Self::new(|| false)
    }

    /// Evaluate the condition once.
    pub fn poll(&self) -> bool {
        (&mut *self.condition.borrow_mut())()
    }

    /// True when both are true. Both sides are polled every time.
    pub fn and(&self, other: &Trigger) -> Trigger {
        let (a, b) = (self.clone(), other.clone());
        Trigger::new(move || {
            let left = a.poll();
            let right = b.poll();
            left && right
        })
    }

    /// True when either is true. Both sides are polled every time.
    pub fn or(&self, other: &Trigger) -> Trigger {
        let (a, b) = (self.clone(), other.clone());
        Trigger::new(move || {
            let left = a.poll();
            let right = b.poll();
            left || right
        })
    }

    /// Inverted condition.
    pub fn negate(&self) -> Trigger {
        let inner = self.clone();
        Trigger::new(move || !inner.poll())
    }

    /// True only on polls where the condition went false → true.
    pub fn rising(&self) -> Trigger {
        let inner = self.clone();
        let mut previous = false;
        Trigger::new(move || {
            let now = inner.poll();
            let edge = now && !previous;
            previous = now;
            edge
        })
    }

    /// True only on polls where the condition went true → false.
    pub fn falling(&self) -> Trigger {
        let inner = self.clone();
        let mut previous = false;
        Trigger::new(move || {
            let now = inner.poll();
            let edge = !now && previous;
            previous = now;
            edge
        })
    }

    /// Condition that must hold steady for `delay` (measured on `clock`)
    /// before the debounced output follows it.
    ///
    /// The output starts false for [`DebounceKind::Rising`] and
    /// [`DebounceKind::Both`], and true for [`DebounceKind::Falling`].
    pub fn debounce(&self, delay: Duration, kind: DebounceKind, clock: &Clock) -> Trigger {
        let inner = self.clone();
        let clock = clock.clone();
        let mut baseline = kind == DebounceKind::Falling;
        let mut stable_since = clock.now();
        Trigger::new(move || {
            let input = inner.poll();
            let now = clock.now();
            if input == baseline {
                stable_since = now;
            }
            if now.saturating_sub(stable_since) >= delay {
                if kind == DebounceKind::Both {
                    baseline = input;
                    stable_since = now;
                }
                input
            } else {
                baseline
            }
        })
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("shared", &Rc::strong_count(&self.condition))
            .finish()
    }
}
