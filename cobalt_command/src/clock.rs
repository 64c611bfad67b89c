//! Time source for time-based commands and trigger debouncing.
//!
//! Robot code uses the monotonic clock. Tests and the simulator use a
//! manual clock that only moves when advanced, so tick-by-tick behavior is
//! reproducible.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug, Clone)]
enum Source {
    Monotonic(Instant),
    Manual(Rc<Cell<Duration>>),
}

/// Cheaply clonable time source. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct Clock {
    source: Source,
}

impl Clock {
    /// Wall-monotonic clock starting at zero now.
    pub fn monotonic() -> Self {
        Self {
            source: Source::Monotonic(Instant::now()),
        }
    }

    /// Manual clock starting at zero.
    pub fn manual() -> Self {
        Self {
            source: Source::Manual(Rc::new(Cell::new(Duration::ZERO))),
        }
    }

    /// Time since the clock was created.
    pub fn now(&self) -> Duration {
        match &self.source {
            Source::Monotonic(start) => start.elapsed(),
            Source::Manual(now) => now.get(),
        }
    }

    /// Whether this is a manual clock.
    pub fn is_manual(&self) -> bool {
        matches!(self.source, Source::Manual(_))
    }

    /// Move a manual clock forward. Ignored (with a warning) on a
    /// monotonic clock.
    pub fn advance(&self, by: Duration) {
        match &self.source {
            Source::Manual(now) => now.set(now.get() + by),
            Source::Monotonic(_) => warn!("advance() ignored on a monotonic clock"),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let clock = Clock::manual();
        let other = clock.clone();
        clock.advance(Duration::from_millis(20));
        assert_eq!(other.now(), Duration::from_millis(20));
        assert!(other.is_manual());
    }

    #[test]
    fn monotonic_ignores_advance() {
        let clock = Clock::monotonic();
        let before = clock.now();
        clock.advance(Duration::from_secs(3600));
        assert!(clock.now() < before + Duration::from_secs(3600));
    }
}
