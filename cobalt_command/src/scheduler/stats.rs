//! Tick timing statistics.

use std::time::Duration;

/// Timing of completed [`run`](super::CommandScheduler::run) calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Completed ticks.
    pub ticks: u64,
    /// Duration of the most recent tick.
    pub last: Duration,
    /// Longest tick.
    pub max: Duration,
    /// Sum of all tick durations.
    pub total: Duration,
    /// Ticks that took longer than the configured period.
    pub overruns: u64,
}

impl TickStats {
    /// Record one tick. Returns `true` if it overran `period`.
    #[inline]
    pub fn record(&mut self, elapsed: Duration, period: Duration) -> bool {
        self.ticks += 1;
        self.last = elapsed;
        self.max = self.max.max(elapsed);
        self.total += elapsed;
        let overrun = elapsed > period;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    /// Mean tick duration (zero before the first tick).
    pub fn average(&self) -> Duration {
        match u32::try_from(self.ticks) {
            Ok(0) => Duration::ZERO,
            Ok(ticks) => self.total / ticks,
            Err(_) => Duration::from_nanos((self.total.as_nanos() / u128::from(self.ticks)) as u64),
        }
    }
}
