//! Timed notifiers.
//!
//! A notifier is an alarm in HAL time: a thread blocks in
//! [`HandleRegistry::wait_for_notifier_alarm`] until the alarm time passes or
//! the notifier is stopped (the wait then returns `0`).
//!
//! Stopping is also the drain point. [`NotifierState::stop_and_drain`] wakes
//! every waiter and then blocks (bounded) until no thread is inside a wait
//! or an alarm callback. The registry calls it before freeing a notifier
//! slot, both in [`HandleRegistry::clean_notifier`] and in
//! [`HandleRegistry::reset_all`], so no callback can run against a slot that
//! has been reclaimed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cobalt_common::hal::status::HalError;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::registry::{HandleRegistry, NotifierHandle};

/// Upper bound on how long a stop waits for waiters to leave.
pub const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ─── HAL-side State ─────────────────────────────────────────────────

#[derive(Debug)]
struct NotifierInner {
    name: String,
    /// Alarm time [µs of HAL time]; `None` when no alarm is armed.
    trigger_time_us: Option<u64>,
    running: bool,
    /// Threads currently inside a wait (or the callback that follows it).
    users: usize,
}

/// Resource stored in the notifier slot table.
#[derive(Debug)]
pub struct NotifierState {
    inner: Mutex<NotifierInner>,
    cond: Condvar,
}

/// Decrements the user count when a waiter leaves, even by unwinding.
struct UserGuard<'a>(&'a NotifierState);

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.lock();
        inner.users -= 1;
        if inner.users == 0 {
            self.0.cond.notify_all();
        }
    }
}

impl NotifierState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(NotifierInner {
                name: String::new(),
                trigger_time_us: None,
                running: true,
                users: 0,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NotifierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Diagnostic name.
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Whether the notifier has not been stopped.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Armed alarm time, if any.
    pub fn trigger_time_us(&self) -> Option<u64> {
        self.lock().trigger_time_us
    }

    pub(crate) fn set_name(&self, name: &str) {
        self.lock().name = name.to_string();
    }

    pub(crate) fn update_alarm(&self, trigger_time_us: u64) {
        let mut inner = self.lock();
        if inner.running {
            inner.trigger_time_us = Some(trigger_time_us);
            self.cond.notify_all();
        }
    }

    pub(crate) fn cancel_alarm(&self) {
        let mut inner = self.lock();
        inner.trigger_time_us = None;
        self.cond.notify_all();
    }

    /// Stop the notifier and wake every waiter without waiting for them.
    pub(crate) fn stop(&self) {
        let mut inner = self.lock();
        inner.running = false;
        inner.trigger_time_us = None;
        self.cond.notify_all();
    }

    /// Stop the notifier and wait until every waiter has left.
    ///
    /// Returns `false` if waiters were still inside after `timeout`.
    pub(crate) fn stop_and_drain(&self, timeout: Duration) -> bool {
        self.stop();
        self.drain(timeout)
    }

    /// Wait until no thread is inside a wait or callback.
    pub(crate) fn drain(&self, timeout: Duration) -> bool {
        let mut inner = self.lock();
        let deadline = Instant::now() + timeout;
        while inner.users > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            inner = self
                .cond
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Block until the alarm fires or the notifier stops, then run
    /// `on_alarm` while still counted as a user.
    ///
    /// Returns the HAL time of the alarm, or `0` if stopped.
    pub(crate) fn wait_then<F: FnOnce(u64)>(&self, epoch: Instant, on_alarm: F) -> u64 {
        let _user = {
            self.lock().users += 1;
            UserGuard(self)
        };
        let mut inner = self.lock();

        let fired = loop {
            if !inner.running {
                break 0;
            }
            match inner.trigger_time_us {
                Some(trigger) => {
                    let now = elapsed_us(epoch);
                    if now >= trigger {
                        inner.trigger_time_us = None;
                        // 0 is reserved for "stopped".
                        break now.max(1);
                    }
                    inner = self
                        .cond
                        .wait_timeout(inner, Duration::from_micros(trigger - now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    inner = self
                        .cond
                        .wait(inner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        };
        drop(inner);

        if fired != 0 {
            on_alarm(fired);
        }
        fired
    }
}

#[inline]
pub(crate) fn elapsed_us(epoch: Instant) -> u64 {
    epoch.elapsed().as_micros() as u64
}

// ─── Registry Operations ────────────────────────────────────────────

impl HandleRegistry {
    /// Allocate a running notifier with no alarm armed.
    ///
    /// # Errors
    /// `HalError::NoAvailableResources` when every notifier slot is in use.
    pub fn initialize_notifier(&self) -> Result<NotifierHandle, HalError> {
        let handle = self.notifiers.allocate(NotifierState::new())?;
        debug!(?handle, "notifier initialized");
        Ok(handle)
    }

    /// Attach a diagnostic name.
    pub fn set_notifier_name(&self, handle: NotifierHandle, name: &str) -> Result<(), HalError> {
        self.notifiers.get(handle)?.set_name(name);
        Ok(())
    }

    /// Arm (or re-arm) the alarm at an absolute HAL time.
    pub fn update_notifier_alarm(
        &self,
        handle: NotifierHandle,
        trigger_time_us: u64,
    ) -> Result<(), HalError> {
        self.notifiers.get(handle)?.update_alarm(trigger_time_us);
        Ok(())
    }

    /// Disarm the alarm; waiters keep waiting.
    pub fn cancel_notifier_alarm(&self, handle: NotifierHandle) -> Result<(), HalError> {
        self.notifiers.get(handle)?.cancel_alarm();
        Ok(())
    }

    /// Stop the notifier: every current and future wait returns `0`.
    pub fn stop_notifier(&self, handle: NotifierHandle) -> Result<(), HalError> {
        let state = self.notifiers.get(handle)?;
        if !state.stop_and_drain(NOTIFIER_DRAIN_TIMEOUT) {
            warn!(?handle, "notifier waiters did not drain within timeout");
        }
        Ok(())
    }

    /// Block until the alarm fires (returns HAL time) or the notifier is
    /// stopped (returns `0`).
    ///
    /// The manager lock is not held while blocking.
    pub fn wait_for_notifier_alarm(&self, handle: NotifierHandle) -> Result<u64, HalError> {
        self.run_notifier_alarm(handle, |_| ())
    }

    /// Like [`wait_for_notifier_alarm`](Self::wait_for_notifier_alarm), but
    /// runs `on_alarm` before returning. A stop issued meanwhile waits for
    /// the callback to finish.
    pub fn run_notifier_alarm<F: FnOnce(u64)>(
        &self,
        handle: NotifierHandle,
        on_alarm: F,
    ) -> Result<u64, HalError> {
        let state = self.notifiers.get(handle)?;
        Ok(state.wait_then(self.epoch(), on_alarm))
    }

    /// Stop, drain and free a notifier. Stale handles are ignored.
    pub fn clean_notifier(&self, handle: NotifierHandle) {
        if let Ok(state) = self.notifiers.get(handle) {
            if !state.stop_and_drain(NOTIFIER_DRAIN_TIMEOUT) {
                warn!(?handle, "notifier waiters did not drain before free");
            }
        }
        if self.notifiers.free(handle).is_some() {
            debug!(?handle, "notifier freed");
        }
    }
}

// ─── Owning Wrapper ─────────────────────────────────────────────────

/// Failure to start a [`Notifier`].
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The HAL notifier could not be allocated or named.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// The OS refused the callback thread. The HAL notifier has already
    /// been released.
    #[error("failed to spawn notifier thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct Schedule {
    /// Next expiration [µs of HAL time].
    expiration_us: u64,
    /// Re-arm period [µs]; `None` for single-shot.
    period_us: Option<u64>,
}

/// Runs a callback from a dedicated thread whenever its HAL alarm fires.
///
/// The thread exits when the notifier is stopped, dropped, or reclaimed by
/// a registry reset.
pub struct Notifier {
    registry: Arc<HandleRegistry>,
    handle: NotifierHandle,
    schedule: Arc<Mutex<Schedule>>,
    thread: Option<JoinHandle<()>>,
}

impl Notifier {
    /// Allocate a HAL notifier and start its callback thread.
    ///
    /// # Errors
    /// - [`NotifierError::Hal`] with `NoAvailableResources` when every
    ///   notifier slot is in use
    /// - [`NotifierError::Spawn`] when the thread cannot be created
    pub fn new<F>(
        registry: Arc<HandleRegistry>,
        name: &str,
        mut callback: F,
    ) -> Result<Self, NotifierError>
    where
        F: FnMut() + Send + 'static,
    {
        let handle = registry.initialize_notifier()?;
        registry.set_notifier_name(handle, name)?;

        let schedule = Arc::new(Mutex::new(Schedule::default()));
        let thread_registry = Arc::clone(&registry);
        let thread_schedule = Arc::clone(&schedule);
        let thread_name = format!("notifier-{name}");

        let thread = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                loop {
                    let result = thread_registry.run_notifier_alarm(handle, |now| {
                        rearm(&thread_registry, handle, &thread_schedule, now);
                        callback();
                    });
                    match result {
                        Ok(0) | Err(_) => break,
                        Ok(now) => trace!(?handle, now, "notifier fired"),
                    }
                }
                debug!(?handle, "notifier thread exiting");
            })
            .map_err(|e| {
                warn!(?handle, "failed to spawn notifier thread: {e}");
                registry.clean_notifier(handle);
                NotifierError::Spawn(e)
            })?;

        Ok(Self {
            registry,
            handle,
            schedule,
            thread: Some(thread),
        })
    }

    /// HAL handle of this notifier.
    pub fn handle(&self) -> NotifierHandle {
        self.handle
    }

    /// Fire once after `delay`.
    pub fn start_single(&self, delay: Duration) -> Result<(), HalError> {
        self.arm(delay, None)
    }

    /// Fire every `period`, starting one period from now.
    pub fn start_periodic(&self, period: Duration) -> Result<(), HalError> {
        self.arm(period, Some(period.as_micros() as u64))
    }

    /// Disarm without stopping the thread; a later start re-arms it.
    pub fn stop(&self) -> Result<(), HalError> {
        self.lock_schedule().period_us = None;
        self.registry.cancel_notifier_alarm(self.handle)
    }

    fn arm(&self, delay: Duration, period_us: Option<u64>) -> Result<(), HalError> {
        let expiration_us = self.registry.hal_time_us() + delay.as_micros() as u64;
        {
            let mut schedule = self.lock_schedule();
            schedule.expiration_us = expiration_us;
            schedule.period_us = period_us;
        }
        self.registry.update_notifier_alarm(self.handle, expiration_us)
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Re-arm a periodic notifier from inside its callback window.
fn rearm(registry: &HandleRegistry, handle: NotifierHandle, schedule: &Mutex<Schedule>, now: u64) {
    let mut schedule = schedule.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(period) = schedule.period_us.filter(|p| *p > 0) else {
        return;
    };
    schedule.expiration_us += period;
    // Skip missed periods instead of firing a burst.
    if schedule.expiration_us <= now {
        let behind = (now - schedule.expiration_us) / period + 1;
        schedule.expiration_us += behind * period;
    }
    let _ = registry.update_notifier_alarm(handle, schedule.expiration_us);
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Stop first so the thread's wait returns 0, then join, then free.
        let _ = self.registry.stop_notifier(self.handle);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(handle = ?self.handle, "notifier callback panicked");
            }
        }
        self.registry.clean_notifier(self.handle);
    }
}

/// Shared flag raised by a notifier callback and polled (and cleared) by
/// the control loop.
#[derive(Debug, Clone, Default)]
pub struct AlarmFlag(Arc<AtomicBool>);

impl AlarmFlag {
    /// New cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Read and clear the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
