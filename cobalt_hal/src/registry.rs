//! Global handle registry.
//!
//! One manager per resource kind, bundled in a [`HandleRegistry`] context.
//! Code that can take the context explicitly should; code that cannot uses
//! [`global()`], a process-wide instance created on first use.
//!
//! # Lifecycle
//!
//! Construct once, [`reset_all`](HandleRegistry::reset_all) any number of
//! times (simulation restarts, test harnesses), drop at process exit.
//! Nothing resets implicitly.
//!
//! # Reset ordering
//!
//! Notifiers are the only resources with threads blocked on them. A reset
//! marks every live notifier stopped in the same critical section that
//! clears its slot, so a notifier allocated on another thread cannot slip
//! between the two. A waiter on a reclaimed slot always wakes to `0`, and
//! no other kind is cleared until those waiters have drained.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use cobalt_common::hal::config::HalConfig;
use cobalt_common::hal::consts::{
    NUM_ANALOG_INPUTS, NUM_COUNTERS, NUM_DIO_CHANNELS, NUM_ENCODERS, NUM_INTERRUPTS,
    NUM_NOTIFIERS, NUM_PWM_CHANNELS, NUM_REGISTRY_KINDS, NUM_VENDOR_RESOURCES,
};
use cobalt_common::hal::handle::{self as kinds, HandleKind, TypedHandle};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::handles::{
    HandleResource, IndexedHandleResource, LimitedHandleResource, LimitedIndexedHandleResource,
};
use crate::notifier::{NOTIFIER_DRAIN_TIMEOUT, NotifierState};
use crate::ports::{AnalogInputPort, CounterState, DigitalPort, EncoderState, InterruptPort, PwmPort};

// ─── Handle Aliases ─────────────────────────────────────────────────

/// Digital I/O handle.
pub type DioHandle = TypedHandle<kinds::Dio>;
/// PWM output handle.
pub type PwmHandle = TypedHandle<kinds::Pwm>;
/// Notifier handle.
pub type NotifierHandle = TypedHandle<kinds::Notifier>;
/// Counter handle.
pub type CounterHandle = TypedHandle<kinds::Counter>;
/// Interrupt handle.
pub type InterruptHandle = TypedHandle<kinds::Interrupt>;
/// Encoder handle (index = channel A, index2 = channel B).
pub type EncoderHandle = TypedHandle<kinds::Encoder>;
/// Analog input handle.
pub type AnalogInputHandle = TypedHandle<kinds::AnalogInput>;
/// Vendor resource handle.
pub type VendorHandle = TypedHandle<kinds::Vendor>;

/// Type-erased vendor resource.
pub type VendorResource = Box<dyn Any + Send + Sync>;

// ─── Diagnostics ────────────────────────────────────────────────────

/// Occupancy of one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindUsage {
    /// Kind name.
    pub kind: &'static str,
    /// Slot count.
    pub capacity: usize,
    /// Occupied slots.
    pub live: usize,
}

/// Occupancy of every manager, in registry order.
pub type RegistrySnapshot = heapless::Vec<KindUsage, NUM_REGISTRY_KINDS>;

// ─── Registry ───────────────────────────────────────────────────────

/// Every handle manager of the HAL.
pub struct HandleRegistry {
    epoch: Instant,
    pub(crate) dio: IndexedHandleResource<kinds::Dio, DigitalPort, NUM_DIO_CHANNELS>,
    pub(crate) pwm: IndexedHandleResource<kinds::Pwm, PwmPort, NUM_PWM_CHANNELS>,
    pub(crate) notifiers: LimitedHandleResource<kinds::Notifier, NotifierState, NUM_NOTIFIERS>,
    pub(crate) counters: LimitedHandleResource<kinds::Counter, CounterState, NUM_COUNTERS>,
    pub(crate) interrupts:
        LimitedIndexedHandleResource<kinds::Interrupt, InterruptPort, NUM_INTERRUPTS>,
    pub(crate) encoders: IndexedHandleResource<kinds::Encoder, EncoderState, NUM_ENCODERS>,
    pub(crate) analog_inputs:
        IndexedHandleResource<kinds::AnalogInput, AnalogInputPort, NUM_ANALOG_INPUTS>,
    pub(crate) vendor: LimitedHandleResource<kinds::Vendor, VendorResource, NUM_VENDOR_RESOURCES>,
    resets: AtomicU64,
}

impl HandleRegistry {
    /// Create a registry with every slot free.
    pub fn new(config: &HalConfig) -> Self {
        debug!(
            interrupt_max_live = config.interrupt_max_live,
            "creating handle registry"
        );
        Self {
            epoch: Instant::now(),
            dio: IndexedHandleResource::new(),
            pwm: IndexedHandleResource::new(),
            notifiers: LimitedHandleResource::new(),
            counters: LimitedHandleResource::new(),
            interrupts: LimitedIndexedHandleResource::new(config.interrupt_max_live),
            encoders: IndexedHandleResource::new(),
            analog_inputs: IndexedHandleResource::new(),
            vendor: LimitedHandleResource::new(),
            resets: AtomicU64::new(0),
        }
    }

    /// Start of HAL time.
    #[inline]
    pub(crate) fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Microseconds since the registry was created.
    #[inline]
    pub fn hal_time_us(&self) -> u64 {
        crate::notifier::elapsed_us(self.epoch)
    }

    /// Number of completed [`reset_all`](Self::reset_all) calls.
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::Acquire)
    }

    /// Every manager, notifiers first.
    fn managers(&self) -> [&dyn HandleResource; NUM_REGISTRY_KINDS] {
        [
            &self.notifiers,
            &self.interrupts,
            &self.encoders,
            &self.counters,
            &self.dio,
            &self.pwm,
            &self.analog_inputs,
            &self.vendor,
        ]
    }

    /// Free every handle of every kind.
    ///
    /// Every live notifier is stopped and its slot cleared under the
    /// notifier table lock, so a notifier allocated concurrently is either
    /// stopped by this reset or allocated after it. Waiters are drained
    /// once the lock is released; only then are the other kinds cleared.
    /// Every handle issued before the reset is stale afterwards.
    pub fn reset_all(&self) {
        let notifiers = self.notifiers.reset_with(NotifierState::stop);
        for state in &notifiers {
            if !state.drain(NOTIFIER_DRAIN_TIMEOUT) {
                warn!(notifier = %state.name(), "notifier did not drain before reset");
            }
        }
        if !notifiers.is_empty() {
            debug!(kind = %HandleKind::Notifier, live = notifiers.len(), "resetting handles");
        }

        for manager in self.managers() {
            // Already reclaimed above; a second clear would skip the stop.
            if manager.kind() == HandleKind::Notifier {
                continue;
            }
            let live = manager.live_count();
            if live > 0 {
                debug!(kind = %manager.kind(), live, "resetting handles");
            }
            manager.reset();
        }

        let resets = self.resets.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            resets,
            notifiers_drained = notifiers.len(),
            "all HAL handles reset"
        );
    }

    /// Occupied slot count of one kind (0 for kinds the registry lacks).
    pub fn live_count(&self, kind: HandleKind) -> usize {
        self.managers()
            .into_iter()
            .find(|manager| manager.kind() == kind)
            .map_or(0, |manager| manager.live_count())
    }

    /// Occupancy of every manager.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut rows = RegistrySnapshot::new();
        for manager in self.managers() {
            // Capacity equals the manager count, so push cannot fail.
            let _ = rows.push(KindUsage {
                kind: manager.kind().as_str(),
                capacity: manager.capacity(),
                live: manager.live_count(),
            });
        }
        rows
    }

    /// Total occupied slots across all kinds.
    pub fn total_live(&self) -> usize {
        self.managers()
            .into_iter()
            .map(|manager| manager.live_count())
            .sum()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(&HalConfig::default())
    }
}

impl std::fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("usage", &self.snapshot())
            .field("resets", &self.reset_count())
            .finish()
    }
}

// ─── Process-wide Instance ──────────────────────────────────────────

static GLOBAL: OnceLock<Arc<HandleRegistry>> = OnceLock::new();

/// Create the process-wide registry with `config`.
///
/// If it already exists the existing instance is returned unchanged and
/// the new configuration is ignored (logged at `warn`).
pub fn init_global(config: &HalConfig) -> Arc<HandleRegistry> {
    let mut created = false;
    let registry = GLOBAL.get_or_init(|| {
        created = true;
        info!("global handle registry initialized");
        Arc::new(HandleRegistry::new(config))
    });
    if !created {
        warn!("global handle registry already initialized; configuration ignored");
    }
    Arc::clone(registry)
}

/// The process-wide registry, created with defaults on first use.
pub fn global() -> Arc<HandleRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| {
        info!("global handle registry initialized with defaults");
        Arc::new(HandleRegistry::default())
    }))
}

/// Reset every handle of the process-wide registry.
///
/// Intended for simulation restarts and test harnesses only.
pub fn reset_all_handles() {
    global().reset_all();
}
