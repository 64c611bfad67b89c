//! HAL (Hardware Abstraction Layer) constants.
//!
//! Per-kind slot capacities of the global handle registry. Every capacity
//! must fit the 8-bit index field of a handle.

use static_assertions::const_assert;

use super::handle::MAX_HANDLE_INDEX;

/// Canonical HAL service name (used in logging).
pub const HAL_SERVICE_NAME: &str = "hal";

/// Number of digital I/O channels.
pub const NUM_DIO_CHANNELS: usize = 31;

/// Number of PWM output channels.
pub const NUM_PWM_CHANNELS: usize = 20;

/// Number of notifier slots.
pub const NUM_NOTIFIERS: usize = 32;

/// Number of counter slots.
pub const NUM_COUNTERS: usize = 8;

/// Number of interrupt slots.
pub const NUM_INTERRUPTS: usize = 16;

/// Default number of interrupts that may be live at the same time.
pub const DEFAULT_INTERRUPT_MAX_LIVE: usize = 8;

/// Number of quadrature encoder slots. An encoder is indexed by its
/// channel A, so there is one slot per digital channel.
pub const NUM_ENCODERS: usize = NUM_DIO_CHANNELS;

/// Number of analog input channels.
pub const NUM_ANALOG_INPUTS: usize = 8;

/// Number of vendor-defined resource slots.
pub const NUM_VENDOR_RESOURCES: usize = 64;

/// Number of resource kinds held by the registry.
pub const NUM_REGISTRY_KINDS: usize = 8;

const_assert!(NUM_DIO_CHANNELS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_PWM_CHANNELS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_NOTIFIERS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_COUNTERS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_INTERRUPTS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_ENCODERS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_ANALOG_INPUTS <= MAX_HANDLE_INDEX + 1);
const_assert!(NUM_VENDOR_RESOURCES <= MAX_HANDLE_INDEX + 1);
const_assert!(DEFAULT_INTERRUPT_MAX_LIVE <= NUM_INTERRUPTS);
