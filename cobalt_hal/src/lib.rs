//! # Cobalt HAL
//!
//! Handle-based resource registry for the hardware abstraction layer.
//!
//! Hardware and simulation objects never leave the HAL. Callers hold
//! opaque 32-bit handles that carry the resource kind, slot index and a
//! generation counter, so a handle that outlived its resource is rejected
//! instead of silently resolving to whatever reuses the slot.
//!
//! # Module Structure
//!
//! - [`handles`] - slot table and the three manager flavors
//! - [`registry`] - [`HandleRegistry`] context and the process-wide instance
//! - [`notifier`] - HAL-time alarms and the [`Notifier`] callback thread
//! - [`ports`] - DIO, PWM, encoder, interrupt, counter, analog and vendor
//!   resources, plus the raw status-code boundary
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     HandleRegistry                         │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────────────┐  │
//! │  │   Limited    │ │   Indexed    │ │  LimitedIndexed    │  │
//! │  │ (first fit)  │ │ (by channel) │ │ (channel + ceiling)│  │
//! │  └──────┬───────┘ └──────┬───────┘ └─────────┬──────────┘  │
//! │         └────────────────┼───────────────────┘             │
//! │                          ▼                                 │
//! │              SlotTable (Mutex, generations)                │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod handles;
pub mod notifier;
pub mod ports;
pub mod registry;

pub use crate::handles::{
    HandleResource, IndexedHandleResource, LimitedHandleResource, LimitedIndexedHandleResource,
};
pub use crate::notifier::{AlarmFlag, Notifier, NotifierError};
pub use crate::registry::{
    HandleRegistry, KindUsage, RegistrySnapshot, global, init_global, reset_all_handles,
};
