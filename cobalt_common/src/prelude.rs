//! Prelude module for common re-exports.
//!
//! ```rust
//! use cobalt_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::hal::config::HalConfig;
pub use crate::scheduler::SchedulerConfig;

// ─── Handles ────────────────────────────────────────────────────────
pub use crate::hal::handle::{
    DecodedHandle, HandleKind, INVALID_HANDLE, RawHandle, ResourceKind, TypedHandle,
};
pub use crate::hal::status::{HalError, STATUS_OK, status_of};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_TICK_PERIOD, DEFAULT_TICK_PERIOD_MS};
