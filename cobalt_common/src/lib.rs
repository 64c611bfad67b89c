//! Cobalt Common Library
//!
//! Shared types for every crate in the Cobalt workspace. Nothing in here
//! owns state: the handle codec is pure arithmetic, status codes are plain
//! values and configuration structs are plain data.
//!
//! # Module Structure
//!
//! - [`hal`] - Handle codec, resource kinds, status codes, HAL configuration
//! - [`scheduler`] - Command scheduler configuration
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! cobalt = { package = "cobalt_common", path = "../cobalt_common" }
//! ```
//!
//! ```rust
//! use cobalt_common::hal::handle::{HandleKind, decode, encode};
//!
//! let raw = encode(HandleKind::Dio, 3, 0, 1);
//! let decoded = decode(raw).unwrap();
//! assert_eq!(decoded.kind, HandleKind::Dio);
//! assert_eq!(decoded.index, 3);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod scheduler;
