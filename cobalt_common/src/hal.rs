//! Hardware abstraction layer shared types.
//!
//! The handle codec and status codes live here rather than in `cobalt_hal`
//! because device collaborators and external tools decode handles without
//! linking the resource managers.

pub mod config;
pub mod consts;
pub mod handle;
pub mod status;
