//! HAL status codes.
//!
//! Inside Rust, handle-layer failures are [`HalError`] values carried in a
//! `Result`. At the raw boundary (device collaborators that speak
//! [`RawHandle`](super::handle::RawHandle)) the same failures travel as
//! out-of-band `i32` status codes. [`HalError::code`] and
//! [`HalError::from_code`] translate between the two.

use thiserror::Error;

/// Status code for success.
pub const STATUS_OK: i32 = 0;

/// Code for [`HalError::InvalidHandle`].
pub const STATUS_INVALID_HANDLE: i32 = -1098;
/// Code for [`HalError::ChannelIndexOutOfRange`].
pub const STATUS_CHANNEL_INDEX_OUT_OF_RANGE: i32 = -1030;
/// Code for [`HalError::ResourceAlreadyAllocated`].
pub const STATUS_RESOURCE_ALREADY_ALLOCATED: i32 = -1029;
/// Code for [`HalError::ResourceExhausted`].
pub const STATUS_RESOURCE_EXHAUSTED: i32 = -1031;
/// Code for [`HalError::NoAvailableResources`].
pub const STATUS_NO_AVAILABLE_RESOURCES: i32 = -104;

/// Error types for handle-layer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// Wrong kind, index out of range, stale generation or malformed value.
    #[error("Invalid handle")]
    InvalidHandle,

    /// Caller-supplied channel outside `[0, capacity)`.
    #[error("Channel index {index} out of range (capacity {capacity})")]
    ChannelIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Manager capacity.
        capacity: usize,
    },

    /// Caller-supplied channel is already in use.
    #[error("Resource at index {index} is already allocated")]
    ResourceAlreadyAllocated {
        /// Requested index.
        index: usize,
    },

    /// Live-count ceiling reached even though raw slots remain.
    #[error("Resource exhausted: at most {limit} may be allocated concurrently")]
    ResourceExhausted {
        /// Configured ceiling.
        limit: usize,
    },

    /// Every slot of a first-fit manager is occupied.
    #[error("No available resources (all {capacity} slots in use)")]
    NoAvailableResources {
        /// Manager capacity.
        capacity: usize,
    },
}

impl HalError {
    /// Out-of-band status code for this error.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidHandle => STATUS_INVALID_HANDLE,
            Self::ChannelIndexOutOfRange { .. } => STATUS_CHANNEL_INDEX_OUT_OF_RANGE,
            Self::ResourceAlreadyAllocated { .. } => STATUS_RESOURCE_ALREADY_ALLOCATED,
            Self::ResourceExhausted { .. } => STATUS_RESOURCE_EXHAUSTED,
            Self::NoAvailableResources { .. } => STATUS_NO_AVAILABLE_RESOURCES,
        }
    }

    /// Rebuild an error from a status code.
    ///
    /// Detail fields are not carried by the code and come back as 0.
    /// Returns `None` for [`STATUS_OK`] and unknown codes.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            STATUS_INVALID_HANDLE => Some(Self::InvalidHandle),
            STATUS_CHANNEL_INDEX_OUT_OF_RANGE => Some(Self::ChannelIndexOutOfRange {
                index: 0,
                capacity: 0,
            }),
            STATUS_RESOURCE_ALREADY_ALLOCATED => Some(Self::ResourceAlreadyAllocated { index: 0 }),
            STATUS_RESOURCE_EXHAUSTED => Some(Self::ResourceExhausted { limit: 0 }),
            STATUS_NO_AVAILABLE_RESOURCES => Some(Self::NoAvailableResources { capacity: 0 }),
            _ => None,
        }
    }

    /// Exhaustion errors are recoverable: retry later or pick another channel.
    pub const fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted { .. } | Self::NoAvailableResources { .. }
        )
    }
}

/// Status code of a handle-layer result.
#[inline]
pub fn status_of<T>(result: &Result<T, HalError>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.code(),
    }
}
