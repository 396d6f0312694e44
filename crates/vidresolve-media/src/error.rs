//! Error types for vidresolve-media.

use thiserror::Error;

/// Result type for vidresolve-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for vidresolve-media operations.
///
/// Every variant means the index cannot be trusted. There is no partial
/// result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The EBML header element was not found.
    #[error("EBML magic bytes not found")]
    MagicNotFound,

    /// A required element is absent.
    #[error("Missing required element: {0}")]
    MissingElement(&'static str),

    /// A variable-length integer has an invalid width marker.
    #[error("Invalid variable-length integer at offset {offset}")]
    InvalidVint { offset: usize },

    /// Buffer too small for operation.
    #[error("Buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },

    /// The requested index range lies beyond the supplied buffer.
    #[error("Index range ends at byte {end} but buffer holds {len} bytes")]
    RangeOutOfBounds { end: u64, len: usize },

    /// The requested index range is unusable.
    #[error("Invalid index range: {0}")]
    InvalidRange(String),
}

impl Error {
    /// Create an invalid range error.
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }
}
