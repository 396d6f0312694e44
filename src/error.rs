//! Error types for vidresolve.

use thiserror::Error;

use crate::resolver::{AttemptLog, Unavailability};

/// Result type for vidresolve operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The content itself cannot be played. Retrying will not help.
    Unrecoverable,
    /// The service could not be reached within the retry budget.
    Transient,
    /// Input or an upstream response did not have the expected structure.
    Malformed,
    /// No format satisfied the selection criteria.
    NotFound,
    Cancelled,
    /// The HTTP client could not be set up.
    Client,
}

/// Error type for vidresolve operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid video reference or byte range.
    #[error(transparent)]
    Input(#[from] vidresolve_common::Error),

    /// Transform extraction failed.
    #[error(transparent)]
    Cipher(#[from] vidresolve_cipher::Error),

    /// Segment index construction failed.
    #[error(transparent)]
    Media(#[from] vidresolve_media::Error),

    /// No endpoint produced usable metadata.
    #[error("Video unavailable: {reason} (attempts: {attempts})")]
    Unavailable {
        reason: Unavailability,
        attempts: AttemptLog,
    },

    /// An upstream response could not be interpreted.
    #[error("Malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    /// A required resource could not be fetched.
    #[error("Failed to fetch {resource}: {detail}")]
    Fetch {
        resource: &'static str,
        detail: String,
    },

    /// No format matched the selection criteria.
    #[error("No format matches criteria: {0}")]
    FormatNotFound(String),

    /// Resolution was cancelled by the caller.
    #[error("Resolution cancelled")]
    Cancelled,

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl Error {
    /// Create a malformed response error.
    pub fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            detail: detail.into(),
        }
    }

    /// Create a fetch error.
    pub fn fetch(resource: &'static str, detail: impl Into<String>) -> Self {
        Self::Fetch {
            resource,
            detail: detail.into(),
        }
    }

    /// Create an HTTP client error.
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) | Self::Cipher(_) | Self::Media(_) | Self::Malformed { .. } => {
                ErrorKind::Malformed
            }
            Self::Unavailable { reason, .. } if reason.is_transient() => ErrorKind::Transient,
            Self::Unavailable { .. } => ErrorKind::Unrecoverable,
            Self::Fetch { .. } => ErrorKind::Transient,
            Self::FormatNotFound(_) => ErrorKind::NotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Client(_) => ErrorKind::Client,
        }
    }
}
