//! Common error types used throughout vidresolve.

/// Common error type for vidresolve.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The user-supplied reference does not name a video.
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    /// A byte range could not be parsed or is empty.
    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new InvalidReference error.
    pub fn invalid_reference<S: Into<String>>(msg: S) -> Self {
        Self::InvalidReference(msg.into())
    }

    /// Create a new InvalidRange error.
    pub fn invalid_range<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
