//! Error types for vidresolve-cipher.

use thiserror::Error;

/// Result type for vidresolve-cipher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for vidresolve-cipher operations.
///
/// Extraction failures mean the player code changed shape upstream; they are
/// never transient and callers must not retry them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No decipher function was found in the code blob.
    #[error("could not extract signature deciphering actions: no transform pattern found")]
    PatternNotFound,

    /// The decipher function calls into a helper object that is not defined.
    #[error("could not extract signature deciphering actions: helper object `{0}` is not defined")]
    HelperNotFound(String),

    /// A statement does not match any known operation shape.
    #[error("could not extract signature deciphering actions: unrecognized operation `{0}`")]
    UnknownOperation(String),

    /// A positional operation is missing its literal argument.
    #[error("could not extract signature deciphering actions: operation `{0}` has no numeric argument")]
    MissingArgument(String),

    /// The decipher function performs no operations.
    #[error("could not extract signature deciphering actions: transform function is empty")]
    EmptyProgram,

    /// Textual program notation could not be parsed.
    #[error("invalid transform program notation: {0}")]
    InvalidNotation(String),
}

impl Error {
    /// Create an unknown operation error.
    pub fn unknown_operation(statement: impl Into<String>) -> Self {
        Self::UnknownOperation(statement.into())
    }

    /// Create an invalid notation error.
    pub fn invalid_notation(msg: impl Into<String>) -> Self {
        Self::InvalidNotation(msg.into())
    }

    /// Returns true if the error came from parsing a code blob.
    pub fn is_extraction_failure(&self) -> bool {
        !matches!(self, Self::InvalidNotation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::PatternNotFound.to_string(),
            "could not extract signature deciphering actions: no transform pattern found"
        );
        assert_eq!(
            Error::HelperNotFound("Xy".into()).to_string(),
            "could not extract signature deciphering actions: helper object `Xy` is not defined"
        );
        assert_eq!(
            Error::invalid_notation("q7").to_string(),
            "invalid transform program notation: q7"
        );
    }

    #[test]
    fn test_extraction_classification() {
        assert!(Error::PatternNotFound.is_extraction_failure());
        assert!(Error::unknown_operation("a.sort()").is_extraction_failure());
        assert!(Error::EmptyProgram.is_extraction_failure());
        assert!(!Error::invalid_notation("x").is_extraction_failure());
    }
}
