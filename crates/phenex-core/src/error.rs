//! Error types shared by the generation-side components.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the generation-side components.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed configuration (zero-length scale ladder, empty memory budget, ...).
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// The operation was cancelled through a [`CancelToken`](crate::CancelToken).
    #[error("operation cancelled")]
    Cancelled,

    /// The base-generation function failed or returned nothing usable.
    #[error("generation failed: {message}")]
    Generation { message: String },

    /// Paired buffers disagree on length where the caller required strictness.
    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a generation failure.
    pub fn generation(message: impl Into<String>) -> Self {
        Error::Generation {
            message: message.into(),
        }
    }

    /// Get error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Configuration { .. } => "configuration",
            Error::Cancelled => "cancelled",
            Error::Generation { .. } => "generation",
            Error::LengthMismatch { .. } => "length_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::LengthMismatch {
            expected: 16,
            actual: 8,
        };
        assert!(err.to_string().contains("16"));
        assert!(err.to_string().contains("8"));
    }

    #[test]
    fn test_category() {
        assert_eq!(Error::Cancelled.category(), "cancelled");
        assert_eq!(Error::configuration("x").category(), "configuration");
    }
}
