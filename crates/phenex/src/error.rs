//! Pipeline-level error aggregation.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// `generate` or `optimize` was called before `initialize`.
    #[error("pipeline not initialized: call initialize() first")]
    Uninitialized,

    /// Generation, configuration, or cancellation failure from a component.
    #[error("pipeline error: {0}")]
    Core(#[from] phenex_core::Error),

    /// Plugin dispatch failure.
    #[error("plugin error: {0}")]
    Plugin(#[from] phenex_plugin::PluginError),

    /// Optimization cycle failure.
    #[error("optimization error: {0}")]
    Optimization(#[from] phenex_autoopt::OptError),

    /// State snapshot serialization failure.
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure came from caller-requested cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Core(phenex_core::Error::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_detection() {
        let err = Error::from(phenex_core::Error::Cancelled);
        assert!(err.is_cancelled());
        assert!(!Error::Uninitialized.is_cancelled());
    }
}
