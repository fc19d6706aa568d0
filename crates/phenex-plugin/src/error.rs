//! Error types for plugin dispatch.

use thiserror::Error;

/// Errors raised by the plugin registry.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No plugin registered under the id.
    #[error("plugin '{id}' is not registered")]
    NotRegistered { id: String },

    /// The plugin exists but is not in the activation set.
    #[error("plugin '{id}' is not active")]
    NotActive { id: String },

    /// The plugin's validation predicate rejected the input.
    #[error("plugin '{id}' rejected its input")]
    Validation { id: String },

    /// The plugin body failed; the failure propagates to the caller.
    #[error("plugin '{id}' failed: {message}")]
    Execution { id: String, message: String },
}

/// Result type for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
