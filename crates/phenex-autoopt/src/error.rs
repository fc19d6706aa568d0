//! Error types for optimization cycles.

use thiserror::Error;

/// Errors raised while running an optimization cycle.
#[derive(Debug, Error)]
pub enum OptError {
    /// A benchmark evaluator failed for one test case.
    #[error("evaluation failed for case {index}: {message}")]
    Evaluation { index: usize, message: String },

    /// A cycle was requested with no test cases.
    #[error("optimization cycle needs at least one test case")]
    NoCases,
}

/// Result type for optimization operations.
pub type Result<T> = std::result::Result<T, OptError>;
