//! # Phenex Engine
//!
//! Wraps a single inference call with memory-budget checks. Inputs that fit
//! the budget run in one pass; oversized inputs fall back to sequential
//! chunked execution with a yield point between chunks so the host can
//! reclaim memory. Every call is recorded in a bounded history that feeds
//! the engine's one-shot settings heuristic.

mod engine;
mod profile;

pub use engine::{ExecutionEngine, InferenceRecord, PerformanceMetrics};
pub use profile::{ComputeKind, EngineSettings, ResourceProfile};

/// Prelude for common imports
pub mod prelude {
    pub use super::{ComputeKind, EngineSettings, ExecutionEngine, PerformanceMetrics, ResourceProfile};
}
