//! Resource description and runtime execution settings.

use serde::{Deserialize, Serialize};

use phenex_core::{Error, Result};

/// Compute substrate the engine targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeKind {
    /// Discrete or integrated GPU.
    Gpu,
    /// Host CPU.
    Cpu,
    /// Constrained edge accelerator.
    Edge,
}

/// Immutable resource budget, supplied at engine construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceProfile {
    /// Memory available for inference buffers, in bytes.
    pub available_memory_bytes: u64,
    /// Compute substrate.
    pub compute_kind: ComputeKind,
    /// Largest batch the backend accepts.
    pub max_batch_size: usize,
    /// Latency target a call should meet.
    pub target_latency_ms: f64,
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self {
            available_memory_bytes: 2 * 1024 * 1024 * 1024,
            compute_kind: ComputeKind::Gpu,
            max_batch_size: 8,
            target_latency_ms: 100.0,
        }
    }
}

impl ResourceProfile {
    /// Set the memory budget.
    pub fn memory_bytes(mut self, bytes: u64) -> Self {
        self.available_memory_bytes = bytes;
        self
    }

    /// Set the compute substrate.
    pub fn compute(mut self, kind: ComputeKind) -> Self {
        self.compute_kind = kind;
        self
    }

    /// Set the latency target.
    pub fn target_latency(mut self, ms: f64) -> Self {
        self.target_latency_ms = ms;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.available_memory_bytes == 0 {
            return Err(Error::configuration("available_memory_bytes must be > 0"));
        }
        if self.max_batch_size == 0 {
            return Err(Error::configuration("max_batch_size must be > 0"));
        }
        if self.target_latency_ms <= 0.0 {
            return Err(Error::configuration("target_latency_ms must be > 0"));
        }
        Ok(())
    }
}

/// Runtime-tunable execution settings.
///
/// [`ExecutionEngine::optimize_settings`](crate::ExecutionEngine::optimize_settings)
/// only ever enables `mixed_precision` and `quantization`; neither flag is
/// auto-disabled once set, which keeps the heuristic from oscillating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Round small magnitudes before inference.
    pub mixed_precision: bool,
    /// Snap inputs to a coarse grid before inference.
    pub quantization: bool,
    /// Let the host batch compatible requests.
    pub dynamic_batching: bool,
    /// Buffers the host keeps pooled for reuse.
    pub pool_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mixed_precision: false,
            quantization: false,
            dynamic_batching: false,
            pool_size: 4,
        }
    }
}
