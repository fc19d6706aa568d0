//! # Phenex
//!
//! Adaptive generative-inference pipeline: turns a textual request into a
//! raster image through resource-aware, progressively refined generation
//! passes, while tracking output health and periodically re-tuning itself.
//!
//! Phenex is named after the 37th demon of the Ars Goetia, who appears as a
//! phoenix - each draft image burns down and is rendered anew at a higher
//! scale.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── Orchestrator ───────────────────────────┐
//! │                                                                     │
//! │  complexity ──▶ ArchitectureController (grow / shrink stages)       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  RefinementScheduler ──▶ ExecutionEngine ──▶ host base generator    │
//! │       │         preview ▶ refine ▶ refine ▶ ... early-stop          │
//! │       ▼                                                             │
//! │  PluginRegistry (postprocessors) ──▶ HealthMonitor ──▶ alerts       │
//! │                                                                     │
//! │  OptimizationLoop / CurriculumController run on caller cadences     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pipeline is a library embedded in a host application. The host
//! supplies the base-generation function `(prompt, scale) -> Frame`, an
//! optional progress sink, and alert sinks; the pipeline knows nothing about
//! how images are produced or displayed.
//!
//! ## Example
//!
//! ```ignore
//! use phenex::prelude::*;
//!
//! let mut pipeline = Orchestrator::new(PipelineConfig::default())?;
//! pipeline.initialize()?;
//!
//! let request = GenerationRequest::new("a harbor at dusk").tier(ResolutionTier::High);
//! let result = pipeline.generate(&request, |prompt, scale| host_backend(prompt, scale))?;
//! ```

mod error;
mod orchestrator;
mod request;

pub use error::{Error, Result};
pub use orchestrator::{
    default_benchmark, default_memory_estimate, BenchmarkDerivation, MemoryEstimator,
    Orchestrator, PipelineConfig, PipelineStatus, StateSnapshot,
};
pub use request::{GenerationRequest, GenerationResult, ResolutionTier};

pub use phenex_adapt::{
    AdaptConfig, Adaptation, ArchitectureController, ArchitectureInfo, KindFallback, Stage,
    StageKind,
};
pub use phenex_attention::{AttentionConfig, AttentionFusion};
pub use phenex_autoopt::{
    BenchmarkMetrics, CycleOutcome, MetricWeights, OptimizationLoop, OptimizationState,
    OptimizerConfig,
};
pub use phenex_core::{
    CancelToken, Error as CoreError, Frame, Result as CoreResult, RollingWindow,
};
pub use phenex_engine::{
    ComputeKind, EngineSettings, ExecutionEngine, PerformanceMetrics, ResourceProfile,
};
pub use phenex_health::{
    HealthConfig, HealthMetrics, HealthMonitor, HealthReport, HealthTrend, Severity,
};
pub use phenex_learning::{CurriculumController, CurriculumStage, TrainingProgress};
pub use phenex_plugin::{Plugin, PluginError, PluginKind, PluginRegistry};
pub use phenex_refine::{
    QualityEstimator, RefineConfig, RefinementOutcome, RefinementScheduler, VarianceEdgeEstimator,
};

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        CancelToken, Error, Frame, GenerationRequest, GenerationResult, Orchestrator,
        PipelineConfig, ResolutionTier, Result,
    };
}
