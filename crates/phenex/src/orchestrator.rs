//! Pipeline orchestrator: owns one instance of every component and drives a
//! generation request through adaptation, refinement, post-processing, and
//! health monitoring.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use phenex_adapt::{AdaptConfig, ArchitectureController, ArchitectureInfo};
use phenex_attention::{AttentionConfig, AttentionFusion};
use phenex_autoopt::{
    BenchmarkMetrics, CycleOutcome, OptimizationLoop, OptimizerConfig,
};
use phenex_core::{CancelToken, Frame};
use phenex_engine::{EngineSettings, ExecutionEngine, PerformanceMetrics, ResourceProfile};
use phenex_health::{HealthConfig, HealthMonitor, HealthTrend};
use phenex_plugin::{PluginKind, PluginRegistry};
use phenex_refine::{RefineConfig, RefinementOutcome, RefinementScheduler};

use crate::error::{Error, Result};
use crate::request::{GenerationRequest, GenerationResult, ResolutionTier};

/// Estimates the memory footprint of a pass from the active stage count.
///
/// The default is a coarse placeholder with no physical basis; hosts with
/// real accounting should install their own estimator.
pub type MemoryEstimator = fn(active_stages: usize) -> f64;

/// Default estimate: 10 MB per active stage.
#[must_use]
pub fn default_memory_estimate(active_stages: usize) -> f64 {
    10.0 * active_stages as f64
}

/// Derives one benchmark sample from a finished generation.
///
/// Arguments: the result, the measured latency, the resource profile, and a
/// batch-level consistency score. Each dimension stays independently
/// replaceable by installing a different derivation.
pub type BenchmarkDerivation =
    fn(&GenerationResult, latency_ms: f64, &ResourceProfile, consistency: f64) -> BenchmarkMetrics;

/// Default benchmark derivation.
#[must_use]
pub fn default_benchmark(
    result: &GenerationResult,
    latency_ms: f64,
    profile: &ResourceProfile,
    consistency: f64,
) -> BenchmarkMetrics {
    let speed = if latency_ms > 0.0 {
        profile.target_latency_ms / latency_ms
    } else {
        1.0
    };
    let budget_mb = profile.available_memory_bytes as f64 / (1024.0 * 1024.0);
    let memory_efficiency = if budget_mb > 0.0 {
        1.0 - result.memory_used_mb / budget_mb
    } else {
        0.0
    };
    BenchmarkMetrics::new(result.quality as f64, speed, memory_efficiency, consistency)
}

/// Aggregate pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Version tag carried into exported state.
    pub version: String,
    /// Attention fusion settings.
    pub attention: AttentionConfig,
    /// Architecture controller settings.
    pub adapt: AdaptConfig,
    /// Execution resource budget.
    pub profile: ResourceProfile,
    /// Execution engine settings.
    pub engine: EngineSettings,
    /// Refinement ladder settings.
    pub refine: RefineConfig,
    /// Health monitoring thresholds.
    pub health: HealthConfig,
    /// Optimization loop settings.
    pub optimizer: OptimizerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            attention: AttentionConfig::default(),
            adapt: AdaptConfig::default(),
            profile: ResourceProfile::default(),
            engine: EngineSettings::default(),
            refine: RefineConfig::default(),
            health: HealthConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Read-only status over every owned component.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    /// Whether `initialize` has run.
    pub initialized: bool,
    /// Architecture summary.
    pub architecture: ArchitectureInfo,
    /// Execution engine metrics.
    pub engine: PerformanceMetrics,
    /// Health samples currently windowed.
    pub health_window: usize,
    /// Health trend against the baseline.
    pub health_trend: HealthTrend,
    /// Optimization cycles run.
    pub optimization_generation: u64,
    /// Optimization improvements recorded.
    pub improvement_count: u64,
    /// Optimization degradations recorded.
    pub degradation_count: u64,
    /// Active plugin ids, in activation order.
    pub active_plugins: Vec<String>,
}

/// Serializable snapshot for persistence and versioning.
///
/// There is deliberately no import path; a snapshot documents a pipeline, it
/// does not restore one.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    /// Version tag.
    pub version: String,
    /// Full configuration.
    pub config: PipelineConfig,
    /// Architecture summary.
    pub architecture: ArchitectureInfo,
}

/// Owns one instance of every pipeline component and exposes the public
/// entry points: `initialize`, `generate`, `optimize`, `status`,
/// `export_state`.
///
/// Every mutating entry point takes `&mut self`, which enforces the
/// single-writer discipline over the shared rolling histories at compile
/// time. Confine one orchestrator to one logical owner; run independent
/// orchestrators for concurrent generation.
pub struct Orchestrator {
    config: PipelineConfig,
    initialized: bool,
    attention: AttentionFusion,
    controller: ArchitectureController,
    engine: ExecutionEngine,
    refiner: RefinementScheduler,
    optimizer: OptimizationLoop,
    health: HealthMonitor,
    plugins: PluginRegistry,
    memory_estimator: MemoryEstimator,
    benchmark: BenchmarkDerivation,
}

impl Orchestrator {
    /// Builds every component from the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let attention = AttentionFusion::new(config.attention.clone())?;
        let controller = ArchitectureController::new(config.adapt.clone())?;
        let engine =
            ExecutionEngine::new(config.profile.clone())?.with_settings(config.engine.clone());
        let refiner = RefinementScheduler::new(config.refine.clone())?;
        let optimizer = OptimizationLoop::new(config.optimizer.clone());
        let health = HealthMonitor::new(config.health.clone());
        let plugins = PluginRegistry::new();

        Ok(Self {
            config,
            initialized: false,
            attention,
            controller,
            engine,
            refiner,
            optimizer,
            health,
            plugins,
            memory_estimator: default_memory_estimate,
            benchmark: default_benchmark,
        })
    }

    /// One-time setup. Idempotent; `generate` before this fails.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            debug!("pipeline already initialized");
            return Ok(());
        }
        self.initialized = true;
        info!(
            version = self.config.version.as_str(),
            plugins = self.plugins.list_registered().len(),
            "pipeline initialized"
        );
        Ok(())
    }

    /// Runs one generation request.
    ///
    /// `base` is the host-supplied base-generation function
    /// `(prompt, scale) -> Frame`; its failures propagate as generation
    /// failures. The preview tier takes the single-pass path; every other
    /// tier runs the full progressive ladder.
    pub fn generate<F>(&mut self, request: &GenerationRequest, base: F) -> Result<GenerationResult>
    where
        F: FnMut(&str, f32) -> phenex_core::Result<Frame>,
    {
        self.generate_with_progress(request, |_, _| {}, base)
    }

    /// [`generate`](Self::generate) with a progress sink.
    ///
    /// The sink receives a strictly non-decreasing fraction in `[0, 1]` and
    /// a stage label, zero or more times.
    pub fn generate_with_progress<F, P>(
        &mut self,
        request: &GenerationRequest,
        on_progress: P,
        mut base: F,
    ) -> Result<GenerationResult>
    where
        F: FnMut(&str, f32) -> phenex_core::Result<Frame>,
        P: FnMut(f32, &str),
    {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }

        let start = Instant::now();
        let cancel = request.cancel.clone().unwrap_or_default();

        let complexity = Self::estimate_complexity(request);
        self.controller.adapt(complexity);
        debug!(
            complexity,
            active_stages = self.controller.active_count(),
            "architecture adapted for request"
        );

        let prompt = request.effective_prompt();
        let outcome = self.run_refinement(request.tier, &prompt, &cancel, on_progress, &mut base)?;

        // Active postprocessors fold over the final image in activation order.
        let width = outcome.image.width();
        let height = outcome.image.height();
        let data = self
            .plugins
            .execute_by_kind(PluginKind::Postprocessor, outcome.image.into_data())?;
        let image = Arc::new(Frame::new(width, height, data)?);

        self.health.monitor_output(Arc::clone(&image), None);

        let active_stages = self.controller.active_count();
        Ok(GenerationResult {
            image,
            generation_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            quality: outcome.quality,
            memory_used_mb: (self.memory_estimator)(active_stages),
            stages_used: active_stages,
        })
    }

    /// Runs the scheduler with every base pass routed through the execution
    /// engine, which budget-checks the pass's buffer, applies any enabled
    /// precision conditioning, and records the call.
    fn run_refinement<F, P>(
        &mut self,
        tier: ResolutionTier,
        prompt: &str,
        cancel: &CancelToken,
        on_progress: P,
        base: &mut F,
    ) -> Result<RefinementOutcome>
    where
        F: FnMut(&str, f32) -> phenex_core::Result<Frame>,
        P: FnMut(f32, &str),
    {
        let engine = &mut self.engine;
        let refiner = &self.refiner;

        let leaf = |prompt: &str, scale: f32| -> phenex_core::Result<Frame> {
            let frame = base(prompt, scale)?;
            let width = frame.width();
            let height = frame.height();
            let data = engine.execute(frame.data(), cancel, |chunk| Ok(chunk.to_vec()))?;
            Frame::new(width, height, data)
        };

        let outcome = match tier {
            ResolutionTier::Preview => {
                refiner.generate_preview(prompt, cancel, on_progress, leaf)?
            }
            _ => refiner.generate_progressive(prompt, cancel, on_progress, leaf)?,
        };
        Ok(outcome)
    }

    /// Complexity estimate: tier base plus a word-count term, capped at 1.0.
    fn estimate_complexity(request: &GenerationRequest) -> f64 {
        let words = request.prompt.split_whitespace().count() as f64;
        (request.tier.base_complexity() + (words / 100.0).min(0.3)).min(1.0)
    }

    /// Runs one optimization cycle over a fixed set of self-generated test
    /// cases, each driven through `generate`.
    pub fn optimize<F>(&mut self, mut base: F) -> Result<CycleOutcome>
    where
        F: FnMut(&str, f32) -> phenex_core::Result<Frame>,
    {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }

        let cases = [
            ("a lone tree on a hillside", ResolutionTier::Preview),
            ("a harbor city at dusk, detailed", ResolutionTier::Standard),
            ("portrait of an explorer, dramatic light", ResolutionTier::High),
        ];

        let mut results = Vec::with_capacity(cases.len());
        for (prompt, tier) in cases {
            let request = GenerationRequest::new(prompt).tier(tier);
            let pass_start = Instant::now();
            let result = self.generate(&request, &mut base)?;
            results.push((result, pass_start.elapsed().as_secs_f64() * 1000.0));
        }

        // Consistency is a batch property: the spread of quality estimates.
        let qualities: Vec<f64> = results.iter().map(|(r, _)| r.quality as f64).collect();
        let spread = qualities.iter().cloned().fold(f64::MIN, f64::max)
            - qualities.iter().cloned().fold(f64::MAX, f64::min);
        let consistency = (1.0 - spread).clamp(0.0, 1.0);

        let samples: Vec<BenchmarkMetrics> = results
            .iter()
            .map(|(result, latency)| {
                (self.benchmark)(result, *latency, &self.config.profile, consistency)
            })
            .collect();

        let outcome = self.optimizer.run_cycle(&samples, |sample| Ok(*sample))?;
        Ok(outcome)
    }

    /// Read-only status over the owned components.
    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        let optimization = self.optimizer.state();
        PipelineStatus {
            initialized: self.initialized,
            architecture: self.controller.info(),
            engine: self.engine.metrics(),
            health_window: self.health.window_len(),
            health_trend: self.health.report().trend,
            optimization_generation: optimization.generation,
            improvement_count: optimization.improvement_count,
            degradation_count: optimization.degradation_count,
            active_plugins: self
                .plugins
                .list_active()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Serializable snapshot of configuration, architecture, and version.
    #[must_use]
    pub fn export_state(&self) -> StateSnapshot {
        StateSnapshot {
            version: self.config.version.clone(),
            config: self.config.clone(),
            architecture: self.controller.info(),
        }
    }

    /// [`export_state`](Self::export_state) rendered as pretty JSON.
    pub fn export_state_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_state())?)
    }

    /// Installs a custom memory estimator.
    pub fn set_memory_estimator(&mut self, estimator: MemoryEstimator) {
        self.memory_estimator = estimator;
    }

    /// Installs a custom benchmark derivation.
    pub fn set_benchmark_derivation(&mut self, derivation: BenchmarkDerivation) {
        self.benchmark = derivation;
    }

    /// The attention fusion module.
    #[must_use]
    pub fn attention(&self) -> &AttentionFusion {
        &self.attention
    }

    /// The architecture controller.
    #[must_use]
    pub fn architecture(&self) -> &ArchitectureController {
        &self.controller
    }

    /// The plugin registry, for registration and activation.
    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    /// The plugin registry, read-only.
    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// The health monitor, for alert sink registration.
    pub fn health_mut(&mut self) -> &mut HealthMonitor {
        &mut self.health
    }

    /// The health monitor, read-only.
    #[must_use]
    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// The execution engine, for settings optimization.
    pub fn engine_mut(&mut self) -> &mut ExecutionEngine {
        &mut self.engine
    }

    /// The optimization loop, read-only.
    #[must_use]
    pub fn optimization(&self) -> &OptimizationLoop {
        &self.optimizer
    }

    /// The aggregate configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("initialized", &self.initialized)
            .field("architecture", &self.controller.info())
            .field("active_plugins", &self.plugins.list_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_base(_prompt: &str, scale: f32) -> phenex_core::Result<Frame> {
        let side = ((8.0 * scale) as usize).max(2);
        let data = (0..side * side)
            .map(|i| if i % 2 == 0 { 0.2 } else { 0.8 })
            .collect();
        Frame::new(side, side, data)
    }

    #[test]
    fn test_generate_before_initialize_fails() {
        let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
        let request = GenerationRequest::new("a test");
        let result = pipeline.generate(&request, stub_base);
        assert!(matches!(result, Err(Error::Uninitialized)));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
        pipeline.initialize().unwrap();
        pipeline.initialize().unwrap();
        assert!(pipeline.status().initialized);
    }

    #[test]
    fn test_complexity_estimate() {
        let short = GenerationRequest::new("tree").tier(ResolutionTier::Standard);
        assert!((Orchestrator::estimate_complexity(&short) - 0.51).abs() < 1e-9);

        // 200 words saturate the word term at 0.3.
        let long_prompt = vec!["word"; 200].join(" ");
        let long = GenerationRequest::new(long_prompt).tier(ResolutionTier::Ultra);
        assert!((Orchestrator::estimate_complexity(&long) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_generate_produces_result_and_feeds_health() {
        let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
        pipeline.initialize().unwrap();

        let request = GenerationRequest::new("a harbor at dusk");
        let result = pipeline.generate(&request, stub_base).unwrap();

        assert!(!result.image.is_empty());
        assert!(result.stages_used >= pipeline.config().adapt.min_stages);
        assert!((result.memory_used_mb - 10.0 * result.stages_used as f64).abs() < 1e-9);
        assert_eq!(pipeline.status().health_window, 1);
    }

    #[test]
    fn test_preview_tier_runs_single_pass() {
        let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
        pipeline.initialize().unwrap();

        let mut calls = 0;
        let request = GenerationRequest::new("quick draft").tier(ResolutionTier::Preview);
        pipeline
            .generate(&request, |p, s| {
                calls += 1;
                stub_base(p, s)
            })
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_custom_memory_estimator() {
        let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
        pipeline.initialize().unwrap();
        pipeline.set_memory_estimator(|stages| 2.5 * stages as f64);

        let request = GenerationRequest::new("t");
        let result = pipeline.generate(&request, stub_base).unwrap();
        assert!((result.memory_used_mb - 2.5 * result.stages_used as f64).abs() < 1e-9);
    }

    #[test]
    fn test_export_state_serializes() {
        let pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
        let json = pipeline.export_state_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"architecture\""));
    }
}
