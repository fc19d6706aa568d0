//! Memory-budgeted execution of inference calls.

use std::borrow::Cow;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use phenex_core::{CancelToken, Result, RollingWindow};

use crate::profile::{EngineSettings, ResourceProfile};

/// Inference calls remembered for aggregate metrics.
const HISTORY_CAPACITY: usize = 100;

/// Fraction of the memory budget a direct call may claim.
const DIRECT_BUDGET_FRACTION: f64 = 0.8;

/// Fraction of the memory budget one chunk claims in the fallback path.
const CHUNK_BUDGET_FRACTION: f64 = 0.5;

/// Record of a single inference call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRecord {
    /// Wall-clock latency of the call.
    pub latency_ms: f64,
    /// Input bytes handed to the backend.
    pub memory_bytes: u64,
}

/// Aggregate view over the recorded call history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Mean latency across the window.
    pub avg_latency_ms: f64,
    /// Mean memory footprint across the window.
    pub avg_memory_bytes: f64,
    /// Fraction of calls that met the latency target.
    pub target_hit_rate: f64,
    /// Calls in the window.
    pub total_calls: usize,
}

/// Executes inference calls inside a fixed resource budget.
pub struct ExecutionEngine {
    profile: ResourceProfile,
    settings: EngineSettings,
    history: RollingWindow<InferenceRecord>,
    /// Input bytes still considered resident from the previous call; the
    /// host reclaims them between calls, so this is a one-call lookback.
    resident_bytes: u64,
}

impl ExecutionEngine {
    /// Creates an engine over a validated resource profile.
    pub fn new(profile: ResourceProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            settings: EngineSettings::default(),
            history: RollingWindow::new(HISTORY_CAPACITY),
            resident_bytes: 0,
        })
    }

    /// Replaces the initial settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Runs `infer` over `input` within the memory budget.
    ///
    /// Inputs that fit under 80% of the budget run as one call. Oversized
    /// inputs are split into chunks of half the budget and run sequentially,
    /// with a cancellation checkpoint and a scheduler yield between chunks;
    /// chunk outputs are concatenated in order. A failing call or chunk
    /// propagates immediately; there is no retry and no partial salvage.
    pub fn execute<F>(&mut self, input: &[f32], cancel: &CancelToken, mut infer: F) -> Result<Vec<f32>>
    where
        F: FnMut(&[f32]) -> Result<Vec<f32>>,
    {
        cancel.checkpoint()?;

        let input_bytes = (std::mem::size_of_val(input)) as u64;
        let direct_budget =
            self.profile.available_memory_bytes as f64 * DIRECT_BUDGET_FRACTION;

        if ((self.resident_bytes + input_bytes) as f64) < direct_budget {
            let data = self.condition(input);
            let start = Instant::now();
            let output = infer(data.as_ref())?;
            self.record(start.elapsed().as_secs_f64() * 1000.0, input_bytes);
            self.resident_bytes = input_bytes;
            return Ok(output);
        }

        // Memory-constrained path: sequential chunks, yielding between them.
        let elem_size = std::mem::size_of::<f32>();
        let chunk_elems = ((self.profile.available_memory_bytes as f64
            * CHUNK_BUDGET_FRACTION) as usize
            / elem_size)
            .max(1);
        debug!(
            input_bytes,
            chunk_elems,
            "input over memory budget, running chunked"
        );

        let mut output = Vec::with_capacity(input.len());
        for chunk in input.chunks(chunk_elems) {
            cancel.checkpoint()?;
            let data = self.condition(chunk);
            let start = Instant::now();
            let partial = infer(data.as_ref())?;
            let chunk_bytes = std::mem::size_of_val(chunk) as u64;
            self.record(start.elapsed().as_secs_f64() * 1000.0, chunk_bytes);
            output.extend(partial);
            self.resident_bytes = chunk_bytes;
            std::thread::yield_now();
        }
        Ok(output)
    }

    /// Applies the enabled precision reductions to the input.
    fn condition<'a>(&self, input: &'a [f32]) -> Cow<'a, [f32]> {
        if !self.settings.mixed_precision && !self.settings.quantization {
            return Cow::Borrowed(input);
        }
        let data = input
            .iter()
            .map(|&v| {
                let mut v = v;
                if self.settings.mixed_precision && v.abs() < 0.01 {
                    v = (v * 100.0).round() / 100.0;
                }
                if self.settings.quantization {
                    v = (v * 256.0).round() / 256.0;
                }
                v
            })
            .collect();
        Cow::Owned(data)
    }

    fn record(&mut self, latency_ms: f64, memory_bytes: u64) {
        self.history.push(InferenceRecord {
            latency_ms,
            memory_bytes,
        });
    }

    /// Aggregate metrics over the recorded history.
    #[must_use]
    pub fn metrics(&self) -> PerformanceMetrics {
        let total = self.history.len();
        if total == 0 {
            return PerformanceMetrics {
                avg_latency_ms: 0.0,
                avg_memory_bytes: 0.0,
                target_hit_rate: 1.0,
                total_calls: 0,
            };
        }

        let mut latency_sum = 0.0;
        let mut memory_sum = 0.0;
        let mut hits = 0usize;
        for record in self.history.iter() {
            latency_sum += record.latency_ms;
            memory_sum += record.memory_bytes as f64;
            if record.latency_ms <= self.profile.target_latency_ms {
                hits += 1;
            }
        }

        PerformanceMetrics {
            avg_latency_ms: latency_sum / total as f64,
            avg_memory_bytes: memory_sum / total as f64,
            target_hit_rate: hits as f64 / total as f64,
            total_calls: total,
        }
    }

    /// One-shot heuristic over the recorded history.
    ///
    /// Under 80% latency-target hits enables mixed precision; average memory
    /// above 70% of budget enables quantization. Both flips are one-way.
    pub fn optimize_settings(&mut self) -> &EngineSettings {
        let metrics = self.metrics();

        if metrics.total_calls > 0 {
            if metrics.target_hit_rate < 0.8 && !self.settings.mixed_precision {
                self.settings.mixed_precision = true;
                info!(
                    hit_rate = metrics.target_hit_rate,
                    "enabling mixed precision"
                );
            }
            let memory_ceiling = self.profile.available_memory_bytes as f64 * 0.7;
            if metrics.avg_memory_bytes > memory_ceiling && !self.settings.quantization {
                self.settings.quantization = true;
                info!(
                    avg_memory_bytes = metrics.avg_memory_bytes,
                    "enabling quantization"
                );
            }
        }

        &self.settings
    }

    /// The immutable resource profile.
    #[must_use]
    pub fn profile(&self) -> &ResourceProfile {
        &self.profile
    }

    /// The current execution settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("profile", &self.profile)
            .field("settings", &self.settings)
            .field("recorded_calls", &self.history.len())
            .finish()
    }
}
