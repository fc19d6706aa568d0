//! The optimization cycle itself.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{OptError, Result};
use crate::metrics::{BenchmarkMetrics, MetricWeights};

/// Loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Composite delta beyond which a cycle counts as improvement or
    /// degradation.
    pub improvement_threshold: f64,
    /// Composite weights.
    pub weights: MetricWeights,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            improvement_threshold: 0.05,
            weights: MetricWeights::default(),
        }
    }
}

impl OptimizerConfig {
    /// Set the improvement threshold.
    pub fn improvement_threshold(mut self, threshold: f64) -> Self {
        self.improvement_threshold = threshold;
        self
    }
}

/// Cumulative optimization state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationState {
    /// Cycles run; increments once per cycle regardless of outcome.
    pub generation: u64,
    /// Best benchmark seen, by composite score.
    pub best: BenchmarkMetrics,
    /// Benchmark of the most recent cycle.
    pub current: BenchmarkMetrics,
    /// Cycles whose composite beat the best by more than the threshold.
    pub improvement_count: u64,
    /// Cycles whose composite fell short by more than the threshold.
    pub degradation_count: u64,
}

/// What one cycle concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The best benchmark was replaced.
    Improved,
    /// The composite regressed beyond the threshold.
    Degraded,
    /// Within the threshold band; state unchanged beyond bookkeeping.
    Unchanged,
}

/// Periodically benchmarks the pipeline and tracks the trend.
#[derive(Debug)]
pub struct OptimizationLoop {
    config: OptimizerConfig,
    state: OptimizationState,
}

impl OptimizationLoop {
    /// Creates a loop with zeroed state.
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            state: OptimizationState::default(),
        }
    }

    /// Runs one cycle: evaluate every case, aggregate, compare to the best.
    ///
    /// The generation counter commits before evaluation, so a failing
    /// evaluator leaves exactly that one mutation behind - counts and
    /// benchmarks stay untouched.
    pub fn run_cycle<T, F>(&mut self, cases: &[T], mut evaluate: F) -> Result<CycleOutcome>
    where
        F: FnMut(&T) -> Result<BenchmarkMetrics>,
    {
        if cases.is_empty() {
            return Err(OptError::NoCases);
        }
        self.state.generation += 1;

        let mut samples = Vec::with_capacity(cases.len());
        for (index, case) in cases.iter().enumerate() {
            let sample = evaluate(case).map_err(|e| match e {
                OptError::Evaluation { message, .. } => OptError::Evaluation { index, message },
                other => other,
            })?;
            samples.push(sample);
        }

        let current = BenchmarkMetrics::aggregate(&samples);
        let delta =
            current.composite(&self.config.weights) - self.state.best.composite(&self.config.weights);
        self.state.current = current;

        if delta > self.config.improvement_threshold {
            self.state.best = current;
            self.state.improvement_count += 1;
            info!(
                generation = self.state.generation,
                delta, "benchmark improved"
            );
            Ok(CycleOutcome::Improved)
        } else if delta < -self.config.improvement_threshold {
            self.state.degradation_count += 1;
            warn!(
                generation = self.state.generation,
                delta, "benchmark degraded"
            );
            Ok(CycleOutcome::Degraded)
        } else {
            Ok(CycleOutcome::Unchanged)
        }
    }

    /// The cumulative state.
    #[must_use]
    pub fn state(&self) -> &OptimizationState {
        &self.state
    }

    /// The loop configuration.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Fixed threshold-driven tuning suggestions for the current benchmark.
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        let current = &self.state.current;
        let mut suggestions = Vec::new();

        if current.quality < 0.6 {
            suggestions.push(
                "quality below 0.6: raise the refinement quality threshold or extend the scale ladder"
                    .to_string(),
            );
        }
        if current.speed < 0.5 {
            suggestions.push(
                "speed below 0.5: enable mixed precision or shorten the scale ladder".to_string(),
            );
        }
        if current.memory_efficiency < 0.5 {
            suggestions.push(
                "memory efficiency below 0.5: enable quantization or lower max_stages".to_string(),
            );
        }
        if current.consistency < 0.6 {
            suggestions.push(
                "consistency below 0.6: pin generation seeds or widen adaptation thresholds"
                    .to_string(),
            );
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_good_cycle_improves_over_zero_best() {
        let mut looper = OptimizationLoop::new(OptimizerConfig::default());
        let cases = [0u8, 1, 2];

        let outcome = looper
            .run_cycle(&cases, |_| Ok(BenchmarkMetrics::new(0.8, 0.8, 0.8, 0.8)))
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Improved);
        let state = looper.state();
        assert_eq!(state.generation, 1);
        assert_eq!(state.improvement_count, 1);
        assert!((state.best.quality - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_regression_counts_degradation_and_keeps_best() {
        let mut looper = OptimizationLoop::new(OptimizerConfig::default());
        let cases = [0u8];

        looper
            .run_cycle(&cases, |_| Ok(BenchmarkMetrics::new(0.9, 0.9, 0.9, 0.9)))
            .unwrap();
        let outcome = looper
            .run_cycle(&cases, |_| Ok(BenchmarkMetrics::new(0.1, 0.1, 0.1, 0.1)))
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Degraded);
        let state = looper.state();
        assert_eq!(state.degradation_count, 1);
        assert!((state.best.quality - 0.9).abs() < 1e-12, "best is retained");
        assert!((state.current.quality - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_generation_increments_every_cycle() {
        let mut looper = OptimizationLoop::new(OptimizerConfig::default());
        let cases = [0u8];

        for _ in 0..5 {
            looper
                .run_cycle(&cases, |_| Ok(BenchmarkMetrics::new(0.5, 0.5, 0.5, 0.5)))
                .unwrap();
        }
        assert_eq!(looper.state().generation, 5);
        // Second through fifth cycles sit inside the threshold band.
        assert_eq!(looper.state().improvement_count, 1);
        assert_eq!(looper.state().degradation_count, 0);
    }

    #[test]
    fn test_empty_cases_rejected() {
        let mut looper = OptimizationLoop::new(OptimizerConfig::default());
        let cases: [u8; 0] = [];
        assert!(matches!(
            looper.run_cycle(&cases, |_| Ok(BenchmarkMetrics::default())),
            Err(OptError::NoCases)
        ));
        assert_eq!(looper.state().generation, 0);
    }

    #[test]
    fn test_evaluator_failure_propagates_with_case_index() {
        let mut looper = OptimizationLoop::new(OptimizerConfig::default());
        let cases = [10u8, 20, 30];

        let result = looper.run_cycle(&cases, |case| {
            if *case == 20 {
                Err(OptError::Evaluation {
                    index: 0,
                    message: "bad case".into(),
                })
            } else {
                Ok(BenchmarkMetrics::default())
            }
        });

        match result {
            Err(OptError::Evaluation { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
        // Generation committed before evaluation; nothing else mutated.
        let state = looper.state();
        assert_eq!(state.generation, 1);
        assert_eq!(state.improvement_count, 0);
    }

    #[test]
    fn test_suggestions_track_thresholds() {
        let mut looper = OptimizationLoop::new(OptimizerConfig::default());
        let cases = [0u8];
        looper
            .run_cycle(&cases, |_| Ok(BenchmarkMetrics::new(0.2, 0.9, 0.9, 0.9)))
            .unwrap();

        let suggestions = looper.suggestions();
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].contains("quality"));
    }
}
