//! Benchmark samples and the composite scoring weights.

use serde::{Deserialize, Serialize};

/// One benchmark sample; every dimension lives in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    /// Output quality.
    pub quality: f64,
    /// Latency relative to target.
    pub speed: f64,
    /// Memory headroom utilization.
    pub memory_efficiency: f64,
    /// Run-to-run output consistency.
    pub consistency: f64,
}

impl BenchmarkMetrics {
    /// Creates a sample, clamping every dimension into `[0, 1]`.
    pub fn new(quality: f64, speed: f64, memory_efficiency: f64, consistency: f64) -> Self {
        Self {
            quality: quality.clamp(0.0, 1.0),
            speed: speed.clamp(0.0, 1.0),
            memory_efficiency: memory_efficiency.clamp(0.0, 1.0),
            consistency: consistency.clamp(0.0, 1.0),
        }
    }

    /// Weighted composite score.
    #[must_use]
    pub fn composite(&self, weights: &MetricWeights) -> f64 {
        self.quality * weights.quality
            + self.speed * weights.speed
            + self.memory_efficiency * weights.memory_efficiency
            + self.consistency * weights.consistency
    }

    /// Mean over a non-empty batch of samples.
    #[must_use]
    pub fn aggregate(samples: &[BenchmarkMetrics]) -> BenchmarkMetrics {
        if samples.is_empty() {
            return BenchmarkMetrics::default();
        }
        let n = samples.len() as f64;
        BenchmarkMetrics::new(
            samples.iter().map(|s| s.quality).sum::<f64>() / n,
            samples.iter().map(|s| s.speed).sum::<f64>() / n,
            samples.iter().map(|s| s.memory_efficiency).sum::<f64>() / n,
            samples.iter().map(|s| s.consistency).sum::<f64>() / n,
        )
    }
}

/// Composite weights over the four benchmark dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricWeights {
    /// Weight of `quality`.
    pub quality: f64,
    /// Weight of `speed`.
    pub speed: f64,
    /// Weight of `memory_efficiency`.
    pub memory_efficiency: f64,
    /// Weight of `consistency`.
    pub consistency: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            quality: 0.4,
            speed: 0.3,
            memory_efficiency: 0.2,
            consistency: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        let m = BenchmarkMetrics::new(1.5, -0.5, 0.5, 0.5);
        assert_eq!(m.quality, 1.0);
        assert_eq!(m.speed, 0.0);
    }

    #[test]
    fn test_composite_default_weights() {
        let m = BenchmarkMetrics::new(1.0, 1.0, 1.0, 1.0);
        assert!((m.composite(&MetricWeights::default()) - 1.0).abs() < 1e-12);

        let m = BenchmarkMetrics::new(1.0, 0.0, 0.0, 0.0);
        assert!((m.composite(&MetricWeights::default()) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_is_mean() {
        let samples = [
            BenchmarkMetrics::new(0.2, 0.4, 0.6, 0.8),
            BenchmarkMetrics::new(0.4, 0.6, 0.8, 1.0),
        ];
        let mean = BenchmarkMetrics::aggregate(&samples);
        assert!((mean.quality - 0.3).abs() < 1e-12);
        assert!((mean.consistency - 0.9).abs() < 1e-12);
    }
}
