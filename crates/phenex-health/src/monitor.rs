//! Health metric derivation, thresholds, and alert fan-out.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use phenex_core::{Frame, RollingWindow};

/// Similarity to the expected pattern below which a sample counts as a
/// hallucination.
const HALLUCINATION_CUTOFF: f32 = 0.3;

/// Mean best-match dissimilarity over which the recent samples count as
/// anomalous.
const ANOMALY_CUTOFF: f64 = 0.7;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Monitoring thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Stability below this alerts at medium severity.
    pub min_stability: f64,
    /// Hallucination rate above this alerts at high severity.
    pub max_hallucination_rate: f64,
    /// Drift above this alerts at medium severity.
    pub max_drift_score: f64,
    /// Confidence below this alerts at low severity.
    pub min_confidence: f64,
    /// Samples retained.
    pub window_capacity: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            min_stability: 0.5,
            max_hallucination_rate: 0.3,
            max_drift_score: 0.5,
            min_confidence: 0.4,
            window_capacity: 100,
        }
    }
}

/// Metrics derived from the sample window. Not stored - recomputed per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Mean similarity between consecutive outputs.
    pub output_stability: f64,
    /// Fraction of expected-bearing samples far from their pattern.
    pub hallucination_rate: f64,
    /// Divergence of recent outputs from the window's earliest outputs.
    pub drift_score: f64,
    /// `stability * (1 - hallucination_rate)`.
    pub confidence_level: f64,
    /// Whether the most recent samples broke from the preceding ones.
    pub anomaly_detected: bool,
}

impl HealthMetrics {
    /// Fixed-weight composite over stability, non-hallucination, non-drift,
    /// and confidence.
    #[must_use]
    pub fn composite(&self) -> f64 {
        0.3 * self.output_stability
            + 0.3 * (1.0 - self.hallucination_rate)
            + 0.2 * (1.0 - self.drift_score)
            + 0.2 * self.confidence_level
    }
}

/// Composite trend against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthTrend {
    Improving,
    Stable,
    Degrading,
}

/// Report over the current window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Current metrics.
    pub metrics: HealthMetrics,
    /// Current composite score.
    pub composite: f64,
    /// Baseline composite, when captured.
    pub baseline_composite: Option<f64>,
    /// Trend against the baseline (±0.1 band).
    pub trend: HealthTrend,
    /// Fixed threshold-triggered recommendations.
    pub recommendations: Vec<String>,
}

struct HealthSample {
    output: Arc<Frame>,
    timestamp_ms: u64,
    expected: Option<Arc<Frame>>,
}

type AlertSink = Box<dyn FnMut(&str, Severity) + Send>;

/// Tracks output health and raises alerts on threshold violations.
pub struct HealthMonitor {
    config: HealthConfig,
    window: RollingWindow<HealthSample>,
    baseline: Option<HealthMetrics>,
    sinks: Vec<AlertSink>,
    last: Option<HealthMetrics>,
}

impl HealthMonitor {
    /// Creates a monitor; the baseline is captured lazily from the first
    /// computed metrics.
    pub fn new(config: HealthConfig) -> Self {
        let capacity = config.window_capacity;
        Self {
            config,
            window: RollingWindow::new(capacity),
            baseline: None,
            sinks: Vec::new(),
            last: None,
        }
    }

    /// Registers an alert sink, invoked synchronously once per violated
    /// threshold.
    pub fn register_alert_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&str, Severity) + Send + 'static,
    {
        self.sinks.push(Box::new(sink));
    }

    /// Records one output (by handle, not deep copy) and derives metrics.
    pub fn monitor_output(
        &mut self,
        output: Arc<Frame>,
        expected: Option<Arc<Frame>>,
    ) -> HealthMetrics {
        self.window.push(HealthSample {
            output,
            timestamp_ms: now_ms(),
            expected,
        });

        let metrics = self.compute_metrics();
        if self.baseline.is_none() {
            debug!("capturing health baseline");
            self.baseline = Some(metrics.clone());
        }
        self.raise_alerts(&metrics);
        self.last = Some(metrics.clone());
        metrics
    }

    fn compute_metrics(&self) -> HealthMetrics {
        let outputs: Vec<&Arc<Frame>> = self.window.iter().map(|s| &s.output).collect();

        // Stability: mean similarity between consecutive outputs. A window
        // of fewer than two samples carries no evidence of instability.
        let output_stability = if outputs.len() < 2 {
            1.0
        } else {
            let mut sum = 0.0f64;
            for pair in outputs.windows(2) {
                sum += pair[0].similarity(pair[1]) as f64;
            }
            sum / (outputs.len() - 1) as f64
        };

        // Hallucination: among samples carrying an expected pattern, the
        // fraction too dissimilar from it.
        let mut expected_total = 0usize;
        let mut hallucinated = 0usize;
        for sample in self.window.iter() {
            if let Some(expected) = &sample.expected {
                expected_total += 1;
                if sample.output.similarity(expected) < HALLUCINATION_CUTOFF {
                    hallucinated += 1;
                }
            }
        }
        let hallucination_rate = if expected_total == 0 {
            0.0
        } else {
            hallucinated as f64 / expected_total as f64
        };

        // Drift: recent ten against the earliest ten, paired in order.
        let drift_score = if outputs.len() < 10 {
            0.0
        } else {
            let span = 10.min(outputs.len());
            let early = &outputs[..span];
            let recent = &outputs[outputs.len() - span..];
            let sum: f64 = early
                .iter()
                .zip(recent.iter())
                .map(|(e, r)| 1.0 - e.similarity(r) as f64)
                .sum();
            sum / span as f64
        };

        let confidence_level = output_stability * (1.0 - hallucination_rate);

        // Anomaly: each of the last five scored by its best match among the
        // preceding five.
        let anomaly_detected = if outputs.len() < 10 {
            false
        } else {
            let recent = &outputs[outputs.len() - 5..];
            let preceding = &outputs[outputs.len() - 10..outputs.len() - 5];
            let mean_novelty: f64 = recent
                .iter()
                .map(|r| {
                    let best = preceding
                        .iter()
                        .map(|p| r.similarity(p))
                        .fold(f32::NEG_INFINITY, f32::max);
                    1.0 - best as f64
                })
                .sum::<f64>()
                / recent.len() as f64;
            mean_novelty > ANOMALY_CUTOFF
        };

        HealthMetrics {
            output_stability,
            hallucination_rate,
            drift_score,
            confidence_level,
            anomaly_detected,
        }
    }

    fn raise_alerts(&mut self, metrics: &HealthMetrics) {
        let mut violations: Vec<(String, Severity)> = Vec::new();

        if metrics.hallucination_rate > self.config.max_hallucination_rate {
            violations.push((
                format!(
                    "hallucination rate {:.2} exceeds {:.2}",
                    metrics.hallucination_rate, self.config.max_hallucination_rate
                ),
                Severity::High,
            ));
        }
        if metrics.anomaly_detected {
            violations.push((
                "recent outputs diverge sharply from preceding outputs".to_string(),
                Severity::High,
            ));
        }
        if metrics.drift_score > self.config.max_drift_score {
            violations.push((
                format!(
                    "drift score {:.2} exceeds {:.2}",
                    metrics.drift_score, self.config.max_drift_score
                ),
                Severity::Medium,
            ));
        }
        if metrics.output_stability < self.config.min_stability {
            violations.push((
                format!(
                    "output stability {:.2} below {:.2}",
                    metrics.output_stability, self.config.min_stability
                ),
                Severity::Medium,
            ));
        }
        if metrics.confidence_level < self.config.min_confidence {
            violations.push((
                format!(
                    "confidence {:.2} below {:.2}",
                    metrics.confidence_level, self.config.min_confidence
                ),
                Severity::Low,
            ));
        }

        for (message, severity) in &violations {
            for sink in &mut self.sinks {
                sink(message, *severity);
            }
        }
    }

    /// Compares the current composite against the baseline composite.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        let metrics = self.last.clone().unwrap_or_else(|| self.compute_metrics());
        let composite = metrics.composite();
        let baseline_composite = self.baseline.as_ref().map(HealthMetrics::composite);

        let trend = match baseline_composite {
            Some(baseline) if composite > baseline + 0.1 => HealthTrend::Improving,
            Some(baseline) if composite < baseline - 0.1 => HealthTrend::Degrading,
            _ => HealthTrend::Stable,
        };

        let mut recommendations = Vec::new();
        if metrics.output_stability < self.config.min_stability {
            recommendations.push(
                "stabilize outputs: pin seeds or lower the adaptation rate".to_string(),
            );
        }
        if metrics.hallucination_rate > self.config.max_hallucination_rate {
            recommendations.push(
                "reduce hallucinations: tighten guidance or supply expected patterns".to_string(),
            );
        }
        if metrics.drift_score > self.config.max_drift_score {
            recommendations
                .push("counter drift: refresh the baseline or retrain".to_string());
        }
        if metrics.confidence_level < self.config.min_confidence {
            recommendations
                .push("raise confidence: increase refinement passes".to_string());
        }

        HealthReport {
            metrics,
            composite,
            baseline_composite,
            trend,
            recommendations,
        }
    }

    /// Samples currently windowed.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Timestamp of the most recent sample, in unix milliseconds.
    #[must_use]
    pub fn last_sample_at_ms(&self) -> Option<u64> {
        self.window.latest().map(|s| s.timestamp_ms)
    }

    /// The baseline metrics, once captured.
    #[must_use]
    pub fn baseline(&self) -> Option<&HealthMetrics> {
        self.baseline.as_ref()
    }

    /// The monitoring thresholds.
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("window_len", &self.window.len())
            .field("sinks", &self.sinks.len())
            .field("baseline_captured", &self.baseline.is_some())
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc as StdArc, Mutex};

    fn frame(value: f32) -> Arc<Frame> {
        Arc::new(Frame::filled(4, 4, value))
    }

    #[test]
    fn test_window_is_bounded_at_capacity() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        assert!(monitor.last_sample_at_ms().is_none());
        for _ in 0..150 {
            monitor.monitor_output(frame(0.5), None);
        }
        assert_eq!(monitor.window_len(), 100);
        assert!(monitor.last_sample_at_ms().is_some());
    }

    #[test]
    fn test_identical_outputs_are_stable() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        let mut metrics = monitor.monitor_output(frame(0.5), None);
        for _ in 0..10 {
            metrics = monitor.monitor_output(frame(0.5), None);
        }
        assert!((metrics.output_stability - 1.0).abs() < 1e-5);
        assert_eq!(metrics.hallucination_rate, 0.0);
        assert!(!metrics.anomaly_detected);
    }

    #[test]
    fn test_baseline_captured_once() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        monitor.monitor_output(frame(0.5), None);
        let first = monitor.baseline().cloned().unwrap();

        monitor.monitor_output(frame(0.9), None);
        let second = monitor.baseline().cloned().unwrap();
        assert_eq!(first.output_stability, second.output_stability);
    }

    #[test]
    fn test_hallucination_rate_counts_far_samples() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        let expected = frame(1.0);

        // Matching output, then an anti-correlated one.
        monitor.monitor_output(frame(1.0), Some(expected.clone()));
        let anti = Arc::new(
            Frame::new(4, 4, (0..16).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect())
                .unwrap(),
        );
        let metrics = monitor.monitor_output(anti, Some(expected));

        assert!((metrics.hallucination_rate - 0.5).abs() < 1e-9);
        assert!(metrics.confidence_level < metrics.output_stability);
    }

    #[test]
    fn test_alert_sinks_fire_per_violation() {
        let config = HealthConfig {
            min_stability: 0.99,
            ..Default::default()
        };
        let mut monitor = HealthMonitor::new(config);
        let fired: StdArc<Mutex<Vec<(String, Severity)>>> = StdArc::default();
        let fired_clone = fired.clone();
        monitor.register_alert_sink(move |message, severity| {
            fired_clone.lock().unwrap().push((message.to_string(), severity));
        });

        // Alternate orthogonal patterns so consecutive similarity collapses.
        let a = Arc::new(
            Frame::new(4, 4, (0..16).map(|i| if i < 8 { 1.0 } else { 0.0 }).collect()).unwrap(),
        );
        let b = Arc::new(
            Frame::new(4, 4, (0..16).map(|i| if i < 8 { 0.0 } else { 1.0 }).collect()).unwrap(),
        );
        monitor.monitor_output(a, None);
        monitor.monitor_output(b, None);

        let fired = fired.lock().unwrap();
        assert!(fired.iter().any(|(m, s)| m.contains("stability") && *s == Severity::Medium));
    }

    #[test]
    fn test_report_trend_stable_without_history() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        monitor.monitor_output(frame(0.5), None);
        let report = monitor.report();
        assert_eq!(report.trend, HealthTrend::Stable);
        assert!(report.baseline_composite.is_some());
    }

    #[test]
    fn test_drift_zero_below_ten_samples() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        for _ in 0..9 {
            let metrics = monitor.monitor_output(frame(0.5), None);
            assert_eq!(metrics.drift_score, 0.0);
        }
    }

    #[test]
    fn test_anomaly_on_sharp_break() {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        // Five orthogonal-to-everything-later samples, then five from a
        // disjoint support: best-match similarity collapses to 0.
        for i in 0..5 {
            let mut data = vec![0.0f32; 16];
            data[i] = 1.0;
            monitor.monitor_output(Arc::new(Frame::new(4, 4, data).unwrap()), None);
        }
        let mut last = None;
        for i in 0..5 {
            let mut data = vec![0.0f32; 16];
            data[8 + i] = 1.0;
            last = Some(monitor.monitor_output(Arc::new(Frame::new(4, 4, data).unwrap()), None));
        }
        assert!(last.unwrap().anomaly_detected);
    }
}
