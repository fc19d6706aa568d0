//! # Phenex Health
//!
//! Output health monitoring. Every generated image is fed into a bounded
//! window; stability, hallucination rate, drift, and confidence are derived
//! from pairwise similarities over that window and compared against
//! configured thresholds. Violations fan out synchronously to registered
//! alert sinks. Health issues never interrupt a generation - they only
//! alert and recommend.

mod monitor;

pub use monitor::{
    HealthConfig, HealthMetrics, HealthMonitor, HealthReport, HealthTrend, Severity,
};

/// Prelude for common imports
pub mod prelude {
    pub use super::{HealthConfig, HealthMetrics, HealthMonitor, HealthReport, Severity};
}
