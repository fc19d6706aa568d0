//! # Phenex Refine
//!
//! Multi-pass progressive image generation.
//!
//! A generation starts with a fast low-resolution preview, then walks a
//! ladder of increasing scales: each pass upscales the prior image, renders
//! a fresh pass at the new scale, and blends the two. A quality estimate
//! after each pass allows stopping early once the configured threshold is
//! met; remaining scales are skipped.
//!
//! ```text
//!  scale 0.25      scale 0.5         scale 1.0
//!  ┌───┐           ┌───────┐         ┌───────────────┐
//!  │pre│──upscale─▶│ blend │─ ... ──▶│  final image  │
//!  └───┘   fresh──▶│  0.3  │         └───────────────┘
//!                  └───────┘   early-stop when quality ≥ threshold
//! ```

mod quality;
mod scheduler;

pub use quality::{QualityEstimator, VarianceEdgeEstimator};
pub use scheduler::{RefineConfig, RefinementOutcome, RefinementScheduler};

/// Prelude for common imports
pub mod prelude {
    pub use super::{QualityEstimator, RefineConfig, RefinementOutcome, RefinementScheduler};
}
