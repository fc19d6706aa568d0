//! The refinement scheduler driving multi-pass generation.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use phenex_core::{CancelToken, Error, Frame, Result};

use crate::quality::{QualityEstimator, VarianceEdgeEstimator};

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Ordered ladder of resolution multipliers, preview scale first.
    pub scales: SmallVec<[f32; 8]>,
    /// Estimated quality at which remaining scales are skipped.
    pub quality_threshold: f32,
    /// Blend weight toward each fresh pass.
    pub blend_weight: f32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            scales: smallvec![0.25, 0.5, 0.75, 1.0],
            quality_threshold: 0.85,
            blend_weight: 0.3,
        }
    }
}

impl RefineConfig {
    /// Set the scale ladder.
    pub fn scales(mut self, scales: impl IntoIterator<Item = f32>) -> Self {
        self.scales = scales.into_iter().collect();
        self
    }

    /// Set the early-stop quality threshold.
    pub fn quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = threshold;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.scales.is_empty() {
            return Err(Error::configuration("scale ladder must not be empty"));
        }
        if self.scales.iter().any(|s| *s <= 0.0) {
            return Err(Error::configuration("scales must be positive"));
        }
        if !(0.0..=1.0).contains(&self.blend_weight) {
            return Err(Error::configuration("blend_weight must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Result of a progressive generation.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// The fast first-pass image.
    pub preview: Frame,
    /// The final (possibly early-stopped) image.
    pub image: Frame,
    /// Last quality estimate.
    pub quality: f32,
    /// Wall-clock time across all passes.
    pub elapsed_ms: f64,
    /// Base-generator passes actually run.
    pub passes: usize,
}

/// Drives multi-pass generation from a fast preview to a refined final image.
pub struct RefinementScheduler {
    config: RefineConfig,
    estimator: Box<dyn QualityEstimator>,
}

impl RefinementScheduler {
    /// Creates a scheduler with the default variance/edge quality estimator.
    pub fn new(config: RefineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            estimator: Box::new(VarianceEdgeEstimator::default()),
        })
    }

    /// Replaces the quality estimator.
    pub fn with_estimator(mut self, estimator: Box<dyn QualityEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// The scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Runs the full progressive ladder.
    ///
    /// `base` is the host's base-generation function; its failures propagate
    /// unchanged. `on_progress` receives a non-decreasing fraction and a
    /// stage label. The moment the quality estimate reaches the configured
    /// threshold, remaining scales are skipped.
    pub fn generate_progressive<F, P>(
        &self,
        prompt: &str,
        cancel: &CancelToken,
        mut on_progress: P,
        mut base: F,
    ) -> Result<RefinementOutcome>
    where
        F: FnMut(&str, f32) -> Result<Frame>,
        P: FnMut(f32, &str),
    {
        let start = Instant::now();
        let ladder_len = self.config.scales.len();

        cancel.checkpoint()?;
        let preview = base(prompt, self.config.scales[0])?;
        on_progress(0.3, "preview");

        let mut image = preview.clone();
        let mut quality = 0.0;
        let mut passes = 1;

        for (index, &scale) in self.config.scales.iter().enumerate().skip(1) {
            cancel.checkpoint()?;

            let fresh = base(prompt, scale)?;
            let upscaled = image.resize_bilinear(fresh.width(), fresh.height());
            image = upscaled.blend(&fresh, self.config.blend_weight)?;
            passes += 1;

            let ladder_progress = (index + 1) as f32 / ladder_len as f32;
            quality = self.estimator.estimate(&image, ladder_progress);

            let reported = 0.3 + 0.7 * index as f32 / (ladder_len - 1) as f32;
            on_progress(reported, &format!("refine @{scale:.2}x"));

            if quality >= self.config.quality_threshold {
                debug!(scale, quality, "quality threshold met, stopping early");
                break;
            }
        }

        Ok(RefinementOutcome {
            preview,
            image,
            quality,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
            passes,
        })
    }

    /// Degenerate one-scale path used for the preview resolution tier.
    pub fn generate_preview<F, P>(
        &self,
        prompt: &str,
        cancel: &CancelToken,
        mut on_progress: P,
        mut base: F,
    ) -> Result<RefinementOutcome>
    where
        F: FnMut(&str, f32) -> Result<Frame>,
        P: FnMut(f32, &str),
    {
        let start = Instant::now();

        cancel.checkpoint()?;
        let image = base(prompt, self.config.scales[0])?;
        let quality = self.estimator.estimate(&image, 1.0);
        on_progress(1.0, "preview");

        Ok(RefinementOutcome {
            preview: image.clone(),
            image,
            quality,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
            passes: 1,
        })
    }
}

impl std::fmt::Debug for RefinementScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinementScheduler")
            .field("config", &self.config)
            .finish()
    }
}
