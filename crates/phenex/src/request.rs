//! Generation requests and results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use phenex_core::{CancelToken, Frame};

/// Output resolution tier; also the base of the complexity estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTier {
    /// Fast single-pass draft.
    Preview,
    /// Default progressive generation.
    Standard,
    /// Higher-effort progressive generation.
    High,
    /// Maximum-effort progressive generation.
    Ultra,
}

impl ResolutionTier {
    /// Base complexity contributed by the tier.
    #[must_use]
    pub fn base_complexity(&self) -> f64 {
        match self {
            ResolutionTier::Preview => 0.2,
            ResolutionTier::Standard => 0.5,
            ResolutionTier::High => 0.7,
            ResolutionTier::Ultra => 0.9,
        }
    }
}

/// One generation request.
///
/// The optional `seed` rides along for the host's base-generation function;
/// the pipeline itself never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Textual prompt.
    pub prompt: String,
    /// Resolution tier.
    pub tier: ResolutionTier,
    /// Optional style, folded into the effective prompt.
    pub style: Option<String>,
    /// Optional seed for the host backend.
    pub seed: Option<u64>,
    /// Optional cancellation token, checked at each suspension point.
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

impl GenerationRequest {
    /// Creates a standard-tier request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tier: ResolutionTier::Standard,
            style: None,
            seed: None,
            cancel: None,
        }
    }

    /// Set the resolution tier.
    pub fn tier(mut self, tier: ResolutionTier) -> Self {
        self.tier = tier;
        self
    }

    /// Set a style hint.
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Set the backend seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The prompt with any style hint folded in.
    #[must_use]
    pub fn effective_prompt(&self) -> String {
        match &self.style {
            Some(style) => format!("{}, {} style", self.prompt, style),
            None => self.prompt.clone(),
        }
    }
}

/// A finished generation, owned by the caller.
///
/// The image is handed out behind an [`Arc`]: the health monitor keeps the
/// same handle in its window rather than a deep copy.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// The generated image.
    pub image: Arc<Frame>,
    /// Wall-clock time of the whole `generate` call.
    pub generation_time_ms: f64,
    /// Final quality estimate, in `[0, 1]`.
    pub quality: f32,
    /// Estimated memory footprint of the pass.
    pub memory_used_mb: f64,
    /// Active architecture stages at generation time.
    pub stages_used: usize,
}
