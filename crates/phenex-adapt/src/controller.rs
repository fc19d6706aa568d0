//! The architecture controller state machine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use phenex_core::{Error, Result, RollingWindow};

use crate::stage::{Stage, StageKind};

/// Complexity samples remembered for the rolling average.
const HISTORY_CAPACITY: usize = 10;

/// Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptConfig {
    /// Minimum active stages; the controller is seeded with this many.
    pub min_stages: usize,
    /// Maximum active stages.
    pub max_stages: usize,
    /// Rolling average above this expands the architecture.
    pub expansion_threshold: f64,
    /// Rolling average below this contracts the architecture.
    pub contraction_threshold: f64,
    /// Seed for the fallback stage-kind pick.
    pub seed: Option<u64>,
}

impl Default for AdaptConfig {
    fn default() -> Self {
        Self {
            min_stages: 2,
            max_stages: 10,
            expansion_threshold: 0.65,
            contraction_threshold: 0.35,
            seed: None,
        }
    }
}

impl AdaptConfig {
    /// Set the stage count bounds.
    pub fn bounds(mut self, min: usize, max: usize) -> Self {
        self.min_stages = min;
        self.max_stages = max;
        self
    }

    /// Set the expansion and contraction thresholds.
    pub fn thresholds(mut self, expansion: f64, contraction: f64) -> Self {
        self.expansion_threshold = expansion;
        self.contraction_threshold = contraction;
        self
    }

    /// Set the fallback-pick seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_stages == 0 {
            return Err(Error::configuration("min_stages must be > 0"));
        }
        if self.max_stages < self.min_stages {
            return Err(Error::configuration(format!(
                "max_stages {} below min_stages {}",
                self.max_stages, self.min_stages
            )));
        }
        if self.contraction_threshold >= self.expansion_threshold {
            return Err(Error::configuration(
                "contraction_threshold must be below expansion_threshold",
            ));
        }
        Ok(())
    }
}

/// Strategy for choosing a new stage's kind when the rolling average gives
/// no clear signal (at or below 0.4).
#[derive(Debug, Clone, Copy)]
pub enum KindFallback {
    /// Uniform pick over every stage kind, from the configured seed.
    UniformRandom,
    /// Always the given kind.
    Fixed(StageKind),
    /// Caller-supplied rule over the rolling average.
    Custom(fn(f64) -> StageKind),
}

/// What a single `adapt` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adaptation {
    /// A new stage of the given kind was appended and activated.
    Expanded(StageKind),
    /// The stage with the given id was deactivated.
    Contracted(u64),
    /// Neither threshold was crossed.
    Unchanged,
}

/// Read-only architecture summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureInfo {
    /// Stages ever created, active or not.
    pub total_created: usize,
    /// Currently active stages.
    pub active_count: usize,
    /// Rolling average of recent complexity samples.
    pub rolling_complexity: f64,
}

/// Tracks task-complexity history and grows or shrinks the stage list.
pub struct ArchitectureController {
    config: AdaptConfig,
    stages: Vec<Stage>,
    history: RollingWindow<f64>,
    next_id: u64,
    rng: StdRng,
    fallback: KindFallback,
}

impl ArchitectureController {
    /// Creates a controller seeded with `min_stages` active attention stages.
    pub fn new(config: AdaptConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let stages: Vec<Stage> = (0..config.min_stages as u64)
            .map(|id| Stage {
                id,
                kind: StageKind::Attention,
                active: true,
                complexity: 0.5,
            })
            .collect();
        let next_id = stages.len() as u64;

        Ok(Self {
            config,
            stages,
            history: RollingWindow::new(HISTORY_CAPACITY),
            next_id,
            rng,
            fallback: KindFallback::UniformRandom,
        })
    }

    /// Replaces the fallback stage-kind strategy.
    pub fn with_fallback(mut self, fallback: KindFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Feeds one complexity sample and applies at most one architecture step.
    ///
    /// The sample is clamped to `[0, 1]`. A call expands by one stage,
    /// contracts by one stage, or does nothing - never both, never more.
    pub fn adapt(&mut self, complexity: f64) -> Adaptation {
        self.history.push(complexity.clamp(0.0, 1.0));
        let average = self.history.mean();
        let active = self.active_count();

        if average > self.config.expansion_threshold && active < self.config.max_stages {
            let kind = self.pick_kind(average);
            let stage = Stage {
                id: self.next_id,
                kind,
                active: true,
                complexity: average,
            };
            self.next_id += 1;
            debug!(id = stage.id, kind = kind.name(), average, "expanding architecture");
            self.stages.push(stage);
            return Adaptation::Expanded(kind);
        }

        if average < self.config.contraction_threshold && active > self.config.min_stages {
            // First-found stage with the lowest complexity among active ones.
            let victim = self
                .stages
                .iter_mut()
                .filter(|s| s.active)
                .min_by(|a, b| {
                    a.complexity
                        .partial_cmp(&b.complexity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(stage) = victim {
                stage.active = false;
                let id = stage.id;
                debug!(id, average, "contracting architecture");
                return Adaptation::Contracted(id);
            }
        }

        Adaptation::Unchanged
    }

    fn pick_kind(&mut self, average: f64) -> StageKind {
        if average > 0.7 {
            StageKind::Attention
        } else if average > 0.4 {
            StageKind::Convolution
        } else {
            match self.fallback {
                KindFallback::UniformRandom => {
                    StageKind::ALL[self.rng.gen_range(0..StageKind::ALL.len())]
                }
                KindFallback::Fixed(kind) => kind,
                KindFallback::Custom(f) => f(average),
            }
        }
    }

    /// Number of active stages.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.stages.iter().filter(|s| s.active).count()
    }

    /// Every stage ever created, in creation order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Architecture summary.
    #[must_use]
    pub fn info(&self) -> ArchitectureInfo {
        ArchitectureInfo {
            total_created: self.stages.len(),
            active_count: self.active_count(),
            rolling_complexity: self.history.mean(),
        }
    }

    /// The controller configuration.
    #[must_use]
    pub fn config(&self) -> &AdaptConfig {
        &self.config
    }
}

impl std::fmt::Debug for ArchitectureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchitectureController")
            .field("config", &self.config)
            .field("total_created", &self.stages.len())
            .field("active_count", &self.active_count())
            .finish()
    }
}
