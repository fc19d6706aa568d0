//! The five-stage curriculum and its progression rules.

use serde::{Deserialize, Serialize};
use tracing::info;

use phenex_core::{Error, Result, RollingWindow};

/// Accuracy samples remembered per stage.
const WINDOW_CAPACITY: usize = 100;

/// Samples required before advancement is considered.
const ELIGIBILITY_SAMPLES: usize = 20;

/// Maximum accuracy spread (population std-dev) across those samples.
const STABILITY_LIMIT: f64 = 0.05;

/// One rung of the difficulty ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumStage {
    /// Human-readable stage name.
    pub name: String,
    /// Difficulty in `[0, 1]`.
    pub difficulty: f64,
    /// Nominal training duration, in scheduler units.
    pub duration_units: u32,
    /// Task families trained at this stage.
    pub task_kinds: Vec<String>,
    /// Examples drawn per epoch.
    pub dataset_size: usize,
}

impl CurriculumStage {
    fn new(
        name: &str,
        difficulty: f64,
        duration_units: u32,
        task_kinds: &[&str],
        dataset_size: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            difficulty,
            duration_units,
            task_kinds: task_kinds.iter().map(|s| s.to_string()).collect(),
            dataset_size,
        }
    }

    /// Accuracy the recent window must average to leave this stage.
    #[must_use]
    pub fn required_accuracy(&self) -> f64 {
        0.7 + 0.2 * self.difficulty
    }
}

/// The standard five-stage ladder.
#[must_use]
pub fn standard_ladder() -> Vec<CurriculumStage> {
    vec![
        CurriculumStage::new(
            "Foundation",
            0.2,
            10,
            &["denoise", "reconstruct"],
            1_000,
        ),
        CurriculumStage::new(
            "Intermediate",
            0.4,
            20,
            &["denoise", "reconstruct", "stylize"],
            5_000,
        ),
        CurriculumStage::new(
            "Advanced",
            0.6,
            30,
            &["stylize", "compose", "inpaint"],
            20_000,
        ),
        CurriculumStage::new(
            "Expert",
            0.8,
            40,
            &["compose", "inpaint", "upscale"],
            50_000,
        ),
        CurriculumStage::new(
            "Master",
            1.0,
            50,
            &["compose", "inpaint", "upscale", "freeform"],
            100_000,
        ),
    ]
}

/// Mutable progression state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingProgress {
    /// Index into the ladder; only ever increases, caps at the last stage.
    pub current_stage_index: usize,
    /// Stage transitions completed so far.
    pub stages_completed: usize,
    /// Most recent reported loss.
    pub last_loss: f64,
    /// Most recent reported accuracy.
    pub last_accuracy: f64,
    /// Whether the last update found the advancement criteria met.
    pub ready_to_advance: bool,
}

/// Tracks the difficulty progression of a training run.
#[derive(Debug)]
pub struct CurriculumController {
    stages: Vec<CurriculumStage>,
    progress: TrainingProgress,
    accuracy_window: RollingWindow<f64>,
}

impl Default for CurriculumController {
    fn default() -> Self {
        Self::new()
    }
}

impl CurriculumController {
    /// Creates a controller over the standard ladder.
    pub fn new() -> Self {
        Self {
            stages: standard_ladder(),
            progress: TrainingProgress {
                current_stage_index: 0,
                stages_completed: 0,
                last_loss: 0.0,
                last_accuracy: 0.0,
                ready_to_advance: false,
            },
            accuracy_window: RollingWindow::new(WINDOW_CAPACITY),
        }
    }

    /// Creates a controller over a custom ladder.
    pub fn with_stages(stages: Vec<CurriculumStage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(Error::configuration("curriculum needs at least one stage"));
        }
        let mut controller = Self::new();
        controller.stages = stages;
        Ok(controller)
    }

    /// Records one training step and advances the stage when eligible.
    ///
    /// Returns `true` when a stage transition happened. At the terminal
    /// stage metrics keep recording but no transition ever occurs.
    pub fn update_progress(&mut self, loss: f64, accuracy: f64) -> bool {
        self.accuracy_window.push(accuracy);
        self.progress.last_loss = loss;
        self.progress.last_accuracy = accuracy;

        let stage = &self.stages[self.progress.current_stage_index];
        let eligible = self.accuracy_window.len() >= ELIGIBILITY_SAMPLES
            && self.accuracy_window.tail_std_dev(ELIGIBILITY_SAMPLES) < STABILITY_LIMIT
            && self.accuracy_window.tail_mean(ELIGIBILITY_SAMPLES) >= stage.required_accuracy();

        let terminal = self.progress.current_stage_index + 1 >= self.stages.len();
        self.progress.ready_to_advance = eligible && !terminal;

        if eligible && !terminal {
            self.progress.current_stage_index += 1;
            self.progress.stages_completed += 1;
            self.accuracy_window.clear();
            self.progress.ready_to_advance = false;
            info!(
                stage = self.stages[self.progress.current_stage_index].name.as_str(),
                completed = self.progress.stages_completed,
                "curriculum advanced"
            );
            return true;
        }
        false
    }

    /// The stage currently being trained.
    #[must_use]
    pub fn current_stage(&self) -> &CurriculumStage {
        &self.stages[self.progress.current_stage_index]
    }

    /// The full ladder.
    #[must_use]
    pub fn stages(&self) -> &[CurriculumStage] {
        &self.stages
    }

    /// The progression state.
    #[must_use]
    pub fn progress(&self) -> &TrainingProgress {
        &self.progress
    }

    /// Whether the terminal stage has been reached.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.progress.current_stage_index + 1 >= self.stages.len()
    }

    /// Accuracy samples currently windowed.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.accuracy_window.len()
    }

    /// Learning rate recommended for the current difficulty.
    #[must_use]
    pub fn recommended_learning_rate(&self) -> f64 {
        0.001 * (1.0 - 0.5 * self.current_stage().difficulty)
    }

    /// Batch size recommended for the current difficulty.
    #[must_use]
    pub fn recommended_batch_size(&self) -> usize {
        (32.0 * (2.0 - self.current_stage().difficulty)).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_shape() {
        let ladder = standard_ladder();
        assert_eq!(ladder.len(), 5);
        assert_eq!(ladder[0].name, "Foundation");
        assert_eq!(ladder[4].name, "Master");
        assert!(ladder.windows(2).all(|w| w[0].difficulty < w[1].difficulty));
    }

    #[test]
    fn test_stable_high_accuracy_advances_once() {
        // 25 samples of exactly 0.95 at Foundation (difficulty 0.2,
        // required mean 0.74): zero spread, eligible at the 20th sample.
        let mut controller = CurriculumController::new();
        let mut advances = 0;

        for _ in 0..25 {
            if controller.update_progress(0.1, 0.95) {
                advances += 1;
            }
        }

        assert_eq!(advances, 1);
        assert_eq!(controller.progress().current_stage_index, 1);
        assert_eq!(controller.progress().stages_completed, 1);
        // Window was cleared at the transition; only post-advance samples remain.
        assert_eq!(controller.window_len(), 5);
    }

    #[test]
    fn test_unstable_accuracy_does_not_advance() {
        let mut controller = CurriculumController::new();
        for i in 0..50 {
            // Mean is high but oscillation keeps the std-dev over the limit.
            let accuracy = if i % 2 == 0 { 0.99 } else { 0.75 };
            assert!(!controller.update_progress(0.1, accuracy));
        }
        assert_eq!(controller.progress().current_stage_index, 0);
    }

    #[test]
    fn test_index_is_monotonic_and_capped() {
        let mut controller = CurriculumController::new();
        let mut last_index = 0;

        for _ in 0..500 {
            controller.update_progress(0.01, 0.99);
            let index = controller.progress().current_stage_index;
            assert!(index >= last_index);
            assert!(index <= 4);
            last_index = index;
        }
        assert_eq!(last_index, 4);
        assert!(controller.is_terminal());
    }

    #[test]
    fn test_terminal_stage_keeps_recording() {
        let mut controller = CurriculumController::new();
        for _ in 0..400 {
            controller.update_progress(0.01, 0.99);
        }
        assert!(controller.is_terminal());

        let advanced = controller.update_progress(2.0, 0.42);
        assert!(!advanced);
        assert_eq!(controller.progress().last_loss, 2.0);
        assert_eq!(controller.progress().last_accuracy, 0.42);
        assert!(!controller.progress().ready_to_advance);
    }

    #[test]
    fn test_recommendations_scale_with_difficulty() {
        let mut controller = CurriculumController::new();
        // Foundation: difficulty 0.2.
        assert!((controller.recommended_learning_rate() - 0.0009).abs() < 1e-12);
        assert_eq!(controller.recommended_batch_size(), 57);

        for _ in 0..500 {
            controller.update_progress(0.01, 0.99);
        }
        // Master: difficulty 1.0.
        assert!((controller.recommended_learning_rate() - 0.0005).abs() < 1e-12);
        assert_eq!(controller.recommended_batch_size(), 32);
    }

    #[test]
    fn test_empty_custom_ladder_rejected() {
        assert!(CurriculumController::with_stages(Vec::new()).is_err());
    }
}
