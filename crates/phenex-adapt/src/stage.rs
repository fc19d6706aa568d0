//! Processing stages of the adaptive architecture.

use serde::{Deserialize, Serialize};

/// The operation a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Attention over the working buffer.
    Attention,
    /// Convolutional filtering.
    Convolution,
    /// Normalization.
    Normalization,
    /// Nonlinear activation.
    Activation,
}

impl StageKind {
    /// Every stage kind, in declaration order.
    pub const ALL: [StageKind; 4] = [
        StageKind::Attention,
        StageKind::Convolution,
        StageKind::Normalization,
        StageKind::Activation,
    ];

    /// Stable lowercase name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Attention => "attention",
            StageKind::Convolution => "convolution",
            StageKind::Normalization => "normalization",
            StageKind::Activation => "activation",
        }
    }
}

/// One unit of the adaptive processing graph.
///
/// Stages are only ever deactivated, never removed, so `id`s stay stable
/// across the architecture's whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Stable identifier, assigned at creation.
    pub id: u64,
    /// Operation kind.
    pub kind: StageKind,
    /// Whether the stage participates in processing.
    pub active: bool,
    /// Complexity level the stage was created to serve.
    pub complexity: f64,
}
