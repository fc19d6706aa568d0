//! # Phenex Attention
//!
//! Attention fusion over query/key/value buffers using recursive multi-scale
//! subdivision: buffers are split into near-equal partitions, fused
//! independently at the next depth, and concatenated back in partition order.
//! At maximum depth a plain scaled-score pass runs per head segment.

mod fusion;

pub use fusion::{AttentionConfig, AttentionFusion};

/// Prelude for common imports
pub mod prelude {
    pub use super::{AttentionConfig, AttentionFusion};
}
