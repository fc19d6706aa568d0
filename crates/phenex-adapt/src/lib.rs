//! # Phenex Adapt
//!
//! Architecture adaptation driven by task complexity.
//!
//! The controller keeps an ordered list of processing stages and a rolling
//! window of recent complexity samples. A sustained rise in average
//! complexity grows the architecture by one stage; a sustained fall
//! deactivates the cheapest active stage. Stages are never deleted, so the
//! history of past shapes is retained.

mod controller;
mod stage;

pub use controller::{Adaptation, AdaptConfig, ArchitectureController, ArchitectureInfo, KindFallback};
pub use stage::{Stage, StageKind};

/// Prelude for common imports
pub mod prelude {
    pub use super::{AdaptConfig, ArchitectureController, ArchitectureInfo, Stage, StageKind};
}
