//! # Phenex Plugin
//!
//! Named, typed, activatable units of behavior. A plugin transforms an
//! `f32` buffer under an opaque JSON config; the registry holds plugins by
//! unique id, tracks an activation set, and executes individual plugins or
//! folds every active plugin of a kind over a buffer in activation order.
//!
//! Five default plugins ship pre-registered but not pre-activated: a loss
//! estimator, a guidance stage, a noise-reduction preprocessor, a
//! sharpening postprocessor, and an adaptive-learning-rate optimizer.

mod defaults;
mod error;
mod registry;

pub use defaults::default_plugins;
pub use error::{PluginError, Result};
pub use registry::{Plugin, PluginKind, PluginRegistry};

/// Prelude for common imports
pub mod prelude {
    pub use super::{Plugin, PluginError, PluginKind, PluginRegistry, Result};
}
