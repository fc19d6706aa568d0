//! # Phenex Core
//!
//! Core types shared across the Phenex adaptive generation pipeline.
//!
//! Phenex is named after the 37th demon of the Ars Goetia, who appears as a
//! phoenix - just as progressive refinement burns each draft image down and
//! renders it anew at a higher scale.
//!
//! ## Core Types
//!
//! - [`Frame`] - a raster image buffer with resize/blend/similarity operations
//! - [`RollingWindow`] - a fixed-capacity FIFO buffer of recent samples
//! - [`CancelToken`] - cooperative cancellation checked at suspension points
//! - [`Error`] - the shared error taxonomy for generation-side components

pub mod cancel;
pub mod error;
pub mod frame;
pub mod window;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use frame::Frame;
pub use window::RollingWindow;

/// Prelude for common imports
pub mod prelude {
    pub use super::{CancelToken, Error, Frame, Result, RollingWindow};
}
