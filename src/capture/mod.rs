//! Still-capture system
//!
//! Produces a single still image from whichever capture source is currently
//! viable, degrading gracefully through three strategies: the live video
//! surface, a rasterization of the camera section, and a one-frame display
//! capture.

pub mod controller;
pub mod types;

pub use controller::CaptureController;
pub use types::{CaptureError, CaptureMethod, CaptureOptions, CaptureResult};
