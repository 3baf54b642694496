//! Capture request and result types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which strategy produced a still capture.
///
/// Recorded verbatim on the result so downstream analytics can tell the
/// strategies apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    /// Current frame of the live video surface
    VideoFrame,
    /// Rasterization of the whole camera section
    SectionSnapshot,
    /// One frame grabbed from a display capture
    ScreenCapture,
}

impl CaptureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::VideoFrame => "video_frame",
            CaptureMethod::SectionSnapshot => "section_snapshot",
            CaptureMethod::ScreenCapture => "screen_capture",
        }
    }
}

/// Parameters for a still capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    /// Encoding quality, 0.0 to 1.0
    #[serde(default = "default_quality")]
    pub quality: f32,

    /// Preferred display-capture width
    #[serde(default = "default_width")]
    pub target_width: u32,

    /// Preferred display-capture height
    #[serde(default = "default_height")]
    pub target_height: u32,
}

fn default_quality() -> f32 {
    1.0
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            target_width: default_width(),
            target_height: default_height(),
        }
    }
}

/// A finished still capture
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    /// PNG-encoded image data
    #[serde(skip)]
    pub payload: Vec<u8>,

    /// The strategy that produced the image
    pub method: CaptureMethod,

    pub width: u32,
    pub height: u32,
}

/// Still-capture errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Every capture strategy failed
    #[error("no capture source available")]
    Unavailable,
}
