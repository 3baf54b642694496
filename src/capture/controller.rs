//! Still-capture controller
//!
//! Tries the capture strategies in fixed priority order, stopping at the
//! first that yields a usable image. Each strategy absorbs its own failure;
//! only exhaustion of all three surfaces an error.

use super::types::{CaptureError, CaptureMethod, CaptureOptions, CaptureResult};
use crate::bridge::{BridgeError, DisplayConstraints, MediaBridge, RasterFrame};
use std::sync::Arc;

pub struct CaptureController {
    bridge: Arc<dyn MediaBridge>,
}

impl CaptureController {
    pub fn new(bridge: Arc<dyn MediaBridge>) -> Self {
        Self { bridge }
    }

    /// Capture a single still image.
    ///
    /// Strategy order: live video frame, camera-section rasterization,
    /// one-frame display capture. The first strategy that returns a
    /// non-empty image wins; its method tag is preserved on the result.
    pub async fn capture_photo(
        &self,
        options: &CaptureOptions,
    ) -> Result<CaptureResult, CaptureError> {
        let attempt = self.bridge.video_frame().await;
        if let Some(result) = Self::finish(attempt, CaptureMethod::VideoFrame) {
            return Ok(result);
        }

        let attempt = self.bridge.render_section().await;
        if let Some(result) = Self::finish(attempt, CaptureMethod::SectionSnapshot) {
            return Ok(result);
        }

        let constraints = DisplayConstraints {
            ideal_width: options.target_width,
            ideal_height: options.target_height,
        };
        let attempt = self.bridge.display_frame(&constraints).await;
        if let Some(result) = Self::finish(attempt, CaptureMethod::ScreenCapture) {
            return Ok(result);
        }

        tracing::warn!("all capture strategies failed");
        Err(CaptureError::Unavailable)
    }

    fn finish(
        attempt: Result<RasterFrame, BridgeError>,
        method: CaptureMethod,
    ) -> Option<CaptureResult> {
        let frame = match attempt {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(method = method.as_str(), "capture strategy failed: {err}");
                return None;
            }
        };

        if frame.data.is_empty() {
            tracing::debug!(method = method.as_str(), "capture strategy returned no data");
            return None;
        }

        let (width, height) = if frame.width > 0 && frame.height > 0 {
            (frame.width, frame.height)
        } else {
            // The host did not report dimensions; read them off the PNG header.
            match probe_png_dimensions(&frame.data) {
                Some(dims) => dims,
                None => {
                    tracing::debug!(
                        method = method.as_str(),
                        "capture strategy returned undecodable image"
                    );
                    return None;
                }
            }
        };

        tracing::info!(
            method = method.as_str(),
            width,
            height,
            bytes = frame.data.len(),
            "captured still image"
        );

        Some(CaptureResult {
            payload: frame.data,
            method,
            width,
            height,
        })
    }
}

/// Read image dimensions from a PNG header
fn probe_png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let decoder = png::Decoder::new(std::io::Cursor::new(data));
    let reader = decoder.read_info().ok()?;
    let info = reader.info();
    Some((info.width, info.height))
}
