//! Webview media bridge
//!
//! Platform-agnostic traits for the capture and playback primitives hosted
//! by the webview: frame grabs, media streams, and the stream encoder.
//! Every primitive is an asynchronous call returning a payload or a
//! structured error, so the controllers never depend on how the host
//! actually produces the media.

pub mod webview;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by bridge primitives
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error("bridge call '{0}' timed out")]
    Timeout(&'static str),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("bridge transport error: {0}")]
    Transport(String),
}

/// A rasterized frame produced by a capture primitive.
///
/// `data` is PNG-encoded. Width and height may be zero when the host could
/// not report them; callers recover the dimensions from the PNG header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterFrame {
    pub data: Vec<u8>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Encoder tuning passed through to the host encoder
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// How often the encoder flushes a chunk
    pub timeslice: Duration,

    /// Target video bitrate
    pub video_bits_per_second: u32,
}

/// Events delivered by an active stream encoder
#[derive(Debug, Clone)]
pub enum EncoderEvent {
    /// A finished chunk of encoded media
    Chunk(Vec<u8>),

    /// The encoder flushed its final data and shut down
    Finished,

    /// The encoder or its backing transport failed
    Error(String),
}

/// Capture tuning for display-backed strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConstraints {
    /// Preferred capture width
    pub ideal_width: u32,

    /// Preferred capture height
    pub ideal_height: u32,
}

impl Default for DisplayConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// A live media stream acquired from the bridge.
///
/// The stream is exclusively owned by whoever acquired it and must be
/// released exactly once, on stop or on error.
#[async_trait]
pub trait MediaStream: Send {
    /// Whether the host encoder supports a container/codec string
    fn supports_mime(&self, mime_type: &str) -> bool;

    /// Start encoding. Chunks arrive periodically on the returned channel
    /// until the encoder finishes or fails.
    async fn start_encoder(
        &mut self,
        mime_type: &str,
        options: &EncoderOptions,
    ) -> Result<mpsc::Receiver<EncoderEvent>, BridgeError>;

    /// Ask the encoder to flush its remaining data; the event channel ends
    /// with `Finished` afterwards.
    async fn stop_encoder(&mut self) -> Result<(), BridgeError>;

    /// Release the stream's tracks. Safe to call after `stop_encoder`.
    async fn release(&mut self);
}

/// Asynchronous capture primitives hosted by the webview
#[async_trait]
pub trait MediaBridge: Send + Sync {
    /// Grab the current frame of the live video surface. Fails unless a
    /// source is presenting and playing.
    async fn video_frame(&self) -> Result<RasterFrame, BridgeError>;

    /// Rasterize the whole camera section, chrome included.
    async fn render_section(&self) -> Result<RasterFrame, BridgeError>;

    /// Grab one frame from a display capture. The backing stream is
    /// released before the call returns.
    async fn display_frame(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<RasterFrame, BridgeError>;

    /// Capture the live video surface's own output stream.
    async fn element_stream(&self) -> Result<Box<dyn MediaStream>, BridgeError>;

    /// Capture a full display stream.
    async fn display_stream(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<Box<dyn MediaStream>, BridgeError>;
}
