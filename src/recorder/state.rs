//! Recording state and session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "idle"),
            RecordingState::Recording => write!(f, "recording"),
        }
    }
}

/// Configuration for starting a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
    /// How often the encoder flushes a chunk, in milliseconds
    #[serde(default = "default_timeslice_ms")]
    pub timeslice_ms: u64,

    /// Target video bitrate
    #[serde(default = "default_bits_per_second")]
    pub video_bits_per_second: u32,

    /// Preferred display-capture width when falling back to a display stream
    #[serde(default = "default_width")]
    pub target_width: u32,

    /// Preferred display-capture height
    #[serde(default = "default_height")]
    pub target_height: u32,
}

fn default_timeslice_ms() -> u64 {
    1000
}

fn default_bits_per_second() -> u32 {
    2_500_000
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            timeslice_ms: default_timeslice_ms(),
            video_bits_per_second: default_bits_per_second(),
            target_width: default_width(),
            target_height: default_height(),
        }
    }
}

/// Which stream fed a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    /// The live video surface's own output
    Element,
    /// A full display capture
    Display,
}

/// A finished recording, chunks concatenated in arrival order
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub source: StreamSource,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: u64,
}

/// Outcome of stopping a recording
#[derive(Debug)]
pub enum StopOutcome {
    /// The session produced data; the artifact is ready to export
    Finished(RecordingArtifact),
    /// The session collected no chunks. Not an error; no artifact is
    /// produced.
    Empty,
}

/// Recording errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    /// Neither the element stream nor a display stream could be acquired
    #[error("no recordable media stream available")]
    Unavailable,

    /// The encoding ladder was exhausted without a supported entry
    #[error("no supported recording encoding")]
    EncodingUnavailable,

    /// The encoder or its transport failed mid-recording
    #[error("recording failed: {0}")]
    Failed(String),

    /// Start while recording, or stop while idle
    #[error("operation not valid while recorder is {0}")]
    InvalidState(RecordingState),
}
