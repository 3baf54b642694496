//! Recording system module
//!
//! Continuous recording of the live feed:
//! - RecordingController owns the {Idle, Recording} state machine
//! - the encoding ladder negotiates a supported container/codec
//! - a chunk pump task owns the media stream and accumulates encoder output

pub mod controller;
pub mod encoding;
pub mod state;

pub use controller::{RecorderEvent, RecordingController};
pub use state::{
    RecordingArtifact, RecordingError, RecordingOptions, RecordingState, StopOutcome, StreamSource,
};
