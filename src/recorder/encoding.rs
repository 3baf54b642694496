//! Encoding negotiation
//!
//! The recorder prefers the most efficient codec the host encoder reports
//! as supported, degrading through a fixed ladder. The ladder is total:
//! negotiation always ends in a supported entry or a terminal error.

use super::state::RecordingError;
use crate::bridge::MediaStream;

/// Preferred-first ladder of container/codec strings
pub const ENCODING_LADDER: [&str; 4] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
    "video/mp4",
];

/// Pick the first ladder entry the stream's encoder supports.
pub fn negotiate(stream: &dyn MediaStream) -> Result<&'static str, RecordingError> {
    ENCODING_LADDER
        .iter()
        .copied()
        .find(|mime| stream.supports_mime(mime))
        .ok_or(RecordingError::EncodingUnavailable)
}

/// File extension for a negotiated mime type
pub fn extension_for(mime_type: &str) -> &'static str {
    if mime_type.starts_with("video/mp4") {
        "mp4"
    } else {
        "webm"
    }
}
