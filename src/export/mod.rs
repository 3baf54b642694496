//! Artifact export
//!
//! Wraps a finished still or recording as a locally addressable,
//! user-downloadable file. This is a pure sink: a failure is reported to
//! the caller and never retried automatically.

use crate::capture::CaptureResult;
use crate::recorder::encoding;
use crate::recorder::RecordingArtifact;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no export directory available")]
    NoDestination,
}

/// A file reference handed back to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub uri: String,
    pub size_bytes: u64,
}

/// Writes artifacts into the configured export directory
#[derive(Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    /// Use `output_dir`, or fall back to the platform download directory.
    pub fn new(output_dir: Option<PathBuf>) -> Result<Self, ExportError> {
        let output_dir = output_dir
            .or_else(dirs::download_dir)
            .ok_or(ExportError::NoDestination)?;
        Ok(Self { output_dir })
    }

    pub fn export_screenshot(
        &self,
        capture: &CaptureResult,
    ) -> Result<ExportedArtifact, ExportError> {
        self.write(screenshot_file_name(Utc::now()), &capture.payload)
    }

    pub fn export_recording(
        &self,
        artifact: &RecordingArtifact,
    ) -> Result<ExportedArtifact, ExportError> {
        self.write(
            recording_file_name(Utc::now(), &artifact.mime_type),
            &artifact.data,
        )
    }

    fn write(&self, file_name: String, data: &[u8]) -> Result<ExportedArtifact, ExportError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&file_name);
        fs::write(&path, data)?;

        let exported = ExportedArtifact {
            uri: file_uri(&path),
            file_name,
            size_bytes: data.len() as u64,
            path,
        };
        tracing::info!(
            file = %exported.file_name,
            bytes = exported.size_bytes,
            "artifact exported"
        );
        Ok(exported)
    }
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced, safe for filenames
fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

pub fn screenshot_file_name(at: DateTime<Utc>) -> String {
    format!("baby-monitor-screenshot-{}.png", timestamp_slug(at))
}

pub fn recording_file_name(at: DateTime<Utc>, mime_type: &str) -> String {
    format!(
        "baby-monitor-recording-{}.{}",
        timestamp_slug(at),
        encoding::extension_for(mime_type)
    )
}

/// `file://` URI with percent-encoded path segments
fn file_uri(path: &Path) -> String {
    let encoded: Vec<String> = path
        .to_string_lossy()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("file://{}", encoded.join("/"))
}
