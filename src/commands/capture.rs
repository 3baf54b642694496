//! Capture and recording commands

use crate::analytics::AnalyticsEvent;
use crate::capture::{CaptureController, CaptureMethod, CaptureOptions};
use crate::export::ExportedArtifact;
use crate::recorder::{RecordingController, RecordingOptions, RecordingState, StopOutcome};
use crate::utils::error::{AppError, ErrorResponse};
use serde::Serialize;
use std::sync::Arc;
use tauri::State;
use tokio::sync::Mutex;

use super::Services;

/// Application state for still capture
pub struct CaptureState {
    pub controller: CaptureController,
}

/// Application state for recording
pub struct RecorderState {
    pub controller: Arc<Mutex<RecordingController>>,
}

/// A finished still capture, exported
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub method: CaptureMethod,
    pub width: u32,
    pub height: u32,
    pub file: ExportedArtifact,
}

/// Take a still photo of the live feed
#[tauri::command]
pub async fn take_photo(
    capture: State<'_, CaptureState>,
    services: State<'_, Services>,
    options: Option<CaptureOptions>,
) -> Result<PhotoResponse, ErrorResponse> {
    let options = options.unwrap_or_default();

    let result = match capture.controller.capture_photo(&options).await {
        Ok(result) => result,
        Err(err) => {
            let err = AppError::from(err);
            services.notices.post(format!("Screenshot failed: {err}"));
            return Err(err.into());
        }
    };

    let file = match services.exporter.export_screenshot(&result) {
        Ok(file) => file,
        Err(err) => {
            let err = AppError::from(err);
            services.notices.post(format!("Screenshot failed: {err}"));
            return Err(err.into());
        }
    };

    services.notices.post("Screenshot saved successfully");
    services.analytics.track(AnalyticsEvent::ScreenshotTaken {
        method: result.method,
    });

    Ok(PhotoResponse {
        method: result.method,
        width: result.width,
        height: result.height,
        file,
    })
}

/// Response for a started recording
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStarted {
    pub mime_type: String,
}

/// Start recording the live feed
#[tauri::command]
pub async fn start_recording(
    recorder: State<'_, RecorderState>,
    services: State<'_, Services>,
    options: Option<RecordingOptions>,
) -> Result<RecordingStarted, ErrorResponse> {
    let options = options.unwrap_or_default();
    let mut controller = recorder.controller.lock().await;

    match controller.start(&options).await {
        Ok(mime_type) => {
            services.analytics.track(AnalyticsEvent::RecordingStarted {
                mime_type: mime_type.clone(),
            });
            services.notices.post("Recording started");
            Ok(RecordingStarted { mime_type })
        }
        Err(err) => {
            let err = AppError::from(err);
            services.notices.post(format!("Recording failed: {err}"));
            Err(err.into())
        }
    }
}

/// Outcome of stopping a recording
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StopResponse {
    /// The recording was exported
    #[serde(rename_all = "camelCase")]
    Saved {
        duration_seconds: u64,
        file: ExportedArtifact,
    },
    /// The session collected no data; nothing was written
    Empty,
}

/// Stop the active recording and export it
#[tauri::command]
pub async fn stop_recording(
    recorder: State<'_, RecorderState>,
    services: State<'_, Services>,
) -> Result<StopResponse, ErrorResponse> {
    let outcome = {
        let mut controller = recorder.controller.lock().await;
        controller.stop().await
    };

    match outcome {
        Ok(StopOutcome::Finished(artifact)) => {
            let file = match services.exporter.export_recording(&artifact) {
                Ok(file) => file,
                Err(err) => {
                    let err = AppError::from(err);
                    services.notices.post(format!("Recording failed: {err}"));
                    return Err(err.into());
                }
            };

            services.notices.post(format!(
                "Recording saved: {} ({}s)",
                file.file_name, artifact.duration_seconds
            ));
            services.analytics.track(AnalyticsEvent::RecordingCompleted {
                duration_seconds: artifact.duration_seconds,
                file_size_bytes: file.size_bytes,
            });

            Ok(StopResponse::Saved {
                duration_seconds: artifact.duration_seconds,
                file,
            })
        }
        Ok(StopOutcome::Empty) => {
            services.notices.post("No recording data available");
            Ok(StopResponse::Empty)
        }
        Err(err) => {
            let err = AppError::from(err);
            services.notices.post(format!("Recording failed: {err}"));
            Err(err.into())
        }
    }
}

/// Get the current recording state
#[tauri::command]
pub async fn get_recording_state(
    recorder: State<'_, RecorderState>,
) -> Result<RecordingState, ErrorResponse> {
    let controller = recorder.controller.lock().await;
    Ok(controller.state())
}

/// Seconds since the active recording started
#[tauri::command]
pub async fn get_recording_duration(
    recorder: State<'_, RecorderState>,
) -> Result<Option<u64>, ErrorResponse> {
    let controller = recorder.controller.lock().await;
    Ok(controller.duration_seconds())
}
