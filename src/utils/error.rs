//! Error types and handling
//!
//! Aggregates the per-subsystem errors and maps them to the stable codes
//! the frontend switches on.

use crate::capture::CaptureError;
use crate::export::ExportError;
use crate::live::StoreError;
use crate::recorder::RecordingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Error response for the frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Capture(CaptureError::Unavailable) => "CAPTURE_UNAVAILABLE",
            AppError::Recording(RecordingError::Unavailable) => "RECORDING_UNAVAILABLE",
            AppError::Recording(RecordingError::EncodingUnavailable) => "ENCODING_UNAVAILABLE",
            AppError::Recording(RecordingError::Failed(_)) => "RECORDING_FAILED",
            AppError::Recording(RecordingError::InvalidState(_)) => "INVALID_STATE",
            AppError::Store(StoreError::Subscription(_)) => "SUBSCRIPTION_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
