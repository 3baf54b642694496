//! Usage analytics
//!
//! Fire-and-forget event emission. A sink that cannot deliver must swallow
//! the failure; emitting an event never fails the originating operation.

use crate::capture::CaptureMethod;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tauri::Emitter;

/// Event channel the frontend listens on to forward events to its SDK
pub const ANALYTICS_EVENT: &str = "analytics://event";

/// The events this application reports
#[derive(Debug, Clone)]
pub enum AnalyticsEvent {
    ScreenshotTaken {
        method: CaptureMethod,
    },
    RecordingStarted {
        mime_type: String,
    },
    RecordingCompleted {
        duration_seconds: u64,
        file_size_bytes: u64,
    },
    VideoFeedLoaded {
        video_url: String,
    },
    VideoError {
        error_code: String,
        error_message: String,
        video_url: String,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::ScreenshotTaken { .. } => "screenshot_taken",
            AnalyticsEvent::RecordingStarted { .. } => "recording_started",
            AnalyticsEvent::RecordingCompleted { .. } => "recording_completed",
            AnalyticsEvent::VideoFeedLoaded { .. } => "video_feed_loaded",
            AnalyticsEvent::VideoError { .. } => "video_error",
        }
    }

    pub fn params(&self) -> serde_json::Value {
        match self {
            AnalyticsEvent::ScreenshotTaken { method } => json!({
                "method": method.as_str(),
            }),
            AnalyticsEvent::RecordingStarted { mime_type } => json!({
                "mime_type": mime_type,
            }),
            AnalyticsEvent::RecordingCompleted {
                duration_seconds,
                file_size_bytes,
            } => json!({
                "duration_seconds": duration_seconds,
                "file_size_bytes": file_size_bytes,
            }),
            AnalyticsEvent::VideoFeedLoaded { video_url } => json!({
                "video_url": video_url,
            }),
            AnalyticsEvent::VideoError {
                error_code,
                error_message,
                video_url,
            } => json!({
                "error_code": error_code,
                "error_message": error_message,
                "video_url": video_url,
            }),
        }
    }
}

/// Destination for analytics events. Implementations must not fail.
pub trait AnalyticsSink: Send + Sync {
    fn log_event(&self, name: &str, params: serde_json::Value);
}

/// Cloneable handle used across the application
#[derive(Clone)]
pub struct Analytics {
    sink: Arc<dyn AnalyticsSink>,
}

impl Analytics {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }

    /// A handle that drops every event; used in tests
    pub fn noop() -> Self {
        struct NullSink;
        impl AnalyticsSink for NullSink {
            fn log_event(&self, _name: &str, _params: serde_json::Value) {}
        }
        Self::new(Arc::new(NullSink))
    }

    pub fn track(&self, event: AnalyticsEvent) {
        let mut params = event.params();
        if let Some(map) = params.as_object_mut() {
            map.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
        }
        self.sink.log_event(event.name(), params);
    }
}

/// Sink that writes events to the structured log
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn log_event(&self, name: &str, params: serde_json::Value) {
        tracing::info!(target: "analytics", event = name, %params);
    }
}

/// Sink that forwards events to the webview's analytics SDK
pub struct WebviewSink {
    app: tauri::AppHandle,
}

impl WebviewSink {
    pub fn new(app: tauri::AppHandle) -> Self {
        Self { app }
    }
}

impl AnalyticsSink for WebviewSink {
    fn log_event(&self, name: &str, params: serde_json::Value) {
        let payload = json!({ "name": name, "params": params });
        if let Err(err) = self.app.emit(ANALYTICS_EVENT, payload) {
            // Best effort only; losing an event must not fail the caller.
            tracing::warn!(event = name, "failed to forward analytics event: {err}");
        }
    }
}
