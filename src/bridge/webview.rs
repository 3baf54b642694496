//! Webview-backed bridge implementation
//!
//! The webview hosts the physical media surfaces (the video element and the
//! dashboard section), so capture primitives are serviced there: the backend
//! emits a `bridge://request` event carrying a call id, the frontend performs
//! the work and resolves the call through the `bridge_response` command.
//! Encoder chunks flow back the same way through `bridge_stream_event`.

use super::{
    BridgeError, DisplayConstraints, EncoderEvent, EncoderOptions, MediaBridge, MediaStream,
    RasterFrame,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tauri::{AppHandle, Emitter, State};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Default time to wait for the webview to service a call
const CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Event channel the frontend listens on for bridge calls
pub const BRIDGE_REQUEST_EVENT: &str = "bridge://request";

type PendingCall = oneshot::Sender<Result<serde_json::Value, String>>;

/// Shared routing tables between the bridge and its Tauri commands
#[derive(Clone, Default)]
pub struct WebviewBridgeState {
    pending: Arc<Mutex<HashMap<Uuid, PendingCall>>>,
    streams: Arc<Mutex<HashMap<Uuid, mpsc::Sender<EncoderEvent>>>>,
}

/// A call emitted to the frontend
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BridgeRequest {
    id: Uuid,
    method: &'static str,
    params: serde_json::Value,
}

/// The frontend's answer to a bridge call
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub id: Uuid,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// An encoder event reported by the frontend
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StreamEventPayload {
    #[serde(rename_all = "camelCase")]
    Chunk { stream_id: Uuid, data: Vec<u8> },
    #[serde(rename_all = "camelCase")]
    Error { stream_id: Uuid, message: String },
    #[serde(rename_all = "camelCase")]
    Finished { stream_id: Uuid },
}

/// Resolve a pending bridge call
#[tauri::command]
pub fn bridge_response(state: State<'_, WebviewBridgeState>, response: BridgeResponse) {
    let Some(reply) = state.pending.lock().remove(&response.id) else {
        tracing::debug!(id = %response.id, "bridge response for unknown or expired call");
        return;
    };

    let result = match response.error {
        Some(message) => Err(message),
        None => Ok(response.payload.unwrap_or(serde_json::Value::Null)),
    };
    let _ = reply.send(result);
}

/// Route an encoder event to the stream that owns it
#[tauri::command]
pub async fn bridge_stream_event(
    state: State<'_, WebviewBridgeState>,
    event: StreamEventPayload,
) -> Result<(), String> {
    let (stream_id, event) = match event {
        StreamEventPayload::Chunk { stream_id, data } => (stream_id, EncoderEvent::Chunk(data)),
        StreamEventPayload::Error { stream_id, message } => {
            (stream_id, EncoderEvent::Error(message))
        }
        StreamEventPayload::Finished { stream_id } => (stream_id, EncoderEvent::Finished),
    };

    let route = state.streams.lock().get(&stream_id).cloned();
    match route {
        Some(tx) => {
            // The pump may already have shut down; a dropped event is fine.
            let _ = tx.send(event).await;
        }
        None => tracing::debug!(%stream_id, "encoder event for unrouted stream"),
    }
    Ok(())
}

/// Request/response plumbing shared by the bridge and its streams
struct Rpc {
    app: AppHandle,
    pending: Arc<Mutex<HashMap<Uuid, PendingCall>>>,
    call_timeout: Duration,
}

impl Rpc {
    async fn call(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let request = BridgeRequest { id, method, params };
        if let Err(err) = self.app.emit(BRIDGE_REQUEST_EVENT, &request) {
            self.pending.lock().remove(&id);
            return Err(BridgeError::Transport(err.to_string()));
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(Ok(payload))) => Ok(payload),
            Ok(Ok(Err(message))) => Err(BridgeError::SourceUnavailable(message)),
            Ok(Err(_)) => Err(BridgeError::Transport("bridge channel closed".into())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(BridgeError::Timeout(method))
            }
        }
    }
}

/// `MediaBridge` implementation backed by the application webview
pub struct WebviewMediaBridge {
    rpc: Arc<Rpc>,
    streams: Arc<Mutex<HashMap<Uuid, mpsc::Sender<EncoderEvent>>>>,
}

impl WebviewMediaBridge {
    pub fn new(app: AppHandle, state: &WebviewBridgeState) -> Self {
        Self {
            rpc: Arc::new(Rpc {
                app,
                pending: state.pending.clone(),
                call_timeout: CALL_TIMEOUT,
            }),
            streams: state.streams.clone(),
        }
    }

    fn decode_frame(payload: serde_json::Value) -> Result<RasterFrame, BridgeError> {
        serde_json::from_value(payload).map_err(|err| BridgeError::Transport(err.to_string()))
    }

    async fn open_stream(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<Box<dyn MediaStream>, BridgeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct StreamOpened {
            stream_id: Uuid,
            #[serde(default)]
            supported_mime_types: Vec<String>,
        }

        let payload = self.rpc.call(method, params).await?;
        let opened: StreamOpened = serde_json::from_value(payload)
            .map_err(|err| BridgeError::Transport(err.to_string()))?;

        Ok(Box::new(WebviewMediaStream {
            rpc: self.rpc.clone(),
            streams: self.streams.clone(),
            stream_id: opened.stream_id,
            supported: opened.supported_mime_types,
        }))
    }
}

#[async_trait]
impl MediaBridge for WebviewMediaBridge {
    async fn video_frame(&self) -> Result<RasterFrame, BridgeError> {
        let payload = self.rpc.call("captureVideoFrame", serde_json::json!({})).await?;
        Self::decode_frame(payload)
    }

    async fn render_section(&self) -> Result<RasterFrame, BridgeError> {
        let payload = self.rpc.call("captureSection", serde_json::json!({})).await?;
        Self::decode_frame(payload)
    }

    async fn display_frame(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<RasterFrame, BridgeError> {
        let params = serde_json::to_value(constraints)
            .map_err(|err| BridgeError::Transport(err.to_string()))?;
        let payload = self.rpc.call("captureDisplayFrame", params).await?;
        Self::decode_frame(payload)
    }

    async fn element_stream(&self) -> Result<Box<dyn MediaStream>, BridgeError> {
        self.open_stream("openElementStream", serde_json::json!({}))
            .await
    }

    async fn display_stream(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<Box<dyn MediaStream>, BridgeError> {
        let params = serde_json::to_value(constraints)
            .map_err(|err| BridgeError::Transport(err.to_string()))?;
        self.open_stream("openDisplayStream", params).await
    }
}

/// A media stream living in the webview, addressed by id
struct WebviewMediaStream {
    rpc: Arc<Rpc>,
    streams: Arc<Mutex<HashMap<Uuid, mpsc::Sender<EncoderEvent>>>>,
    stream_id: Uuid,
    supported: Vec<String>,
}

#[async_trait]
impl MediaStream for WebviewMediaStream {
    fn supports_mime(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|mime| mime == mime_type)
    }

    async fn start_encoder(
        &mut self,
        mime_type: &str,
        options: &EncoderOptions,
    ) -> Result<mpsc::Receiver<EncoderEvent>, BridgeError> {
        let (tx, rx) = mpsc::channel(32);
        self.streams.lock().insert(self.stream_id, tx);

        let params = serde_json::json!({
            "streamId": self.stream_id,
            "mimeType": mime_type,
            "timesliceMs": options.timeslice.as_millis() as u64,
            "videoBitsPerSecond": options.video_bits_per_second,
        });

        if let Err(err) = self.rpc.call("startEncoder", params).await {
            self.streams.lock().remove(&self.stream_id);
            return Err(err);
        }
        Ok(rx)
    }

    async fn stop_encoder(&mut self) -> Result<(), BridgeError> {
        self.rpc
            .call(
                "stopEncoder",
                serde_json::json!({ "streamId": self.stream_id }),
            )
            .await
            .map(|_| ())
    }

    async fn release(&mut self) {
        if let Err(err) = self
            .rpc
            .call(
                "releaseStream",
                serde_json::json!({ "streamId": self.stream_id }),
            )
            .await
        {
            tracing::warn!(stream_id = %self.stream_id, "failed to release stream: {err}");
        }
        self.streams.lock().remove(&self.stream_id);
    }
}
