//! Playback pipeline seam
//!
//! The resolver drives playback through this trait: bind a URL, clear the
//! source, and listen for readiness or failure. The webview implementation
//! forwards binds to the video surface and relays its media events back.

use async_trait::async_trait;
use serde::Serialize;
use tauri::Emitter;
use tokio::sync::broadcast;

/// Event channels the frontend video surface listens on
pub const PLAYER_BIND_EVENT: &str = "player://bind";
pub const PLAYER_CLEAR_EVENT: &str = "player://clear";

/// Playback-health signals
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// The bound source reports it can begin playback
    Ready,
    /// The bound source failed to load or play
    Failed { code: String, message: String },
}

/// A playback pipeline the resolver can bind and tear down
#[async_trait]
pub trait Player: Send + Sync {
    /// Bind a new source URL and begin loading it
    async fn bind(&self, url: &str) -> Result<(), String>;

    /// Stop playback and clear the bound source
    async fn clear(&self);

    /// Subscribe to playback-health events
    fn events(&self) -> broadcast::Receiver<PlayerEvent>;
}

/// Player backed by the webview's video surface
pub struct WebviewPlayer {
    app: tauri::AppHandle,
    events: broadcast::Sender<PlayerEvent>,
}

impl WebviewPlayer {
    pub fn new(app: tauri::AppHandle) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { app, events }
    }

    /// Feed a playback event reported by the webview
    pub fn notify(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct BindPayload<'a> {
    url: &'a str,
}

#[async_trait]
impl Player for WebviewPlayer {
    async fn bind(&self, url: &str) -> Result<(), String> {
        self.app
            .emit(PLAYER_BIND_EVENT, BindPayload { url })
            .map_err(|err| err.to_string())
    }

    async fn clear(&self) {
        if let Err(err) = self.app.emit(PLAYER_CLEAR_EVENT, ()) {
            tracing::warn!("failed to clear video surface: {err}");
        }
    }

    fn events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}
