//! Live feed commands

use crate::live::player::WebviewPlayer;
use crate::live::{LiveSourceResolver, PlayerEvent, PresentationState};
use crate::utils::error::{AppError, ErrorResponse};
use serde::Deserialize;
use std::sync::Arc;
use tauri::State;
use tokio::sync::Mutex;

/// Application state for the live feed
pub struct LiveFeedState {
    pub resolver: Arc<Mutex<LiveSourceResolver>>,
    pub player: Arc<WebviewPlayer>,
}

/// Subscribe to the remote live-source document and start resolving
#[tauri::command]
pub async fn start_live_feed(state: State<'_, LiveFeedState>) -> Result<(), ErrorResponse> {
    let mut resolver = state.resolver.lock().await;
    resolver
        .start()
        .await
        .map_err(|err| ErrorResponse::from(AppError::from(err)))
}

/// Manually retry loading the video feed
#[tauri::command]
pub async fn retry_video_feed(state: State<'_, LiveFeedState>) -> Result<(), ErrorResponse> {
    let mut resolver = state.resolver.lock().await;
    resolver
        .start()
        .await
        .map_err(|err| ErrorResponse::from(AppError::from(err)))
}

/// Tear down the subscription and the bound source
#[tauri::command]
pub async fn dispose_live_feed(state: State<'_, LiveFeedState>) -> Result<(), ErrorResponse> {
    let mut resolver = state.resolver.lock().await;
    resolver.dispose().await;
    Ok(())
}

/// The currently active presentation state
#[tauri::command]
pub async fn get_presentation_state(
    state: State<'_, LiveFeedState>,
) -> Result<PresentationState, ErrorResponse> {
    let resolver = state.resolver.lock().await;
    Ok(resolver.current())
}

/// A media event observed by the webview's video surface
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlaybackEventPayload {
    /// The source can begin playback
    Ready,
    /// The source failed to load or play
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },
}

/// Report a playback event from the video surface
#[tauri::command]
pub fn report_playback_event(state: State<'_, LiveFeedState>, event: PlaybackEventPayload) {
    let event = match event {
        PlaybackEventPayload::Ready => PlayerEvent::Ready,
        PlaybackEventPayload::Error { code, message } => PlayerEvent::Failed { code, message },
    };
    state.player.notify(event);
}
