//! Baby Monitor - a hybrid nursery dashboard.
//!
//! This is the main library crate for the Baby Monitor application. It
//! provides the Tauri application setup and all backend functionality: the
//! live feed resolver, still capture, recording, export, nursery metrics
//! and the webview bridge.

pub mod analytics;
pub mod bridge;
pub mod capture;
pub mod commands;
pub mod export;
pub mod live;
pub mod monitor;
pub mod notify;
pub mod recorder;
pub mod utils;

use analytics::{Analytics, WebviewSink};
use bridge::webview::{WebviewBridgeState, WebviewMediaBridge};
use bridge::MediaBridge;
use capture::CaptureController;
use commands::capture::{CaptureState, RecorderState};
use commands::live::LiveFeedState;
use commands::system::AppShellState;
use commands::Services;
use export::Exporter;
use live::player::WebviewPlayer;
use live::resolver::LIVE_STATE_EVENT;
use live::{FirestoreConfig, FirestoreStore, LiveSourceResolver};
use monitor::MonitorState;
use notify::NoticeCenter;
use recorder::RecordingController;
use std::sync::Arc;
use tauri::{Emitter, Manager};
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the application
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baby_monitor=debug,tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Baby Monitor v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            // Capture commands
            commands::capture::take_photo,
            commands::capture::start_recording,
            commands::capture::stop_recording,
            commands::capture::get_recording_state,
            commands::capture::get_recording_duration,
            // Live feed commands
            commands::live::start_live_feed,
            commands::live::retry_video_feed,
            commands::live::dispose_live_feed,
            commands::live::get_presentation_state,
            commands::live::report_playback_event,
            // Shell commands
            commands::system::get_device_info,
            commands::system::get_metrics,
            commands::system::refresh_metrics,
            commands::system::switch_tab,
            commands::system::set_fullscreen,
            commands::system::back_pressed,
            // Webview bridge plumbing
            bridge::webview::bridge_response,
            bridge::webview::bridge_stream_event,
        ])
        .setup(|app| {
            let handle = app.handle().clone();

            // Webview media bridge
            let bridge_state = WebviewBridgeState::default();
            let media_bridge: Arc<dyn MediaBridge> =
                Arc::new(WebviewMediaBridge::new(handle.clone(), &bridge_state));
            app.manage(bridge_state);

            // Shared services
            let notices = NoticeCenter::new();
            let analytics = Analytics::new(Arc::new(WebviewSink::new(handle.clone())));
            let exporter = match Exporter::new(None) {
                Ok(exporter) => exporter,
                Err(err) => {
                    tracing::warn!("no download directory: {err}; exporting to temp dir");
                    Exporter::new(Some(std::env::temp_dir()))?
                }
            };
            app.manage(Services {
                exporter,
                analytics: analytics.clone(),
                notices: notices.clone(),
            });

            // Capture and recording
            app.manage(CaptureState {
                controller: CaptureController::new(media_bridge.clone()),
            });
            app.manage(RecorderState {
                controller: Arc::new(Mutex::new(RecordingController::new(media_bridge))),
            });

            // Live feed
            let player = Arc::new(WebviewPlayer::new(handle.clone()));
            let store = Arc::new(FirestoreStore::new(FirestoreConfig::from_env()));
            let resolver =
                LiveSourceResolver::new(store, player.clone(), analytics, notices.clone());

            // Forward presentation-state changes to the dashboard
            let mut presentation = resolver.watch();
            let emitter = handle.clone();
            tauri::async_runtime::spawn(async move {
                while presentation.changed().await.is_ok() {
                    let state = *presentation.borrow();
                    if let Err(err) = emitter.emit(LIVE_STATE_EVENT, state) {
                        tracing::warn!("failed to publish presentation state: {err}");
                    }
                }
            });

            // Forward notices to the dashboard toast
            let mut notice_feed = notices.subscribe();
            let emitter = handle.clone();
            tauri::async_runtime::spawn(async move {
                while notice_feed.changed().await.is_ok() {
                    let notice = notice_feed.borrow().clone();
                    if let Some(notice) = notice {
                        if let Err(err) = emitter.emit(notify::NOTICE_EVENT, &notice) {
                            tracing::warn!("failed to publish notice: {err}");
                        }
                    }
                }
            });

            let resolver = Arc::new(Mutex::new(resolver));
            app.manage(LiveFeedState {
                resolver: resolver.clone(),
                player,
            });

            // Bind the feed as soon as the app is up
            tauri::async_runtime::spawn(async move {
                if let Err(err) = resolver.lock().await.start().await {
                    tracing::error!("live feed failed to start: {err}");
                }
            });

            // Nursery metrics simulation
            let monitor = MonitorState::new();
            app.manage(monitor.clone());
            let emitter = handle.clone();
            tauri::async_runtime::spawn(monitor::run_simulation(monitor, move |metrics| {
                if let Err(err) = emitter.emit(monitor::METRICS_EVENT, &metrics) {
                    tracing::warn!("failed to publish metrics: {err}");
                }
            }));

            app.manage(AppShellState::default());
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
