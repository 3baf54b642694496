//! App shell commands
//!
//! Device information, dashboard metrics, navigation and back-button
//! policy: the chrome around the monitor itself.

use crate::monitor::{MonitorState, NurseryMetrics};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tauri::State;
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons};
use tokio::sync::oneshot;

use super::Services;

/// Bottom-bar navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Dashboard,
    Activity,
    Alerts,
    Settings,
}

impl Default for Tab {
    fn default() -> Self {
        Tab::Dashboard
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tab::Dashboard => "Dashboard",
            Tab::Activity => "Activity",
            Tab::Alerts => "Alerts",
            Tab::Settings => "Settings",
        };
        write!(f, "{name}")
    }
}

/// Navigation and chrome state
#[derive(Default)]
pub struct AppShellState {
    tab: RwLock<Tab>,
    fullscreen: AtomicBool,
}

impl AppShellState {
    pub fn tab(&self) -> Tab {
        *self.tab.read()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }
}

/// Device information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: String,
    pub arch: String,
    pub app_version: String,
}

/// Get basic device information
#[tauri::command]
pub async fn get_device_info() -> Result<DeviceInfo, String> {
    Ok(DeviceInfo {
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current nursery metrics snapshot
#[tauri::command]
pub fn get_metrics(monitor: State<'_, MonitorState>) -> NurseryMetrics {
    monitor.snapshot()
}

/// Pull-to-refresh: re-step the simulated sensors
#[tauri::command]
pub fn refresh_metrics(
    monitor: State<'_, MonitorState>,
    services: State<'_, Services>,
) -> NurseryMetrics {
    let metrics = monitor.refresh();
    services.notices.post("Data refreshed");
    metrics
}

/// Switch the active navigation tab
#[tauri::command]
pub fn switch_tab(
    shell: State<'_, AppShellState>,
    services: State<'_, Services>,
    tab: Tab,
) -> Tab {
    *shell.tab.write() = tab;
    tracing::debug!(%tab, "navigated");
    services.notices.post(format!("Switched to {tab}"));
    tab
}

/// Toggle camera-section fullscreen
#[tauri::command]
pub fn set_fullscreen(
    shell: State<'_, AppShellState>,
    services: State<'_, Services>,
    enabled: bool,
) -> bool {
    shell.fullscreen.store(enabled, Ordering::SeqCst);
    services.notices.post(if enabled {
        "Fullscreen mode"
    } else {
        "Exited fullscreen"
    });
    enabled
}

/// What the back button did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum BackAction {
    ExitedFullscreen,
    WentToDashboard,
    Exiting,
    Stayed,
}

enum BackDecision {
    ExitFullscreen,
    GoToDashboard,
    ConfirmExit,
}

fn back_policy(fullscreen: bool, tab: Tab) -> BackDecision {
    if fullscreen {
        BackDecision::ExitFullscreen
    } else if tab != Tab::Dashboard {
        BackDecision::GoToDashboard
    } else {
        BackDecision::ConfirmExit
    }
}

/// Hardware back button: leave fullscreen first, then return to the
/// dashboard, and only then offer to exit the app.
#[tauri::command]
pub async fn back_pressed(
    app: tauri::AppHandle,
    shell: State<'_, AppShellState>,
    services: State<'_, Services>,
) -> Result<BackAction, String> {
    match back_policy(shell.is_fullscreen(), shell.tab()) {
        BackDecision::ExitFullscreen => {
            shell.fullscreen.store(false, Ordering::SeqCst);
            services.notices.post("Exited fullscreen");
            Ok(BackAction::ExitedFullscreen)
        }
        BackDecision::GoToDashboard => {
            *shell.tab.write() = Tab::Dashboard;
            services.notices.post("Switched to Dashboard");
            Ok(BackAction::WentToDashboard)
        }
        BackDecision::ConfirmExit => {
            let (confirm_tx, confirm_rx) = oneshot::channel();
            app.dialog()
                .message("Are you sure you want to exit Baby Monitor?")
                .title("Exit App")
                .buttons(MessageDialogButtons::YesNo)
                .show(move |confirmed| {
                    let _ = confirm_tx.send(confirmed);
                });

            if confirm_rx.await.unwrap_or(false) {
                tracing::info!("exiting on user confirmation");
                app.exit(0);
                Ok(BackAction::Exiting)
            } else {
                Ok(BackAction::Stayed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_leaves_fullscreen_before_anything_else() {
        assert!(matches!(
            back_policy(true, Tab::Settings),
            BackDecision::ExitFullscreen
        ));
    }

    #[test]
    fn back_returns_to_dashboard_from_other_tabs() {
        assert!(matches!(
            back_policy(false, Tab::Alerts),
            BackDecision::GoToDashboard
        ));
    }

    #[test]
    fn back_on_dashboard_asks_to_exit() {
        assert!(matches!(
            back_policy(false, Tab::Dashboard),
            BackDecision::ConfirmExit
        ));
    }
}
