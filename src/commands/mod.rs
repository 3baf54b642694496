//! Tauri command handlers
//!
//! This module contains all the IPC command handlers that can be called
//! from the frontend via Tauri's invoke system.

pub mod capture;
pub mod live;
pub mod system;

use crate::analytics::Analytics;
use crate::export::Exporter;
use crate::notify::NoticeCenter;

/// Service handles shared across command handlers
#[derive(Clone)]
pub struct Services {
    pub exporter: Exporter,
    pub analytics: Analytics,
    pub notices: NoticeCenter,
}
