//! Transient user notices
//!
//! A single-slot channel: a new notice immediately supersedes any
//! still-visible one. Notices never queue.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Event channel the frontend listens on for notices
pub const NOTICE_EVENT: &str = "notice://show";

/// A transient user-facing message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub message: String,
    pub posted_at: DateTime<Utc>,
}

/// Posts and publishes the single active notice
#[derive(Clone)]
pub struct NoticeCenter {
    slot: Arc<watch::Sender<Option<Notice>>>,
}

impl NoticeCenter {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot: Arc::new(slot) }
    }

    /// Post a notice, replacing whatever is currently visible.
    pub fn post(&self, message: impl Into<String>) {
        let notice = Notice {
            message: message.into(),
            posted_at: Utc::now(),
        };
        tracing::debug!(message = %notice.message, "notice posted");
        self.slot.send_replace(Some(notice));
    }

    /// Subscribe to notice changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.slot.subscribe()
    }

    /// The currently visible notice, if any
    pub fn current(&self) -> Option<Notice> {
        self.slot.borrow().clone()
    }
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_new_notice_supersedes_the_old_one() {
        let notices = NoticeCenter::new();
        notices.post("Recording started");
        notices.post("Recording stopped");

        assert_eq!(notices.current().unwrap().message, "Recording stopped");
    }

    #[tokio::test]
    async fn subscribers_only_see_the_latest() {
        let notices = NoticeCenter::new();
        let mut rx = notices.subscribe();

        notices.post("first");
        notices.post("second");

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().message, "second");
    }
}
