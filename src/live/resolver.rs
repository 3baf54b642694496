//! Live source resolver
//!
//! Folds the remote document subscription and the player's health signals
//! into a single presentation state. One event-driven task per running
//! resolver; every event runs to completion before the next is processed.

use super::player::{Player, PlayerEvent};
use super::store::{DocumentEvent, LiveDocumentStore, StoreError, Subscription};
use crate::analytics::{Analytics, AnalyticsEvent};
use crate::notify::NoticeCenter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// How long a bound source may take to signal readiness before the feed
/// degrades to the placeholder
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Event channel the frontend listens on for presentation-state changes
pub const LIVE_STATE_EVENT: &str = "live://state";

/// The single active presentation of the live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationState {
    /// A source is being resolved or loaded
    Loading,
    /// The bound source is playing
    Video,
    /// No usable source; the static placeholder is shown
    Fallback,
    /// The control channel failed (document missing or subscription error)
    Error,
}

struct RunningFeed {
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

pub struct LiveSourceResolver {
    store: Arc<dyn LiveDocumentStore>,
    player: Arc<dyn Player>,
    analytics: Analytics,
    notices: NoticeCenter,
    state: watch::Sender<PresentationState>,
    running: Option<RunningFeed>,
}

impl LiveSourceResolver {
    pub fn new(
        store: Arc<dyn LiveDocumentStore>,
        player: Arc<dyn Player>,
        analytics: Analytics,
        notices: NoticeCenter,
    ) -> Self {
        let (state, _) = watch::channel(PresentationState::Loading);
        Self {
            store,
            player,
            analytics,
            notices,
            state,
            running: None,
        }
    }

    /// Subscribe to the remote document and start resolving.
    ///
    /// A resolver that is already running is fully disposed first so the
    /// previous remote listener cannot keep mutating freed state.
    pub async fn start(&mut self) -> Result<(), StoreError> {
        if self.running.is_some() {
            self.dispose().await;
        }

        self.state.send_replace(PresentationState::Loading);

        let subscription = match self.store.subscribe().await {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::error!("failed to subscribe to live source: {err}");
                self.state.send_replace(PresentationState::Error);
                return Err(err);
            }
        };

        let player_events = self.player.events();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = FeedTask {
            player: self.player.clone(),
            analytics: self.analytics.clone(),
            notices: self.notices.clone(),
            state: self.state.clone(),
        };
        let handle = tokio::spawn(run(task, subscription, player_events, shutdown_rx));

        self.running = Some(RunningFeed {
            shutdown: shutdown_tx,
            task: handle,
        });
        Ok(())
    }

    /// Tear down the subscription and the bound source.
    ///
    /// Idempotent: a second call is a no-op. Callable from any state.
    pub async fn dispose(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if let Err(err) = running.task.await {
            tracing::warn!("live feed task aborted: {err}");
        }
    }

    /// Watch presentation-state changes
    pub fn watch(&self) -> watch::Receiver<PresentationState> {
        self.state.subscribe()
    }

    /// The currently active presentation state
    pub fn current(&self) -> PresentationState {
        *self.state.borrow()
    }
}

struct FeedTask {
    player: Arc<dyn Player>,
    analytics: Analytics,
    notices: NoticeCenter,
    state: watch::Sender<PresentationState>,
}

impl FeedTask {
    fn set_state(&self, next: PresentationState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = ?*current, to = ?next, "presentation state changed");
            *current = next;
            true
        });
    }

    async fn handle_document_event(
        &self,
        event: DocumentEvent,
        bound_url: &mut Option<String>,
        bind_generation: &mut u64,
        ready: &mut bool,
        timer: &mpsc::Sender<u64>,
    ) {
        match event {
            DocumentEvent::Snapshot {
                video_url: Some(url),
            } => {
                if bound_url.as_deref() == Some(url.as_str()) {
                    // Same source; no redundant teardown and rebind.
                    return;
                }
                tracing::info!(%url, "live source changed; rebinding");
                self.player.clear().await;
                *bound_url = Some(url.clone());
                *bind_generation += 1;
                *ready = false;
                self.set_state(PresentationState::Loading);

                if let Err(err) = self.player.bind(&url).await {
                    tracing::warn!("failed to bind video source: {err}");
                    self.analytics.track(AnalyticsEvent::VideoError {
                        error_code: "BIND_FAILED".to_string(),
                        error_message: err,
                        video_url: url,
                    });
                    self.set_state(PresentationState::Fallback);
                    self.notices
                        .post("Video feed unavailable, showing placeholder");
                    return;
                }

                // One-shot readiness timer for this bind; a stale generation
                // is ignored when it fires.
                let generation = *bind_generation;
                let timer = timer.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(READINESS_TIMEOUT).await;
                    let _ = timer.send(generation).await;
                });
            }
            DocumentEvent::Snapshot { video_url: None } => {
                tracing::warn!("no video source configured");
                self.set_state(PresentationState::Fallback);
            }
            DocumentEvent::Missing => {
                tracing::warn!("live-source document does not exist");
                self.set_state(PresentationState::Error);
            }
            DocumentEvent::Error(message) => {
                tracing::error!("live-source subscription error: {message}");
                self.set_state(PresentationState::Error);
            }
        }
    }

    fn handle_player_event(
        &self,
        event: PlayerEvent,
        bound_url: &Option<String>,
        ready: &mut bool,
    ) {
        match event {
            PlayerEvent::Ready => {
                *ready = true;
                self.set_state(PresentationState::Video);
                self.analytics.track(AnalyticsEvent::VideoFeedLoaded {
                    video_url: bound_url.clone().unwrap_or_default(),
                });
            }
            PlayerEvent::Failed { code, message } => {
                // A broken feed degrades to the placeholder; Error is
                // reserved for the control channel.
                tracing::warn!(%code, "video playback failed: {message}");
                self.analytics.track(AnalyticsEvent::VideoError {
                    error_code: code,
                    error_message: message.clone(),
                    video_url: bound_url.clone().unwrap_or_else(|| "unknown".to_string()),
                });
                self.set_state(PresentationState::Fallback);
                self.notices.post(format!("{message}, showing placeholder"));
            }
        }
    }
}

async fn run(
    task: FeedTask,
    mut subscription: Subscription,
    mut player_events: broadcast::Receiver<PlayerEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut bound_url: Option<String> = None;
    let mut bind_generation: u64 = 0;
    let mut ready = false;
    let (timer_tx, mut timer_rx) = mpsc::channel::<u64>(4);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = subscription.events.recv() => match event {
                Some(event) => {
                    task.handle_document_event(
                        event,
                        &mut bound_url,
                        &mut bind_generation,
                        &mut ready,
                        &timer_tx,
                    )
                    .await;
                }
                None => {
                    tracing::error!("live-source subscription ended");
                    task.set_state(PresentationState::Error);
                    break;
                }
            },
            event = player_events.recv() => match event {
                Ok(event) => task.handle_player_event(event, &bound_url, &mut ready),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "playback events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(generation) = timer_rx.recv() => {
                if generation == bind_generation && !ready {
                    tracing::warn!("video source not ready in time; falling back");
                    task.set_state(PresentationState::Fallback);
                    task.notices
                        .post("Video loading timeout, showing placeholder");
                }
            }
        }
    }

    subscription.guard.unsubscribe();
    task.player.clear().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::store::SubscriptionGuard;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockStore {
        subscriptions: Mutex<Vec<Subscription>>,
    }

    #[async_trait]
    impl LiveDocumentStore for MockStore {
        async fn subscribe(&self) -> Result<Subscription, StoreError> {
            self.subscriptions
                .lock()
                .pop()
                .ok_or_else(|| StoreError::Subscription("store offline".to_string()))
        }
    }

    struct MockPlayer {
        binds: Mutex<Vec<String>>,
        clears: AtomicUsize,
        events: broadcast::Sender<PlayerEvent>,
    }

    impl MockPlayer {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                binds: Mutex::new(Vec::new()),
                clears: AtomicUsize::new(0),
                events,
            })
        }

        fn ready(&self) {
            let _ = self.events.send(PlayerEvent::Ready);
        }

        fn fail(&self, code: &str, message: &str) {
            let _ = self.events.send(PlayerEvent::Failed {
                code: code.to_string(),
                message: message.to_string(),
            });
        }
    }

    #[async_trait]
    impl Player for MockPlayer {
        async fn bind(&self, url: &str) -> Result<(), String> {
            self.binds.lock().push(url.to_string());
            Ok(())
        }

        async fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }

        fn events(&self) -> broadcast::Receiver<PlayerEvent> {
            self.events.subscribe()
        }
    }

    struct Feed {
        resolver: LiveSourceResolver,
        player: Arc<MockPlayer>,
        documents: mpsc::Sender<DocumentEvent>,
        cancelled: oneshot::Receiver<()>,
        notices: NoticeCenter,
    }

    fn feed() -> Feed {
        let (documents, events) = mpsc::channel(16);
        let (cancel_tx, cancelled) = oneshot::channel();
        let subscription = Subscription {
            events,
            guard: SubscriptionGuard::new(cancel_tx),
        };
        let store = Arc::new(MockStore {
            subscriptions: Mutex::new(vec![subscription]),
        });
        let player = MockPlayer::new();
        let notices = NoticeCenter::new();
        let resolver = LiveSourceResolver::new(
            store,
            player.clone(),
            Analytics::noop(),
            notices.clone(),
        );
        Feed {
            resolver,
            player,
            documents,
            cancelled,
            notices,
        }
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    fn snapshot(url: &str) -> DocumentEvent {
        DocumentEvent::Snapshot {
            video_url: Some(url.to_string()),
        }
    }

    const NO_URL: DocumentEvent = DocumentEvent::Snapshot { video_url: None };

    #[tokio::test]
    async fn resolver_starts_in_loading() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();
        assert_eq!(feed.resolver.current(), PresentationState::Loading);
        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn url_binds_once_and_ready_reaches_video() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Loading);

        feed.player.ready();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        // The same URL again is a no-op update: no teardown, no rebind.
        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;
        assert_eq!(feed.player.binds.lock().len(), 1);
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn new_url_tears_down_and_rebinds() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;
        feed.player.ready();
        settle().await;

        feed.documents.send(snapshot("http://b/video")).await.unwrap();
        settle().await;

        assert_eq!(
            *feed.player.binds.lock(),
            vec!["http://a/video".to_string(), "http://b/video".to_string()]
        );
        assert!(feed.player.clears.load(Ordering::SeqCst) >= 2);
        assert_eq!(feed.resolver.current(), PresentationState::Loading);

        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn empty_url_falls_back_regardless_of_prior_state() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;
        feed.player.ready();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        feed.documents.send(NO_URL).await.unwrap();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Fallback);

        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn missing_document_errors_but_error_is_not_sticky() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(DocumentEvent::Missing).await.unwrap();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Error);

        feed.documents.send(NO_URL).await.unwrap();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Fallback);

        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn subscription_transport_error_reaches_error_state() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents
            .send(DocumentEvent::Error("connection reset".to_string()))
            .await
            .unwrap();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Error);

        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn playback_failure_degrades_to_fallback_never_error() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;
        feed.player.ready();
        settle().await;

        feed.player.fail("NETWORK", "Network error loading video");
        settle().await;

        assert_eq!(feed.resolver.current(), PresentationState::Fallback);
        assert!(feed
            .notices
            .current()
            .unwrap()
            .message
            .contains("showing placeholder"));

        feed.resolver.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_timeout_degrades_to_fallback() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;

        tokio::time::advance(READINESS_TIMEOUT + Duration::from_millis(10)).await;
        settle().await;

        assert_eq!(feed.resolver.current(), PresentationState::Fallback);
        assert!(feed
            .notices
            .current()
            .unwrap()
            .message
            .contains("timeout"));

        feed.resolver.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rebinding_disarms_the_previous_readiness_timer() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;

        feed.documents.send(snapshot("http://b/video")).await.unwrap();
        settle().await;
        feed.player.ready();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        // The first bind's timer fires now; it must be ignored.
        tokio::time::advance(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        // The second bind's timer fires after readiness; also ignored.
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        feed.resolver.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn late_readiness_recovers_from_timeout_fallback() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;

        tokio::time::advance(READINESS_TIMEOUT + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Fallback);

        feed.player.ready();
        settle().await;
        assert_eq!(feed.resolver.current(), PresentationState::Video);

        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_releases_the_subscription() {
        let mut feed = feed();
        feed.resolver.start().await.unwrap();

        feed.documents.send(snapshot("http://a/video")).await.unwrap();
        settle().await;

        feed.resolver.dispose().await;
        assert!(feed.cancelled.try_recv().is_ok());
        assert!(feed.player.clears.load(Ordering::SeqCst) >= 1);

        // Second call is a no-op, not an error.
        feed.resolver.dispose().await;
    }

    #[tokio::test]
    async fn restart_disposes_the_previous_subscription_first() {
        let (documents_a, events_a) = mpsc::channel(16);
        let (cancel_a, mut cancelled_a) = oneshot::channel();
        let (_documents_b, events_b) = mpsc::channel(16);
        let (cancel_b, _cancelled_b) = oneshot::channel();

        // Popped back-to-front.
        let store = Arc::new(MockStore {
            subscriptions: Mutex::new(vec![
                Subscription {
                    events: events_b,
                    guard: SubscriptionGuard::new(cancel_b),
                },
                Subscription {
                    events: events_a,
                    guard: SubscriptionGuard::new(cancel_a),
                },
            ]),
        });
        let player = MockPlayer::new();
        let mut resolver = LiveSourceResolver::new(
            store,
            player.clone(),
            Analytics::noop(),
            NoticeCenter::new(),
        );

        resolver.start().await.unwrap();
        documents_a.send(snapshot("http://a/video")).await.unwrap();
        settle().await;

        resolver.start().await.unwrap();
        assert!(cancelled_a.try_recv().is_ok());

        resolver.dispose().await;
    }

    #[tokio::test]
    async fn failed_subscribe_surfaces_error_state() {
        let store = Arc::new(MockStore {
            subscriptions: Mutex::new(Vec::new()),
        });
        let player = MockPlayer::new();
        let mut resolver = LiveSourceResolver::new(
            store,
            player,
            Analytics::noop(),
            NoticeCenter::new(),
        );

        assert!(resolver.start().await.is_err());
        assert_eq!(resolver.current(), PresentationState::Error);
    }
}
