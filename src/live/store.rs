//! Remote document store
//!
//! The monitor's live-video URL lives in a single remote document. The store
//! exposes a subscribe-with-callback primitive that delivers the full
//! document on every observed change, plus an error channel for transport
//! failures. The concrete implementation watches a Firestore document over
//! its REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Document field carrying the live-video URL
pub const VIDEO_URL_FIELD: &str = "video-url";

/// Store errors surfaced when establishing a subscription
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("subscription failed: {0}")]
    Subscription(String),
}

/// Events delivered by an active subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The document exists; `video_url` is its configured URL, if any
    Snapshot { video_url: Option<String> },
    /// The document does not exist
    Missing,
    /// The subscription transport failed
    Error(String),
}

/// Releases the remote listener when dropped; `unsubscribe` may also be
/// called explicitly and is idempotent.
pub struct SubscriptionGuard {
    cancel: Option<oneshot::Sender<()>>,
}

impl SubscriptionGuard {
    pub fn new(cancel: oneshot::Sender<()>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            tracing::debug!("document subscription released");
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// An established subscription: the event stream plus its release guard
pub struct Subscription {
    pub events: mpsc::Receiver<DocumentEvent>,
    pub guard: SubscriptionGuard,
}

/// Subscribe-with-callback primitive over the remote document
#[async_trait]
pub trait LiveDocumentStore: Send + Sync {
    async fn subscribe(&self) -> Result<Subscription, StoreError>;
}

/// Firestore watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreConfig {
    pub project_id: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_document")]
    pub document: String,

    /// How often the document is re-read, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_collection() -> String {
    "app-data".to_string()
}

fn default_document() -> String {
    "HtWNpeUV3eKivGBEZpLi".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl FirestoreConfig {
    /// Configuration from the environment, with packaged defaults
    pub fn from_env() -> Self {
        Self {
            project_id: std::env::var("BABY_MONITOR_FIREBASE_PROJECT")
                .unwrap_or_else(|_| "baby-monitor".to_string()),
            collection: std::env::var("BABY_MONITOR_FIRESTORE_COLLECTION")
                .unwrap_or_else(|_| default_collection()),
            document: std::env::var("BABY_MONITOR_FIRESTORE_DOCUMENT")
                .unwrap_or_else(|_| default_document()),
            poll_interval_secs: default_poll_interval_secs(),
            api_key: std::env::var("BABY_MONITOR_FIREBASE_API_KEY").ok(),
        }
    }

    fn document_url(&self) -> String {
        let mut url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/{}/{}",
            self.project_id, self.collection, self.document
        );
        if let Some(key) = &self.api_key {
            url.push_str("?key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }
}

/// Firestore-backed document store
pub struct FirestoreStore {
    config: FirestoreConfig,
    client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

#[async_trait]
impl LiveDocumentStore for FirestoreStore {
    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        let url = self.config.document_url();
        let client = self.client.clone();
        let interval = Duration::from_secs(self.config.poll_interval_secs.max(1));

        tracing::info!(
            collection = %self.config.collection,
            document = %self.config.document,
            "subscribing to live-source document"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<PollDigest> = None;

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        tracing::debug!("document watch cancelled");
                        return;
                    }
                    _ = ticker.tick() => {
                        let (digest, event) = match fetch_document(&client, &url).await {
                            Ok(Some(document)) => (
                                PollDigest::Document(document.update_time.clone()),
                                DocumentEvent::Snapshot { video_url: document.video_url() },
                            ),
                            Ok(None) => (PollDigest::Missing, DocumentEvent::Missing),
                            Err(err) => (PollDigest::Failed, DocumentEvent::Error(err)),
                        };

                        // Re-deliver only on change, like a snapshot listener.
                        if last.as_ref() == Some(&digest) {
                            continue;
                        }
                        last = Some(digest);

                        if events_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(Subscription {
            events: events_rx,
            guard: SubscriptionGuard::new(cancel_tx),
        })
    }
}

#[derive(PartialEq, Eq)]
enum PollDigest {
    Document(String),
    Missing,
    Failed,
}

/// Wire shape of a Firestore document resource
#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,

    #[serde(rename = "updateTime", default)]
    update_time: String,
}

#[derive(Debug, Deserialize)]
struct FirestoreValue {
    #[serde(rename = "stringValue")]
    string_value: Option<String>,
}

impl FirestoreDocument {
    /// The configured video URL; empty strings count as absent.
    fn video_url(&self) -> Option<String> {
        self.fields
            .get(VIDEO_URL_FIELD)
            .and_then(|value| value.string_value.clone())
            .filter(|url| !url.is_empty())
    }
}

async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<FirestoreDocument>, String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| format!("document read failed: {err}"))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(format!("document read failed: HTTP {}", response.status()));
    }

    let document = response
        .json::<FirestoreDocument>()
        .await
        .map_err(|err| format!("document parse failed: {err}"))?;
    Ok(Some(document))
}
