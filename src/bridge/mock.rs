//! In-memory bridge fakes shared by controller tests

use super::{
    BridgeError, DisplayConstraints, EncoderEvent, EncoderOptions, MediaBridge, MediaStream,
    RasterFrame,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) fn unavailable() -> Result<RasterFrame, BridgeError> {
    Err(BridgeError::SourceUnavailable("not configured".into()))
}

/// Scriptable `MediaBridge` recording how often each primitive was tried
#[derive(Default)]
pub(crate) struct MockBridge {
    pub video_frame: Mutex<Option<Result<RasterFrame, BridgeError>>>,
    pub section: Mutex<Option<Result<RasterFrame, BridgeError>>>,
    pub display: Mutex<Option<Result<RasterFrame, BridgeError>>>,
    pub element_stream: Mutex<Option<MockStream>>,
    pub display_stream: Mutex<Option<MockStream>>,
    pub video_frame_calls: AtomicUsize,
    pub section_calls: AtomicUsize,
    pub display_calls: AtomicUsize,
}

impl MockBridge {
    fn take_frame(
        slot: &Mutex<Option<Result<RasterFrame, BridgeError>>>,
        calls: &AtomicUsize,
    ) -> Result<RasterFrame, BridgeError> {
        calls.fetch_add(1, Ordering::SeqCst);
        slot.lock().take().unwrap_or_else(unavailable)
    }
}

#[async_trait]
impl MediaBridge for MockBridge {
    async fn video_frame(&self) -> Result<RasterFrame, BridgeError> {
        Self::take_frame(&self.video_frame, &self.video_frame_calls)
    }

    async fn render_section(&self) -> Result<RasterFrame, BridgeError> {
        Self::take_frame(&self.section, &self.section_calls)
    }

    async fn display_frame(
        &self,
        _constraints: &DisplayConstraints,
    ) -> Result<RasterFrame, BridgeError> {
        Self::take_frame(&self.display, &self.display_calls)
    }

    async fn element_stream(&self) -> Result<Box<dyn MediaStream>, BridgeError> {
        match self.element_stream.lock().take() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(BridgeError::SourceUnavailable("no element stream".into())),
        }
    }

    async fn display_stream(
        &self,
        _constraints: &DisplayConstraints,
    ) -> Result<Box<dyn MediaStream>, BridgeError> {
        match self.display_stream.lock().take() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(BridgeError::SourceUnavailable("no display stream".into())),
        }
    }
}

/// Handle a test keeps to feed encoder events and observe the stream
#[derive(Default)]
pub(crate) struct MockStreamHandle {
    pub events: Mutex<Option<mpsc::Sender<EncoderEvent>>>,
    pub released: AtomicBool,
    pub stop_requested: AtomicBool,
}

impl MockStreamHandle {
    pub async fn push(&self, event: EncoderEvent) {
        let tx = self.events.lock().clone();
        if let Some(tx) = tx {
            tx.send(event).await.expect("pump dropped event channel");
        }
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Scriptable `MediaStream`
pub(crate) struct MockStream {
    pub supported: Vec<String>,
    pub handle: Arc<MockStreamHandle>,
    /// Emit `Finished` automatically when the encoder is stopped
    pub finish_on_stop: bool,
}

impl MockStream {
    pub fn new(supported: &[&str]) -> (Self, Arc<MockStreamHandle>) {
        let handle = Arc::new(MockStreamHandle::default());
        let stream = Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            handle: handle.clone(),
            finish_on_stop: true,
        };
        (stream, handle)
    }
}

#[async_trait]
impl MediaStream for MockStream {
    fn supports_mime(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|mime| mime == mime_type)
    }

    async fn start_encoder(
        &mut self,
        _mime_type: &str,
        _options: &EncoderOptions,
    ) -> Result<mpsc::Receiver<EncoderEvent>, BridgeError> {
        let (tx, rx) = mpsc::channel(32);
        *self.handle.events.lock() = Some(tx);
        Ok(rx)
    }

    async fn stop_encoder(&mut self) -> Result<(), BridgeError> {
        self.handle.stop_requested.store(true, Ordering::SeqCst);
        if self.finish_on_stop {
            self.handle.push(EncoderEvent::Finished).await;
        }
        Ok(())
    }

    async fn release(&mut self) {
        self.handle.released.store(true, Ordering::SeqCst);
        *self.handle.events.lock() = None;
    }
}
