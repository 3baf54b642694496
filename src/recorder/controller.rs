//! Recording controller
//!
//! Owns the {Idle, Recording} state machine. On start it resolves a media
//! stream (element output first, display capture as fallback), negotiates an
//! encoding, and hands the stream to a chunk pump task that accumulates
//! encoder output until stop. The stream is released on stop or on error,
//! never left attached after the session ends.

use super::encoding;
use super::state::{
    RecordingArtifact, RecordingError, RecordingOptions, RecordingState, StopOutcome, StreamSource,
};
use crate::bridge::{EncoderEvent, EncoderOptions, MediaBridge, MediaStream};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Events emitted while recording
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// Recording started with the negotiated mime type
    Started { mime_type: String },
    /// Recording stopped normally
    Stopped,
    /// A transport error terminated the recording
    Failed(String),
}

enum PumpCommand {
    Stop(oneshot::Sender<Vec<Vec<u8>>>),
}

struct ActiveSession {
    started_at: DateTime<Utc>,
    mime_type: String,
    source: StreamSource,
    commands: mpsc::Sender<PumpCommand>,
}

pub struct RecordingController {
    state: Arc<RwLock<RecordingState>>,
    session: Option<ActiveSession>,
    bridge: Arc<dyn MediaBridge>,
    events: broadcast::Sender<RecorderEvent>,
}

impl RecordingController {
    pub fn new(bridge: Arc<dyn MediaBridge>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            session: None,
            bridge,
            events,
        }
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Subscribe to recorder events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.events.subscribe()
    }

    /// Seconds since the active recording started, if any
    pub fn duration_seconds(&self) -> Option<u64> {
        if self.state() != RecordingState::Recording {
            return None;
        }
        self.session
            .as_ref()
            .map(|session| elapsed_seconds(session.started_at))
    }

    /// Start a recording. Returns the negotiated mime type.
    pub async fn start(&mut self, options: &RecordingOptions) -> Result<String, RecordingError> {
        if self.state() != RecordingState::Idle {
            return Err(RecordingError::InvalidState(RecordingState::Recording));
        }
        // A session terminated by a transport error leaves its entry behind;
        // its pump has already released the stream.
        self.session = None;

        let (mut stream, source) = self.acquire_stream(options).await?;

        let mime_type = match encoding::negotiate(stream.as_ref()) {
            Ok(mime) => mime.to_string(),
            Err(err) => {
                stream.release().await;
                return Err(err);
            }
        };

        let encoder_options = EncoderOptions {
            timeslice: Duration::from_millis(options.timeslice_ms),
            video_bits_per_second: options.video_bits_per_second,
        };
        let encoder_events = match stream.start_encoder(&mime_type, &encoder_options).await {
            Ok(events) => events,
            Err(err) => {
                stream.release().await;
                return Err(RecordingError::Failed(err.to_string()));
            }
        };

        let (commands_tx, commands_rx) = mpsc::channel(4);
        tokio::spawn(pump(
            stream,
            encoder_events,
            commands_rx,
            self.state.clone(),
            self.events.clone(),
        ));

        self.session = Some(ActiveSession {
            started_at: Utc::now(),
            mime_type: mime_type.clone(),
            source,
            commands: commands_tx,
        });
        *self.state.write() = RecordingState::Recording;
        let _ = self.events.send(RecorderEvent::Started {
            mime_type: mime_type.clone(),
        });

        tracing::info!(%mime_type, ?source, "recording started");
        Ok(mime_type)
    }

    /// Stop the active recording and finalize its artifact.
    pub async fn stop(&mut self) -> Result<StopOutcome, RecordingError> {
        if self.state() != RecordingState::Recording {
            return Err(RecordingError::InvalidState(RecordingState::Idle));
        }
        let Some(session) = self.session.take() else {
            *self.state.write() = RecordingState::Idle;
            return Err(RecordingError::InvalidState(RecordingState::Idle));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if session
            .commands
            .send(PumpCommand::Stop(reply_tx))
            .await
            .is_err()
        {
            // The pump exited after a transport error and already reset the
            // state; nothing left to finalize.
            return Err(RecordingError::Failed(
                "recording already terminated".to_string(),
            ));
        }

        let chunks = reply_rx
            .await
            .map_err(|_| RecordingError::Failed("recorder task dropped".to_string()))?;

        *self.state.write() = RecordingState::Idle;
        let _ = self.events.send(RecorderEvent::Stopped);

        let duration_seconds = elapsed_seconds(session.started_at);
        if chunks.is_empty() {
            tracing::info!("recording stopped with no data");
            return Ok(StopOutcome::Empty);
        }

        let data = chunks.concat();
        tracing::info!(
            bytes = data.len(),
            chunks = chunks.len(),
            duration_seconds,
            "recording stopped"
        );

        Ok(StopOutcome::Finished(RecordingArtifact {
            data,
            mime_type: session.mime_type,
            source: session.source,
            started_at: session.started_at,
            duration_seconds,
        }))
    }

    async fn acquire_stream(
        &self,
        options: &RecordingOptions,
    ) -> Result<(Box<dyn MediaStream>, StreamSource), RecordingError> {
        match self.bridge.element_stream().await {
            Ok(stream) => return Ok((stream, StreamSource::Element)),
            Err(err) => tracing::debug!("element stream unavailable: {err}"),
        }

        let constraints = crate::bridge::DisplayConstraints {
            ideal_width: options.target_width,
            ideal_height: options.target_height,
        };
        match self.bridge.display_stream(&constraints).await {
            Ok(stream) => Ok((stream, StreamSource::Display)),
            Err(err) => {
                tracing::warn!("no recordable stream: {err}");
                Err(RecordingError::Unavailable)
            }
        }
    }
}

fn elapsed_seconds(started_at: DateTime<Utc>) -> u64 {
    (Utc::now() - started_at).num_seconds().max(0) as u64
}

/// Owns the media stream for the lifetime of one recording.
///
/// Appends chunks as the encoder flushes them so partial data survives a
/// crash mid-recording. A transport error releases the stream, resets the
/// state machine to Idle, and reports the failure.
async fn pump(
    mut stream: Box<dyn MediaStream>,
    mut encoder_events: mpsc::Receiver<EncoderEvent>,
    mut commands: mpsc::Receiver<PumpCommand>,
    state: Arc<RwLock<RecordingState>>,
    events: broadcast::Sender<RecorderEvent>,
) {
    let mut chunks: Vec<Vec<u8>> = Vec::new();

    loop {
        tokio::select! {
            event = encoder_events.recv() => match event {
                Some(EncoderEvent::Chunk(data)) => {
                    if !data.is_empty() {
                        tracing::debug!(bytes = data.len(), "recording chunk received");
                        chunks.push(data);
                    }
                }
                Some(EncoderEvent::Error(message)) => {
                    tracing::error!("recording transport error: {message}");
                    stream.release().await;
                    *state.write() = RecordingState::Idle;
                    let _ = events.send(RecorderEvent::Failed(message));
                    return;
                }
                Some(EncoderEvent::Finished) | None => {
                    tracing::error!("encoder ended without a stop request");
                    stream.release().await;
                    *state.write() = RecordingState::Idle;
                    let _ = events.send(RecorderEvent::Failed(
                        "encoder ended unexpectedly".to_string(),
                    ));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(PumpCommand::Stop(reply)) => {
                    if let Err(err) = stream.stop_encoder().await {
                        tracing::warn!("stop encoder: {err}");
                    }
                    // Drain whatever the encoder flushes on the way out.
                    while let Some(event) = encoder_events.recv().await {
                        match event {
                            EncoderEvent::Chunk(data) if !data.is_empty() => chunks.push(data),
                            EncoderEvent::Chunk(_) => {}
                            EncoderEvent::Finished | EncoderEvent::Error(_) => break,
                        }
                    }
                    stream.release().await;
                    let _ = reply.send(std::mem::take(&mut chunks));
                    return;
                }
                None => {
                    // Controller dropped the session without stopping.
                    stream.release().await;
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::mock::{MockBridge, MockStream};

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn controller_with_element(supported: &[&str]) -> (RecordingController, Arc<crate::bridge::mock::MockStreamHandle>) {
        let bridge = Arc::new(MockBridge::default());
        let (stream, handle) = MockStream::new(supported);
        *bridge.element_stream.lock() = Some(stream);
        (RecordingController::new(bridge), handle)
    }

    #[tokio::test]
    async fn start_negotiates_down_the_ladder() {
        let (mut controller, _handle) = controller_with_element(&["video/webm"]);
        let mime = controller.start(&RecordingOptions::default()).await.unwrap();
        assert_eq!(mime, "video/webm");
        assert_eq!(controller.state(), RecordingState::Recording);
    }

    #[tokio::test]
    async fn start_while_recording_is_invalid() {
        let (mut controller, _handle) = controller_with_element(&["video/webm;codecs=vp9"]);
        controller.start(&RecordingOptions::default()).await.unwrap();

        let err = controller
            .start(&RecordingOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn stop_while_idle_is_invalid() {
        let bridge = Arc::new(MockBridge::default());
        let mut controller = RecordingController::new(bridge);

        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, RecordingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn falls_back_to_display_stream() {
        let bridge = Arc::new(MockBridge::default());
        let (stream, _handle) = MockStream::new(&["video/webm"]);
        *bridge.display_stream.lock() = Some(stream);

        let mut controller = RecordingController::new(bridge);
        controller.start(&RecordingOptions::default()).await.unwrap();

        let session = controller.session.as_ref().unwrap();
        assert_eq!(session.source, StreamSource::Display);
    }

    #[tokio::test]
    async fn no_stream_at_all_is_unavailable() {
        let bridge = Arc::new(MockBridge::default());
        let mut controller = RecordingController::new(bridge);

        let err = controller
            .start(&RecordingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, RecordingError::Unavailable);
        assert_eq!(controller.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn exhausted_ladder_releases_the_stream() {
        let (mut controller, handle) = controller_with_element(&[]);

        let err = controller
            .start(&RecordingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, RecordingError::EncodingUnavailable);
        assert!(handle.released());
        assert_eq!(controller.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn chunks_concatenate_in_arrival_order() {
        let (mut controller, handle) = controller_with_element(&["video/webm"]);
        controller.start(&RecordingOptions::default()).await.unwrap();

        handle.push(EncoderEvent::Chunk(b"c1".to_vec())).await;
        handle.push(EncoderEvent::Chunk(b"c2".to_vec())).await;
        handle.push(EncoderEvent::Chunk(b"c3".to_vec())).await;
        settle().await;

        match controller.stop().await.unwrap() {
            StopOutcome::Finished(artifact) => {
                assert_eq!(artifact.data, b"c1c2c3".to_vec());
                assert_eq!(artifact.mime_type, "video/webm");
                assert!(handle.released());
            }
            StopOutcome::Empty => panic!("expected a finished artifact"),
        }
        assert_eq!(controller.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn stop_with_no_chunks_is_empty_not_an_artifact() {
        let (mut controller, handle) = controller_with_element(&["video/webm"]);
        controller.start(&RecordingOptions::default()).await.unwrap();
        settle().await;

        match controller.stop().await.unwrap() {
            StopOutcome::Empty => {}
            StopOutcome::Finished(_) => panic!("expected an empty outcome"),
        }
        assert!(handle.released());
    }

    #[tokio::test]
    async fn transport_error_resets_to_idle_and_releases() {
        let (mut controller, handle) = controller_with_element(&["video/webm"]);
        let mut events = controller.subscribe();
        controller.start(&RecordingOptions::default()).await.unwrap();

        handle
            .push(EncoderEvent::Error("track ended".to_string()))
            .await;
        settle().await;

        assert_eq!(controller.state(), RecordingState::Idle);
        assert!(handle.released());

        // Started, then Failed
        assert!(matches!(
            events.try_recv().unwrap(),
            RecorderEvent::Started { .. }
        ));
        assert!(matches!(events.try_recv().unwrap(), RecorderEvent::Failed(_)));

        // The dead session cannot be stopped.
        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, RecordingError::InvalidState(_)));
    }
}
