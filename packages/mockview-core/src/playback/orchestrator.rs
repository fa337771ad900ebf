//! One-session-at-a-time speech playback.
//!
//! [`StreamOrchestrator::begin`] takes a streaming response body, opens a
//! fresh sink/player pair, starts playback immediately and feeds decoded
//! frames through the [`SinkAdapter`] as they arrive. Each session runs as one
//! task whose `select!` loop is the only code touching the sink, the queue and
//! the controller, so every media signal is handled in a single order.
//!
//! Starting a new session cancels the previous one and waits for its
//! teardown, so at most one player is ever alive.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{PlaybackController, PlaybackOutcome, Signal, StreamOutcome};
use crate::error::PlaybackError;
use crate::events::{EventEmitter, PlaybackEvent};
use crate::media::{MediaBackend, MediaEvent, MediaSink, PlayableHandle};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::stream::{decode_stream, DecoderEvent, SinkAdapter};
use crate::utils::now_millis;

type StreamExhaustedCallback = Box<dyn FnOnce(&StreamOutcome) + Send>;

/// Caller's view of one playback session.
///
/// Both signals fire exactly once, independently and in either order.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    /// Fires when the response body has been fully read.
    pub stream_exhausted: Signal<StreamOutcome>,
    /// Fires when playback reaches a terminal state.
    pub playback_ended: Signal<PlaybackOutcome>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Requests cancellation. Unfired signals resolve as cancelled.
    ///
    /// Does not wait for teardown; use [`StreamOrchestrator::cancel`] for that.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    finished: oneshot::Receiver<()>,
}

/// Runs speech playback sessions, one at a time.
pub struct StreamOrchestrator<S: TaskSpawner = TokioSpawner> {
    backend: Arc<dyn MediaBackend>,
    spawner: S,
    emitter: Arc<dyn EventEmitter>,
    speaking: Arc<watch::Sender<bool>>,
    active: Option<ActiveSession>,
}

impl StreamOrchestrator<TokioSpawner> {
    /// Creates an orchestrator spawning sessions on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn new(backend: Arc<dyn MediaBackend>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self::with_spawner(backend, emitter, TokioSpawner::current())
    }
}

impl<S: TaskSpawner> StreamOrchestrator<S> {
    pub fn with_spawner(
        backend: Arc<dyn MediaBackend>,
        emitter: Arc<dyn EventEmitter>,
        spawner: S,
    ) -> Self {
        let (speaking, _) = watch::channel(false);
        Self {
            backend,
            spawner,
            emitter,
            speaking: Arc::new(speaking),
            active: None,
        }
    }

    /// Starts playing a streamed speech reply.
    ///
    /// Any session still running is cancelled first and its player released
    /// before the new one is opened. `on_stream_exhausted` runs once, when
    /// the stream-exhausted signal fires (including as cancelled).
    pub async fn begin<B, E, F>(&mut self, body: B, on_stream_exhausted: F) -> SessionHandle
    where
        B: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce(&StreamOutcome) + Send + 'static,
    {
        self.cancel().await;

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (stream_tx, stream_rx) = oneshot::channel();
        let (playback_tx, playback_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = oneshot::channel();

        let session = Session {
            id,
            backend: Arc::clone(&self.backend),
            emitter: Arc::clone(&self.emitter),
            speaking: Arc::clone(&self.speaking),
            cancel: cancel.clone(),
            stream_tx: Some(stream_tx),
            playback_tx: Some(playback_tx),
            on_stream_exhausted: Some(Box::new(on_stream_exhausted)),
        };

        log::info!("[Playback] Starting session {}", id);
        self.spawner.spawn(async move {
            session.run(body).await;
            let _ = finished_tx.send(());
        });

        self.active = Some(ActiveSession {
            id,
            cancel: cancel.clone(),
            finished: finished_rx,
        });

        SessionHandle {
            id,
            stream_exhausted: Signal::new(stream_rx),
            playback_ended: Signal::new(playback_rx),
            cancel,
        }
    }

    /// Cancels the active session, if any, and waits for its teardown.
    pub async fn cancel(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        if !active.cancel.is_cancelled() {
            log::debug!("[Playback] Cancelling session {}", active.id);
        }
        active.cancel.cancel();
        // Resolves on completion or when the task is gone.
        let _ = active.finished.await;
    }

    /// Identifier of the most recently started session.
    pub fn active_session(&self) -> Option<Uuid> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Returns true while speech is playing.
    pub fn is_speaking(&self) -> bool {
        *self.speaking.borrow()
    }

    /// Subscribes to the speaking flag.
    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.speaking.subscribe()
    }
}

impl<S: TaskSpawner> Drop for StreamOrchestrator<S> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session task
// ─────────────────────────────────────────────────────────────────────────────

type SessionSink = SinkAdapter<Box<dyn MediaSink>>;

struct Session {
    id: Uuid,
    backend: Arc<dyn MediaBackend>,
    emitter: Arc<dyn EventEmitter>,
    speaking: Arc<watch::Sender<bool>>,
    cancel: CancellationToken,
    stream_tx: Option<oneshot::Sender<StreamOutcome>>,
    playback_tx: Option<oneshot::Sender<PlaybackOutcome>>,
    on_stream_exhausted: Option<StreamExhaustedCallback>,
}

impl Session {
    async fn run<B, E>(mut self, body: B)
    where
        B: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let handle = PlayableHandle::new();
        let (media_tx, mut media_rx) = mpsc::unbounded_channel();

        let pair = match self.backend.open(&handle, media_tx) {
            Ok(pair) => pair,
            Err(err) => {
                log::error!("[Playback] Session {} could not open media: {}", self.id, err);
                let reason = err.to_string();
                self.fire_stream(StreamOutcome::Failed {
                    reason: reason.clone(),
                });
                self.fire_playback(PlaybackOutcome::Failed { reason });
                return;
            }
        };

        let mut sink = SinkAdapter::new(pair.sink);
        let mut controller =
            PlaybackController::new(pair.player, handle, Arc::clone(&self.speaking));

        self.emitter.emit_playback(PlaybackEvent::SessionStarted {
            session_id: self.id.to_string(),
            timestamp: now_millis(),
        });

        // Playback starts before any data is buffered; the player catches up.
        match controller.start() {
            Ok(()) => self.emit_speaking(true),
            Err(err) => self.fail(&mut sink, &mut controller, err),
        }

        let decoded = decode_stream(body);
        futures::pin_mut!(decoded);

        let cancel = self.cancel.clone();
        let mut reading = true;
        let mut media_open = true;
        // Set when the body failed; the eventual playback outcome reports it.
        let mut network_error: Option<PlaybackError> = None;

        while reading || self.playback_tx.is_some() {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::info!("[Playback] Session {} cancelled", self.id);
                    sink.abort();
                    if let Some(outcome) = controller.dispose() {
                        self.finish_playback(outcome);
                    }
                    self.fire_stream(StreamOutcome::Cancelled);
                    self.fire_playback(PlaybackOutcome::Cancelled);
                    break;
                }

                event = media_rx.recv(), if media_open => match event {
                    Some(event) => {
                        self.on_media_event(event, &mut sink, &mut controller, network_error.as_ref());
                    }
                    None => {
                        media_open = false;
                        if !controller.is_terminated() {
                            let err = PlaybackError::Player("media backend went away".to_string());
                            self.fail(&mut sink, &mut controller, err);
                        }
                    }
                },

                item = decoded.next(), if reading => match item {
                    Some(DecoderEvent::Frame(chunk)) => {
                        if let Err(err) = sink.push(chunk) {
                            self.fail(&mut sink, &mut controller, err);
                        }
                    }
                    Some(DecoderEvent::End(summary)) => {
                        reading = false;
                        self.fire_stream(StreamOutcome::Completed(summary));
                        if let Err(err) = sink.finish() {
                            self.fail(&mut sink, &mut controller, err);
                        }
                    }
                    Some(DecoderEvent::Failed(err)) => {
                        reading = false;
                        self.fire_stream(StreamOutcome::Failed {
                            reason: err.to_string(),
                        });
                        // Whatever arrived before the failure still plays out.
                        network_error = Some(err);
                        if let Err(err) = sink.finish() {
                            self.fail(&mut sink, &mut controller, err);
                        }
                    }
                    None => {
                        reading = false;
                        self.fire_stream(StreamOutcome::Completed(Default::default()));
                    }
                },
            }
        }

        log::debug!(
            "[Playback] Session {} finished: {} chunks appended, max backlog {}",
            self.id,
            sink.appended(),
            sink.queue_high_water()
        );
    }

    fn on_media_event(
        &mut self,
        event: MediaEvent,
        sink: &mut SessionSink,
        controller: &mut PlaybackController,
        network_error: Option<&PlaybackError>,
    ) {
        log::trace!("[Playback] Session {} media event {:?}", self.id, event);
        match event {
            MediaEvent::SinkOpened => {
                if let Err(err) = sink.on_open() {
                    self.fail(sink, controller, err);
                }
            }
            MediaEvent::WriteComplete => {
                if let Err(err) = sink.on_write_complete() {
                    self.fail(sink, controller, err);
                }
            }
            MediaEvent::SinkError(reason) => {
                let err = sink.on_error(reason);
                self.fail(sink, controller, err);
            }
            MediaEvent::PlayerEnded => {
                sink.abort();
                let outcome = match network_error {
                    Some(err) => controller.on_error(err),
                    None => controller.on_ended(),
                };
                if let Some(outcome) = outcome {
                    self.finish_playback(outcome);
                }
            }
            MediaEvent::PlayerError(reason) => {
                self.fail(sink, controller, PlaybackError::Player(reason));
            }
        }
    }

    /// Ends playback with an error. The body keeps being read so the
    /// stream-exhausted signal still fires on its own schedule.
    fn fail(&mut self, sink: &mut SessionSink, controller: &mut PlaybackController, err: PlaybackError) {
        log::warn!("[Playback] Session {} failed: {}", self.id, err);
        sink.abort();
        if let Some(outcome) = controller.on_error(&err) {
            self.finish_playback(outcome);
        }
    }

    fn finish_playback(&mut self, outcome: PlaybackOutcome) {
        self.emit_speaking(false);
        self.fire_playback(outcome);
    }

    fn emit_speaking(&self, speaking: bool) {
        self.emitter.emit_playback(PlaybackEvent::SpeakingChanged {
            speaking,
            timestamp: now_millis(),
        });
    }

    fn fire_stream(&mut self, outcome: StreamOutcome) {
        let Some(tx) = self.stream_tx.take() else {
            return;
        };
        log::debug!("[Playback] Session {} stream exhausted: {:?}", self.id, outcome);
        if let Some(callback) = self.on_stream_exhausted.take() {
            callback(&outcome);
        }
        self.emitter.emit_playback(PlaybackEvent::StreamExhausted {
            session_id: self.id.to_string(),
            outcome: outcome.clone(),
            timestamp: now_millis(),
        });
        let _ = tx.send(outcome);
    }

    fn fire_playback(&mut self, outcome: PlaybackOutcome) {
        let Some(tx) = self.playback_tx.take() else {
            return;
        };
        self.emitter.emit_playback(PlaybackEvent::PlaybackEnded {
            session_id: self.id.to_string(),
            outcome: outcome.clone(),
            timestamp: now_millis(),
        });
        let _ = tx.send(outcome);
    }
}
