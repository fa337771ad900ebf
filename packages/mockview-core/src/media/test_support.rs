//! Scripted in-memory media backend for session tests.
//!
//! Every `open` records a [`ScriptedSession`] that tests can inspect and
//! drive: appends are acknowledged after a configurable delay, end-of-stream
//! can end the player automatically, and arbitrary [`MediaEvent`]s can be
//! injected through [`ScriptedBackend::inject`]. [`ScriptedBackend::disconnect`]
//! drops every event sender of a session, as a crashed backend would.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{MediaBackend, MediaEvent, MediaEventSender, MediaPair, MediaSink, PlayableHandle, Player};
use crate::error::{PlaybackError, PlaybackResult};
use crate::stream::Chunk;

/// Behaviour of sessions opened by a [`ScriptedBackend`].
#[derive(Debug, Clone)]
pub struct Script {
    /// Delay before each write-complete.
    pub write_delay: Duration,
    /// Send `PlayerEnded` once end-of-stream is applied.
    pub end_on_eos: bool,
    /// Fail the append with this index (0-based).
    pub fail_append_at: Option<usize>,
    /// Refuse to open.
    pub fail_open: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            write_delay: Duration::ZERO,
            end_on_eos: true,
            fail_append_at: None,
            fail_open: false,
        }
    }
}

/// What happened to one session's sink and player.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pub appended: Vec<Chunk>,
    pub end_of_stream: usize,
    /// Appends issued while another append was still in flight.
    pub overlapping_appends: usize,
    /// An append arrived after end-of-stream.
    pub append_after_end: bool,
    pub aborted: usize,
    pub played: usize,
    pub paused: usize,
    pub released: usize,
    in_flight: bool,
    events: Option<MediaEventSender>,
}

impl ScriptedSession {
    fn send(&self, event: MediaEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[derive(Default)]
struct Shared {
    sessions: Vec<Arc<Mutex<ScriptedSession>>>,
}

#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Script,
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            shared: Arc::default(),
        }
    }

    pub fn opened(&self) -> usize {
        self.shared.lock().sessions.len()
    }

    /// Waits until `count` sessions have been opened.
    pub async fn wait_opened(&self, count: usize) {
        while self.opened() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Snapshot accessor for session `index`.
    pub fn session<R>(&self, index: usize, read: impl FnOnce(&ScriptedSession) -> R) -> R {
        let session = Arc::clone(&self.shared.lock().sessions[index]);
        let guard = session.lock();
        read(&guard)
    }

    /// Injects a media event into session `index`.
    pub fn inject(&self, index: usize, event: MediaEvent) {
        let session = Arc::clone(&self.shared.lock().sessions[index]);
        session.lock().send(event);
    }

    /// Drops the event channel of session `index`.
    pub fn disconnect(&self, index: usize) {
        let session = Arc::clone(&self.shared.lock().sessions[index]);
        session.lock().events = None;
    }
}

impl MediaBackend for ScriptedBackend {
    fn open(&self, _handle: &PlayableHandle, events: MediaEventSender) -> PlaybackResult<MediaPair> {
        if self.script.fail_open {
            return Err(PlaybackError::Backend("no audio device".to_string()));
        }
        let _ = events.send(MediaEvent::SinkOpened);
        let record = Arc::new(Mutex::new(ScriptedSession {
            events: Some(events),
            ..ScriptedSession::default()
        }));
        self.shared.lock().sessions.push(Arc::clone(&record));

        Ok(MediaPair {
            sink: Box::new(ScriptedSink {
                script: self.script.clone(),
                record: Arc::clone(&record),
            }),
            player: Box::new(ScriptedPlayer { record }),
        })
    }
}

struct ScriptedSink {
    script: Script,
    record: Arc<Mutex<ScriptedSession>>,
}

impl MediaSink for ScriptedSink {
    fn append(&mut self, chunk: Chunk) -> PlaybackResult<()> {
        let index = {
            let mut record = self.record.lock();
            if record.in_flight {
                record.overlapping_appends += 1;
            }
            if record.end_of_stream > 0 {
                record.append_after_end = true;
            }
            record.appended.push(chunk);
            record.in_flight = true;
            record.appended.len() - 1
        };
        if self.script.fail_append_at == Some(index) {
            return Err(PlaybackError::SinkWrite("quota exceeded".to_string()));
        }

        let record = Arc::clone(&self.record);
        let delay = self.script.write_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut record = record.lock();
            record.in_flight = false;
            record.send(MediaEvent::WriteComplete);
        });
        Ok(())
    }

    fn end_of_stream(&mut self) -> PlaybackResult<()> {
        self.record.lock().end_of_stream += 1;
        if self.script.end_on_eos {
            let record = Arc::clone(&self.record);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                record.lock().send(MediaEvent::PlayerEnded);
            });
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.record.lock().aborted += 1;
    }
}

struct ScriptedPlayer {
    record: Arc<Mutex<ScriptedSession>>,
}

impl Player for ScriptedPlayer {
    fn play(&mut self) -> PlaybackResult<()> {
        self.record.lock().played += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.record.lock().paused += 1;
    }

    fn release(&mut self) {
        self.record.lock().released += 1;
    }
}
