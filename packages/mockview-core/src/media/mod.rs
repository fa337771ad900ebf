//! Media backend abstraction.
//!
//! A backend provides, per playback session, a single-writer [`MediaSink`]
//! and a [`Player`] that renders what the sink receives. Both report their
//! asynchronous signals (open, write complete, end, failure) as
//! [`MediaEvent`]s on the channel handed to [`MediaBackend::open`], so the
//! session loop sees every signal in one serialized order.
//!
//! The shipped implementation is [`ProcessBackend`], which pipes frames into
//! an external player process.

mod process;
#[cfg(test)]
pub(crate) mod test_support;

pub use process::ProcessBackend;

use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::PlaybackResult;
use crate::stream::Chunk;

/// Asynchronous signals raised by a sink or player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// The sink can accept its first append.
    SinkOpened,
    /// The append in flight has been consumed.
    WriteComplete,
    /// The sink failed; no further appends will succeed.
    SinkError(String),
    /// The player rendered everything up to end-of-stream.
    PlayerEnded,
    /// The player failed.
    PlayerError(String),
}

/// Sending half of the session's media event channel.
pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;

/// Append-only destination read by a player.
///
/// Implementations accept one append at a time: `append` starts a write and
/// its completion is reported later as [`MediaEvent::WriteComplete`]. Callers
/// never issue a second append before that event.
pub trait MediaSink: Send {
    /// Starts appending one chunk.
    fn append(&mut self, chunk: Chunk) -> PlaybackResult<()>;

    /// Declares that no more data follows. Only called with no append in
    /// flight.
    fn end_of_stream(&mut self) -> PlaybackResult<()>;

    /// Closes the sink without draining; used on cancellation.
    fn abort(&mut self);
}

impl<T: MediaSink + ?Sized> MediaSink for Box<T> {
    fn append(&mut self, chunk: Chunk) -> PlaybackResult<()> {
        (**self).append(chunk)
    }

    fn end_of_stream(&mut self) -> PlaybackResult<()> {
        (**self).end_of_stream()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

/// Renders a sink's output.
///
/// Playback starts before any data is appended; a player with an empty
/// buffer is expected to stall and resume on its own.
pub trait Player: Send {
    /// Starts playback.
    fn play(&mut self) -> PlaybackResult<()>;

    /// Stops rendering without reporting a terminal event.
    fn pause(&mut self);

    /// Frees the player. Called exactly once per session.
    fn release(&mut self);
}

/// A sink and the player bound to it.
pub struct MediaPair {
    pub sink: Box<dyn MediaSink>,
    pub player: Box<dyn Player>,
}

impl fmt::Debug for MediaPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPair").finish_non_exhaustive()
    }
}

/// Factory for per-session media resources.
pub trait MediaBackend: Send + Sync {
    /// Creates a sink/player pair bound to `handle`.
    ///
    /// Called from within the session task, so implementations may spawn on
    /// the current Tokio runtime. Every asynchronous signal must go through
    /// `events`.
    fn open(&self, handle: &PlayableHandle, events: MediaEventSender) -> PlaybackResult<MediaPair>;
}

/// Identifies the playable resource a player is bound to.
///
/// Revoked exactly once, when the session reaches a terminal state.
#[derive(Debug)]
pub struct PlayableHandle {
    id: Uuid,
    revoked: bool,
}

impl PlayableHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            revoked: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Revokes the handle. Returns `false` if it was already revoked.
    pub fn revoke(&mut self) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        log::debug!("[Playback] Revoked playable handle {}", self.id);
        true
    }
}

impl Default for PlayableHandle {
    fn default() -> Self {
        Self::new()
    }
}
