//! Event system for observing playback sessions.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the orchestrator to report session lifecycle
//! - [`PlaybackEvent`], the serializable event type front-ends consume
//!
//! Events are informational. The completion signals callers act on are the
//! per-session futures in [`crate::playback::SessionHandle`].

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::playback::{PlaybackOutcome, StreamOutcome};

/// Lifecycle events of a speech playback session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// A session was created and its player started.
    SessionStarted {
        /// Unique identifier of the session.
        #[serde(rename = "sessionId")]
        session_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The response body was fully read (or failed, or was cancelled).
    StreamExhausted {
        /// Unique identifier of the session.
        #[serde(rename = "sessionId")]
        session_id: String,
        /// How reading ended.
        outcome: StreamOutcome,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Playback reached a terminal state.
    PlaybackEnded {
        /// Unique identifier of the session.
        #[serde(rename = "sessionId")]
        session_id: String,
        /// How playback ended.
        outcome: PlaybackOutcome,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The "now speaking" indicator changed.
    SpeakingChanged {
        /// Whether speech is currently playing.
        speaking: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}
