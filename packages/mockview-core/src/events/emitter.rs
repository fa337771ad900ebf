//! Event emitter abstraction for decoupling the orchestrator from consumers.
//!
//! The orchestrator depends on the [`EventEmitter`] trait rather than on a
//! concrete channel, so front-ends decide how (and whether) events surface.

use super::PlaybackEvent;

/// Trait for emitting playback events without knowledge of the consumer.
///
/// # Example
///
/// ```ignore
/// struct StatusLine;
///
/// impl EventEmitter for StatusLine {
///     fn emit_playback(&self, event: PlaybackEvent) {
///         if let PlaybackEvent::SpeakingChanged { speaking, .. } = event {
///             println!("{}", if speaking { "Listening..." } else { "Your turn" });
///         }
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a playback session event.
    fn emit_playback(&self, event: PlaybackEvent);
}

/// No-op emitter for embedding or testing.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_playback(&self, _event: PlaybackEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }
}
