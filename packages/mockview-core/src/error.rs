//! Centralized error types for the Mockview core library.
//!
//! This module provides:
//! - [`PlaybackError`] for the streaming speech pipeline
//! - The [`ErrorCode`] trait mapping every error to a machine-readable code
//! - Result aliases re-exported from their defining modules

use serde::Serialize;
use thiserror::Error;

use crate::client::InterviewError;

/// Trait for error types that provide machine-readable error codes.
///
/// Front-ends use the code to pick user-facing wording without matching on
/// display strings.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Errors raised while decoding and playing a streamed speech reply.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum PlaybackError {
    /// A line of the stream was not valid base64. The frame is skipped.
    #[error("Frame decode failed: {0}")]
    Decode(String),

    /// The sink rejected an append or reported a write failure.
    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    /// The player failed while rendering the buffered audio.
    #[error("Player failed: {0}")]
    Player(String),

    /// Reading the response body failed before the stream was exhausted.
    #[error("Network read failed: {0}")]
    NetworkRead(String),

    /// The media backend could not provide a sink/player pair.
    #[error("Media backend unavailable: {0}")]
    Backend(String),
}

impl PlaybackError {
    /// Returns true if the error only costs a single frame.
    ///
    /// Everything else ends the playback session.
    #[must_use]
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "frame_decode_failed",
            Self::SinkWrite(_) => "sink_write_failed",
            Self::Player(_) => "player_failed",
            Self::NetworkRead(_) => "network_read_failed",
            Self::Backend(_) => "media_backend_unavailable",
        }
    }
}

impl ErrorCode for InterviewError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Feedback(_) => "feedback_unavailable",
            Self::NoRecording => "no_recording",
            Self::InvalidPhase { .. } => "invalid_phase",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub use crate::client::InterviewResult;

/// Convenient Result alias for playback operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;
