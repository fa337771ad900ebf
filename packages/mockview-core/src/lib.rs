//! Mockview Core - shared library for Mockview voice mock interviews.
//!
//! This crate provides the client side of a spoken mock interview: it talks
//! to the interview backend and plays the interviewer's questions while they
//! are still streaming in.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`stream`]: Line-framed base64 decoding, chunk queue and single-writer sink adapter
//! - [`media`]: Media sink/player abstraction and the external-process backend
//! - [`playback`]: Playback controller and the one-session-at-a-time orchestrator
//! - [`client`]: HTTP client for the interview backend
//! - [`interview`]: Interview phase tracking for front-ends
//! - [`events`]: Playback lifecycle events
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from platform-specific
//! implementations:
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting playback events
//! - [`MediaBackend`](media::MediaBackend): Providing a sink and player per session
//! - [`InterviewApi`](client::InterviewApi): Talking to the interview backend
//!
//! Each trait has a default implementation suitable for the terminal front-end.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod interview;
pub mod media;
pub mod playback;
pub mod protocol_constants;
pub mod runtime;
pub mod stream;
pub mod utils;

// Re-export commonly used types at the crate root
pub use client::{
    Feedback, InterviewApi, InterviewClient, InterviewError, InterviewReply, InterviewResult,
    Recording, ReplyBody, Subject,
};
pub use config::{ClientConfig, PlaybackConfig};
pub use error::{ErrorCode, PlaybackError, PlaybackResult};
pub use events::{EventEmitter, LoggingEventEmitter, NoopEventEmitter, PlaybackEvent};
pub use interview::{AfterPlayback, InterviewPhase, InterviewState};
pub use media::{MediaBackend, MediaEvent, MediaSink, PlayableHandle, Player, ProcessBackend};
pub use playback::{PlaybackOutcome, SessionHandle, StreamOrchestrator, StreamOutcome};
pub use runtime::{TaskSpawner, TokioSpawner};
