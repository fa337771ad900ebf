//! Speech playback sessions.
//!
//! - [`controller`]: owns the player and its playable handle, turns player
//!   end/failure into one terminal outcome
//! - [`orchestrator`]: runs one session at a time and reports its two
//!   independent completion signals
//!
//! The two signals are deliberately separate. [`StreamOutcome`] tells the
//! caller the network response is finished (safe to issue the next request);
//! [`PlaybackOutcome`] tells it the speech has finished playing (safe to hand
//! control back to the user). Either can come first.

pub mod controller;
pub mod orchestrator;

pub use controller::PlaybackController;
pub use orchestrator::{SessionHandle, StreamOrchestrator};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::stream::DecodeSummary;

/// How reading the response body ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StreamOutcome {
    /// The body was read to the end.
    Completed(DecodeSummary),
    /// Reading failed part way; frames decoded so far were still played.
    Failed { reason: String },
    /// The session was cancelled or replaced before the body was exhausted.
    Cancelled,
}

impl StreamOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// How playback ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PlaybackOutcome {
    /// The player rendered everything.
    Ended,
    /// The sink, the player, the backend or the network failed.
    Failed { reason: String },
    /// The session was cancelled or replaced.
    Cancelled,
}

impl PlaybackOutcome {
    #[must_use]
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// Outcomes that have a meaning when their sender disappears.
pub trait SignalOutcome: Sized {
    /// Outcome reported when the session went away without sending one.
    fn abandoned() -> Self;
}

impl SignalOutcome for StreamOutcome {
    fn abandoned() -> Self {
        Self::Cancelled
    }
}

impl SignalOutcome for PlaybackOutcome {
    fn abandoned() -> Self {
        Self::Cancelled
    }
}

/// One-shot completion signal of a session.
///
/// Resolves exactly once; the outcome is kept, so the signal can be polled
/// with [`Signal::try_outcome`] and awaited afterwards.
#[derive(Debug)]
pub struct Signal<T> {
    rx: Option<oneshot::Receiver<T>>,
    outcome: Option<T>,
}

impl<T: SignalOutcome + Clone> Signal<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>) -> Self {
        Self {
            rx: Some(rx),
            outcome: None,
        }
    }

    /// Returns the outcome if the signal has fired, without waiting.
    pub fn try_outcome(&mut self) -> Option<T> {
        if let Some(rx) = self.rx.as_mut() {
            match rx.try_recv() {
                Ok(outcome) => self.resolve(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => self.resolve(T::abandoned()),
            }
        }
        self.outcome.clone()
    }

    /// Returns true once the signal has fired.
    pub fn is_fired(&mut self) -> bool {
        self.try_outcome().is_some()
    }

    fn resolve(&mut self, outcome: T) {
        self.rx = None;
        self.outcome = Some(outcome);
    }
}

impl<T: SignalOutcome + Clone + Unpin> Future for Signal<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = &mut *self;
        if let Some(rx) = this.rx.as_mut() {
            let outcome = match Pin::new(rx).poll(cx) {
                Poll::Ready(result) => result.unwrap_or_else(|_| T::abandoned()),
                Poll::Pending => return Poll::Pending,
            };
            this.resolve(outcome);
        }
        match &this.outcome {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => Poll::Pending,
        }
    }
}
