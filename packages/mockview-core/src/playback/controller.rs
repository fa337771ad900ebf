//! Player ownership and terminal-event cleanup.

use std::sync::Arc;

use tokio::sync::watch;

use super::PlaybackOutcome;
use crate::error::{PlaybackError, PlaybackResult};
use crate::media::{PlayableHandle, Player};

/// Owns a session's player and the playable handle it is bound to.
///
/// Natural end, player failure and disposal share one cleanup path. Only the
/// first of them yields an outcome; later terminal events are ignored.
pub struct PlaybackController {
    player: Option<Box<dyn Player>>,
    handle: PlayableHandle,
    speaking: Arc<watch::Sender<bool>>,
}

impl PlaybackController {
    pub fn new(
        player: Box<dyn Player>,
        handle: PlayableHandle,
        speaking: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            player: Some(player),
            handle,
            speaking,
        }
    }

    /// Starts playback with whatever is buffered (possibly nothing).
    pub fn start(&mut self) -> PlaybackResult<()> {
        let player = self
            .player
            .as_mut()
            .ok_or_else(|| PlaybackError::Player("player already released".to_string()))?;
        player.play()?;
        self.speaking.send_replace(true);
        log::debug!("[Playback] Player started for handle {}", self.handle.id());
        Ok(())
    }

    /// Natural completion.
    pub fn on_ended(&mut self) -> Option<PlaybackOutcome> {
        self.terminate(PlaybackOutcome::Ended)
    }

    /// Playback failure, from the player or propagated from the sink.
    pub fn on_error(&mut self, err: &PlaybackError) -> Option<PlaybackOutcome> {
        self.terminate(PlaybackOutcome::Failed {
            reason: err.to_string(),
        })
    }

    /// Stops a player that has not reached a terminal event (cancellation or
    /// replacement by a newer session).
    pub fn dispose(&mut self) -> Option<PlaybackOutcome> {
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        self.terminate(PlaybackOutcome::Cancelled)
    }

    /// Returns true once a terminal event has been handled.
    pub fn is_terminated(&self) -> bool {
        self.player.is_none()
    }

    pub fn handle(&self) -> &PlayableHandle {
        &self.handle
    }

    fn terminate(&mut self, outcome: PlaybackOutcome) -> Option<PlaybackOutcome> {
        let Some(mut player) = self.player.take() else {
            log::debug!("[Playback] Ignoring {:?} after terminal event", outcome);
            return None;
        };
        self.speaking.send_replace(false);
        self.handle.revoke();
        player.release();
        log::info!("[Playback] Handle {} finished: {:?}", self.handle.id(), outcome);
        Some(outcome)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if !self.is_terminated() {
            self.dispose();
        }
    }
}
