//! Media backend that plays speech through an external player process.
//!
//! Each session spawns the configured command with a piped stdin. The sink
//! writes frames to that stdin one at a time from a writer task; closing
//! stdin is the end-of-stream. The player side watches the process: a
//! successful exit means playback ended, anything else is a player error.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};

use super::{MediaBackend, MediaEvent, MediaEventSender, MediaPair, MediaSink, PlayableHandle, Player};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, PlaybackResult};
use crate::protocol_constants::SPEECH_MIME_TYPE;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::stream::Chunk;

/// Spawns one player process per session.
///
/// The pipe writer and exit watcher of each player run as tasks on `S`.
#[derive(Clone)]
pub struct ProcessBackend<S: TaskSpawner = TokioSpawner> {
    program: String,
    args: Vec<String>,
    spawner: S,
}

impl ProcessBackend<TokioSpawner> {
    /// Creates a backend running `command` (program followed by arguments)
    /// with its tasks on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Backend`] if `command` is empty.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn new(command: Vec<String>) -> PlaybackResult<Self> {
        Self::with_spawner(command, TokioSpawner::current())
    }

    pub fn from_config(config: &PlaybackConfig) -> PlaybackResult<Self> {
        Self::new(config.player_command.clone())
    }
}

impl<S: TaskSpawner> ProcessBackend<S> {
    pub fn with_spawner(command: Vec<String>, spawner: S) -> PlaybackResult<Self> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| PlaybackError::Backend("player command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            spawner,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl<S: TaskSpawner> std::fmt::Debug for ProcessBackend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessBackend")
            .field("program", &self.program)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl<S: TaskSpawner> MediaBackend for ProcessBackend<S> {
    fn open(&self, handle: &PlayableHandle, events: MediaEventSender) -> PlaybackResult<MediaPair> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::Backend(format!("failed to start {}: {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PlaybackError::Backend("player stdin was not captured".to_string()))?;

        log::info!(
            "[Playback] Started player {} (pid={:?}) for {} handle {}",
            self.program,
            child.id(),
            SPEECH_MIME_TYPE,
            handle.id()
        );

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        self.spawner.spawn(write_loop(stdin, command_rx, events.clone()));

        let (stop_tx, stop_rx) = oneshot::channel();
        self.spawner.spawn(watch_player(child, stop_rx, events.clone()));

        // The pipe is writable as soon as the process exists.
        let _ = events.send(MediaEvent::SinkOpened);

        Ok(MediaPair {
            sink: Box::new(PipeSink {
                commands: Some(command_tx),
            }),
            player: Box::new(ProcessPlayer {
                stop: Some(stop_tx),
            }),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink
// ─────────────────────────────────────────────────────────────────────────────

enum SinkCommand {
    Append(Chunk),
    EndOfStream,
}

/// Sink half: forwards appends to the writer task.
struct PipeSink {
    commands: Option<mpsc::UnboundedSender<SinkCommand>>,
}

impl PipeSink {
    fn send(&mut self, command: SinkCommand) -> PlaybackResult<()> {
        self.commands
            .as_ref()
            .ok_or_else(|| PlaybackError::SinkWrite("player pipe already closed".to_string()))?
            .send(command)
            .map_err(|_| PlaybackError::SinkWrite("player pipe writer has exited".to_string()))
    }
}

impl MediaSink for PipeSink {
    fn append(&mut self, chunk: Chunk) -> PlaybackResult<()> {
        self.send(SinkCommand::Append(chunk))
    }

    fn end_of_stream(&mut self) -> PlaybackResult<()> {
        let result = self.send(SinkCommand::EndOfStream);
        self.commands = None;
        result
    }

    fn abort(&mut self) {
        self.commands = None;
    }
}

/// Writes one chunk per command, acknowledging each with `WriteComplete`.
async fn write_loop(
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<SinkCommand>,
    events: MediaEventSender,
) {
    while let Some(command) = commands.recv().await {
        match command {
            SinkCommand::Append(chunk) => {
                if let Err(e) = stdin.write_all(&chunk).await {
                    log::warn!("[Playback] Player pipe write failed: {}", e);
                    let _ = events.send(MediaEvent::SinkError(e.to_string()));
                    return;
                }
                let _ = events.send(MediaEvent::WriteComplete);
            }
            SinkCommand::EndOfStream => break,
        }
    }

    // Closing stdin is what tells the player the stream is over.
    if let Err(e) = stdin.shutdown().await {
        log::debug!("[Playback] Closing player pipe: {}", e);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player
// ─────────────────────────────────────────────────────────────────────────────

/// Player half: stopping the process is the only control available.
struct ProcessPlayer {
    stop: Option<oneshot::Sender<()>>,
}

impl ProcessPlayer {
    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Player for ProcessPlayer {
    fn play(&mut self) -> PlaybackResult<()> {
        // The process starts rendering as soon as data reaches its stdin.
        if self.stop.is_none() {
            return Err(PlaybackError::Player("player already released".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.stop();
    }

    fn release(&mut self) {
        self.stop();
    }
}

/// Reports the process exit, or kills it when asked to stop.
async fn watch_player(mut child: Child, stop: oneshot::Receiver<()>, events: MediaEventSender) {
    let exit = tokio::select! {
        status = child.wait() => Some(status),
        _ = stop => None,
    };

    match exit {
        None => {
            if let Err(e) = child.kill().await {
                log::debug!("[Playback] Player already gone: {}", e);
            }
        }
        Some(Ok(status)) if status.success() => {
            let _ = events.send(MediaEvent::PlayerEnded);
        }
        Some(Ok(status)) => {
            let _ = events.send(MediaEvent::PlayerError(format!("player exited with {}", status)));
        }
        Some(Err(e)) => {
            let _ = events.send(MediaEvent::PlayerError(e.to_string()));
        }
    }
}
