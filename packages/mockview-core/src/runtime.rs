//! Task spawning abstraction for playback sessions.
//!
//! Every playback session runs its event loop as one background task. The
//! orchestrator spawns it through [`TaskSpawner`] so embedders can pick the
//! runtime (or a dedicated one) the session loop and its backend tasks run on.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Spawned tasks must keep running after the spawner is dropped; session
/// teardown is signalled through the session itself, never by dropping the
/// task.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner, the default for the orchestrator.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
