//! Single-writer sink coordination.
//!
//! A media sink accepts one append at a time and reports completion
//! asynchronously. [`SinkAdapter`] sits in front of it and owns the
//! [`ChunkQueue`], so that:
//!
//! - at most one append is in flight
//! - chunks reach the sink in arrival order and none is dropped
//! - end-of-stream is applied only once the queue is empty and the last
//!   append has completed
//!
//! ```text
//!            open                    append
//! Unopened ───────▶ Ready ◀───────▶ Appending
//!                     │   write complete  │
//!                     │ end (queue empty) │ failure
//!                     ▼                   ▼
//!                   Ended               Error
//! ```
//!
//! The adapter is driven entirely by its caller (the session event loop); it
//! never blocks and never spawns.

use serde::Serialize;

use super::{Chunk, ChunkQueue};
use crate::error::{PlaybackError, PlaybackResult};
use crate::media::MediaSink;

/// Lifecycle of the session's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SinkState {
    /// Waiting for the sink's open signal. Chunks are queued.
    Unopened,
    /// Open and idle: the next chunk may be appended directly.
    Ready,
    /// One append is in flight.
    Appending,
    /// End-of-stream applied and acknowledged.
    Ended,
    /// A write or sink failure occurred. No further writes.
    Error,
}

impl SinkState {
    /// Returns true once no further writes can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Error)
    }
}

/// State machine guarding a single-writer [`MediaSink`].
pub struct SinkAdapter<K> {
    sink: K,
    state: SinkState,
    queue: ChunkQueue,
    /// End-of-sequence received but not yet applied to the sink.
    end_held: bool,
    appended: u64,
}

impl<K: MediaSink> SinkAdapter<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            state: SinkState::Unopened,
            queue: ChunkQueue::new(),
            end_held: false,
            appended: 0,
        }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Chunks waiting for the sink.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Largest backlog seen during the session.
    pub fn queue_high_water(&self) -> usize {
        self.queue.high_water()
    }

    /// Chunks handed to the sink so far.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Returns true while end-of-sequence is waiting for the backlog to drain.
    pub fn end_pending(&self) -> bool {
        self.end_held
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Handles the sink's open signal (`Unopened → Ready`), then drains.
    pub fn on_open(&mut self) -> PlaybackResult<()> {
        if self.state != SinkState::Unopened {
            log::warn!("[Sink] Ignoring open signal in state {:?}", self.state);
            return Ok(());
        }
        log::debug!("[Sink] Opened with {} queued chunks", self.queue.len());
        self.state = SinkState::Ready;
        self.pump()
    }

    /// Accepts the next chunk from the decoder.
    ///
    /// Appends directly only when the sink is idle and nothing is queued;
    /// otherwise the chunk goes to the queue tail so it cannot overtake
    /// earlier chunks.
    pub fn push(&mut self, chunk: Chunk) -> PlaybackResult<()> {
        match self.state {
            SinkState::Ready if self.queue.is_empty() => self.write(chunk),
            SinkState::Unopened | SinkState::Ready | SinkState::Appending => {
                self.queue.push_back(chunk);
                log::trace!(
                    "[Sink] Backlog {} chunks, {} bytes",
                    self.queue.len(),
                    self.queue.queued_bytes()
                );
                self.pump()
            }
            SinkState::Ended | SinkState::Error => {
                log::debug!(
                    "[Sink] Discarding {} byte chunk after sink reached {:?}",
                    chunk.len(),
                    self.state
                );
                Ok(())
            }
        }
    }

    /// Handles the sink's write-complete signal (`Appending → Ready`), then
    /// drains the next chunk or applies a held end-of-stream.
    pub fn on_write_complete(&mut self) -> PlaybackResult<()> {
        if self.state != SinkState::Appending {
            log::warn!("[Sink] Spurious write-complete in state {:?}", self.state);
            return Ok(());
        }
        self.state = SinkState::Ready;
        self.pump()
    }

    /// Records the decoder's end-of-sequence marker.
    ///
    /// Applied immediately if the sink is idle with an empty queue, otherwise
    /// held until the write-complete that leaves the queue empty.
    pub fn finish(&mut self) -> PlaybackResult<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.end_held = true;
        self.pump()
    }

    /// Handles a sink-level failure reported asynchronously.
    pub fn on_error(&mut self, reason: String) -> PlaybackError {
        let err = PlaybackError::SinkWrite(reason);
        self.enter_error(&err);
        err
    }

    /// Abandons the sink: discards the queue and closes it without draining.
    pub fn abort(&mut self) {
        let dropped_bytes = self.queue.queued_bytes();
        let dropped = self.queue.clear();
        self.end_held = false;
        if !self.state.is_terminal() {
            log::debug!(
                "[Sink] Aborting in state {:?}, {} chunks ({} bytes) dropped",
                self.state,
                dropped,
                dropped_bytes
            );
            self.sink.abort();
            self.state = SinkState::Ended;
        }
    }

    fn pump(&mut self) -> PlaybackResult<()> {
        if self.state != SinkState::Ready {
            return Ok(());
        }
        if let Some(chunk) = self.queue.pop_front() {
            return self.write(chunk);
        }
        if self.end_held {
            self.end_held = false;
            return match self.sink.end_of_stream() {
                Ok(()) => {
                    log::debug!(
                        "[Sink] End of stream applied after {} appends (max backlog {})",
                        self.appended,
                        self.queue.high_water()
                    );
                    self.state = SinkState::Ended;
                    Ok(())
                }
                Err(err) => {
                    self.enter_error(&err);
                    Err(err)
                }
            };
        }
        Ok(())
    }

    fn write(&mut self, chunk: Chunk) -> PlaybackResult<()> {
        debug_assert_eq!(self.state, SinkState::Ready);
        match self.sink.append(chunk) {
            Ok(()) => {
                self.appended += 1;
                self.state = SinkState::Appending;
                Ok(())
            }
            Err(err) => {
                self.enter_error(&err);
                Err(err)
            }
        }
    }

    fn enter_error(&mut self, err: &PlaybackError) {
        let dropped = self.queue.clear();
        self.end_held = false;
        self.state = SinkState::Error;
        log::error!("[Sink] {} ({} queued chunks dropped)", err, dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records appends and enforces the single-writer contract.
    #[derive(Default)]
    struct RecordingSink {
        written: Vec<Chunk>,
        in_flight: bool,
        ended: bool,
        aborted: bool,
        fail_on_append: Option<usize>,
    }

    impl MediaSink for RecordingSink {
        fn append(&mut self, chunk: Chunk) -> PlaybackResult<()> {
            assert!(!self.in_flight, "second append while one is in flight");
            assert!(!self.ended, "append after end of stream");
            if self.fail_on_append == Some(self.written.len()) {
                return Err(PlaybackError::SinkWrite("quota exceeded".into()));
            }
            self.in_flight = true;
            self.written.push(chunk);
            Ok(())
        }

        fn end_of_stream(&mut self) -> PlaybackResult<()> {
            assert!(!self.in_flight, "end of stream while an append is in flight");
            self.ended = true;
            Ok(())
        }

        fn abort(&mut self) {
            self.aborted = true;
        }
    }

    fn chunk(n: u8) -> Chunk {
        Chunk::from(vec![n; 3])
    }

    fn complete(adapter: &mut SinkAdapter<RecordingSink>) {
        adapter.sink_mut().in_flight = false;
        adapter.on_write_complete().unwrap();
    }

    fn open_adapter() -> SinkAdapter<RecordingSink> {
        let mut adapter = SinkAdapter::new(RecordingSink::default());
        adapter.on_open().unwrap();
        adapter
    }

    #[test]
    fn idle_sink_appends_directly() {
        let mut adapter = open_adapter();
        adapter.push(chunk(1)).unwrap();
        assert_eq!(adapter.state(), SinkState::Appending);
        assert_eq!(adapter.queue_len(), 0);
        assert_eq!(adapter.sink().written, vec![chunk(1)]);
    }

    #[test]
    fn busy_sink_backlog_keeps_order_and_bounds_queue() {
        let mut adapter = open_adapter();
        for n in 0..5 {
            adapter.push(chunk(n)).unwrap();
            assert!(adapter.queue_len() <= 4);
        }
        assert_eq!(adapter.queue_len(), 4);

        while adapter.state() == SinkState::Appending {
            complete(&mut adapter);
        }

        let expected: Vec<_> = (0..5).map(chunk).collect();
        assert_eq!(adapter.sink().written, expected);
        assert_eq!(adapter.queue_high_water(), 4);
        assert_eq!(adapter.state(), SinkState::Ready);
    }

    #[test]
    fn chunks_before_open_are_queued_then_drained() {
        let mut adapter = SinkAdapter::new(RecordingSink::default());
        adapter.push(chunk(1)).unwrap();
        adapter.push(chunk(2)).unwrap();
        assert_eq!(adapter.state(), SinkState::Unopened);
        assert!(adapter.sink().written.is_empty());

        adapter.on_open().unwrap();
        assert_eq!(adapter.sink().written, vec![chunk(1)]);
        complete(&mut adapter);
        assert_eq!(adapter.sink().written, vec![chunk(1), chunk(2)]);
    }

    #[test]
    fn interleaved_arrivals_never_overtake_queue() {
        // Completion timing varies; the observed order must not.
        let mut adapter = open_adapter();
        let mut next = 0u8;
        for round in 0..20u8 {
            for _ in 0..(round % 3) {
                adapter.push(chunk(next)).unwrap();
                next += 1;
            }
            if round % 2 == 0 && adapter.state() == SinkState::Appending {
                complete(&mut adapter);
            }
        }
        while adapter.state() == SinkState::Appending {
            complete(&mut adapter);
        }
        let expected: Vec<_> = (0..next).map(chunk).collect();
        assert_eq!(adapter.sink().written, expected);
        assert_eq!(adapter.appended(), u64::from(next));
    }

    #[test]
    fn end_is_held_until_queue_drains() {
        let mut adapter = open_adapter();
        for n in 0..3 {
            adapter.push(chunk(n)).unwrap();
        }
        adapter.finish().unwrap();
        assert!(adapter.end_pending());
        assert!(!adapter.sink().ended);

        complete(&mut adapter);
        complete(&mut adapter);
        assert!(!adapter.sink().ended, "end applied with a write in flight");

        complete(&mut adapter);
        assert!(adapter.sink().ended);
        assert_eq!(adapter.state(), SinkState::Ended);
        assert_eq!(adapter.sink().written.len(), 3);
    }

    #[test]
    fn empty_stream_ends_without_appending() {
        let mut adapter = open_adapter();
        adapter.finish().unwrap();
        assert_eq!(adapter.state(), SinkState::Ended);
        assert!(adapter.sink().written.is_empty());
        assert_eq!(adapter.queue_high_water(), 0);
    }

    #[test]
    fn end_before_open_is_applied_after_drain() {
        let mut adapter = SinkAdapter::new(RecordingSink::default());
        adapter.push(chunk(7)).unwrap();
        adapter.finish().unwrap();
        adapter.on_open().unwrap();
        assert!(!adapter.sink().ended);
        complete(&mut adapter);
        assert!(adapter.sink().ended);
    }

    #[test]
    fn append_failure_enters_error_and_stops_writes() {
        let mut adapter = open_adapter();
        adapter.sink_mut().fail_on_append = Some(1);
        adapter.push(chunk(0)).unwrap();
        adapter.push(chunk(1)).unwrap();
        adapter.push(chunk(2)).unwrap();

        adapter.sink_mut().in_flight = false;
        let err = adapter.on_write_complete().unwrap_err();
        assert!(matches!(err, PlaybackError::SinkWrite(_)));
        assert_eq!(adapter.state(), SinkState::Error);
        assert_eq!(adapter.queue_len(), 0);

        adapter.push(chunk(3)).unwrap();
        adapter.finish().unwrap();
        assert_eq!(adapter.sink().written, vec![chunk(0)]);
        assert!(!adapter.sink().ended);
    }

    #[test]
    fn sink_error_event_enters_error() {
        let mut adapter = open_adapter();
        adapter.push(chunk(0)).unwrap();
        let err = adapter.on_error("decoder rejected data".into());
        assert_eq!(err, PlaybackError::SinkWrite("decoder rejected data".into()));
        assert_eq!(adapter.state(), SinkState::Error);
    }

    #[test]
    fn spurious_write_complete_is_ignored() {
        let mut adapter = open_adapter();
        adapter.on_write_complete().unwrap();
        assert_eq!(adapter.state(), SinkState::Ready);
    }

    #[test]
    fn abort_discards_queue_and_closes_sink() {
        let mut adapter = open_adapter();
        adapter.push(chunk(0)).unwrap();
        adapter.push(chunk(1)).unwrap();
        adapter.abort();
        assert_eq!(adapter.state(), SinkState::Ended);
        assert_eq!(adapter.queue_len(), 0);
        assert!(adapter.sink().aborted);
    }
}
