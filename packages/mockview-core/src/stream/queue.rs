//! FIFO overflow storage for chunks the sink cannot accept yet.

use std::collections::VecDeque;

use super::Chunk;

/// Ordered backlog of chunks waiting for the sink.
///
/// Empty most of the time: it only fills while an append is in flight or the
/// sink has not opened. The high-water mark is kept for diagnostics.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: VecDeque<Chunk>,
    queued_bytes: usize,
    high_water: usize,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk at the tail.
    pub fn push_back(&mut self, chunk: Chunk) {
        self.queued_bytes += chunk.len();
        self.chunks.push_back(chunk);
        self.high_water = self.high_water.max(self.chunks.len());
    }

    /// Removes the head chunk.
    pub fn pop_front(&mut self) -> Option<Chunk> {
        let chunk = self.chunks.pop_front()?;
        self.queued_bytes -= chunk.len();
        Some(chunk)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total payload bytes currently queued.
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Largest length the queue has reached.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Discards every queued chunk, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.chunks.len();
        self.chunks.clear();
        self.queued_bytes = 0;
        dropped
    }
}
