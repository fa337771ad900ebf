//! Speech stream decoding and single-writer sink coordination.
//!
//! A speech reply arrives as newline-delimited base64 text. The
//! [`decoder`] turns raw body reads into ordered audio [`Chunk`]s, the
//! [`queue`] absorbs chunks while the sink is busy, and the [`sink`]
//! adapter guarantees that the media sink sees exactly one append at a time,
//! in arrival order, with end-of-stream applied only after the backlog drains.

pub mod decoder;
pub mod queue;
pub mod sink;

pub use decoder::{decode_stream, DecodeSummary, DecoderEvent, FrameDecoder, Frames};
pub use queue::ChunkQueue;
pub use sink::{SinkAdapter, SinkState};

use bytes::Bytes;

/// One decoded audio frame.
///
/// Chunks carry no identity beyond their position in the stream; cloning is
/// an O(1) reference count bump.
pub type Chunk = Bytes;
