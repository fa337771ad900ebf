//! Line-framed base64 frame decoding.
//!
//! The backend writes every MP3 frame as one base64 line terminated by `\n`.
//! Network reads align with neither line nor code point boundaries, so the
//! decoder carries two kinds of leftovers between reads:
//!
//! - the bytes of a UTF-8 code point cut by the read boundary
//! - the text after the last newline (a line that is not complete yet)
//!
//! A line is only base64-decoded once its terminating newline has arrived, or
//! when the stream ends.

use std::fmt::Display;

use async_stream::stream;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use futures::{Stream, StreamExt};
use serde::Serialize;

use super::Chunk;
use crate::error::PlaybackError;

/// Standard alphabet, padding optional on decode (matches browser `atob`).
const FRAME_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Counters reported once the stream is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeSummary {
    /// Frames emitted.
    pub frames: u64,
    /// Malformed lines that were logged and dropped.
    pub skipped: u64,
}

/// Stateful decoder from raw body bytes to audio chunks.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Leading bytes of a code point split across reads.
    utf8_tail: Vec<u8>,
    /// Decoded text not yet consumed as lines.
    text: String,
    /// Offset in `text` of the first unconsumed line.
    cursor: usize,
    summary: DecodeSummary,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network read and returns the frames it completes.
    ///
    /// The returned iterator is lazy: lines are base64-decoded as it is
    /// advanced. Lines left unconsumed when it is dropped are yielded by the
    /// next call, so nothing is lost by stopping early.
    pub fn feed(&mut self, raw: &[u8]) -> Frames<'_> {
        self.compact();
        self.push_utf8(raw);
        Frames { decoder: self }
    }

    /// Signals that the body is exhausted and returns the remaining frames.
    ///
    /// A trailing line without a newline is decoded as a final frame; an
    /// incomplete code point at the very end cannot be completed and is
    /// dropped.
    pub fn finish(&mut self) -> Frames<'_> {
        self.compact();
        if !self.utf8_tail.is_empty() {
            log::warn!(
                "[Decoder] Discarding {} bytes of an incomplete UTF-8 sequence at end of stream",
                self.utf8_tail.len()
            );
            self.utf8_tail.clear();
        }
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        Frames { decoder: self }
    }

    /// Frames emitted and lines skipped so far.
    pub fn summary(&self) -> DecodeSummary {
        self.summary
    }

    /// Length of the carried-over line fragment, in bytes.
    pub fn pending_len(&self) -> usize {
        self.text.len() - self.cursor + self.utf8_tail.len()
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.text.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    /// Appends `raw` to the text buffer, keeping an incomplete trailing code
    /// point for the next read. Invalid sequences become U+FFFD.
    fn push_utf8(&mut self, raw: &[u8]) {
        let joined;
        let mut input: &[u8] = if self.utf8_tail.is_empty() {
            raw
        } else {
            let mut buf = std::mem::take(&mut self.utf8_tail);
            buf.extend_from_slice(raw);
            joined = buf;
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            self.utf8_tail = rest.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Takes the next complete line, if any.
    fn next_line(&mut self) -> Option<(usize, usize)> {
        let rel = self.text[self.cursor..].find('\n')?;
        let span = (self.cursor, self.cursor + rel);
        self.cursor += rel + 1;
        Some(span)
    }

    fn decode_line(line: &str) -> Option<Result<Chunk, PlaybackError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(
            FRAME_ENGINE
                .decode(line)
                .map(Chunk::from)
                .map_err(|e| PlaybackError::Decode(e.to_string())),
        )
    }
}

/// Lazy sequence of frames completed by one [`FrameDecoder::feed`] call.
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            let (start, end) = self.decoder.next_line()?;
            match FrameDecoder::decode_line(&self.decoder.text[start..end]) {
                None => continue,
                Some(Ok(chunk)) => {
                    self.decoder.summary.frames += 1;
                    return Some(chunk);
                }
                Some(Err(err)) => {
                    self.decoder.summary.skipped += 1;
                    log::warn!("[Decoder] Skipping malformed frame: {}", err);
                }
            }
        }
    }
}

/// Items produced by [`decode_stream`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEvent {
    /// One decoded frame, in arrival order.
    Frame(Chunk),
    /// The body is exhausted. Always the last item on success.
    End(DecodeSummary),
    /// Reading the body failed. Always the last item on failure.
    Failed(PlaybackError),
}

/// Decodes a response body into frames followed by exactly one terminal item.
///
/// Nothing is read from `body` until the returned stream is polled.
pub fn decode_stream<S, E>(body: S) -> impl Stream<Item = DecoderEvent> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send,
    E: Display + Send,
{
    stream! {
        let mut decoder = FrameDecoder::new();
        futures::pin_mut!(body);

        while let Some(read) = body.next().await {
            match read {
                Ok(bytes) => {
                    log::trace!("[Decoder] Read {} bytes", bytes.len());
                    for chunk in decoder.feed(&bytes) {
                        yield DecoderEvent::Frame(chunk);
                    }
                }
                Err(err) => {
                    log::warn!("[Decoder] Body read failed: {}", err);
                    yield DecoderEvent::Failed(PlaybackError::NetworkRead(err.to_string()));
                    return;
                }
            }
        }

        for chunk in decoder.finish() {
            yield DecoderEvent::Frame(chunk);
        }
        let summary = decoder.summary();
        log::debug!(
            "[Decoder] Stream exhausted: frames={}, skipped={}",
            summary.frames,
            summary.skipped
        );
        yield DecoderEvent::End(summary);
    }
}
