// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Frame decoder — reassembles the streamed answer from raw chunks.
//
// Responsibilities:
// - Carry unterminated input across arbitrary chunk boundaries
// - Split the buffer on the blank-line record separator
// - Strip the `data: ` prefix and decode JSON payloads into frames
// - Recognize the `[DONE]` sentinel and stop consuming input
// - Skip malformed records without taking down the stream

use crate::frame::{frames_from_record, Frame};

/// Separator between records on the wire.
const RECORD_SEPARATOR: &str = "\n\n";

/// Line prefix marking a meaningful record.
const DATA_PREFIX: &str = "data: ";

/// Sentinel payload terminating the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for the streamed answer protocol.
///
/// Feed chunks with [`FrameDecoder::push`]; each call returns the frames
/// completed by that chunk, in stream order. The unterminated remainder
/// stays buffered for the next chunk, so a record split anywhere —
/// including exactly at the separator — decodes identically to the same
/// record delivered whole. Call [`FrameDecoder::finish`] at end of input
/// to discard a trailing partial record.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Not-yet-terminated input carried across chunks.
    buffer: String,
    /// Set once `[DONE]` is decoded; later input is ignored.
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal sentinel has been decoded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Append a chunk and drain every record it completes.
    pub fn push(&mut self, chunk: &str) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            tracing::trace!(len = chunk.len(), "chunk after [DONE] ignored");
            return frames;
        }
        self.buffer.push_str(chunk);

        while !self.done {
            let Some(pos) = self.buffer.find(RECORD_SEPARATOR) else {
                break;
            };
            let record = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + RECORD_SEPARATOR.len());
            self.decode_record(&record, &mut frames);
        }
        if self.done {
            self.buffer.clear();
        }
        frames
    }

    /// Signal end of input.
    ///
    /// A partial record left in the buffer is discarded — records are
    /// never completed across stream end.
    pub fn finish(&mut self) {
        if !self.buffer.trim().is_empty() {
            tracing::debug!(len = self.buffer.len(), "discarding unterminated partial record");
        }
        self.buffer.clear();
    }

    fn decode_record(&mut self, record: &str, frames: &mut Vec<Frame>) {
        let record = record.trim();
        let Some(payload) = record.strip_prefix(DATA_PREFIX) else {
            if !record.is_empty() {
                tracing::debug!(len = record.len(), "record without data prefix skipped");
            }
            return;
        };
        if payload == DONE_SENTINEL {
            self.done = true;
            frames.push(Frame::Done);
            return;
        }
        match frames_from_record(payload) {
            Some(decoded) => frames.extend(decoded),
            None => tracing::debug!(len = payload.len(), "malformed record skipped"),
        }
    }
}
