// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Response accumulator — folds decoded frames into the growing answer.
//
// The accumulator owns the answer state for exactly one in-flight
// request. It is a fold: frames go in, in decode order, and after every
// frame that changed something the observer receives a snapshot. The
// state is discarded with the accumulator once the stream ends; a new
// question starts from a fresh one.

use std::sync::Arc;

use super::dedup::should_append;
use crate::client::ChatError;
use crate::frame::{Frame, Source, Usage};

/// Prefix tagging inline backend-reported errors in the answer text.
pub const ERROR_MARKER: &str = "⚠";

/// Render a backend-reported error as an inline text marker.
///
/// The marker lands in [`AnswerState::text`] like ordinary content but
/// on its own line with the [`ERROR_MARKER`] prefix, so renderers can
/// pick the line out and style it.
pub fn error_marker(message: &str) -> String {
    format!("\n{ERROR_MARKER} {message}\n")
}

/// The growing answer for one in-flight request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerState {
    /// Answer text, append-only within a request. Inline error markers
    /// appear in arrival order.
    pub text: String,
    /// Citations, append-unique in insertion order. Never reordered,
    /// never removed.
    pub sources: Vec<Source>,
    /// Last reported token accounting.
    pub usage: Option<Usage>,
    /// Last reported elapsed time in milliseconds.
    pub latency_ms: Option<u64>,
    /// Whether the terminal sentinel has been applied.
    pub terminated: bool,
}

/// Receives state snapshots as the answer grows.
///
/// `on_snapshot` fires after every frame that changed the state —
/// per-frame, not batched, so text can be rendered character by
/// character. `on_end` fires exactly once per request when the stream
/// ends, successfully or not.
pub trait AnswerObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &AnswerState);
    fn on_end(&self, outcome: Result<&AnswerState, &ChatError>);
}

/// Fold driver owning the answer state for one request.
pub struct ResponseAccumulator {
    state: AnswerState,
    observer: Arc<dyn AnswerObserver>,
}

impl ResponseAccumulator {
    pub fn new(observer: Arc<dyn AnswerObserver>) -> Self {
        Self {
            state: AnswerState::default(),
            observer,
        }
    }

    pub fn state(&self) -> &AnswerState {
        &self.state
    }

    pub fn into_state(self) -> AnswerState {
        self.state
    }

    /// Apply one frame, notifying the observer if the state changed.
    ///
    /// Frames arriving after `Done` are a protocol violation; they are
    /// ignored rather than crashing the pipeline.
    pub fn apply(&mut self, frame: Frame) {
        if self.state.terminated {
            tracing::debug!(?frame, "frame after Done ignored");
            return;
        }
        let changed = match frame {
            Frame::Text { content } => {
                if content.is_empty() {
                    false
                } else {
                    self.state.text.push_str(&content);
                    true
                }
            }
            Frame::Error { message } => {
                self.state.text.push_str(&error_marker(&message));
                true
            }
            Frame::Sources { items } => {
                let before = self.state.sources.len();
                for item in items {
                    if should_append(&self.state.sources, &item) {
                        self.state.sources.push(item);
                    }
                }
                self.state.sources.len() != before
            }
            Frame::Usage(usage) => {
                self.state.usage = Some(usage);
                true
            }
            Frame::Latency { millis } => {
                self.state.latency_ms = Some(millis);
                true
            }
            Frame::Done => {
                self.state.terminated = true;
                false
            }
        };
        if changed {
            self.observer.on_snapshot(&self.state);
        }
    }
}
