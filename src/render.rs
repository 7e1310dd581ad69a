// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Terminal renderer — the CLI's answer view.
//
// Streams text to stdout as it arrives (only the suffix appended since
// the previous snapshot), then prints sources and stats once the answer
// finishes. Backend-reported errors are already tagged inline by the
// accumulator; a terminal failure gets its own inline marker here.

use std::io::Write;
use std::sync::Mutex;

use crate::client::ChatError;
use crate::frame::Usage;
use crate::stream::{AnswerObserver, AnswerState};

/// Renders streaming answers to stdout.
///
/// Tracks how many bytes of the answer text have been printed so each
/// snapshot only emits the new tail. The text is append-only within a
/// request, so a byte cursor is enough; use a fresh renderer per
/// question.
#[derive(Default)]
pub struct TerminalRenderer {
    printed: Mutex<usize>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnswerObserver for TerminalRenderer {
    fn on_snapshot(&self, snapshot: &AnswerState) {
        let mut printed = self.printed.lock().unwrap_or_else(|e| e.into_inner());
        if snapshot.text.len() > *printed {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{}", &snapshot.text[*printed..]);
            let _ = stdout.flush();
            *printed = snapshot.text.len();
        }
    }

    fn on_end(&self, outcome: Result<&AnswerState, &ChatError>) {
        let mut stdout = std::io::stdout().lock();
        match outcome {
            Ok(state) => {
                let _ = writeln!(stdout);
                if !state.sources.is_empty() {
                    let _ = writeln!(stdout, "\nSources:");
                    for source in &state.sources {
                        let _ = writeln!(stdout, "  [{}] {}", source.kind, source.label());
                    }
                }
                if let Some(stats) = format_stats(state.latency_ms, state.usage.as_ref()) {
                    let _ = writeln!(stdout, "\n{stats}");
                }
            }
            Err(e) => {
                let _ = writeln!(stdout, "\n[failed: {e}]");
            }
        }
        let _ = stdout.flush();
    }
}

// ---------------------------------------------------------------------------
// Metadata formatting
// ---------------------------------------------------------------------------

/// Format elapsed time: seconds above one second, milliseconds below.
pub fn format_latency(millis: u64) -> String {
    if millis > 1000 {
        format!("{:.2}s", millis as f64 / 1000.0)
    } else {
        format!("{millis}ms")
    }
}

/// Format token usage as `total tokens (In:i/Out:o)`.
pub fn format_usage(usage: &Usage) -> String {
    format!(
        "{} tokens (In:{}/Out:{})",
        usage.total(),
        usage.input_tokens,
        usage.output_tokens
    )
}

fn format_stats(latency_ms: Option<u64>, usage: Option<&Usage>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(millis) = latency_ms {
        parts.push(format_latency(millis));
    }
    if let Some(usage) = usage {
        parts.push(format_usage(usage));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}
