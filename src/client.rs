// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Chat client — the single seam between a front-end and the backend.
//
// Responsibilities:
// - POST the question with the session id and stream the response body
// - Pipe chunks through the frame decoder and fold each frame into the
//   accumulator, interleaved in the calling task
// - Enforce at most one in-flight request, released on every exit path
// - History listing and deletion

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::history::HistoryEntry;
use crate::session::SessionProvider;
use crate::stream::{AnswerObserver, AnswerState, FrameDecoder, ResponseAccumulator};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the chat client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A previous answer is still streaming; one request at a time.
    #[error("a request is already in flight")]
    Busy,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("backend returned status {status}")]
    Http { status: u16 },

    #[error("history entry {id} not found")]
    NotFound { id: i64 },
}

impl ChatError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout(e.to_string())
        } else {
            ChatError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    session_id: &'a str,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// HTTP client for the chat backend.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
    history_limit: usize,
    session: SessionProvider,
    in_flight: AtomicBool,
}

impl ChatClient {
    pub fn new(config: &ClientConfig, session: SessionProvider) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.backend.base_url.clone(),
            timeout: config.backend.timeout_ms.map(Duration::from_millis),
            history_limit: config.history.limit,
            session,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The session identifier attached to outgoing questions.
    pub fn session_id(&self) -> String {
        self.session.get()
    }

    /// Ask a question and stream the answer into `observer`.
    ///
    /// Returns the final answer state. At most one ask may be in flight:
    /// a second call while one is streaming fails with [`ChatError::Busy`]
    /// without touching the network. The in-flight gate is released on
    /// every exit path — success, malformed-stream end, or transport
    /// failure — and `on_end` fires exactly once either way.
    pub async fn ask(
        &self,
        question: &str,
        observer: Arc<dyn AnswerObserver>,
    ) -> Result<AnswerState, ChatError> {
        let _guard = AdmissionGuard::acquire(&self.in_flight)?;
        let result = self.stream_answer(question, observer.clone()).await;
        match &result {
            Ok(state) => observer.on_end(Ok(state)),
            Err(e) => {
                tracing::warn!(error = %e, "answer stream failed");
                observer.on_end(Err(e));
            }
        }
        result
    }

    async fn stream_answer(
        &self,
        question: &str,
        observer: Arc<dyn AnswerObserver>,
    ) -> Result<AnswerState, ChatError> {
        let session_id = self.session.get();
        let url = format!("{}/api/v1/chat/ask", self.base_url);
        tracing::debug!(%url, %session_id, "sending question");

        let mut request = self.http.post(&url).json(&AskRequest {
            question,
            session_id: &session_id,
        });
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(ChatError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ChatError::from_reqwest));
        fold_answer_stream(Box::pin(body), observer).await
    }

    /// Fetch the most recent answers, newest first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ChatError> {
        let url = format!("{}/api/v1/chat/history", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("limit", self.history_limit)])
            .send()
            .await
            .map_err(ChatError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }
        response
            .json::<Vec<HistoryEntry>>()
            .await
            .map_err(ChatError::from_reqwest)
    }

    /// Delete one saved answer by id.
    pub async fn delete_history(&self, id: i64) -> Result<(), ChatError> {
        let url = format!("{}/api/v1/chat/history/{id}", self.base_url);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(ChatError::from_reqwest)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChatError::NotFound { id });
        }
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stream folding
// ---------------------------------------------------------------------------

/// Decode and fold a streamed response body.
///
/// Decoder and accumulator run interleaved in the calling task: the loop
/// suspends awaiting the next chunk, drains the frames that chunk
/// completed, and applies each in arrival order. A transport error
/// aborts the fold immediately and the partial state is dropped.
async fn fold_answer_stream(
    mut body: impl Stream<Item = Result<Bytes, ChatError>> + Unpin,
    observer: Arc<dyn AnswerObserver>,
) -> Result<AnswerState, ChatError> {
    let mut decoder = FrameDecoder::new();
    let mut accumulator = ResponseAccumulator::new(observer);

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for frame in decoder.push(&String::from_utf8_lossy(&chunk)) {
            accumulator.apply(frame);
        }
        if decoder.is_done() {
            break;
        }
    }
    decoder.finish();
    Ok(accumulator.into_state())
}

// ---------------------------------------------------------------------------
// Admission control
// ---------------------------------------------------------------------------

/// Holds the single-request admission slot.
///
/// Dropping the guard reopens the gate, which gives the
/// release-on-every-exit-path guarantee without any explicit cleanup at
/// the call sites.
struct AdmissionGuard<'a> {
    gate: &'a AtomicBool,
}

impl<'a> AdmissionGuard<'a> {
    fn acquire(gate: &'a AtomicBool) -> Result<Self, ChatError> {
        match gate.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(Self { gate }),
            Err(_) => Err(ChatError::Busy),
        }
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.gate.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
