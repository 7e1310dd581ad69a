// Frame and citation types for the streamed answer protocol.
//
// These are the canonical types the whole pipeline operates on: the
// decoder turns raw records into `Frame` values, and the accumulator
// folds them into the growing answer state.

use serde::{Deserialize, Serialize};

/// One decoded logical event from the streamed answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Incremental answer text.
    Text { content: String },
    /// Non-fatal backend-reported error, displayed inline.
    Error { message: String },
    /// Citation records, possibly overlapping previously seen ones.
    Sources { items: Vec<Source> },
    /// Token accounting; latest value wins.
    Usage(Usage),
    /// Elapsed time in milliseconds; latest value wins.
    Latency { millis: u64 },
    /// Terminal sentinel; no further frames follow.
    Done,
}

/// A citation record referencing a document or URL supporting part of
/// the answer.
///
/// Identity for deduplication is the `(url, title)` pair. Everything
/// else rides along untouched — the backend attaches arbitrary extra
/// fields depending on the retrieval path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Retrieval channel, e.g. "rag" or "web".
    #[serde(rename = "type", default = "default_source_type")]
    pub kind: String,
    /// Opaque extra fields, preserved as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_source_type() -> String {
    "rag".to_string()
}

impl Source {
    /// Whether two sources cite the same document.
    ///
    /// Missing url/title are normal equality candidates, not wildcards:
    /// a source with both fields absent only matches another source
    /// that also has both absent.
    pub fn same_citation(&self, other: &Source) -> bool {
        self.url == other.url && self.title == other.title
    }

    /// Human-facing label: title, else url, else a generic placeholder.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("Document")
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

// ---------------------------------------------------------------------------
// Record payloads
// ---------------------------------------------------------------------------

/// Raw shape of one JSON record payload.
///
/// The wire representation is a loosely-typed object, not a single-field
/// union: any subset of the fields may be present in one record. The
/// backend also sends fields this client does not consume (`is_finish`,
/// `request_id`, `rag_result`, ...), which serde ignores.
#[derive(Debug, Deserialize)]
struct RecordPayload {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    latency: Option<u64>,
}

/// Decode one record payload into frames, one per present field.
///
/// Field order matters: an error and text arriving in the same record
/// must land in the answer in that order. Returns `None` if the payload
/// is not a valid record object.
pub fn frames_from_record(payload: &str) -> Option<Vec<Frame>> {
    let record: RecordPayload = serde_json::from_str(payload).ok()?;
    let mut frames = Vec::new();
    if let Some(message) = record.error {
        frames.push(Frame::Error { message });
    }
    if let Some(content) = record.text {
        frames.push(Frame::Text { content });
    }
    if let Some(items) = record.sources {
        frames.push(Frame::Sources { items });
    }
    if let Some(usage) = record.usage {
        frames.push(Frame::Usage(usage));
    }
    if let Some(millis) = record.latency {
        frames.push(Frame::Latency { millis });
    }
    Some(frames)
}
