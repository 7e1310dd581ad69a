// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// History API types.
//
// The backend logs every completed answer; these are the shapes returned
// by `GET /api/v1/chat/history`. Consumed by the CLI history view — this
// client exposes no history surface of its own.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::frame::{Source, Usage};

/// One saved question/answer pair.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub session_id: Option<String>,
    pub request_id: String,
    pub user_query: String,
    #[serde(default)]
    pub ai_response: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    #[serde(default)]
    pub metadata_info: Option<HistoryMetadata>,
    /// Stored by the backend without an offset.
    pub created_at: NaiveDateTime,
}

/// Usage/latency captured when the answer finished.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryMetadata {
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub latency: Option<u64>,
}

impl HistoryEntry {
    /// Short answer preview for list views.
    pub fn preview(&self, max_chars: usize) -> String {
        let answer = self.ai_response.as_deref().unwrap_or("");
        let mut preview: String = answer.chars().take(max_chars).collect();
        if answer.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_entry_deserializes() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 7,
            "session_id": "sess-abc-123456789",
            "request_id": "req-1",
            "user_query": "What is Lumi?",
            "ai_response": "A chat client.",
            "sources": [{"title": "Doc", "url": "https://a"}],
            "metadata_info": {
                "usage": {"input_tokens": 10, "output_tokens": 20},
                "latency": 1234,
                "rag_result": {"ignored": true}
            },
            "created_at": "2026-08-08T10:00:00.123456"
        }))
        .unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.user_query, "What is Lumi?");
        assert_eq!(entry.sources.as_ref().unwrap().len(), 1);
        let meta = entry.metadata_info.unwrap();
        assert_eq!(meta.usage.unwrap().total(), 30);
        assert_eq!(meta.latency, Some(1234));
    }

    #[test]
    fn minimal_entry_deserializes() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 1,
            "request_id": "req-2",
            "user_query": "hi",
            "created_at": "2026-01-01T00:00:00"
        }))
        .unwrap();
        assert_eq!(entry.session_id, None);
        assert_eq!(entry.ai_response, None);
        assert!(entry.sources.is_none());
        assert!(entry.metadata_info.is_none());
    }

    #[test]
    fn preview_truncates_long_answers() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 1,
            "request_id": "req-3",
            "user_query": "q",
            "ai_response": "abcdefghij",
            "created_at": "2026-01-01T00:00:00"
        }))
        .unwrap();
        assert_eq!(entry.preview(4), "abcd...");
        assert_eq!(entry.preview(10), "abcdefghij");
        assert_eq!(entry.preview(100), "abcdefghij");
    }

    #[test]
    fn preview_of_missing_answer_is_empty() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 1,
            "request_id": "req-4",
            "user_query": "q",
            "created_at": "2026-01-01T00:00:00"
        }))
        .unwrap();
        assert_eq!(entry.preview(10), "");
    }
}
