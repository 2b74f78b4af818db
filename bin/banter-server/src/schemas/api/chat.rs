//! Request / response types for the chat endpoint.
//!
//! The streamed chunk shape is kept compatible with the OpenAI
//! chat-completion chunk format so existing SSE consumers (and the site's
//! chat widget) work without modification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// The role of the message author (`"system"`, `"user"`, `"assistant"`).
    pub role: String,
    /// The content of the message.
    pub content: String,
    /// Client-side timestamp; accepted but not forwarded upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Request body for `POST /api/chat`.
///
/// The full transcript is resent on every call; the server holds no
/// conversation state between requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation history, oldest first.  Must be non-empty.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// One streamed SSE chunk: `{"choices":[{"delta":{"content": "..."}}]}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatChunk {
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkDelta {
    pub content: String,
}

impl ChatChunk {
    /// Serialized SSE payload carrying one text fragment.
    pub fn frame(fragment: &str) -> String {
        serde_json::json!({ "choices": [{ "delta": { "content": fragment } }] }).to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_matches_the_chunk_shape() {
        let chunk: ChatChunk = serde_json::from_str(&ChatChunk::frame("Hel")).unwrap();
        assert_eq!(chunk.choices.len(), 1);
        assert_eq!(chunk.choices[0].delta.content, "Hel");
    }

    #[test]
    fn missing_messages_field_defaults_to_empty() {
        let request: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(request.messages.is_empty());
    }

    #[test]
    fn timestamp_is_optional() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"Hi","timestamp":"2026-08-06T12:00:00Z"}]}"#,
        )
        .unwrap();
        assert!(request.messages[0].timestamp.is_some());

        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"Hi"}]}"#).unwrap();
        assert!(request.messages[0].timestamp.is_none());
    }
}
