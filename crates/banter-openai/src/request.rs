//! Request payloads for the hosted API calls this crate performs.

use bytes::Bytes;
use serde::Serialize;

/// A single turn of conversation context sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct InputMessage {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

/// Reasoning controls for the Responses API.
#[derive(Debug, Clone, Serialize)]
pub struct Reasoning {
    /// e.g. `"minimal"`, `"low"`, `"medium"`, `"high"`.
    pub effort: String,
}

/// Text-output controls for the Responses API.
#[derive(Debug, Clone, Serialize)]
pub struct TextOptions {
    /// e.g. `"low"`, `"medium"`, `"high"`.
    pub verbosity: String,
}

/// Body for `POST /responses`.
///
/// Serializes directly to the upstream wire shape; callers fill in their
/// fixed generation parameters and conversation context.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    /// System instruction prepended to the conversation by the API.
    pub instructions: String,
    pub input: Vec<InputMessage>,
    pub stream: bool,
    pub reasoning: Reasoning,
    pub text: TextOptions,
}

/// An audio upload for `POST /audio/transcriptions`.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub model: String,
    pub bytes: Bytes,
    pub filename: String,
    pub mime: String,
}

/// Body for `POST /audio/speech`.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest {
    pub model: String,
    pub voice: String,
    pub input: String,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
