//! Streaming event model for the Responses API.
//!
//! The upstream wire protocol tags every SSE payload with a `type` field.
//! Only the output-text delta carries data this crate's consumers care
//! about; every other tag (lifecycle events, reasoning summaries, future
//! additions) decodes into [`ResponseEvent::Other`] so new upstream event
//! types never break the stream.

use serde::Deserialize;

/// One decoded event from an upstream response stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseEvent {
    /// An incremental fragment of the generated text.
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// The text fragment; concatenating all deltas yields the full output.
        delta: String,
    },

    /// Any event tag this crate does not recognize.  Ignored by consumers.
    #[serde(other)]
    Other,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
