//! Request types for the speech-synthesis endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/tts`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TtsRequest {
    /// The text to synthesize.  Must be non-empty.
    pub text: String,
}
