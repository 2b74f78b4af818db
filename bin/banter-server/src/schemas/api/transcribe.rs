//! Response types for the transcription endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `POST /api/transcribe`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscriptionResponse {
    /// The recognized text.
    pub text: String,
}
