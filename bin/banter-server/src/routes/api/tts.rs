//! Speech-synthesis endpoint.
//!
//! Quota, validation, one upstream call, encoded audio back.  The voice
//! and model are fixed server-side; clients only supply the text.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use banter_openai::SpeechRequest;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::limit;
use crate::schemas::api::tts::TtsRequest;
use crate::state::AppState;

/// Upper bound on synthesized text; matches the upstream API's input cap.
const MAX_TTS_INPUT_BYTES: usize = 4096;

#[derive(OpenApi)]
#[openapi(paths(tts), components(schemas(TtsRequest)))]
pub struct TtsApi;

/// Register the speech-synthesis route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tts", post(tts))
}

/// Text-to-speech (`POST /api/tts`).
#[utoipa::path(
    post,
    path = "/api/tts",
    tag = "audio",
    request_body = TtsRequest,
    responses(
        (status = 200, description = "Encoded audio (audio/mpeg)"),
        (status = 400, description = "Missing or oversized text"),
        (status = 429, description = "Speech quota exhausted"),
        (status = 500, description = "Upstream failure"),
    )
)]
pub async fn tts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let client = limit::client_key(&headers);
    let decision = state
        .limiter
        .limit(&format!("tts:{client}"), state.config.tts_quota())
        .await
        .map_err(|e| ServerError::LimiterUnavailable(e.to_string()))?;
    if !decision.allowed {
        debug!(client = %client, "speech request rejected by quota");
        return Err(ServerError::RateLimited(decision));
    }

    let Json(request) = payload
        .map_err(|_| ServerError::BadRequest("Invalid JSON in request body".to_owned()))?;

    if request.text.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "Invalid request: non-empty text required".to_owned(),
        ));
    }
    if request.text.len() > MAX_TTS_INPUT_BYTES {
        return Err(ServerError::BadRequest(format!(
            "Invalid request: text too long ({} bytes); maximum is {} bytes",
            request.text.len(),
            MAX_TTS_INPUT_BYTES
        )));
    }

    debug!(client = %client, input_len = request.text.len(), "speech request");

    let audio = state
        .upstream
        .speech(SpeechRequest {
            model: state.config.speech_model.clone(),
            voice: state.config.speech_voice.clone(),
            input: request.text,
        })
        .await?;

    info!(client = %client, audio_bytes = audio.len(), "speech synthesis done");
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
