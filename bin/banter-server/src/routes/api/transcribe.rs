//! Audio transcription endpoint.
//!
//! Same pipeline shape as chat (quota, validation, one upstream call,
//! mapped errors), but the upstream call is a plain request/response, so
//! no streaming translation is involved.  Accepts an audio clip via
//! multipart/form-data (the site's voice widget records webm/opus).

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use banter_openai::TranscriptionRequest;
use bytes::Bytes;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::limit;
use crate::schemas::api::transcribe::TranscriptionResponse;
use crate::state::AppState;

const ALLOWED_MIME_TYPES: [&str; 10] = [
    "audio/mpeg",   // MP3
    "audio/mp4",    // M4A
    "audio/x-m4a",  // M4A (alternative)
    "audio/wav",    // WAV
    "audio/wave",   // WAV (alternative)
    "audio/x-wav",  // WAV (alternative)
    "audio/webm",   // browser MediaRecorder default
    "audio/ogg",    // OGG/Opus
    "audio/flac",   // FLAC
    "audio/x-flac", // FLAC (alternative)
];

#[derive(OpenApi)]
#[openapi(paths(transcribe), components(schemas(TranscriptionResponse)))]
pub struct TranscribeApi;

/// Register the transcription route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/transcribe", post(transcribe))
}

/// Speech-to-text (`POST /api/transcribe`).
///
/// Accepts a single `file` field via multipart/form-data.  File size is
/// capped while streaming the upload and the MIME type must be on the
/// audio allowlist before any byte is forwarded upstream.
#[utoipa::path(
    post,
    path = "/api/transcribe",
    tag = "audio",
    responses(
        (status = 200, description = "Transcription", body = TranscriptionResponse),
        (status = 400, description = "Missing, oversized, or non-audio upload"),
        (status = 429, description = "Transcription quota exhausted"),
        (status = 500, description = "Upstream failure"),
    )
)]
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>, ServerError> {
    let client = limit::client_key(&headers);
    let decision = state
        .limiter
        .limit(&format!("transcribe:{client}"), state.config.transcribe_quota())
        .await
        .map_err(|e| ServerError::LimiterUnavailable(e.to_string()))?;
    if !decision.allowed {
        debug!(client = %client, "transcription request rejected by quota");
        return Err(ServerError::RateLimited(decision));
    }

    let mut multipart = multipart
        .map_err(|_| ServerError::BadRequest("multipart form data required".to_owned()))?;

    let max_upload_size_bytes = state.config.max_upload_size_mb * 1024 * 1024;

    let mut file_bytes: Vec<u8> = Vec::new();
    let mut file_name = String::new();
    let mut content_type = String::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or("unknown").to_owned();
        if field_name != "file" {
            return Err(ServerError::BadRequest(format!("Unknown field: {field_name}")));
        }

        file_name = field.file_name().unwrap_or("audio").to_owned();
        content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();

        if !content_type.starts_with("audio/") {
            return Err(ServerError::BadRequest(format!(
                "Invalid file type: {content_type}. Only audio files are allowed."
            )));
        }
        if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
            return Err(ServerError::BadRequest(format!(
                "Unsupported audio format: {content_type}. \
                 Supported formats: MP3, M4A, WAV, WebM, OGG, FLAC"
            )));
        }

        // Stream the upload, enforcing the size cap as chunks arrive.
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Failed to read file chunk: {e}")))?
        {
            file_bytes.extend_from_slice(&chunk);
            if file_bytes.len() > max_upload_size_bytes {
                return Err(ServerError::BadRequest(format!(
                    "File too large: {} bytes exceeds maximum of {}MB",
                    file_bytes.len(),
                    state.config.max_upload_size_mb
                )));
            }
        }
    }

    if file_bytes.is_empty() {
        return Err(ServerError::BadRequest("No file uploaded".to_owned()));
    }

    debug!(
        client = %client,
        file_name = %file_name,
        content_type = %content_type,
        size_bytes = file_bytes.len(),
        "transcription request"
    );

    let text = state
        .upstream
        .transcribe(TranscriptionRequest {
            model: state.config.transcribe_model.clone(),
            bytes: Bytes::from(file_bytes),
            filename: file_name,
            mime: content_type,
        })
        .await?;

    info!(client = %client, output_len = text.len(), "transcription done");
    Ok(Json(TranscriptionResponse { text }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::testing::{ScriptedApi, app_with, body_string, test_config};

    const BOUNDARY: &str = "banter-test-boundary";

    fn upload_request(filename: &str, mime: &str, payload: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 content-disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 content-type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/transcribe")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn transcribes_an_audio_upload() {
        let app = app_with(test_config(), ScriptedApi::new());
        let response = app
            .oneshot(upload_request("clip.webm", "audio/webm", b"opus-bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert_eq!(body, r#"{"text":"a scripted transcript"}"#);
    }

    #[tokio::test]
    async fn non_audio_upload_is_rejected() {
        let app = app_with(test_config(), ScriptedApi::new());
        let response = app
            .oneshot(upload_request("notes.txt", "text/plain", b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_audio_container_is_rejected() {
        let app = app_with(test_config(), ScriptedApi::new());
        let response = app
            .oneshot(upload_request("clip.aiff", "audio/aiff", b"aiff"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_multipart_body_is_rejected() {
        let app = app_with(test_config(), ScriptedApi::new());
        let request = Request::builder()
            .method("POST")
            .uri("/api/transcribe")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let mut config = test_config();
        config.max_upload_size_mb = 0;
        let app = app_with(config, ScriptedApi::new());
        let response = app
            .oneshot(upload_request("clip.webm", "audio/webm", b"too big for zero"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn quota_exhaustion_yields_429() {
        let mut config = test_config();
        config.transcribe_limit = 1;
        let app = app_with(config, ScriptedApi::new());

        let response = app
            .clone()
            .oneshot(upload_request("clip.webm", "audio/webm", b"opus"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(upload_request("clip.webm", "audio/webm", b"opus"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
