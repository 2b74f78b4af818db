pub mod chat;
pub mod transcribe;
pub mod tts;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Routes nested under `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .merge(transcribe::router())
        .merge(tts::router())
}

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = chat::ChatApi::openapi();
    spec.merge(transcribe::TranscribeApi::openapi());
    spec.merge(tts::TtsApi::openapi());
    spec
}
