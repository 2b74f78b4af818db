//! Test doubles and request helpers shared by the route tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use banter_openai::{
    EventStream, OpenAiApi, ResponseEvent, ResponsesRequest, SpeechRequest, TranscriptionRequest,
    UpstreamError,
};
use bytes::Bytes;
use http_body_util::BodyExt;

use crate::config::Config;
use crate::limit::memory::MemoryStore;
use crate::state::AppState;

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        openai_api_key: "sk-test".into(),
        openai_base_url: "http://127.0.0.1:9".into(),
        chat_model: "test-model".into(),
        reasoning_effort: "low".into(),
        text_verbosity: "low".into(),
        system_prompt: "You answer questions about the site owner.".into(),
        transcribe_model: "whisper-1".into(),
        speech_model: "tts-test".into(),
        speech_voice: "alloy".into(),
        chat_limit: 20,
        transcribe_limit: 10,
        tts_limit: 10,
        limit_window_secs: 24 * 60 * 60,
        redis_url: None,
        upstream_idle_timeout_secs: 30,
        max_upload_size_mb: 1,
        cors_allowed_origins: None,
        enable_swagger: false,
        log_level: "info".into(),
        log_json: false,
    }
}

/// Upstream double that replays pre-scripted event sequences, one sequence
/// per `stream_responses` call.  An unscripted call fails, which doubles as
/// the "upstream setup failure" fixture.
pub struct ScriptedApi {
    scripts: Mutex<VecDeque<Vec<Result<ResponseEvent, UpstreamError>>>>,
    last_request: Mutex<Option<ResponsesRequest>>,
}

impl ScriptedApi {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            last_request: Mutex::new(None),
        })
    }

    /// Queue the event sequence for the next `stream_responses` call.
    pub fn script(&self, events: Vec<Result<ResponseEvent, UpstreamError>>) {
        self.scripts.lock().unwrap().push_back(events);
    }

    pub fn last_request(&self) -> Option<ResponsesRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl OpenAiApi for ScriptedApi {
    async fn stream_responses(
        &self,
        request: ResponsesRequest,
    ) -> Result<EventStream, UpstreamError> {
        *self.last_request.lock().unwrap() = Some(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(UpstreamError::Api {
                status: 500,
                message: "no scripted response".into(),
            })?;
        Ok(Box::pin(futures::stream::iter(script)))
    }

    async fn transcribe(&self, _request: TranscriptionRequest) -> Result<String, UpstreamError> {
        Ok("a scripted transcript".into())
    }

    async fn speech(&self, _request: SpeechRequest) -> Result<Bytes, UpstreamError> {
        Ok(Bytes::from_static(b"mp3-bytes"))
    }
}

/// Upstream double whose stream never yields; for idle-timeout tests.
pub struct StalledApi;

#[async_trait]
impl OpenAiApi for StalledApi {
    async fn stream_responses(
        &self,
        _request: ResponsesRequest,
    ) -> Result<EventStream, UpstreamError> {
        let pending: futures::stream::Pending<Result<ResponseEvent, UpstreamError>> =
            futures::stream::pending();
        Ok(Box::pin(pending))
    }

    async fn transcribe(&self, _request: TranscriptionRequest) -> Result<String, UpstreamError> {
        Err(UpstreamError::Api { status: 500, message: "not scripted".into() })
    }

    async fn speech(&self, _request: SpeechRequest) -> Result<Bytes, UpstreamError> {
        Err(UpstreamError::Api { status: 500, message: "not scripted".into() })
    }
}

/// Full application router over an in-memory rate-limit store.
pub fn app_with(config: Config, upstream: Arc<dyn OpenAiApi>) -> Router {
    let state = Arc::new(AppState {
        config: Arc::new(config),
        limiter: Arc::new(MemoryStore::new()),
        upstream,
    });
    crate::routes::build(state)
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
