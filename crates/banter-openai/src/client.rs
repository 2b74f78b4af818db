//! Reqwest-backed client for the hosted OpenAI HTTP API.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::multipart;
use tracing::debug;

use crate::error::UpstreamError;
use crate::event::ResponseEvent;
use crate::request::{ResponsesRequest, SpeechRequest, TranscriptionRequest};

/// A pull stream of decoded upstream events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent, UpstreamError>> + Send>>;

/// The surface this crate exposes to servers.
///
/// Handlers hold an `Arc<dyn OpenAiApi>` so tests can substitute a scripted
/// implementation without any network access.
#[async_trait]
pub trait OpenAiApi: Send + Sync {
    /// Open one streaming Responses call and yield its decoded events.
    ///
    /// The returned stream holds the underlying HTTP connection; dropping it
    /// closes the upstream connection.
    async fn stream_responses(&self, request: ResponsesRequest)
    -> Result<EventStream, UpstreamError>;

    /// Transcribe an uploaded audio clip, returning the recognized text.
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String, UpstreamError>;

    /// Synthesize speech for `input`, returning encoded audio bytes.
    async fn speech(&self, request: SpeechRequest) -> Result<Bytes, UpstreamError>;
}

/// HTTP client bound to one API base URL and key.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Build a client for `base_url` (no trailing slash, e.g.
    /// `https://api.openai.com/v1`) authenticated with `api_key`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("banter-openai/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Consume a non-success response into an [`UpstreamError::Api`].
async fn api_error(response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    UpstreamError::Api { status, message }
}

/// Map one decoded SSE frame to an upstream event, or skip it.
///
/// The Responses API does not terminate with a sentinel line, but a blank
/// or `[DONE]` frame from a compatible proxy is tolerated and skipped.
fn decode_event<E: std::fmt::Display>(
    item: Result<eventsource_stream::Event, eventsource_stream::EventStreamError<E>>,
) -> Option<Result<ResponseEvent, UpstreamError>> {
    match item {
        Ok(sse) if sse.data.is_empty() || sse.data == "[DONE]" => None,
        Ok(sse) => Some(
            serde_json::from_str::<ResponseEvent>(&sse.data)
                .map_err(|e| UpstreamError::Decode(format!("bad event payload: {e}"))),
        ),
        Err(e) => Some(Err(UpstreamError::Decode(e.to_string()))),
    }
}

#[async_trait]
impl OpenAiApi for OpenAiClient {
    async fn stream_responses(
        &self,
        request: ResponsesRequest,
    ) -> Result<EventStream, UpstreamError> {
        let response = self
            .http
            .post(self.endpoint("/responses"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        debug!(model = %request.model, "responses stream opened");

        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(|item| std::future::ready(decode_event(item)));

        Ok(Box::pin(events))
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String, UpstreamError> {
        let part = multipart::Part::bytes(request.bytes.to_vec())
            .file_name(request.filename)
            .mime_str(&request.mime)?;
        let form = multipart::Form::new()
            .text("model", request.model)
            .part("file", part);

        let response = self
            .http
            .post(self.endpoint("/audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        #[derive(serde::Deserialize)]
        struct Transcription {
            text: String,
        }

        let transcription: Transcription = response.json().await?;
        Ok(transcription.text)
    }

    async fn speech(&self, request: SpeechRequest) -> Result<Bytes, UpstreamError> {
        let response = self
            .http
            .post(self.endpoint("/audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.bytes().await?)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
