//! Chat endpoint: quota check, validation, upstream call, SSE re-emission.
//!
//! The pipeline runs strictly in order per request: rate limiter first (a
//! rejected caller costs no parsing and no upstream traffic), then shape
//! validation, then one streaming call to the hosted model.  Each upstream
//! text delta is re-emitted immediately as one OpenAI-style chunk frame;
//! ordering is exactly upstream arrival order and nothing is batched.
//!
//! Client contract: a well-formed reply always ends with `data: [DONE]`.
//! Failures after the 200 has committed abort the stream instead of
//! changing the status code, so a terminated stream without the sentinel
//! must be treated as an error by the consumer.

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use banter_openai::{
    InputMessage, Reasoning, ResponseEvent, ResponsesRequest, TextOptions, UpstreamError,
};
use futures::StreamExt;
use tracing::{debug, info, warn};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::limit;
use crate::schemas::api::chat::{ChatChunk, ChatMessage, ChatRequest, ChunkChoice, ChunkDelta};
use crate::state::AppState;

/// Exact client-facing messages; the site's chat widget matches on them.
pub(crate) const MSG_INVALID_JSON: &str = "Invalid JSON in request body";
pub(crate) const MSG_MESSAGES_REQUIRED: &str =
    "Invalid request: non-empty messages array required";

/// Terminal SSE frame of every completed stream.
const DONE_FRAME: &str = "[DONE]";

const VALID_ROLES: [&str; 3] = ["system", "user", "assistant"];

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatRequest, ChatMessage, ChatChunk, ChunkChoice, ChunkDelta))
)]
pub struct ChatApi;

/// Register the chat route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Streaming chat (`POST /api/chat`).
///
/// Takes the full conversation transcript on every call (the server holds
/// no session state) and answers with an SSE stream of text-delta chunks
/// terminated by `data: [DONE]`.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "SSE stream of chunks, terminated by [DONE]", body = ChatChunk),
        (status = 400, description = "Malformed JSON or empty messages"),
        (status = 429, description = "Chat quota exhausted"),
        (status = 500, description = "Upstream failure before streaming started"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let client = limit::client_key(&headers);
    let decision = state
        .limiter
        .limit(&format!("chat:{client}"), state.config.chat_quota())
        .await
        .map_err(|e| ServerError::LimiterUnavailable(e.to_string()))?;
    if !decision.allowed {
        debug!(client = %client, "chat request rejected by quota");
        return Err(ServerError::RateLimited(decision));
    }

    let request = validate(payload)?;
    debug!(client = %client, messages = request.messages.len(), "chat request");

    // Open the upstream stream before committing the response so setup
    // failures still map to a 500 JSON body.
    let mut events = state
        .upstream
        .stream_responses(build_call(&state, &request.messages))
        .await?;

    let idle = Duration::from_secs(state.config.upstream_idle_timeout_secs);
    let stream = try_stream! {
        let mut fragments = 0usize;
        loop {
            let next = match tokio::time::timeout(idle, events.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(idle_secs = idle.as_secs(), "upstream stream stalled; aborting");
                    Err(UpstreamError::Stalled(idle))?
                }
            };
            let Some(event) = next else { break };
            match event? {
                ResponseEvent::OutputTextDelta { delta } if !delta.is_empty() => {
                    fragments += 1;
                    yield Event::default().data(ChatChunk::frame(&delta));
                }
                // Empty fragments and all other event tags: no frame.
                _ => {}
            }
        }
        info!(fragments, "chat stream complete");
        yield Event::default().data(DONE_FRAME);
    };

    // Pin the stream's error type (the only error raised inside `try_stream!`
    // is `UpstreamError`) so `Sse::new`'s `Into<BoxError>` bound resolves.
    let stream = stream.map(|frame: Result<Event, UpstreamError>| frame);

    let mut response = Sse::new(stream).into_response();
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    Ok(response)
}

/// Reject structurally invalid input before any upstream call is made.
fn validate(payload: Result<Json<ChatRequest>, JsonRejection>) -> Result<ChatRequest, ServerError> {
    let Json(request) = payload.map_err(|rejection| match rejection {
        // Parsed JSON of the wrong shape, e.g. `messages` not an array.
        JsonRejection::JsonDataError(_) => {
            ServerError::BadRequest(MSG_MESSAGES_REQUIRED.to_owned())
        }
        // Unparseable body, missing JSON content type, or unreadable body.
        _ => ServerError::BadRequest(MSG_INVALID_JSON.to_owned()),
    })?;

    if request.messages.is_empty() {
        return Err(ServerError::BadRequest(MSG_MESSAGES_REQUIRED.to_owned()));
    }

    for message in &request.messages {
        if !VALID_ROLES.contains(&message.role.as_str()) {
            return Err(ServerError::BadRequest(format!(
                "Invalid request: unknown role {:?}",
                message.role
            )));
        }
        if message.content.trim().is_empty() {
            return Err(ServerError::BadRequest(
                "Invalid request: message content must be non-empty".to_owned(),
            ));
        }
    }

    Ok(request)
}

/// Assemble the upstream call: fixed generation parameters and system
/// instruction from config, conversation context from the client.
fn build_call(state: &AppState, messages: &[ChatMessage]) -> ResponsesRequest {
    ResponsesRequest {
        model: state.config.chat_model.clone(),
        instructions: state.config.system_prompt.clone(),
        input: messages
            .iter()
            .map(|m| InputMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect(),
        stream: true,
        reasoning: Reasoning {
            effort: state.config.reasoning_effort.clone(),
        },
        text: TextOptions {
            verbosity: state.config.text_verbosity.clone(),
        },
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
