//! Thin client for the hosted OpenAI HTTP API.
//!
//! Covers the three calls the banter server makes: streaming text
//! generation via the Responses API, audio transcription, and speech
//! synthesis.  The [`OpenAiApi`] trait is the seam servers program
//! against; [`OpenAiClient`] is the reqwest-backed implementation.

mod client;
mod error;
mod event;
mod request;

pub use client::{EventStream, OpenAiApi, OpenAiClient};
pub use error::UpstreamError;
pub use event::ResponseEvent;
pub use request::{InputMessage, Reasoning, ResponsesRequest, SpeechRequest, TextOptions,
    TranscriptionRequest};
