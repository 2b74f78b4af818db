//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use anyhow::Context;

use crate::limit::Quota;

/// Persona instruction sent with every chat call when `BANTER_SYSTEM_PROMPT`
/// is not set.  Generation parameters and this instruction are fixed
/// server-side; clients only supply conversation messages.
const DEFAULT_SYSTEM_PROMPT: &str = "You are the assistant on Filipe's personal website. \
Answer questions about Filipe, a software engineer who writes about web development \
and developer tooling on this site's blog, in a friendly and concise \
voice. If a question is unrelated to Filipe or this site, politely steer the \
conversation back. Keep answers short enough to read in a chat widget.";

/// Runtime configuration for banter-server.
///
/// Every field except the API key has a sensible default so the server works
/// out-of-the-box with only `BANTER_OPENAI_API_KEY` set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// API key for the hosted model provider.  Required; startup fails
    /// without it so misconfiguration never surfaces as per-request 500s.
    pub openai_api_key: String,

    /// Base URL of the hosted API (default: `"https://api.openai.com/v1"`).
    pub openai_base_url: String,

    /// Model used for chat generation.
    pub chat_model: String,

    /// Reasoning effort passed with every chat call.
    pub reasoning_effort: String,

    /// Output verbosity passed with every chat call.
    pub text_verbosity: String,

    /// System instruction prepended to every conversation.
    pub system_prompt: String,

    /// Model used for audio transcription.
    pub transcribe_model: String,

    /// Model and voice used for speech synthesis.
    pub speech_model: String,
    pub speech_voice: String,

    /// Per-client request quotas over `limit_window_secs`.
    pub chat_limit: u32,
    pub transcribe_limit: u32,
    pub tts_limit: u32,

    /// Trailing rate-limit window in seconds (default: 24 hours).
    pub limit_window_secs: u64,

    /// Redis URL for the shared rate-limit store.  When unset, an in-process
    /// store is used (single-instance deployments only).
    pub redis_url: Option<String>,

    /// Abort a chat stream if no upstream event arrives within this bound.
    pub upstream_idle_timeout_secs: u64,

    /// Maximum accepted transcription upload size in megabytes.
    pub max_upload_size_mb: usize,

    /// Comma-separated allowed CORS origins; unset means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    ///
    /// Errors if `BANTER_OPENAI_API_KEY` is missing or empty.
    pub fn from_env() -> anyhow::Result<Self> {
        let openai_api_key = std::env::var("BANTER_OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .context("BANTER_OPENAI_API_KEY is not set; refusing to start")?;

        Ok(Self {
            bind_address: env_or("BANTER_BIND", "0.0.0.0:3000"),
            openai_api_key,
            openai_base_url: env_or("BANTER_OPENAI_BASE_URL", "https://api.openai.com/v1"),
            chat_model: env_or("BANTER_CHAT_MODEL", "gpt-5-mini"),
            reasoning_effort: env_or("BANTER_REASONING_EFFORT", "low"),
            text_verbosity: env_or("BANTER_TEXT_VERBOSITY", "low"),
            system_prompt: env_or("BANTER_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            transcribe_model: env_or("BANTER_TRANSCRIBE_MODEL", "whisper-1"),
            speech_model: env_or("BANTER_SPEECH_MODEL", "gpt-4o-mini-tts"),
            speech_voice: env_or("BANTER_SPEECH_VOICE", "alloy"),
            chat_limit: parse_env("BANTER_CHAT_LIMIT", 20),
            transcribe_limit: parse_env("BANTER_TRANSCRIBE_LIMIT", 10),
            tts_limit: parse_env("BANTER_TTS_LIMIT", 10),
            limit_window_secs: parse_env("BANTER_LIMIT_WINDOW_SECS", 24 * 60 * 60),
            redis_url: std::env::var("BANTER_REDIS_URL").ok().filter(|v| !v.is_empty()),
            upstream_idle_timeout_secs: parse_env("BANTER_UPSTREAM_IDLE_TIMEOUT_SECS", 30),
            max_upload_size_mb: parse_env("BANTER_MAX_UPLOAD_SIZE_MB", 25),
            cors_allowed_origins: std::env::var("BANTER_CORS_ORIGINS").ok(),
            enable_swagger: std::env::var("BANTER_ENABLE_SWAGGER")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_level: env_or("BANTER_LOG", "info"),
            log_json: std::env::var("BANTER_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    pub fn chat_quota(&self) -> Quota {
        Quota {
            max_requests: self.chat_limit,
            window: Duration::from_secs(self.limit_window_secs),
        }
    }

    pub fn transcribe_quota(&self) -> Quota {
        Quota {
            max_requests: self.transcribe_limit,
            window: Duration::from_secs(self.limit_window_secs),
        }
    }

    pub fn tts_quota(&self) -> Quota {
        Quota {
            max_requests: self.tts_limit,
            window: Duration::from_secs(self.limit_window_secs),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
