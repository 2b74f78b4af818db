//! banter-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables; a missing upstream
//!    API key is fatal here, never a per-request surprise.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Connect the rate-limit store; a configured-but-unreachable Redis is
//!    fatal for the same reason.
//! 4. Build the upstream API client.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod limit;
mod middleware;
mod routes;
mod schemas;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use banter_openai::OpenAiClient;
use tracing::{info, warn};

use crate::config::Config;
use crate::limit::RateLimitStore;
use crate::limit::memory::MemoryStore;
use crate::limit::redis::RedisStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env()?;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: BANTER_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "banter-server starting");

    // ── 3. Rate-limit store ────────────────────────────────────────────────────
    let limiter: Arc<dyn RateLimitStore> = match &cfg.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url)
                .await
                .context("rate-limit store unreachable; refusing to start")?;
            info!("rate limiting backed by redis");
            Arc::new(store)
        }
        None => {
            warn!(
                "BANTER_REDIS_URL not set; using in-process rate limiting \
                 (quotas are per instance and reset on restart)"
            );
            Arc::new(MemoryStore::new())
        }
    };

    // ── 4. Upstream API client ─────────────────────────────────────────────────
    let upstream = OpenAiClient::new(&cfg.openai_base_url, &cfg.openai_api_key)?;

    // ── 5. Shared application state ────────────────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        limiter,
        upstream: Arc::new(upstream),
    });

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("banter-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
