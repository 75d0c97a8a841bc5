#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave API
//!
//! The `axum` HTTP surface over `weave-facade` and `weave-trigger` :
//! `POST /executions` plus its `GET` counterparts, webhook ingestion at
//! `/webhook/{webhookId}`, and a realtime SSE bridge onto the event bus.
//! Three thin binaries (`weave-server`, `weave-webhook`, `weave-realtime`)
//! mount a different subset of [`routes`] over the same [`state::AppState`],
//! mirroring the façade's three stimulus sources — a manual `POST
//! /executions` call, an inbound webhook, and a subscriber watching
//! progress live.

/// Environment-driven configuration.
pub mod config;
/// HTTP status mapping for `EngineError`.
pub mod error;
/// Route groups: executions, webhook ingestion, realtime.
pub mod routes;
/// Shared application state and how to build it.
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;
pub use state::AppState;

use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Apply the standard middleware stack (tracing, CORS, gzip compression)
/// every binary in this crate wants regardless of which routes it mounts.
#[must_use]
pub fn with_standard_middleware(router: axum::Router<AppState>) -> axum::Router<AppState> {
    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

/// Resolves once `SIGINT`/`SIGTERM` arrives, for `axum::serve`'s
/// `with_graceful_shutdown`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
