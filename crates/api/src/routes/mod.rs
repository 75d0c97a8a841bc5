//! Route groups, one module per binary's concern. Each binary mounts the
//! subset it owns; `full_router` merges all three for a single-process
//! development server.

/// `/executions` and `/executions/{id}[/progress]`.
pub mod executions;
/// Realtime SSE bridge.
pub mod realtime;
/// Webhook ingestion.
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Every route this crate knows about, merged into one router. Used by
/// `weave-server` when run without `weave-webhook`/`weave-realtime` split
/// out as separate processes, and by this crate's own integration tests.
#[must_use]
pub fn full_router() -> Router<AppState> {
    executions::router()
        .merge(webhook::router())
        .merge(realtime::router())
}
