//! Realtime SSE bridge onto the event bus : one subscriber
//! connection maps to one `tokio::sync::broadcast::Receiver`, forwarded
//! as server-sent events so editor/operator UIs can watch a workflow or a
//! single execution live instead of polling `GET /executions/{id}`.

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, Stream};
use tokio::sync::broadcast;
use weave_core::{ExecutionId, WorkflowId};
use weave_eventbus::{warn_on_lag, Event, Topic};

use crate::state::AppState;

/// Mountable router for the realtime subscription surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workflows/:id/events", get(workflow_events))
        .route("/executions/:id/events", get(execution_events))
}

async fn workflow_events(
    State(state): State<AppState>,
    Path(id): Path<WorkflowId>,
) -> Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let topic = Topic::Workflow(id);
    subscribe(&state, topic)
}

async fn execution_events(
    State(state): State<AppState>,
    Path(id): Path<ExecutionId>,
) -> Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let topic = Topic::Execution(id);
    subscribe(&state, topic)
}

fn subscribe(
    state: &AppState,
    topic: Topic,
) -> Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let rx = state.events.subscribe(&topic);
    let stream = stream::unfold((rx, topic), |(mut rx, topic)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok(to_sse(&event)), (rx, topic))),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn_on_lag(&topic, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &Event) -> SseEvent {
    let name = match &event.kind {
        weave_eventbus::EventKind::WebhookTriggered => "webhook-triggered",
        weave_eventbus::EventKind::WebhookTestTriggered => "webhook-test-triggered",
        weave_eventbus::EventKind::ExecutionStarted => "execution-started",
        weave_eventbus::EventKind::ExecutionCompleted { .. } => "execution-completed",
        weave_eventbus::EventKind::NodeStarted => "node-started",
        weave_eventbus::EventKind::NodeStatusUpdate { .. } => "node-status-update",
        weave_eventbus::EventKind::NodeCompleted => "node-completed",
        weave_eventbus::EventKind::NodeFailed { .. } => "node-failed",
    };
    SseEvent::default()
        .event(name)
        .json_data(event)
        .unwrap_or_else(|_| SseEvent::default().event(name).data("<unserializable event>"))
}
