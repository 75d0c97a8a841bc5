//! `{method} /webhook/{webhookId}` ingestion, translating an
//! axum request into `weave-trigger`'s framework-agnostic [`WebhookRequest`].

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method};
use axum::routing::any;
use axum::{Json, Router};
use weave_core::TriggerId;
use weave_trigger::WebhookIngestResult;

use crate::error::ApiError;
use crate::state::AppState;

/// Mountable router for the webhook ingestion surface.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/:webhook_id", any(ingest))
}

async fn ingest(
    State(state): State<AppState>,
    Path(webhook_id): Path<TriggerId>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookIngestResult>, ApiError> {
    let query = parse_query(raw_query.as_deref().unwrap_or(""));
    let test_mode = query.get("test").is_some_and(|v| v == "true")
        || query.get("visualize").is_some_and(|v| v == "true");

    let request = weave_trigger::WebhookRequest {
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        query: query.clone(),
    };

    let body_json: serde_json::Value = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };

    let result = state
        .trigger
        .handle_webhook(
            webhook_id,
            method.as_str(),
            &format!("/webhook/{webhook_id}"),
            request,
            body_json,
            test_mode,
        )
        .await?;
    Ok(Json(result))
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}
