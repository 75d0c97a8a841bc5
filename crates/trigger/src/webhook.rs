//! Webhook ingestion : `{METHOD} /webhook/{webhookId}[?test=true]`.

use weave_core::{ExecutionId, TriggerId};
use serde::{Deserialize, Serialize};

pub use crate::auth::WebhookRequest;

/// `{ executionId, webhookId, testMode }` — the fire-and-forget response
/// body returned immediately, without waiting for the workflow to finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookIngestResult {
    /// The execution this webhook started.
    pub execution_id: ExecutionId,
    /// The webhook route that was hit.
    pub webhook_id: TriggerId,
    /// `true` if `?test=true` (or `?visualize=true`) was set.
    pub test_mode: bool,
}

/// The raw `triggerData` shape a webhook invocation hands to the engine
/// : `{ body, headers, query, method, path }`.
#[must_use]
pub fn build_trigger_data(
    body: serde_json::Value,
    request: &WebhookRequest,
    method: &str,
    path: &str,
) -> serde_json::Value {
    serde_json::json!({
        "body": body,
        "headers": request.headers,
        "query": request.query,
        "method": method,
        "path": path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_data_carries_body_byte_equivalent() {
        let request = WebhookRequest::default();
        let body = serde_json::json!({"x": 1});
        let data = build_trigger_data(body.clone(), &request, "POST", "/webhook/abc");
        assert_eq!(data["body"], body);
        assert_eq!(data["method"], "POST");
        assert_eq!(data["path"], "/webhook/abc");
    }
}
