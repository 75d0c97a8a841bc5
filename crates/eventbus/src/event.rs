//! The events published on the bus's two topic families.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weave_core::{ExecutionId, NodeId, WorkflowId};

/// The kind of event carried by a [`Event`], named exactly as §4.5/§6
/// enumerate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    /// Published on `workflow:{id}` when a webhook starts an execution.
    WebhookTriggered,
    /// Published on `workflow:{id}` before a test-mode execution starts,
    /// so an editor session can subscribe to the execution topic in time
    /// to observe progress from node 0.
    WebhookTestTriggered,
    /// Published on `workflow:{id}` when any execution starts.
    ExecutionStarted,
    /// Published on `workflow:{id}` when any execution reaches a terminal
    /// state.
    ExecutionCompleted {
        /// The execution's terminal status.
        status: String,
    },
    /// Published on `execution:{id}` when a node begins running.
    NodeStarted,
    /// Published on `execution:{id}` on an intermediate node state change.
    NodeStatusUpdate {
        /// The node's new status.
        status: String,
    },
    /// Published on `execution:{id}` when a node completes successfully.
    NodeCompleted,
    /// Published on `execution:{id}` when a node fails.
    NodeFailed {
        /// The persisted error shape.
        error: serde_json::Value,
    },
}

/// One event on the bus, carrying the correlation ids every subscriber
/// needs regardless of which topic family it arrived on (§6: "Each event
/// carries `{ executionId, workflowId, nodeId?, timestamp, ... }`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The execution this event concerns.
    pub execution_id: ExecutionId,
    /// The workflow this event concerns.
    pub workflow_id: WorkflowId,
    /// Set for node-scoped events; absent for workflow/execution-level ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Publication time, used for in-topic ordering by consumers that
    /// batch-replay from persistence.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

impl Event {
    /// Build an event with the given kind and no node scope.
    #[must_use]
    pub fn workflow_scoped(execution_id: ExecutionId, workflow_id: WorkflowId, kind: EventKind) -> Self {
        Self {
            execution_id,
            workflow_id,
            node_id: None,
            timestamp: weave_core::time::now(),
            kind,
        }
    }

    /// Build an event scoped to a specific node.
    #[must_use]
    pub fn node_scoped(
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        node_id: NodeId,
        kind: EventKind,
    ) -> Self {
        Self {
            execution_id,
            workflow_id,
            node_id: Some(node_id),
            timestamp: weave_core::time::now(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_scoped_event_has_no_node_id() {
        let event = Event::workflow_scoped(ExecutionId::new(), "wf1".into(), EventKind::ExecutionStarted);
        assert!(event.node_id.is_none());
    }

    #[test]
    fn node_scoped_event_carries_node_id() {
        let event = Event::node_scoped(
            ExecutionId::new(),
            "wf1".into(),
            "n1".into(),
            EventKind::NodeStarted,
        );
        assert_eq!(event.node_id, Some("n1".into()));
    }

    #[test]
    fn node_failed_serializes_tagged_with_error_detail() {
        let event = Event::node_scoped(
            ExecutionId::new(),
            "wf1".into(),
            "n1".into(),
            EventKind::NodeFailed {
                error: serde_json::json!({"message": "boom"}),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "node-failed");
        assert_eq!(json["kind"]["error"]["message"], "boom");
    }
}
