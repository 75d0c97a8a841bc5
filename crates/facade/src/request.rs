//! The façade's single request shape : `POST /executions`.

use std::collections::HashMap;

use weave_core::{ExecutionId, NodeId, PortItems, WorkflowId};
use weave_workflow::ParameterValue;

/// `{ workflowId, triggerNodeId?, nodeId?, inputData?, parameters?, mode? }`.
///
/// Dispatch rule: `node_id` present selects single-node mode;
/// otherwise full-workflow mode, defaulting to the workflow's sole trigger
/// when `trigger_node_id` is absent.
#[derive(Debug, Clone)]
pub struct StartExecutionRequest {
    /// The workflow to run.
    pub workflow_id: WorkflowId,
    /// Full-workflow mode: which trigger to start from. Omit to let the
    /// façade pick the workflow's sole trigger (error if ambiguous).
    pub trigger_node_id: Option<NodeId>,
    /// Single-node mode: which node to run in isolation.
    pub node_id: Option<NodeId>,
    /// Single-node mode: input items to feed the node, by input port.
    /// Ignored in full-workflow mode.
    pub input_data: Option<PortItems>,
    /// Single-node mode: per-run parameter overrides. Ignored in
    /// full-workflow mode.
    pub parameters: Option<HashMap<String, ParameterValue>>,
    /// Full-workflow mode: the raw data that started this run (webhook
    /// body/headers/query, schedule fire time, workflow-call payload).
    /// Defaults to `null` for a manually-started execution.
    pub trigger_data: Option<serde_json::Value>,
    /// Accepted for request-shape compatibility with callers that send it
    /// explicitly; dispatch is always derived from `node_id`'s presence,
    /// never from this field, so an inconsistent `mode` is silently
    /// ignored rather than rejected.
    pub mode: Option<String>,
    /// Pre-assigned id for this execution. `weave-trigger` sets this for a
    /// test-mode webhook, so the `webhook-test-triggered` event it
    /// publishes before dispatch carries the same id the execution row
    /// ends up under. Omit to let the façade mint one.
    pub execution_id: Option<ExecutionId>,
}

impl StartExecutionRequest {
    /// Build a full-workflow request with no trigger-node override.
    #[must_use]
    pub fn workflow(workflow_id: WorkflowId, trigger_data: serde_json::Value) -> Self {
        Self {
            workflow_id,
            trigger_node_id: None,
            node_id: None,
            input_data: None,
            parameters: None,
            trigger_data: Some(trigger_data),
            mode: None,
            execution_id: None,
        }
    }

    /// Build a single-node request.
    #[must_use]
    pub fn single_node(workflow_id: WorkflowId, node_id: NodeId, input_data: PortItems) -> Self {
        Self {
            workflow_id,
            trigger_node_id: None,
            node_id: Some(node_id),
            input_data: Some(input_data),
            parameters: None,
            trigger_data: None,
            mode: None,
            execution_id: None,
        }
    }
}
