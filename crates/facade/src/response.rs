//! The façade's unified response shape : identical
//! fields whether the request ran a full workflow or a single node.

use serde::{Deserialize, Serialize};
use weave_core::{ExecutionId, NodeId};
use weave_execution::ExecutionStatus;
use weave_persistence::{ExecutionRow, NodeExecutionRow};

/// `{ executionId, status, executedNodes, failedNodes, duration, hasFailures }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    /// The execution this run created.
    pub execution_id: ExecutionId,
    /// Terminal status.
    pub status: ExecutionStatus,
    /// Nodes that reached `Completed` (including disabled pass-through).
    pub executed_nodes: Vec<NodeId>,
    /// Nodes that reached `Failed`.
    pub failed_nodes: Vec<NodeId>,
    /// Wall-clock duration of the run, in milliseconds.
    pub duration: u64,
    /// `true` if `failed_nodes` is non-empty.
    pub has_failures: bool,
}

/// `GET /executions/{id}` — the execution row plus every node-execution
/// child recorded for it. Identical shape for both dispatch modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetail {
    /// The top-level execution row.
    pub execution: ExecutionRow,
    /// Every node-execution row recorded for this run.
    pub node_executions: Vec<NodeExecutionRow>,
}
