//! Row shapes matching the persisted tables of §6.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weave_core::{CredentialId, ExecutionId, NodeId, TriggerId, UserId, WorkflowId};
use weave_execution::{ExecutionStatus, NodeState};
use weave_workflow::Workflow;

/// `executions` table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRow {
    /// Primary key.
    pub id: ExecutionId,
    /// The workflow this execution ran.
    pub workflow_id: WorkflowId,
    /// Terminal (or `Running`, while in flight) status.
    pub status: ExecutionStatus,
    /// When the engine started this execution.
    pub started_at: DateTime<Utc>,
    /// When the engine finished this execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// The raw `{ body, headers, query, method, path }` (webhook) or
    /// `{ scheduledFor, firedAt }` (schedule) data that started this run.
    pub trigger_data: serde_json::Value,
    /// Deep copy of the workflow graph and settings at the instant this
    /// execution started; later edits to the live workflow never
    /// affect this snapshot.
    pub workflow_snapshot: serde_json::Value,
    /// Aggregated, normalized error for `Failed`/`Partial` executions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl ExecutionRow {
    /// Begin a new row with a deep-copied snapshot of `workflow`, taken at
    /// the instant this execution starts.
    #[must_use]
    pub fn starting(
        id: ExecutionId,
        workflow: &Workflow,
        trigger_data: serde_json::Value,
    ) -> Self {
        Self {
            id,
            workflow_id: workflow.id.clone(),
            status: ExecutionStatus::Running,
            started_at: weave_core::time::now(),
            finished_at: None,
            trigger_data,
            workflow_snapshot: serde_json::to_value(workflow)
                .expect("Workflow always serializes"),
            error: None,
        }
    }
}

/// `node_executions` table row. `id` is content-addressable
/// (`"{executionId}_{nodeId}"`) so a retried write is a detectable
/// conflict rather than a silent duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionRow {
    /// `"{executionId}_{nodeId}"`.
    pub id: String,
    /// Owning execution.
    pub execution_id: ExecutionId,
    /// The node this row describes.
    pub node_id: NodeId,
    /// Terminal state this node reached.
    pub status: NodeState,
    /// When this node started.
    pub started_at: DateTime<Utc>,
    /// When this node reached its terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Inputs assembled for this run, by input port.
    pub input_data: serde_json::Value,
    /// Outputs produced, by output port.
    #[serde(default)]
    pub output_data: serde_json::Value,
    /// Normalized `{ message, name?, stack? }` error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl NodeExecutionRow {
    /// Build the content-addressable primary key for `(execution_id,
    /// node_id)`.
    #[must_use]
    pub fn row_id(execution_id: ExecutionId, node_id: &NodeId) -> String {
        format!("{execution_id}_{node_id}")
    }
}

/// `triggers` table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRow {
    /// Primary key, assigned (or honored, for webhooks) at registration.
    pub id: TriggerId,
    /// The workflow that owns this trigger.
    pub workflow_id: WorkflowId,
    /// The trigger node within that workflow.
    pub node_id: NodeId,
    /// `"webhook"`, `"schedule"`, or `"workflowCall"`.
    pub trigger_type: String,
    /// Type-specific configuration (webhook method/auth, cron expression,...).
    pub settings: serde_json::Value,
    /// Whether this trigger currently accepts new invocations.
    pub active: bool,
}

/// `credentials` table row (still encrypted; decrypted only by
/// `weave-credential`'s resolver).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRow {
    /// Primary key.
    pub id: CredentialId,
    /// Owning user. Ownership enforcement is the CRUD layer's job, out of
    /// scope here — the resolver is system-scoped.
    pub owner_id: UserId,
    /// Credential type key.
    pub credential_type: String,
    /// Display name shown in the editor.
    pub name: String,
    /// `IV || ciphertext`, produced by `weave_credential::cipher::encrypt`.
    pub encrypted_data: Vec<u8>,
    /// Optional expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_id_is_content_addressable() {
        let exec = ExecutionId::new();
        let node: NodeId = "n1".into();
        let id = NodeExecutionRow::row_id(exec, &node);
        assert_eq!(id, format!("{exec}_n1"));
    }

    #[test]
    fn starting_row_snapshots_the_workflow() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "test".into(),
            nodes: vec![],
            connections: vec![],
            settings: weave_workflow::WorkflowSettings::default(),
            active: true,
        };
        let row = ExecutionRow::starting(ExecutionId::new(), &workflow, serde_json::json!({}));
        assert_eq!(row.workflow_snapshot["id"], "wf1");
        assert_eq!(row.status, ExecutionStatus::Running);
    }
}
