//! Workflow-level execution configuration.

use serde::{Deserialize, Serialize};

/// Node activation ordering strategy. Modeled as non-exhaustive so future
/// orderings (e.g. a priority scheduler) don't break callers matching on
/// this today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ExecutionOrder {
    /// Breadth-first level-by-level activation, the only ordering this
    /// engine currently implements.
    V1,
}

impl Default for ExecutionOrder {
    fn default() -> Self {
        Self::V1
    }
}

/// What happens to the rest of a run when one node fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the execution; dependents of the failed node are never run.
    Stop,
    /// Mark the node failed and keep running everything that doesn't
    /// depend on it.
    Continue,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::Stop
    }
}

/// Who may invoke this workflow as a sub-workflow via workflow-call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerPolicy {
    /// Any workflow in the same instance may call this one.
    Any,
    /// Only workflows explicitly listed may call this one.
    WorkflowsFromList,
    /// No workflow-call invocation allowed.
    None,
}

impl Default for CallerPolicy {
    fn default() -> Self {
        Self::None
    }
}

/// Per-workflow execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// IANA timezone used to evaluate schedule triggers.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Node activation strategy.
    #[serde(default)]
    pub execution_order: ExecutionOrder,
    /// Behavior when a node fails.
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    /// Who may invoke this workflow as a sub-workflow.
    #[serde(default)]
    pub caller_policy: CallerPolicy,
    /// Hard wall-clock budget for the whole execution; `None` means no
    /// limit beyond the engine's own defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            execution_order: ExecutionOrder::default(),
            error_policy: ErrorPolicy::default(),
            caller_policy: CallerPolicy::default(),
            max_duration_ms: None,
        }
    }
}
