//! Per-node and per-execution state machines.

use serde::{Deserialize, Serialize};

/// The execution state of one node within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not affected by this run, or not yet reached.
    Idle,
    /// A trigger node's initial state, before the engine dispatches it.
    Queued,
    /// Currently executing.
    Running,
    /// Finished successfully (includes disabled-node pass-through).
    Completed,
    /// Finished with an error.
    Failed,
    /// Aborted by cancellation or the `stop` failure policy.
    Cancelled,
    /// Pruned by branch semantics or a `continue`-policy upstream failure;
    /// distinguishes "never had a chance" from a node that simply never
    /// ran (`Idle`).
    Skipped,
}

impl NodeState {
    /// Returns `true` if this state will never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Skipped
        )
    }

    /// Returns `true` if dependents may treat this node as having
    /// produced data (only `Completed` counts; `Skipped`/`Failed`/
    /// `Cancelled` never feed data downstream).
    #[must_use]
    pub fn produced_output(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// The overall status of a workflow execution, named to match the
/// façade's response vocabulary rather than the per-node states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Still dispatching nodes.
    Running,
    /// Every affected node reached `Completed` or a benign `Skipped`.
    Completed,
    /// `errorPolicy = stop` and a node failed, or every path failed.
    Failed,
    /// Cancelled by the user or a timeout.
    Cancelled,
    /// `errorPolicy = continue`, at least one node failed and at least
    /// one succeeded.
    Partial,
}

impl ExecutionStatus {
    /// Returns `true` if this status will never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Partial => "partial",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_four_node_states_are_terminal() {
        let terminal = [
            NodeState::Completed,
            NodeState::Failed,
            NodeState::Cancelled,
            NodeState::Skipped,
        ];
        for state in terminal {
            assert!(state.is_terminal());
        }
        assert!(!NodeState::Idle.is_terminal());
        assert!(!NodeState::Queued.is_terminal());
        assert!(!NodeState::Running.is_terminal());
    }

    #[test]
    fn only_completed_produces_output() {
        assert!(NodeState::Completed.produced_output());
        assert!(!NodeState::Skipped.produced_output());
        assert!(!NodeState::Failed.produced_output());
        assert!(!NodeState::Cancelled.produced_output());
    }

    #[test]
    fn execution_status_display_matches_facade_vocabulary() {
        assert_eq!(ExecutionStatus::Completed.to_string(), "completed");
        assert_eq!(ExecutionStatus::Partial.to_string(), "partial");
    }

    #[test]
    fn only_running_is_non_terminal_execution_status() {
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Partial.is_terminal());
    }
}
