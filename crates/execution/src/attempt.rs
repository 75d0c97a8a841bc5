//! A per-node execution record, the unit `weave-persistence` stores as a
//! `NodeExecution` row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weave_core::PortItems;

use crate::state::NodeState;

/// One node's complete run within one execution.
///
/// This is a single record, not a retry ledger — the engine never retries
/// a node on its own (no retry scheduler is in scope here, see
/// `DESIGN.md`); it exists so the dispatch loop, the persister, and the
/// progress tracker all describe a finished node run with the same shape
/// instead of each inventing their own partial view of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAttempt {
    /// Terminal state this run reached.
    pub state: NodeState,
    /// Inputs assembled for this run, by input port.
    pub input: PortItems,
    /// Outputs produced, by output port. Empty for `Failed`/`Cancelled`/
    /// `Skipped`.
    #[serde(default)]
    pub output: PortItems,
    /// Normalized `{ message, name?, stack? }` error, set only when
    /// `state == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    /// When this node started running.
    pub started_at: DateTime<Utc>,
    /// When this node reached its terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl NodeAttempt {
    /// Begin a run; `finished_at` and outputs are filled in as the run
    /// completes.
    #[must_use]
    pub fn started(input: PortItems) -> Self {
        Self {
            state: NodeState::Running,
            input,
            output: PortItems::new(),
            error: None,
            started_at: weave_core::time::now(),
            finished_at: None,
        }
    }

    /// Mark this run completed with the given output.
    pub fn complete(&mut self, output: PortItems) {
        self.state = NodeState::Completed;
        self.output = output;
        self.finished_at = Some(weave_core::time::now());
    }

    /// Mark this run failed with a normalized error.
    pub fn fail(&mut self, error: serde_json::Value) {
        self.state = NodeState::Failed;
        self.error = Some(error);
        self.finished_at = Some(weave_core::time::now());
    }

    /// Mark this run cancelled, discarding any partial output.
    pub fn cancel(&mut self) {
        self.state = NodeState::Cancelled;
        self.output = PortItems::new();
        self.finished_at = Some(weave_core::time::now());
    }

    /// Duration of this run, if it has finished.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_attempt_is_running_with_no_output() {
        let attempt = NodeAttempt::started(PortItems::new());
        assert_eq!(attempt.state, NodeState::Running);
        assert!(attempt.output.is_empty());
        assert!(attempt.finished_at.is_none());
    }

    #[test]
    fn complete_sets_state_and_output() {
        let mut attempt = NodeAttempt::started(PortItems::new());
        let mut output = PortItems::new();
        output.insert("main".into(), vec![]);
        attempt.complete(output.clone());
        assert_eq!(attempt.state, NodeState::Completed);
        assert_eq!(attempt.output, output);
        assert!(attempt.finished_at.is_some());
    }

    #[test]
    fn fail_records_normalized_error() {
        let mut attempt = NodeAttempt::started(PortItems::new());
        attempt.fail(serde_json::json!({"message": "boom"}));
        assert_eq!(attempt.state, NodeState::Failed);
        assert_eq!(attempt.error.unwrap()["message"], "boom");
    }

    #[test]
    fn cancel_discards_partial_output() {
        let mut attempt = NodeAttempt::started(PortItems::new());
        attempt.output.insert("main".into(), vec![]);
        attempt.cancel();
        assert!(attempt.output.is_empty());
        assert_eq!(attempt.state, NodeState::Cancelled);
    }

    #[test]
    fn duration_is_none_until_finished() {
        let attempt = NodeAttempt::started(PortItems::new());
        assert!(attempt.duration_ms().is_none());
    }
}
