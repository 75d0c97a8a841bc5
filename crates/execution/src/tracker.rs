//! The Progress Tracker : the authority for "is node X running in
//! execution Y?".
//!
//! State storage is `map<executionId, map<nodeId, NodeState>>`, exactly as
//! specified, implemented as a [`DashMap`] of executions each guarded by
//! its own [`RwLock`] partition. The historical bug this fixes — a single
//! global node-state map leaking status across concurrent executions of
//! the same workflow — is made structurally impossible: every read and
//! write takes an `ExecutionId` first, and partitions never see each
//! other's contents.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use weave_core::{ExecutionId, NodeId, PortItems};

use crate::state::NodeState;

struct Partition {
    states: HashMap<NodeId, NodeState>,
    outputs: HashMap<NodeId, PortItems>,
    affected: HashSet<NodeId>,
    created_at: Instant,
}

/// Aggregate view of one execution's progress, as returned by
/// `GET /executions/{id}/progress`.
#[derive(Debug, Clone)]
pub struct ExecutionProgress {
    /// Per-node current state.
    pub node_states: HashMap<NodeId, NodeState>,
}

impl ExecutionProgress {
    /// `true` once every affected node has reached a terminal state.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.node_states.values().all(|s| s.is_terminal())
    }
}

/// Per-execution, per-node state, partitioned by `executionId`.
#[derive(Default)]
pub struct ProgressTracker {
    executions: DashMap<ExecutionId, RwLock<Partition>>,
}

impl ProgressTracker {
    /// Build an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize every affected node: `Queued` for the trigger, `Idle`
    /// for everything downstream.
    pub fn start_execution(
        &self,
        execution_id: ExecutionId,
        trigger_node_id: &NodeId,
        affected_nodes: &[NodeId],
    ) {
        let mut states = HashMap::with_capacity(affected_nodes.len());
        for node_id in affected_nodes {
            let state = if node_id == trigger_node_id {
                NodeState::Queued
            } else {
                NodeState::Idle
            };
            states.insert(node_id.clone(), state);
        }
        let partition = Partition {
            states,
            outputs: HashMap::new(),
            affected: affected_nodes.iter().cloned().collect(),
            created_at: Instant::now(),
        };
        self.executions.insert(execution_id, RwLock::new(partition));
    }

    /// Transition a node to `Running`.
    pub fn set_running(&self, execution_id: ExecutionId, node_id: &NodeId) {
        self.set_state(execution_id, node_id, NodeState::Running);
    }

    /// Transition a node to `Completed`, recording its output for
    /// downstream assembly.
    pub fn set_completed(&self, execution_id: ExecutionId, node_id: &NodeId, output: PortItems) {
        if let Some(partition) = self.executions.get(&execution_id) {
            let mut guard = partition.write();
            guard.states.insert(node_id.clone(), NodeState::Completed);
            guard.outputs.insert(node_id.clone(), output);
        }
    }

    /// Transition a node to `Failed`.
    pub fn set_failed(&self, execution_id: ExecutionId, node_id: &NodeId) {
        self.set_state(execution_id, node_id, NodeState::Failed);
    }

    /// Transition a node to `Cancelled`.
    pub fn set_cancelled(&self, execution_id: ExecutionId, node_id: &NodeId) {
        self.set_state(execution_id, node_id, NodeState::Cancelled);
    }

    /// Transition a node to `Skipped` (branch pruning or policy-driven
    /// downstream skip, §4.6.3/§4.6.5).
    pub fn set_skipped(&self, execution_id: ExecutionId, node_id: &NodeId) {
        self.set_state(execution_id, node_id, NodeState::Skipped);
    }

    fn set_state(&self, execution_id: ExecutionId, node_id: &NodeId, state: NodeState) {
        if let Some(partition) = self.executions.get(&execution_id) {
            partition.write().states.insert(node_id.clone(), state);
        }
    }

    /// `true` only if `node_id` is both affected by this execution and
    /// currently `Running` — a query for a node in execution A can never
    /// return state mutated by execution B (invariant, §8 property 1).
    #[must_use]
    pub fn is_node_running(&self, execution_id: ExecutionId, node_id: &NodeId) -> bool {
        self.executions.get(&execution_id).is_some_and(|partition| {
            let guard = partition.read();
            guard.affected.contains(node_id)
                && guard.states.get(node_id) == Some(&NodeState::Running)
        })
    }

    /// Current state of a node within this execution, or `None` if this
    /// execution has no record (evicted or never started) or the node
    /// isn't affected by it.
    #[must_use]
    pub fn node_state(&self, execution_id: ExecutionId, node_id: &NodeId) -> Option<NodeState> {
        self.executions
            .get(&execution_id)
            .and_then(|partition| partition.read().states.get(node_id).copied())
    }

    /// The output a completed node produced, for assembling a
    /// dependent's inputs.
    #[must_use]
    pub fn node_output(&self, execution_id: ExecutionId, node_id: &NodeId) -> Option<PortItems> {
        self.executions
            .get(&execution_id)
            .and_then(|partition| partition.read().outputs.get(node_id).cloned())
    }

    /// Aggregate per-node state for this execution.
    #[must_use]
    pub fn execution_progress(&self, execution_id: ExecutionId) -> Option<ExecutionProgress> {
        self.executions.get(&execution_id).map(|partition| {
            let guard = partition.read();
            ExecutionProgress {
                node_states: guard.states.clone(),
            }
        })
    }

    /// How long this execution's partition has existed, for the
    /// retention-window eviction policy (`EXECUTION_RETENTION_MS`).
    #[must_use]
    pub fn age(&self, execution_id: ExecutionId) -> Option<std::time::Duration> {
        self.executions
            .get(&execution_id)
            .map(|partition| partition.read().created_at.elapsed())
    }

    /// Release an execution's partition, freeing its memory.
    pub fn clear_execution(&self, execution_id: ExecutionId) {
        self.executions.remove(&execution_id);
    }

    /// Evict every execution partition that finished and has sat past
    /// `retention`. A still-running execution is never evicted regardless
    /// of its age — only `EXECUTION_RETENTION_MS` governs memory held for
    /// late subscribers after a terminal state, per §4's lifecycle note.
    /// Returns how many partitions were removed.
    pub fn evict_expired(&self, retention: std::time::Duration) -> usize {
        let expired: Vec<ExecutionId> = self
            .executions
            .iter()
            .filter_map(|entry| {
                let guard = entry.value().read();
                let complete = !guard.states.is_empty()
                    && guard.states.values().all(|s| s.is_terminal());
                (complete && guard.created_at.elapsed() >= retention).then(|| *entry.key())
            })
            .collect();
        for execution_id in &expired {
            self.executions.remove(execution_id);
        }
        expired.len()
    }
}
