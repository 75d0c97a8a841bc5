//! Per-execution in-memory context the scheduler threads through one run
//! (the spec's `ExecutionContext`).

use std::collections::HashSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use weave_core::{ExecutionId, NodeId};
use weave_workflow::{DependencyGraph, Workflow};

/// Everything the scheduler needs for one execution that doesn't belong in
/// the (workspace-shared) `ProgressTracker`: the workflow snapshot, its
/// dependency graph, the domain this run is scoped to, and the
/// cancellation signal propagated to every in-flight node.
///
/// This is deliberately *not* `Clone` and never stored anywhere beyond the
/// scheduler's own stack frame — the whole point of partitioning state by
/// `executionId` is that nothing reaches for a global map keyed
/// by node id alone.
pub struct ExecutionContext<'a> {
    /// Stable identifier for this run.
    pub execution_id: ExecutionId,
    /// The graph this execution runs against. Already a snapshot by the
    /// time the façade calls the engine.
    pub workflow: &'a Workflow,
    /// Dependency analysis over `workflow`, built once per run.
    pub graph: DependencyGraph,
    /// Nodes reachable from the trigger; the exclusive domain of
    /// this execution. For single-node mode this is exactly one node.
    pub affected: HashSet<NodeId>,
    /// Propagated to every dispatched node's `NodeContext::cancellation`.
    /// Callers that want to support a `/cancel` endpoint keep their own
    /// clone of this token before passing it in.
    cancel: CancellationToken,
    /// How long a non-cooperating node is given to react to `cancel`
    /// before its output is discarded (`WEBHOOK_GRACE_PERIOD_MS`).
    pub grace_period: Duration,
    /// Upper bound on concurrently-running nodes for this execution
    /// (`MAX_EXECUTION_CONCURRENCY`). Scoped per-execution — §5 is explicit
    /// that there is no cross-execution limit at this layer.
    pub concurrency_limit: usize,
}

impl<'a> ExecutionContext<'a> {
    /// Build the context for a full-workflow run starting at
    /// `trigger_node_id`.
    #[must_use]
    pub fn for_workflow(
        execution_id: ExecutionId,
        workflow: &'a Workflow,
        trigger_node_id: &NodeId,
        cancel: CancellationToken,
        concurrency_limit: usize,
        grace_period: Duration,
    ) -> Self {
        let graph = workflow.dependency_graph();
        let affected = graph.affected_from(trigger_node_id);
        Self {
            execution_id,
            workflow,
            graph,
            affected,
            cancel,
            grace_period,
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    /// Build the context for single-node mode: the domain is exactly the
    /// one node, and concurrency is moot since nothing else will ever be
    /// dispatched.
    #[must_use]
    pub fn for_single_node(
        execution_id: ExecutionId,
        workflow: &'a Workflow,
        node_id: &NodeId,
        cancel: CancellationToken,
        grace_period: Duration,
    ) -> Self {
        let graph = workflow.dependency_graph();
        let mut affected = HashSet::with_capacity(1);
        affected.insert(node_id.clone());
        Self {
            execution_id,
            workflow,
            graph,
            affected,
            cancel,
            grace_period,
            concurrency_limit: 1,
        }
    }

    /// The cancellation token propagated to every node dispatched in this
    /// execution.
    #[must_use]
    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use weave_workflow::{Connection, ExecutionCapability, Node, WorkflowSettings};

    fn node(id: &str, capability: ExecutionCapability) -> Node {
        Node {
            id: id.into(),
            node_type: "noOp".into(),
            name: id.into(),
            position: serde_json::Value::Null,
            parameters: HashMap::new(),
            credentials: HashMap::new(),
            disabled: false,
            execution_capability: capability,
            continue_on_fail: false,
            parent_id: None,
            extent: None,
        }
    }

    fn chain_workflow() -> Workflow {
        Workflow {
            id: "wf1".into(),
            name: "chain".into(),
            nodes: vec![
                node("t", ExecutionCapability::Trigger),
                node("a", ExecutionCapability::Action),
                node("b", ExecutionCapability::Action),
            ],
            connections: vec![
                Connection::main("t".into(), "a".into()),
                Connection::main("a".into(), "b".into()),
            ],
            settings: WorkflowSettings::default(),
            active: true,
        }
    }

    #[test]
    fn for_workflow_computes_affected_from_trigger() {
        let wf = chain_workflow();
        let ctx = ExecutionContext::for_workflow(
            ExecutionId::new(),
            &wf,
            &"t".into(),
            CancellationToken::new(),
            4,
            Duration::from_secs(30),
        );
        assert_eq!(ctx.affected.len(), 3);
        assert_eq!(ctx.concurrency_limit, 4);
    }

    #[test]
    fn for_single_node_scopes_to_one_node() {
        let wf = chain_workflow();
        let ctx = ExecutionContext::for_single_node(
            ExecutionId::new(),
            &wf,
            &"b".into(),
            CancellationToken::new(),
            Duration::from_secs(5),
        );
        assert_eq!(ctx.affected.len(), 1);
        assert!(ctx.affected.contains(&NodeId::from("b")));
        assert_eq!(ctx.concurrency_limit, 1);
    }

    #[test]
    fn zero_concurrency_limit_is_clamped_to_one() {
        let wf = chain_workflow();
        let ctx = ExecutionContext::for_workflow(
            ExecutionId::new(),
            &wf,
            &"t".into(),
            CancellationToken::new(),
            0,
            Duration::from_secs(30),
        );
        assert_eq!(ctx.concurrency_limit, 1);
    }
}
