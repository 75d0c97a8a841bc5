//! The flow execution engine's dispatch loop : the affected-node
//! subgraph walk that actually runs a workflow, one [`ExecutionContext`] at
//! a time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use weave_core::{ExecutionId, Item, NodeId, PortItems};
use weave_credential::CredentialResolver;
use weave_error::{EngineError, EngineResult};
use weave_eventbus::{Event, EventBus, EventKind, Topic};
use weave_execution::{ExecutionStatus, NodeState, ProgressTracker};
use weave_node::NodeError;
use weave_persistence::{NodeExecutionRow, PersistenceStore};
use weave_workflow::{ErrorPolicy, ParameterValue, Workflow};

use crate::context::ExecutionContext;
use crate::params::{resolve_credentials, resolve_parameters};
use crate::registry::NodeRegistry;

/// Why the dispatch loop stopped scheduling new work before every affected
/// node reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum AbortReason {
    #[default]
    None,
    /// A node failed and its effective policy was `stop`.
    NodeFailureStop,
    /// `maxDurationMs` elapsed.
    Timeout,
    /// The caller cancelled via the shared `CancellationToken`.
    UserCancelled,
}

/// What the scheduler decided for one non-terminal node this pass.
enum Readiness {
    /// At least one dependency hasn't reached a terminal state yet.
    Pending,
    /// Every dependency is terminal and at least one delivered items.
    Ready,
    /// Every dependency is terminal and none delivered items on an edge
    /// this node consumes (branch not taken, or the only path in failed).
    Skip,
}

struct NodeRunOutcome {
    node_id: NodeId,
    input: PortItems,
    result: Result<weave_node::NodeResult, NodeError>,
    started_at: DateTime<Utc>,
    /// `true` for a disabled node's synthesized pass-through :
    /// recorded as `SKIPPED` in persistence even though the tracker sees it
    /// as `COMPLETED`.
    disabled: bool,
}

/// The outcome of one full-workflow or single-node run.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// Terminal execution status.
    pub status: ExecutionStatus,
    /// Nodes that reached `Completed` (including disabled pass-through).
    pub executed_nodes: Vec<NodeId>,
    /// Nodes that reached `Failed`.
    pub failed_nodes: Vec<NodeId>,
}

/// Ties the node-type registry, credential resolver, progress tracker,
/// persistence store and event bus together into the dispatch loop
/// described in §4.6.
///
/// Grounded on the teacher's `WorkflowEngine`: a `Semaphore`-gated
/// `JoinSet` of node tasks, with per-run state (here, `ExecutionContext` +
/// `ProgressTracker`) replacing its level-by-level barrier with readiness
/// evaluated per node against actual port data, as the affected-node
/// scheduling in §4.6.2 requires.
pub struct FlowExecutionEngine {
    registry: Arc<NodeRegistry>,
    credentials: Arc<CredentialResolver>,
    tracker: Arc<ProgressTracker>,
    persistence: Arc<dyn PersistenceStore>,
    events: Arc<EventBus>,
}

impl FlowExecutionEngine {
    /// Build an engine over the given shared collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<NodeRegistry>,
        credentials: Arc<CredentialResolver>,
        tracker: Arc<ProgressTracker>,
        persistence: Arc<dyn PersistenceStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            credentials,
            tracker,
            persistence,
            events,
        }
    }

    /// Run a full workflow starting at `trigger_node_id`.
    ///
    /// `cancel` is owned by the caller (typically `weave-facade`, which
    /// keeps a clone in a live-executions map so a later cancel request can
    /// signal it) and is propagated to every dispatched node.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_workflow(
        &self,
        workflow: &Workflow,
        execution_id: ExecutionId,
        trigger_node_id: &NodeId,
        trigger_data: serde_json::Value,
        cancel: CancellationToken,
        concurrency_limit: usize,
        grace_period: Duration,
    ) -> EngineResult<EngineOutcome> {
        let ctx = ExecutionContext::for_workflow(
            execution_id,
            workflow,
            trigger_node_id,
            cancel,
            concurrency_limit,
            grace_period,
        );
        let affected: Vec<NodeId> = ctx.affected.iter().cloned().collect();
        self.tracker
        .start_execution(execution_id, trigger_node_id, &affected);

        let mut seed = HashMap::new();
        let mut trigger_input = PortItems::new();
        trigger_input.insert(weave_node::MAIN_PORT.to_string(), vec![Item::json(trigger_data)]);
        seed.insert(trigger_node_id.clone(), trigger_input);

        let max_duration = workflow.settings.max_duration_ms.map(Duration::from_millis);
        self.dispatch(ctx, seed, HashMap::new(), max_duration).await
    }

    /// Run exactly one node in isolation, against caller-supplied input
    /// data rather than upstream output.
    pub async fn run_single_node(
        &self,
        workflow: &Workflow,
        execution_id: ExecutionId,
        node_id: &NodeId,
        input_data: PortItems,
        parameter_overrides: Option<HashMap<String, ParameterValue>>,
        cancel: CancellationToken,
        grace_period: Duration,
    ) -> EngineResult<EngineOutcome> {
        let ctx =
        ExecutionContext::for_single_node(execution_id, workflow, node_id, cancel, grace_period);
        self.tracker
        .start_execution(execution_id, node_id, &[node_id.clone()]);

        let mut seed = HashMap::new();
        seed.insert(node_id.clone(), input_data);
        let mut overrides = HashMap::new();
        if let Some(o) = parameter_overrides {
            overrides.insert(node_id.clone(), o);
        }
        self.dispatch(ctx, seed, overrides, None).await
    }

    async fn dispatch(
        &self,
        ctx: ExecutionContext<'_>,
        seed: HashMap<NodeId, PortItems>,
        node_overrides: HashMap<NodeId, HashMap<String, ParameterValue>>,
        max_duration: Option<Duration>,
    ) -> EngineResult<EngineOutcome> {
        let semaphore = Arc::new(Semaphore::new(ctx.concurrency_limit));
        let mut remaining: HashSet<NodeId> = ctx.affected.clone();
        let mut running: HashSet<NodeId> = HashSet::new();
        let mut join_set: JoinSet<NodeRunOutcome> = JoinSet::new();
        let mut executed = Vec::new();
        let mut failed = Vec::new();
        let mut abort = AbortReason::None;
        let deadline = max_duration.map(|d| tokio::time::Instant::now() + d);

        loop {
            if ctx.cancel().is_cancelled() {
                if abort == AbortReason::None {
                    abort = AbortReason::UserCancelled;
                }
                break;
            }

            loop {
                let mut to_skip = Vec::new();
                let mut to_ready = Vec::new();
                for node_id in &remaining {
                    match self.evaluate_readiness(&ctx, node_id, &seed) {
                        Readiness::Ready => to_ready.push(node_id.clone()),
                        Readiness::Skip => to_skip.push(node_id.clone()),
                        Readiness::Pending => {}
                    }
                }
                if to_skip.is_empty() && to_ready.is_empty() {
                    break;
                }
                for node_id in to_skip {
                    remaining.remove(&node_id);
                    self.tracker.set_skipped(ctx.execution_id, &node_id);
                    self.persist_node_execution(
                        &ctx,
                        &node_id,
                        NodeState::Skipped,
                        PortItems::new(),
                        PortItems::new(),
                        None,
                        weave_core::time::now(),
                    )
                    .await;
                }
                for node_id in to_ready {
                    remaining.remove(&node_id);
                    self.spawn_node(
                        &ctx,
                        &node_id,
                        &seed,
                        &node_overrides,
                        &semaphore,
                        &mut join_set,
                        &mut executed,
                        &mut failed,
                        &mut abort,
                    )
                    .await;
                    running.insert(node_id);
                }
            }

            // A node resolved synchronously (disabled pass-through, or a
            // pre-dispatch validation failure) never entered `join_set`;
            // reconcile `running` against what's actually outstanding.
            running.retain(|id| {
                    self.tracker.node_state(ctx.execution_id, id) == Some(NodeState::Running)
                });

            if running.is_empty() && remaining.is_empty() {
                break;
            }
            if running.is_empty() {
                return Err(EngineError::workflow_execution(
                        "scheduler could not make progress: a dependency outside the trigger's domain \
                        is unsatisfiable",
                    ));
            }

            let mut fired_timeout = false;
            if let Some(deadline) = deadline {
                tokio::select! {
                    res = join_set.join_next() => {
                        if let Some(res) = res {
                            self.handle_completion(res, &ctx, &mut running, &mut executed, &mut failed, &mut abort).await?;
                        }
                    }
                    () = tokio::time::sleep_until(deadline) => { fired_timeout = true; }
                }
            } else if let Some(res) = join_set.join_next().await {
                self.handle_completion(res, &ctx, &mut running, &mut executed, &mut failed, &mut abort)
                .await?;
            }

            if fired_timeout {
                abort = AbortReason::Timeout;
                ctx.cancel().cancel();
            }
        }

        if ctx.cancel().is_cancelled() {
            for node_id in remaining.drain() {
                self.tracker.set_cancelled(ctx.execution_id, &node_id);
                self.persist_node_execution(
                    &ctx,
                    &node_id,
                    NodeState::Cancelled,
                    PortItems::new(),
                    PortItems::new(),
                    None,
                    weave_core::time::now(),
                )
                .await;
            }

            let grace_deadline = tokio::time::Instant::now() + ctx.grace_period;
            while !running.is_empty() {
                match tokio::time::timeout_at(grace_deadline, join_set.join_next()).await {
                    Ok(Some(res)) => {
                        self.handle_completion(res, &ctx, &mut running, &mut executed, &mut failed, &mut abort)
                        .await?;
                    }
                    Ok(None) => break,
                    Err(_elapsed) => {
                        for node_id in running.drain() {
                            self.tracker.set_cancelled(ctx.execution_id, &node_id);
                            self.persist_node_execution(
                                &ctx,
                                &node_id,
                                NodeState::Cancelled,
                                PortItems::new(),
                                PortItems::new(),
                                None,
                                weave_core::time::now(),
                            )
                            .await;
                        }
                        join_set.abort_all();
                        break;
                    }
                }
            }
        }

        let status = match abort {
            AbortReason::NodeFailureStop => ExecutionStatus::Failed,
            AbortReason::UserCancelled | AbortReason::Timeout => ExecutionStatus::Cancelled,
            AbortReason::None => {
                if failed.is_empty() {
                    ExecutionStatus::Completed
                } else if executed.is_empty() {
                    ExecutionStatus::Failed
                } else {
                    ExecutionStatus::Partial
                }
            }
        };

        Ok(EngineOutcome {
                status,
                executed_nodes: executed,
                failed_nodes: failed,
            })
    }

    fn evaluate_readiness(
        &self,
        ctx: &ExecutionContext<'_>,
        node_id: &NodeId,
        seed: &HashMap<NodeId, PortItems>,
    ) -> Readiness {
        if seed.contains_key(node_id) {
            return Readiness::Ready;
        }
        let incoming: Vec<_> = ctx
        .graph
        .incoming(node_id)
        .into_iter()
        .filter(|c| ctx.affected.contains(&c.source_node_id))
        .collect();
        if incoming.is_empty() {
            return Readiness::Ready;
        }

        let mut all_terminal = true;
        let mut any_data = false;
        for conn in incoming {
            match self.tracker.node_state(ctx.execution_id, &conn.source_node_id) {
                Some(state) if state.is_terminal => {
                    if state.produced_output {
                        if let Some(output) =
                        self.tracker.node_output(ctx.execution_id, &conn.source_node_id)
                        {
                            if output
                            .get(&conn.source_output)
                            .is_some_and(|items| !items.is_empty())
                            {
                                any_data = true;
                            }
                        }
                    }
                }
                _ => all_terminal = false,
            }
        }

        if !all_terminal {
            Readiness::Pending
        } else if any_data {
            Readiness::Ready
        } else {
            Readiness::Skip
        }
    }

    fn assemble_input(
        &self,
        ctx: &ExecutionContext<'_>,
        node_id: &NodeId,
        seed: &HashMap<NodeId, PortItems>,
    ) -> PortItems {
        if let Some(seeded) = seed.get(node_id) {
            return seeded.clone();
        }
        let mut assembled = PortItems::new();
        for conn in ctx.graph.incoming(node_id) {
            if !ctx.affected.contains(&conn.source_node_id) {
                continue;
            }
            if let Some(output) = self.tracker.node_output(ctx.execution_id, &conn.source_node_id) {
                if let Some(items) = output.get(&conn.source_output) {
                    assembled
                    .entry(conn.target_input.clone())
                    .or_default()
                    .extend(items.iter().cloned());
                }
            }
        }
        assembled
    }

    /// Build the `$node["<name>"]` lookup table for expression resolution:
    /// every already-settled affected node's main-port output, keyed by its
    /// display name rather than its id.
    fn named_node_outputs(&self, ctx: &ExecutionContext<'_>) -> HashMap<String, Vec<Item>> {
        let mut by_name = HashMap::new();
        for node_id in &ctx.affected {
            let Some(node) = ctx.workflow.node(node_id) else {
                continue;
            };
            if let Some(mut output) = self.tracker.node_output(ctx.execution_id, node_id) {
                if let Some(items) = output.remove(weave_node::MAIN_PORT) {
                    by_name.insert(node.name.clone(), items);
                }
            }
        }
        by_name
    }

    /// Resolve one ready node and either settle it synchronously (disabled
    /// pass-through, missing registration, parameter/credential error) or
    /// spawn it onto `join_set`.
    #[allow(clippy::too_many_arguments)]
    async fn spawn_node(
        &self,
        ctx: &ExecutionContext<'_>,
        node_id: &NodeId,
        seed: &HashMap<NodeId, PortItems>,
        node_overrides: &HashMap<NodeId, HashMap<String, ParameterValue>>,
        semaphore: &Arc<Semaphore>,
        join_set: &mut JoinSet<NodeRunOutcome>,
        executed: &mut Vec<NodeId>,
        failed: &mut Vec<NodeId>,
        abort: &mut AbortReason,
    ) {
        let node = ctx
        .workflow
        .node(node_id)
        .expect("node id came from this workflow's own dependency graph");
        let input = self.assemble_input(ctx, node_id, seed);
        self.tracker.set_running(ctx.execution_id, node_id);
        self.events.publish(
            &Topic::Execution(ctx.execution_id),
            Event::node_scoped(
                ctx.execution_id,
                ctx.workflow.id.clone(),
                node_id.clone(),
                EventKind::NodeStarted,
            ),
        );

        if node.disabled {
            let outcome = NodeRunOutcome {
                node_id: node_id.clone(),
                input: input.clone(),
                result: Ok(weave_node::NodeResult::Success(input)),
                started_at: weave_core::time::now(),
                disabled: true,
            };
            self.apply_outcome(ctx, outcome, executed, failed, abort).await;
            return;
        }

        let Some(registered) = self.registry.get(&node.node_type) else {
            let outcome = NodeRunOutcome {
                node_id: node_id.clone(),
                input,
                result: Err(NodeError::validation(format!(
                            "no node type registered for {}",
                            node.node_type
                        ))),
                started_at: weave_core::time::now(),
                disabled: false,
            };
            self.apply_outcome(ctx, outcome, executed, failed, abort).await;
            return;
        };

        let overrides = node_overrides.get(node_id);
        let empty_items: Vec<Item> = Vec::new();
        let input_items = input.get(weave_node::MAIN_PORT).unwrap_or(&empty_items);
        let node_outputs = self.named_node_outputs(ctx);
        let scope = crate::expression::ExpressionScope {
            item: input_items.first(),
            input_items,
            node_outputs: &node_outputs,
        };
        let parameters = match resolve_parameters(node, &registered.definition, overrides, &scope) {
            Ok(p) => p,
            Err(e) => {
                let outcome = NodeRunOutcome {
                    node_id: node_id.clone(),
                    input,
                    result: Err(NodeError::validation(e.message())),
                    started_at: weave_core::time::now(),
                    disabled: false,
                };
                self.apply_outcome(ctx, outcome, executed, failed, abort).await;
                return;
            }
        };
        let credentials = match resolve_credentials(node, &registered.definition, &self.credentials) {
            Ok(c) => c,
            Err(e) => {
                let outcome = NodeRunOutcome {
                    node_id: node_id.clone(),
                    input,
                    result: Err(NodeError::validation(e.message())),
                    started_at: weave_core::time::now(),
                    disabled: false,
                };
                self.apply_outcome(ctx, outcome, executed, failed, abort).await;
                return;
            }
        };

        let node_impl = registered.node.clone();
        let node_ctx = weave_node::NodeContext::new(ctx.execution_id, node_id.clone())
        .with_inputs(input.clone())
        .with_parameters(parameters)
        .with_credentials(credentials)
        .with_cancellation(ctx.cancel().clone());
        let semaphore = semaphore.clone();
        let started_at = weave_core::time::now();
        let spawned_node_id = node_id.clone();

        join_set.spawn(async move {
                let permit = semaphore.acquire_owned().await.ok();
                let result = node_impl.execute(&node_ctx).await;
                drop(permit);
                NodeRunOutcome {
                    node_id: spawned_node_id,
                    input: node_ctx.inputs.clone(),
                    result,
                    started_at,
                    disabled: false,
                }
            });
    }

    async fn handle_completion(
        &self,
        res: Result<NodeRunOutcome, tokio::task::JoinError>,
        ctx: &ExecutionContext<'_>,
        running: &mut HashSet<NodeId>,
        executed: &mut Vec<NodeId>,
        failed: &mut Vec<NodeId>,
        abort: &mut AbortReason,
    ) -> EngineResult<()> {
        let outcome = match res {
            Ok(outcome) => outcome,
            Err(join_err) => {
                return Err(EngineError::workflow_execution(format!(
                            "node task did not complete cleanly: {join_err}"
                        )));
            }
        };
        running.remove(&outcome.node_id);
        self.apply_outcome(ctx, outcome, executed, failed, abort).await;
        Ok(())
    }

    async fn apply_outcome(
        &self,
        ctx: &ExecutionContext<'_>,
        outcome: NodeRunOutcome,
        executed: &mut Vec<NodeId>,
        failed: &mut Vec<NodeId>,
        abort: &mut AbortReason,
    ) {
        match outcome.result {
            Ok(node_result) => {
                if node_result.is_skip() {
                    self.tracker.set_skipped(ctx.execution_id, &outcome.node_id);
                    self.persist_node_execution(
                        ctx,
                        &outcome.node_id,
                        NodeState::Skipped,
                        outcome.input,
                        PortItems::new(),
                        None,
                        outcome.started_at,
                    )
                    .await;
                    return;
                }

                let (outputs, _) = node_result.into_port_items();
                self.tracker
                .set_completed(ctx.execution_id, &outcome.node_id, outputs.clone());
                let persisted_status = if outcome.disabled {
                    NodeState::Skipped
                } else {
                    NodeState::Completed
                };
                self.persist_node_execution(
                    ctx,
                    &outcome.node_id,
                    persisted_status,
                    outcome.input,
                    outputs,
                    None,
                    outcome.started_at,
                )
                .await;
                if !outcome.disabled {
                    executed.push(outcome.node_id.clone());
                }
                self.events.publish(
                    &Topic::Execution(ctx.execution_id),
                    Event::node_scoped(
                        ctx.execution_id,
                        ctx.workflow.id.clone(),
                        outcome.node_id,
                        EventKind::NodeCompleted,
                    ),
                );
            }
            Err(NodeError::Cancelled) => {
                self.tracker.set_cancelled(ctx.execution_id, &outcome.node_id);
                self.persist_node_execution(
                    ctx,
                    &outcome.node_id,
                    NodeState::Cancelled,
                    outcome.input,
                    PortItems::new(),
                    Some(NodeError::Cancelled.to_persisted_error()),
                    outcome.started_at,
                )
                .await;
            }
            Err(node_err) => {
                self.tracker.set_failed(ctx.execution_id, &outcome.node_id);
                let persisted_error = node_err.to_persisted_error();
                self.persist_node_execution(
                    ctx,
                    &outcome.node_id,
                    NodeState::Failed,
                    outcome.input,
                    PortItems::new(),
                    Some(persisted_error.clone()),
                    outcome.started_at,
                )
                .await;
                failed.push(outcome.node_id.clone());
                self.events.publish(
                    &Topic::Execution(ctx.execution_id),
                    Event::node_scoped(
                        ctx.execution_id,
                        ctx.workflow.id.clone(),
                        outcome.node_id.clone(),
                        EventKind::NodeFailed {
                            error: persisted_error,
                        },
                    ),
                );

                let node = ctx.workflow.node(&outcome.node_id);
                let continues = node.is_some_and(|n| n.continue_on_fail)
                || ctx.workflow.settings.error_policy == ErrorPolicy::Continue;
                if !continues && *abort == AbortReason::None {
                    *abort = AbortReason::NodeFailureStop;
                    ctx.cancel().cancel();
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_node_execution(
        &self,
        ctx: &ExecutionContext<'_>,
        node_id: &NodeId,
        status: NodeState,
        input: PortItems,
        output: PortItems,
        error: Option<serde_json::Value>,
        started_at: DateTime<Utc>,
    ) {
        let row = NodeExecutionRow {
            id: NodeExecutionRow::row_id(ctx.execution_id, node_id),
            execution_id: ctx.execution_id,
            node_id: node_id.clone(),
            status,
            started_at,
            finished_at: Some(weave_core::time::now()),
            input_data: serde_json::to_value(&input).unwrap_or(serde_json::Value::Null),
            output_data: serde_json::to_value(&output).unwrap_or(serde_json::Value::Null),
            error,
        };
        if let Err(err) = self.persistence.insert_node_execution(row).await {
            tracing::warn!(
                execution_id = %ctx.execution_id,
                node_id = %node_id,
                error = %err,
                "failed to persist node execution row",
            );
        }
    }
}
