//! The Execution Façade : the single public entry point unifying
//! full-workflow and single-node dispatch behind one contract and one
//! response shape.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use weave_core::{ExecutionId, PortItems};
use weave_error::{EngineError, EngineResult};
use weave_eventbus::{Event, EventBus, EventKind, Topic};
use weave_execution::{ExecutionProgress, ExecutionStatus, ProgressTracker};
use weave_persistence::{ExecutionRow, PersistenceStore};
use weave_workflow::Workflow;

use crate::config::FacadeConfig;
use crate::request::StartExecutionRequest;
use crate::response::{ExecutionDetail, ExecutionResponse};
use crate::workflow_source::WorkflowSource;
use weave_engine::FlowExecutionEngine;

/// Ties the flow execution engine to workflow lookup, persistence, the
/// progress tracker, and the event bus, and owns the per-execution
/// cancellation tokens a future `/cancel` endpoint needs (cancelling
/// execution A never affects execution B).
pub struct ExecutionFacade {
    workflows: Arc<dyn WorkflowSource>,
    engine: Arc<FlowExecutionEngine>,
    tracker: Arc<ProgressTracker>,
    persistence: Arc<dyn PersistenceStore>,
    events: Arc<EventBus>,
    config: FacadeConfig,
    live: DashMap<ExecutionId, CancellationToken>,
}

impl ExecutionFacade {
    /// Build a façade over its collaborators.
    pub fn new(
        workflows: Arc<dyn WorkflowSource>,
        engine: Arc<FlowExecutionEngine>,
        tracker: Arc<ProgressTracker>,
        persistence: Arc<dyn PersistenceStore>,
        events: Arc<EventBus>,
        config: FacadeConfig,
    ) -> Self {
        Self {
            workflows,
            engine,
            tracker,
            persistence,
            events,
            config,
            live: DashMap::new(),
        }
    }

    /// Dispatch a `POST /executions` request.
    pub async fn start_execution(
        &self,
        request: StartExecutionRequest,
    ) -> EngineResult<ExecutionResponse> {
        self.dispatch(request, CancellationToken::new()).await
    }

    /// Start an execution whose cancellation is tied to a parent's (an
    /// `Execute Workflow` sub-execution dies when the parent run is
    /// cancelled). `parent`'s own lifetime is untouched; only its
    /// cancellation propagates downward, via [`CancellationToken::child_token`].
    pub async fn start_execution_linked(
        &self,
        request: StartExecutionRequest,
        parent: &CancellationToken,
    ) -> EngineResult<ExecutionResponse> {
        self.dispatch(request, parent.child_token()).await
    }

    async fn dispatch(
        &self,
        request: StartExecutionRequest,
        cancel: CancellationToken,
    ) -> EngineResult<ExecutionResponse> {
        let workflow = self
            .workflows
            .get(&request.workflow_id)
            .ok_or_else(|| EngineError::not_found(format!("unknown workflow {}", request.workflow_id)))?;

        let execution_id = request.execution_id.unwrap_or_else(ExecutionId::new);
        let trigger_data = request.trigger_data.clone().unwrap_or(serde_json::Value::Null);

        if workflow.nodes.is_empty() {
            return self
                .run_empty_workflow(&workflow, execution_id, trigger_data)
                .await;
        }

        let row = ExecutionRow::starting(execution_id, &workflow, trigger_data.clone());
        self.persistence.create_execution(row).await?;
        self.events.publish(
            &Topic::Workflow(workflow.id.clone()),
            Event::workflow_scoped(execution_id, workflow.id.clone(), EventKind::ExecutionStarted),
        );

        self.live.insert(execution_id, cancel.clone());
        let started_at = weave_core::time::now();

        let outcome = if let Some(node_id) = &request.node_id {
            self.engine
                .run_single_node(
                    &workflow,
                    execution_id,
                    node_id,
                    request.input_data.unwrap_or_default(),
                    request.parameters,
                    cancel,
                    self.config.grace_period,
                )
                .await
        } else {
            let trigger_node_id = match &request.trigger_node_id {
                Some(id) => id.clone(),
                None => self.sole_trigger(&workflow)?.id.clone(),
            };
            self.engine
                .run_workflow(
                    &workflow,
                    execution_id,
                    &trigger_node_id,
                    trigger_data,
                    cancel,
                    self.config.max_execution_concurrency,
                    self.config.grace_period,
                )
                .await
        };

        self.live.remove(&execution_id);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.abort_execution(&workflow, execution_id, &err).await?;
                return Err(err);
            }
        };
        let duration = (weave_core::time::now() - started_at)
            .num_milliseconds()
            .max(0) as u64;

        let error = if outcome.failed_nodes.is_empty() {
            None
        } else {
            Some(serde_json::json!({
                "message": format!("{} node(s) failed", outcome.failed_nodes.len()),
                "failedNodes": outcome.failed_nodes,
                "executionPath": outcome.executed_nodes,
            }))
        };
        let mut row = self.persistence.get_execution(execution_id).await?;
        row.status = outcome.status;
        row.finished_at = Some(weave_core::time::now());
        row.error = error;
        self.persistence.update_execution(row).await?;

        self.events.publish(
            &Topic::Workflow(workflow.id.clone()),
            Event::workflow_scoped(
                execution_id,
                workflow.id.clone(),
                EventKind::ExecutionCompleted {
                    status: outcome.status.to_string(),
                },
            ),
        );

        Ok(ExecutionResponse {
            execution_id,
            status: outcome.status,
            has_failures: !outcome.failed_nodes.is_empty(),
            executed_nodes: outcome.executed_nodes,
            failed_nodes: outcome.failed_nodes,
            duration,
        })
    }

    /// Engine-level failure (scheduler invariant violated, corrupt
    /// snapshot): abort the execution rather than leave it `Running`
    /// forever. Terminal status `Failed`, every non-terminal node
    /// `Cancelled`, the error recorded on the row, and
    /// `ExecutionCompleted` published same as the happy path.
    async fn abort_execution(
        &self,
        workflow: &Workflow,
        execution_id: ExecutionId,
        err: &EngineError,
    ) -> EngineResult<()> {
        let node_executions = self.persistence.list_node_executions(execution_id).await?;
        for mut row in node_executions {
            if row.status.is_terminal() {
                continue;
            }
            row.status = weave_execution::NodeState::Cancelled;
            row.finished_at = Some(weave_core::time::now());
            self.persistence.update_node_execution(row).await?;
        }

        let mut row = self.persistence.get_execution(execution_id).await?;
        row.status = ExecutionStatus::Failed;
        row.finished_at = Some(weave_core::time::now());
        row.error = Some(serde_json::json!({"message": err.message}));
        self.persistence.update_execution(row).await?;

        self.events.publish(
            &Topic::Workflow(workflow.id.clone()),
            Event::workflow_scoped(
                execution_id,
                workflow.id.clone(),
                EventKind::ExecutionCompleted {
                    status: ExecutionStatus::Failed.to_string(),
                },
            ),
        );
        Ok(())
    }

    /// Boundary behavior: a workflow with no nodes completes
    /// immediately with zero node executions, without ever touching the
    /// engine or progress tracker.
    async fn run_empty_workflow(
        &self,
        workflow: &Workflow,
        execution_id: ExecutionId,
        trigger_data: serde_json::Value,
    ) -> EngineResult<ExecutionResponse> {
        let mut row = ExecutionRow::starting(execution_id, workflow, trigger_data);
        row.status = ExecutionStatus::Completed;
        row.finished_at = Some(weave_core::time::now());
        self.persistence.create_execution(row).await?;
        self.events.publish(
            &Topic::Workflow(workflow.id.clone()),
            Event::workflow_scoped(execution_id, workflow.id.clone(), EventKind::ExecutionStarted),
        );
        self.events.publish(
            &Topic::Workflow(workflow.id.clone()),
            Event::workflow_scoped(
                execution_id,
                workflow.id.clone(),
                EventKind::ExecutionCompleted {
                    status: ExecutionStatus::Completed.to_string(),
                },
            ),
        );
        Ok(ExecutionResponse {
            execution_id,
            status: ExecutionStatus::Completed,
            executed_nodes: Vec::new(),
            failed_nodes: Vec::new(),
            duration: 0,
            has_failures: false,
        })
    }

    fn sole_trigger<'a>(&self, workflow: &'a Workflow) -> EngineResult<&'a weave_workflow::Node> {
        let triggers = workflow.triggers();
        match triggers.as_slice() {
            [] => Err(EngineError::validation("workflow has no trigger node")),
            [only] => Ok(only),
            _ => Err(EngineError::validation(
                "workflow has multiple triggers; triggerNodeId is required",
            )),
        }
    }

    /// Signal cancellation for a still-running execution. Returns `false`
    /// if the execution isn't currently live (already terminal, or
    /// unknown).
    pub fn cancel_execution(&self, execution_id: ExecutionId) -> bool {
        if let Some(token) = self.live.get(&execution_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// `GET /executions/{id}`: the execution row plus every node-execution
    /// child recorded for it.
    pub async fn get_execution(&self, execution_id: ExecutionId) -> EngineResult<ExecutionDetail> {
        let execution = self.persistence.get_execution(execution_id).await?;
        let node_executions = self.persistence.list_node_executions(execution_id).await?;
        Ok(ExecutionDetail {
            execution,
            node_executions,
        })
    }

    /// `GET /executions/{id}/progress`: the tracker's live view if the
    /// execution is still in memory, falling back to persistence if it
    /// has been evicted.
    pub async fn get_progress(&self, execution_id: ExecutionId) -> EngineResult<ExecutionProgress> {
        if let Some(progress) = self.tracker.execution_progress(execution_id) {
            return Ok(progress);
        }

        let node_executions = self.persistence.list_node_executions(execution_id).await?;
        let node_states = node_executions
            .into_iter()
            .map(|row| (row.node_id, row.status))
            .collect();
        Ok(ExecutionProgress { node_states })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use weave_credential::{CredentialResolver, InMemoryCredentialStore};
    use weave_engine::NodeRegistry;
    use weave_node::{NodeContext, NodeError, NodeResult, SimpleNode};
    use weave_persistence::InMemoryPersistenceStore;
    use weave_workflow::{
        Connection, ExecutionCapability, Node, NodeDefinition, PropertySource, WorkflowSettings,
    };

    struct NoOp;

    #[async_trait::async_trait]
    impl SimpleNode for NoOp {
        async fn run(&self, ctx: &NodeContext) -> Result<weave_core::Items, NodeError> {
            Ok(ctx.main_input().to_vec())
        }
    }

    fn no_op_definition(type_key: &str, capability: ExecutionCapability) -> NodeDefinition {
        NodeDefinition {
            type_key: type_key.into(),
            display_name: type_key.into(),
            group: vec![],
            inputs: if capability == ExecutionCapability::Trigger {
                vec![]
            } else {
                vec!["main".into()]
            },
            outputs: vec!["main".into()],
            execution_capability: capability,
            properties: PropertySource::Static(vec![]),
            credential_types: vec![],
        }
    }

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

    fn facade_with(workflow: Workflow) -> ExecutionFacade {
        let mut registry = NodeRegistry::new();
        registry.register(
            no_op_definition("noOp", ExecutionCapability::Action),
            Arc::new(NoOp),
        );
        let resolver = Arc::new(CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            weave_credential::EncryptionKey::from_bytes(&[7u8; 32]).unwrap(),
        ));
        let tracker = Arc::new(ProgressTracker::new());
        let persistence: Arc<dyn PersistenceStore> = Arc::new(InMemoryPersistenceStore::new());
        let events = Arc::new(EventBus::new());
        let engine = Arc::new(FlowExecutionEngine::new(
            Arc::new(registry),
            resolver,
            tracker.clone(),
            persistence.clone(),
            events.clone(),
        ));
        let workflows = Arc::new(crate::workflow_source::InMemoryWorkflowSource::new());
        workflows.put(workflow);
        ExecutionFacade::new(
            workflows,
            engine,
            tracker,
            persistence,
            events,
            FacadeConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_workflow_completes_immediately_with_no_node_executions() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "empty".into(),
            nodes: vec![],
            connections: vec![],
            settings: WorkflowSettings::default(),
            active: true,
        };
        let facade = facade_with(workflow);
        let response = facade
            .start_execution(StartExecutionRequest::workflow(
                "wf1".into(),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status, ExecutionStatus::Completed);
        assert!(response.executed_nodes.is_empty());
        let detail = facade.get_execution(response.execution_id).await.unwrap();
        assert!(detail.node_executions.is_empty());
    }

    #[tokio::test]
    async fn linear_workflow_executes_trigger_and_downstream() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "linear".into(),
            nodes: vec![
                node("t", ExecutionCapability::Trigger),
                node("a", ExecutionCapability::Action),
            ],
            connections: vec![Connection::main("t".into(), "a".into())],
            settings: WorkflowSettings::default(),
            active: true,
        };
        let facade = facade_with(workflow);
        let response = facade
            .start_execution(StartExecutionRequest::workflow(
                "wf1".into(),
                serde_json::json!({"x": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status, ExecutionStatus::Completed);
        assert_eq!(response.executed_nodes.len(), 2);
        assert!(!response.has_failures);
    }

    #[tokio::test]
    async fn ambiguous_trigger_without_explicit_id_is_rejected() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "ambiguous".into(),
            nodes: vec![
                node("t1", ExecutionCapability::Trigger),
                node("t2", ExecutionCapability::Trigger),
            ],
            connections: vec![],
            settings: WorkflowSettings::default(),
            active: true,
        };
        let facade = facade_with(workflow);
        let err = facade
            .start_execution(StartExecutionRequest::workflow(
                "wf1".into(),
                serde_json::json!({}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn single_node_mode_runs_exactly_one_node() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "single".into(),
            nodes: vec![
                node("t", ExecutionCapability::Trigger),
                node("a", ExecutionCapability::Action),
            ],
            connections: vec![Connection::main("t".into(), "a".into())],
            settings: WorkflowSettings::default(),
            active: true,
        };
        let facade = facade_with(workflow);
        let mut input = PortItems::new();
        input.insert("main".into(), vec![weave_core::Item::json(serde_json::json!({}))]);
        let response = facade
            .start_execution(StartExecutionRequest::single_node("wf1".into(), "a".into(), input))
            .await
            .unwrap();
        assert_eq!(response.executed_nodes, vec![weave_core::NodeId::from("a")]);
        let detail = facade.get_execution(response.execution_id).await.unwrap();
        assert_eq!(detail.node_executions.len(), 1);
    }

    #[tokio::test]
    async fn engine_level_error_aborts_execution_with_bookkeeping() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "abort".into(),
            nodes: vec![
                node("t", ExecutionCapability::Trigger),
                node("a", ExecutionCapability::Action),
            ],
            connections: vec![Connection::main("t".into(), "a".into())],
            settings: WorkflowSettings::default(),
            active: true,
        };
        let facade = facade_with(workflow.clone());
        let execution_id = ExecutionId::new();

        let row = ExecutionRow::starting(execution_id, &workflow, serde_json::json!({}));
        facade.persistence.create_execution(row).await.unwrap();
        facade
            .persistence
            .insert_node_execution(weave_persistence::NodeExecutionRow {
                id: weave_persistence::NodeExecutionRow::row_id(execution_id, &"t".into()),
                execution_id,
                node_id: "t".into(),
                status: weave_execution::NodeState::Running,
                started_at: weave_core::time::now(),
                finished_at: None,
                input_data: serde_json::Value::Null,
                output_data: serde_json::Value::Null,
                error: None,
            })
            .await
            .unwrap();

        let mut subscriber = facade.events.subscribe(&Topic::Workflow(workflow.id.clone()));
        let err = EngineError::workflow_execution("scheduler could not make progress");
        facade
            .abort_execution(&workflow, execution_id, &err)
            .await
            .unwrap();

        let stored = facade.persistence.get_execution(execution_id).await.unwrap();
        assert_eq!(stored.status, ExecutionStatus::Failed);
        assert!(stored.finished_at.is_some());
        assert!(stored.error.is_some());

        let node_rows = facade.persistence.list_node_executions(execution_id).await.unwrap();
        let t_row = node_rows.iter().find(|r| r.node_id == "t".into()).unwrap();
        assert_eq!(t_row.status, weave_execution::NodeState::Cancelled);

        let event = subscriber.try_recv().unwrap();
        assert!(matches!(event.kind, EventKind::ExecutionCompleted { .. }));
    }

    #[tokio::test]
    async fn unknown_workflow_id_is_not_found() {
        let workflow = Workflow {
            id: "wf1".into(),
            name: "x".into(),
            nodes: vec![],
            connections: vec![],
            settings: WorkflowSettings::default(),
            active: true,
        };
        let facade = facade_with(workflow);
        let err = facade
            .start_execution(StartExecutionRequest::workflow(
                "ghost".into(),
                serde_json::json!({}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::NotFound);
    }
}
