//! The Trigger Dispatcher itself : registration, webhook ingestion,
//! and sub-execution via an `Execute Workflow` node.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use weave_core::{NodeId, TriggerId, WorkflowId};
use weave_credential::CredentialResolver;
use weave_error::{EngineError, EngineResult};
use weave_eventbus::{Event, EventBus, EventKind, Topic};
use weave_facade::{ExecutionFacade, ExecutionResponse, StartExecutionRequest};
use weave_persistence::{PersistenceStore, TriggerRow};

use crate::auth::{self, WebhookRequest};
use crate::schedule;
use crate::settings::{ScheduleTriggerSettings, WebhookTriggerSettings};
use crate::webhook::{build_trigger_data, WebhookIngestResult};

/// A live schedule registration: the task it runs under and the token that
/// stops it.
struct ScheduleHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Registers triggers on workflow activation, ingests webhook requests,
/// evaluates schedules, and brokers workflow-call sub-executions.
pub struct TriggerDispatcher {
    persistence: Arc<dyn PersistenceStore>,
    credentials: Arc<CredentialResolver>,
    facade: Arc<ExecutionFacade>,
    events: Arc<EventBus>,
    schedules: DashMap<TriggerId, ScheduleHandle>,
}

impl TriggerDispatcher {
    /// Build a dispatcher over its collaborators.
    #[must_use]
    pub fn new(
        persistence: Arc<dyn PersistenceStore>,
        credentials: Arc<CredentialResolver>,
        facade: Arc<ExecutionFacade>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            persistence,
            credentials,
            facade,
            events,
            schedules: DashMap::new(),
        }
    }

    /// Register a webhook route. `explicit_id` lets a workflow keep a
    /// stable webhook URL across edits; omit it to mint a fresh one.
    pub async fn register_webhook(
        &self,
        workflow_id: WorkflowId,
        node_id: NodeId,
        settings: serde_json::Value,
        explicit_id: Option<TriggerId>,
    ) -> EngineResult<TriggerId> {
        WebhookTriggerSettings::parse(&settings)?;
        let id = explicit_id.unwrap_or_else(TriggerId::new);
        let row = TriggerRow {
            id,
            workflow_id,
            node_id,
            trigger_type: "webhook".into(),
            settings,
            active: true,
        };
        self.persistence.upsert_trigger(row).await?;
        Ok(id)
    }

    /// Register a schedule trigger and start its background evaluation
    /// loop.
    pub async fn register_schedule(
        &self,
        workflow_id: WorkflowId,
        node_id: NodeId,
        settings: serde_json::Value,
    ) -> EngineResult<TriggerId> {
        let parsed = ScheduleTriggerSettings::parse(&settings)?;
        let id = TriggerId::new();
        let row = TriggerRow {
            id,
            workflow_id: workflow_id.clone(),
            node_id: node_id.clone(),
            trigger_type: "schedule".into(),
            settings,
            active: true,
        };
        self.persistence.upsert_trigger(row).await?;

        let cancel = CancellationToken::new();
        let task = schedule::spawn(
            id,
            workflow_id,
            node_id,
            parsed,
            self.facade.clone(),
            cancel.clone(),
        )?;
        self.schedules.insert(id, ScheduleHandle { cancel, task });
        Ok(id)
    }

    /// Deactivate a trigger: mark its row inactive and, for a schedule,
    /// stop its evaluation loop.
    pub async fn deactivate(&self, trigger_id: TriggerId) -> EngineResult<()> {
        let mut row = self.persistence.get_trigger(&trigger_id).await?;
        row.active = false;
        self.persistence.upsert_trigger(row).await?;
        if let Some((_, handle)) = self.schedules.remove(&trigger_id) {
            handle.cancel.cancel();
            handle.task.abort();
        }
        Ok(())
    }

    /// Ingest a webhook request. Returns as soon as authentication
    /// passes and the execution has been handed off — it does not wait for
    /// the workflow to finish.
    pub async fn handle_webhook(
        &self,
        webhook_id: TriggerId,
        method: &str,
        path: &str,
        request: WebhookRequest,
        body: serde_json::Value,
        test_mode: bool,
    ) -> EngineResult<WebhookIngestResult> {
        let trigger = self.persistence.get_trigger(&webhook_id).await?;
        if !trigger.active {
            return Err(EngineError::not_found(format!(
                "webhook {webhook_id} is not active"
            )));
        }

        let settings = WebhookTriggerSettings::parse(&trigger.settings)?;
        if !method.eq_ignore_ascii_case(&settings.http_method) {
            return Err(EngineError::method_not_allowed(format!(
                "webhook {webhook_id} accepts {} only",
                settings.http_method
            )));
        }

        auth::authenticate(&settings.authentication, &self.credentials, &request)?;

        let trigger_data = build_trigger_data(body, &request, method, path);
        let execution_id = weave_core::ExecutionId::new();

        let event_kind = if test_mode {
            EventKind::WebhookTestTriggered
        } else {
            EventKind::WebhookTriggered
        };
        self.events.publish(
            &Topic::Workflow(trigger.workflow_id.clone()),
            Event::workflow_scoped(execution_id, trigger.workflow_id.clone(), event_kind),
        );

        let mut exec_request = StartExecutionRequest::workflow(trigger.workflow_id.clone(), trigger_data);
        exec_request.trigger_node_id = Some(trigger.node_id.clone());
        exec_request.execution_id = Some(execution_id);

        let facade = self.facade.clone();
        let webhook_id_for_log = webhook_id;
        tokio::spawn(async move {
            if let Err(err) = facade.start_execution(exec_request).await {
                error!(
                    webhook_id = %webhook_id_for_log,
                    error = %err,
                    "webhook-triggered execution failed to start"
                );
            }
        });

        info!(webhook_id = %webhook_id, execution_id = %execution_id, test_mode, "webhook accepted");

        Ok(WebhookIngestResult {
            execution_id,
            webhook_id,
            test_mode,
        })
    }

    /// Invoke a child workflow as a sub-execution of an `Execute Workflow`
    /// node. Blocks until the child reaches a terminal state;
    /// cancelling `parent_cancel` cancels the child.
    pub async fn invoke_workflow_call(
        &self,
        child_workflow_id: WorkflowId,
        payload: serde_json::Value,
        parent_cancel: &CancellationToken,
    ) -> EngineResult<ExecutionResponse> {
        let request = StartExecutionRequest::workflow(child_workflow_id, payload);
        self.facade
            .start_execution_linked(request, parent_cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use weave_credential::{cipher, EncryptionKey, InMemoryCredentialStore};
    use weave_engine::{FlowExecutionEngine, NodeRegistry};
    use weave_execution::ProgressTracker;
    use weave_facade::{FacadeConfig, InMemoryWorkflowSource};
    use weave_persistence::InMemoryPersistenceStore;
    use weave_workflow::{ExecutionCapability, Node, Workflow, WorkflowSettings};

    fn node(id: &str, capability: ExecutionCapability) -> Node {
        Node {
            id: id.into(),
            node_type: "noOp".into(),
            name: id.into(),
            position: serde_json::Value::Null,
            parameters: std::collections::HashMap::new(),
            credentials: std::collections::HashMap::new(),
            disabled: false,
            execution_capability: capability,
            continue_on_fail: false,
            parent_id: None,
            extent: None,
        }
    }

    fn dispatcher_with(workflow: Workflow) -> (TriggerDispatcher, Arc<InMemoryPersistenceStore>) {
        let registry = Arc::new(NodeRegistry::new());
        let resolver = Arc::new(CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            EncryptionKey::from_bytes(&[4u8; 32]).unwrap(),
        ));
        let tracker = Arc::new(ProgressTracker::new());
        let persistence = Arc::new(InMemoryPersistenceStore::new());
        let events = Arc::new(EventBus::new());
        let engine = Arc::new(FlowExecutionEngine::new(
            registry,
            resolver.clone(),
            tracker.clone(),
            persistence.clone() as Arc<dyn PersistenceStore>,
            events.clone(),
        ));
        let workflows = Arc::new(InMemoryWorkflowSource::new());
        workflows.put(workflow);
        let facade = Arc::new(ExecutionFacade::new(
            workflows,
            engine,
            tracker,
            persistence.clone() as Arc<dyn PersistenceStore>,
            events.clone(),
            FacadeConfig::default(),
        ));
        let dispatcher = TriggerDispatcher::new(
            persistence.clone() as Arc<dyn PersistenceStore>,
            resolver,
            facade,
            events,
        );
        (dispatcher, persistence)
    }

    fn trigger_workflow() -> Workflow {
        Workflow {
            id: "wf1".into(),
            name: "webhook".into(),
            nodes: vec![node("t", ExecutionCapability::Trigger)],
            connections: vec![],
            settings: WorkflowSettings::default(),
            active: true,
        }
    }

    #[tokio::test]
    async fn unknown_webhook_id_is_not_found() {
        let (dispatcher, _) = dispatcher_with(trigger_workflow());
        let err = dispatcher
            .handle_webhook(
                TriggerId::new(),
                "POST",
                "/webhook/ghost",
                WebhookRequest::default(),
                serde_json::json!({}),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn method_mismatch_is_rejected() {
        let (dispatcher, _) = dispatcher_with(trigger_workflow());
        let id = dispatcher
            .register_webhook(
                "wf1".into(),
                "t".into(),
                serde_json::json!({"httpMethod": "POST"}),
                None,
            )
            .await
            .unwrap();
        let err = dispatcher
            .handle_webhook(
                id,
                "GET",
                "/webhook/x",
                WebhookRequest::default(),
                serde_json::json!({}),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::MethodNotAllowed);
    }

    #[tokio::test]
    async fn inactive_trigger_is_not_found() {
        let (dispatcher, _) = dispatcher_with(trigger_workflow());
        let id = dispatcher
            .register_webhook("wf1".into(), "t".into(), serde_json::json!({}), None)
            .await
            .unwrap();
        dispatcher.deactivate(id).await.unwrap();
        let err = dispatcher
            .handle_webhook(
                id,
                "POST",
                "/webhook/x",
                WebhookRequest::default(),
                serde_json::json!({}),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn successful_webhook_starts_an_execution_and_returns_immediately() {
        let (dispatcher, persistence) = dispatcher_with(trigger_workflow());
        let id = dispatcher
            .register_webhook(
                "wf1".into(),
                "t".into(),
                serde_json::json!({"httpMethod": "POST"}),
                None,
            )
            .await
            .unwrap();
        let result = dispatcher
            .handle_webhook(
                id,
                "POST",
                "/webhook/x",
                WebhookRequest::default(),
                serde_json::json!({"x": 1}),
                false,
            )
            .await
            .unwrap();
        assert_eq!(result.webhook_id, id);
        assert!(!result.test_mode);

        // The spawned execution runs on its own task; give it a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let row = persistence.get_execution(result.execution_id).await.unwrap();
        assert_eq!(row.trigger_data["body"]["x"], 1);
    }

    #[tokio::test]
    async fn test_mode_publishes_before_execution_starts() {
        let (dispatcher, _) = dispatcher_with(trigger_workflow());
        let id = dispatcher
            .register_webhook(
                "wf1".into(),
                "t".into(),
                serde_json::json!({"httpMethod": "POST"}),
                None,
            )
            .await
            .unwrap();
        let mut rx = dispatcher.events.subscribe(&Topic::Workflow("wf1".into()));
        let result = dispatcher
            .handle_webhook(
                id,
                "POST",
                "/webhook/x",
                WebhookRequest::default(),
                serde_json::json!({}),
                true,
            )
            .await
            .unwrap();
        assert!(result.test_mode);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::WebhookTestTriggered);
        assert_eq!(event.execution_id, result.execution_id);
    }

    #[tokio::test]
    async fn explicit_webhook_id_is_honored_across_re_registration() {
        let (dispatcher, _) = dispatcher_with(trigger_workflow());
        let id = TriggerId::new();
        let got = dispatcher
            .register_webhook("wf1".into(), "t".into(), serde_json::json!({}), Some(id))
            .await
            .unwrap();
        assert_eq!(got, id);
    }

    #[tokio::test]
    async fn basic_auth_failure_rejects_before_any_execution_is_created() {
        let (dispatcher, persistence) = dispatcher_with(trigger_workflow());
        let plaintext = serde_json::to_vec(&serde_json::json!({"username": "u", "password": "p"})).unwrap();
        let store = InMemoryCredentialStore::new();
        let key = EncryptionKey::from_bytes(&[4u8; 32]).unwrap();
        store.put(weave_credential::EncryptedCredential {
            id: "cred-1".into(),
            owner_id: weave_core::UserId::new(),
            credential_type: "httpBasicAuth".into(),
            encrypted_data: cipher::encrypt(&plaintext, &key),
            expires_at: None,
        });
        // Rebuild a dispatcher whose resolver actually knows this credential.
        let resolver = Arc::new(CredentialResolver::new(Arc::new(store), key));
        let facade_events = Arc::new(EventBus::new());
        let tracker = Arc::new(ProgressTracker::new());
        let workflows = Arc::new(InMemoryWorkflowSource::new());
        workflows.put(trigger_workflow());
        let engine = Arc::new(FlowExecutionEngine::new(
            Arc::new(NodeRegistry::new()),
            resolver.clone(),
            tracker.clone(),
            persistence.clone() as Arc<dyn PersistenceStore>,
            facade_events.clone(),
        ));
        let facade = Arc::new(ExecutionFacade::new(
            workflows,
            engine,
            tracker,
            persistence.clone() as Arc<dyn PersistenceStore>,
            facade_events.clone(),
            FacadeConfig::default(),
        ));
        let dispatcher = TriggerDispatcher::new(
            persistence.clone() as Arc<dyn PersistenceStore>,
            resolver,
            facade,
            facade_events,
        );
        let id = dispatcher
            .register_webhook(
                "wf1".into(),
                "t".into(),
                serde_json::json!({"httpMethod": "POST", "authentication": "cred-1"}),
                None,
            )
            .await
            .unwrap();
        let mut request = WebhookRequest::default();
        request
            .headers
            .insert("authorization".into(), "Basic d3Jvbmc6d3Jvbmc=".into());
        let err = dispatcher
            .handle_webhook(id, "POST", "/webhook/x", request, serde_json::json!({}), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn workflow_call_blocks_until_child_completes() {
        let (dispatcher, _) = dispatcher_with(trigger_workflow());
        let parent_cancel = CancellationToken::new();
        let response = dispatcher
            .invoke_workflow_call("wf1".into(), serde_json::json!({"from": "parent"}), &parent_cancel)
            .await
            .unwrap();
        assert_eq!(response.status, weave_execution::ExecutionStatus::Completed);
    }
}
