//! Shared application state: the façade, trigger dispatcher, and event
//! bus every handler closes over, plus how to build the whole in-process
//! stack from an [`ApiConfig`].
//!
//! All three binaries in this crate (`weave-server`, `weave-webhook`,
//! `weave-realtime`) build the same [`AppState`] and mount a different
//! subset of routes over it — mirroring how a real deployment would run
//! them as separate processes against one shared Postgres instance and
//! dispatch queue, while still being able to run any of them standalone
//! against the in-memory backend for local development.

use std::sync::Arc;

use weave_credential::{CredentialResolver, InMemoryCredentialStore};
use weave_engine::{FlowExecutionEngine, NodeRegistry};
use weave_eventbus::EventBus;
use weave_execution::ProgressTracker;
use weave_facade::{ExecutionFacade, InMemoryWorkflowSource, WorkflowSource};
use weave_persistence::{InMemoryPersistenceStore, PersistenceStore};
use weave_trigger::TriggerDispatcher;

use crate::config::ApiConfig;

/// Everything an axum handler needs, cloned cheaply (every field is an
/// `Arc`) into each request.
#[derive(Clone)]
pub struct AppState {
    /// The unified dispatch entry point.
    pub facade: Arc<ExecutionFacade>,
    /// Webhook ingestion, schedule evaluation, workflow-call brokering.
    pub trigger: Arc<TriggerDispatcher>,
    /// The event bus the realtime bridge subscribes to.
    pub events: Arc<EventBus>,
    /// Workflow registration, so an operator can seed workflows before
    /// traffic arrives. `weave-cli` uses the same type directly.
    pub workflows: Arc<InMemoryWorkflowSource>,
}

impl AppState {
    /// Build the full in-process stack: in-memory persistence, in-memory
    /// credential storage, an empty node registry, and every collaborator
    /// wired together per [`ApiConfig`].
    ///
    /// The registry starts empty — this crate ships no node
    /// implementations of its own. A deployment that needs real node
    /// types links its own registration crate and calls
    /// [`Self::with_registry`] instead.
    #[must_use]
    pub fn build(config: &ApiConfig) -> Self {
        Self::with_registry(config, NodeRegistry::new())
    }

    /// Build the stack over an already-populated [`NodeRegistry`].
    #[must_use]
    pub fn with_registry(config: &ApiConfig, registry: NodeRegistry) -> Self {
        let persistence: Arc<dyn PersistenceStore> = Arc::new(InMemoryPersistenceStore::new());
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let resolver = Arc::new(CredentialResolver::new(
            credentials,
            config.credential_key.clone(),
        ));
        let tracker = Arc::new(ProgressTracker::new());
        let events = Arc::new(EventBus::new());
        let workflows = Arc::new(InMemoryWorkflowSource::new());

        let engine = Arc::new(FlowExecutionEngine::new(
            Arc::new(registry),
            resolver.clone(),
            tracker.clone(),
            persistence.clone(),
            events.clone(),
        ));
        let facade = Arc::new(ExecutionFacade::new(
            workflows.clone() as Arc<dyn WorkflowSource>,
            engine,
            tracker.clone(),
            persistence.clone(),
            events.clone(),
            config.facade_config(),
        ));
        let trigger = Arc::new(TriggerDispatcher::new(
            persistence,
            resolver,
            facade.clone(),
            events.clone(),
        ));

        spawn_retention_sweep(tracker, config.execution_retention);

        Self {
            facade,
            trigger,
            events,
            workflows,
        }
    }
}

/// Periodically evicts terminal executions past `EXECUTION_RETENTION_MS`
/// from the progress tracker, so long-lived processes don't grow one
/// partition per execution forever (§4.3's "retained briefly, then
/// dropped" lifecycle). Persisted rows are untouched — only the
/// in-memory, late-subscriber-serving view is reclaimed.
fn spawn_retention_sweep(tracker: Arc<ProgressTracker>, retention: std::time::Duration) {
    let sweep_interval = retention.clamp(
        std::time::Duration::from_secs(1),
        std::time::Duration::from_secs(300),
    );
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let evicted = tracker.evict_expired(retention);
            if evicted > 0 {
                tracing::debug!(evicted, "retention sweep evicted terminal execution state");
            }
        }
    });
}
