//! Cron-based schedule evaluation.
//!
//! Evaluation runs in UTC; `ScheduleTriggerSettings::timezone` is carried
//! through for callers to re-derive local time but does not shift when the
//! scheduler wakes (the source gave no IANA timezone library to match; see
//! the crate's design notes).

use std::str::FromStr;
use std::sync::Arc;

use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use weave_core::{NodeId, TriggerId, WorkflowId};
use weave_error::{EngineError, EngineResult};
use weave_facade::{ExecutionFacade, StartExecutionRequest};

use crate::settings::ScheduleTriggerSettings;

/// Spawn the long-running task that evaluates one schedule trigger and
/// fires executions until `cancel` fires. `cancel` is owned by the
/// dispatcher's registration table so deactivating the trigger stops it.
pub fn spawn(
    trigger_id: TriggerId,
    workflow_id: WorkflowId,
    trigger_node_id: NodeId,
    settings: ScheduleTriggerSettings,
    facade: Arc<ExecutionFacade>,
    cancel: CancellationToken,
) -> EngineResult<tokio::task::JoinHandle<()>> {
    let schedule = Schedule::from_str(&settings.cron_expression)
        .map_err(|e| EngineError::validation(format!("invalid cron expression: {e}")))?;

    let handle = tokio::spawn(async move {
        loop {
            let now = weave_core::time::now();
            let Some(next) = schedule.after(&now).next() else {
                warn!(trigger_id = %trigger_id, "schedule has no further fire times, stopping");
                return;
            };
            let wait = (next - weave_core::time::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }

            let trigger_data = serde_json::json!({
                "scheduledFor": next,
                "firedAt": weave_core::time::now(),
            });
            let mut request = StartExecutionRequest::workflow(workflow_id.clone(), trigger_data);
            request.trigger_node_id = Some(trigger_node_id.clone());

            if let Err(err) = facade.start_execution(request).await {
                error!(trigger_id = %trigger_id, error = %err, "scheduled execution failed to start");
            }
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_cron_expression() {
        let settings = ScheduleTriggerSettings {
            cron_expression: "not a cron expression".into(),
            timezone: "UTC".into(),
        };
        let err = spawn(
            TriggerId::new(),
            "wf1".into(),
            "t".into(),
            settings,
            Arc::new(test_facade()),
            CancellationToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::Validation);
    }

    fn test_facade() -> ExecutionFacade {
        use weave_engine::{FlowExecutionEngine, NodeRegistry};
        use weave_eventbus::EventBus;
        use weave_execution::ProgressTracker;
        use weave_persistence::InMemoryPersistenceStore;

        let registry = Arc::new(NodeRegistry::new());
        let resolver = Arc::new(weave_credential::CredentialResolver::new(
            Arc::new(weave_credential::InMemoryCredentialStore::new()),
            weave_credential::EncryptionKey::from_bytes(&[1u8; 32]).unwrap(),
        ));
        let tracker = Arc::new(ProgressTracker::new());
        let persistence: Arc<dyn weave_persistence::PersistenceStore> =
            Arc::new(InMemoryPersistenceStore::new());
        let events = Arc::new(EventBus::new());
        let engine = Arc::new(FlowExecutionEngine::new(
            registry,
            resolver,
            tracker.clone(),
            persistence.clone(),
            events.clone(),
        ));
        let workflows = Arc::new(weave_facade::InMemoryWorkflowSource::new());
        ExecutionFacade::new(
            workflows,
            engine,
            tracker,
            persistence,
            events,
            weave_facade::FacadeConfig::default(),
        )
    }
}
