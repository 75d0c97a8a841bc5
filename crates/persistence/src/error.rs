//! Persistence-layer errors.

use weave_core::{ExecutionId, TriggerId, WorkflowId};
use weave_error::EngineError;

/// Errors raised by a [`crate::store::PersistenceStore`] implementation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// No execution row exists with this id.
    #[error("execution {0} not found")]
    ExecutionNotFound(ExecutionId),
    /// No workflow row exists with this id.
    #[error("workflow {0} not found")]
    WorkflowNotFound(WorkflowId),
    /// No trigger row exists with this id (unknown `webhookId` → 404).
    #[error("trigger {0} not found")]
    TriggerNotFound(TriggerId),
    /// A node-execution row was inserted twice for the same
    /// `(execution_id, node_id)` pair.
    #[error("node execution {0} already recorded")]
    Conflict(String),
    /// The backing store (e.g. Postgres) returned an error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<PersistenceError> for EngineError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::ExecutionNotFound(_)
            | PersistenceError::WorkflowNotFound(_)
            | PersistenceError::TriggerNotFound(_) => EngineError::not_found(err.to_string()),
            PersistenceError::Conflict(_) => EngineError::validation(err.to_string()),
            PersistenceError::Backend(_) => EngineError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_engine_not_found() {
        let err: EngineError = PersistenceError::ExecutionNotFound(ExecutionId::new()).into();
        assert_eq!(err.kind, weave_error::ErrorKind::NotFound);
    }

    #[test]
    fn conflict_maps_to_validation() {
        let err: EngineError = PersistenceError::Conflict("dup".into()).into();
        assert_eq!(err.kind, weave_error::ErrorKind::Validation);
    }

    #[test]
    fn trigger_not_found_maps_to_engine_not_found() {
        let err: EngineError = PersistenceError::TriggerNotFound(TriggerId::new()).into();
        assert_eq!(err.kind, weave_error::ErrorKind::NotFound);
    }
}
