//! The [`PersistenceStore`] trait and its always-available in-memory
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use weave_core::{ExecutionId, TriggerId, WorkflowId};
use weave_credential::{CredentialStore, EncryptedCredential};

use crate::error::PersistenceError;
use crate::row::{CredentialRow, ExecutionRow, NodeExecutionRow, TriggerRow};

/// Durable storage for executions, their per-node records, trigger
/// registrations, and encrypted credentials.
///
/// Every method is keyed so that two concurrent executions of the same
/// workflow never touch each other's rows — mirroring the isolation
/// `weave-execution::ProgressTracker` enforces in memory.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Insert a new execution row (always `Running`).
    async fn create_execution(&self, row: ExecutionRow) -> Result<(), PersistenceError>;

    /// Update an existing execution row, generally to set its terminal
    /// `status`, `finished_at`, and `error`. Written last, after every
    /// node-execution row for this run.
    async fn update_execution(&self, row: ExecutionRow) -> Result<(), PersistenceError>;

    /// Fetch one execution row by id.
    async fn get_execution(&self, id: ExecutionId) -> Result<ExecutionRow, PersistenceError>;

    /// Insert a node-execution row. Rejects a second insert for the same
    /// `(execution_id, node_id)` pair as a [`PersistenceError::Conflict`].
    async fn insert_node_execution(&self, row: NodeExecutionRow) -> Result<(), PersistenceError>;

    /// Overwrite a node-execution row in place (used to move it from
    /// `Running` to a terminal state).
    async fn update_node_execution(&self, row: NodeExecutionRow) -> Result<(), PersistenceError>;

    /// All node-execution rows recorded for an execution, in no
    /// particular order.
    async fn list_node_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<NodeExecutionRow>, PersistenceError>;

    /// Register or update a trigger row.
    async fn upsert_trigger(&self, row: TriggerRow) -> Result<(), PersistenceError>;

    /// Look up a trigger by id (e.g. a webhook's `webhookId`).
    async fn get_trigger(&self, id: &TriggerId) -> Result<TriggerRow, PersistenceError>;

    /// All triggers registered for a workflow.
    async fn list_triggers_for_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<TriggerRow>, PersistenceError>;

    /// Insert or replace a credential row.
    async fn put_credential(&self, row: CredentialRow) -> Result<(), PersistenceError>;
}

/// `DashMap`-backed store; the default backend, and the one every
/// workspace test runs against.
#[derive(Default)]
pub struct InMemoryPersistenceStore {
    executions: DashMap<ExecutionId, ExecutionRow>,
    node_executions: DashMap<String, NodeExecutionRow>,
    triggers: DashMap<TriggerId, TriggerRow>,
    credentials: DashMap<weave_core::CredentialId, CredentialRow>,
}

impl InMemoryPersistenceStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryPersistenceStore {
    async fn create_execution(&self, row: ExecutionRow) -> Result<(), PersistenceError> {
        self.executions.insert(row.id, row);
        Ok(())
    }

    async fn update_execution(&self, row: ExecutionRow) -> Result<(), PersistenceError> {
        if !self.executions.contains_key(&row.id) {
            return Err(PersistenceError::ExecutionNotFound(row.id));
        }
        self.executions.insert(row.id, row);
        Ok(())
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<ExecutionRow, PersistenceError> {
        self.executions
            .get(&id)
            .map(|r| r.clone())
            .ok_or(PersistenceError::ExecutionNotFound(id))
    }

    async fn insert_node_execution(&self, row: NodeExecutionRow) -> Result<(), PersistenceError> {
        if self.node_executions.contains_key(&row.id) {
            return Err(PersistenceError::Conflict(row.id));
        }
        self.node_executions.insert(row.id.clone(), row);
        Ok(())
    }

    async fn update_node_execution(&self, row: NodeExecutionRow) -> Result<(), PersistenceError> {
        self.node_executions.insert(row.id.clone(), row);
        Ok(())
    }

    async fn list_node_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<NodeExecutionRow>, PersistenceError> {
        Ok(self
            .node_executions
            .iter()
            .filter(|entry| entry.value().execution_id == execution_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn upsert_trigger(&self, row: TriggerRow) -> Result<(), PersistenceError> {
        self.triggers.insert(row.id.clone(), row);
        Ok(())
    }

    async fn get_trigger(&self, id: &TriggerId) -> Result<TriggerRow, PersistenceError> {
        self.triggers
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| PersistenceError::TriggerNotFound(*id))
    }

    async fn list_triggers_for_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<TriggerRow>, PersistenceError> {
        Ok(self
            .triggers
            .iter()
            .filter(|entry| &entry.value().workflow_id == workflow_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn put_credential(&self, row: CredentialRow) -> Result<(), PersistenceError> {
        self.credentials.insert(row.id.clone(), row);
        Ok(())
    }
}

/// Adapts the persisted `credentials` table to `weave-credential`'s
/// resolver, so `CredentialResolver` can be built directly on top of
/// whichever `PersistenceStore` backend is configured.
pub struct PersistedCredentialStore {
    inner: Arc<InMemoryPersistenceStore>,
}

impl PersistedCredentialStore {
    /// Wrap an in-memory store for use as a `weave_credential::CredentialStore`.
    #[must_use]
    pub fn new(inner: Arc<InMemoryPersistenceStore>) -> Self {
        Self { inner }
    }
}

impl CredentialStore for PersistedCredentialStore {
    fn get(&self, id: &weave_core::CredentialId) -> Option<EncryptedCredential> {
        self.inner.credentials.get(id).map(|row| EncryptedCredential {
            id: row.id.clone(),
            owner_id: row.owner_id.clone(),
            credential_type: row.credential_type.clone(),
            encrypted_data: row.encrypted_data.clone(),
            expires_at: row.expires_at,
        })
    }
}
