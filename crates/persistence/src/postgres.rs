//! `sqlx`-backed [`PersistenceStore`], gated behind the `postgres`
//! feature. Uses runtime-checked `sqlx::query`/`query_as` rather than the
//! `query!` macros, since no `DATABASE_URL` is available at compile time
//! in this workspace.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use weave_core::{ExecutionId, TriggerId, WorkflowId};

use crate::error::PersistenceError;
use crate::row::{CredentialRow, ExecutionRow, NodeExecutionRow, TriggerRow};
use crate::store::PersistenceStore;

fn backend_err(err: sqlx::Error) -> PersistenceError {
    PersistenceError::Backend(err.to_string())
}

/// Durable store over a Postgres connection pool, matching the table
/// layout of §6.
pub struct PgPersistenceStore {
    pool: PgPool,
}

impl PgPersistenceStore {
    /// Wrap an existing pool. Schema migration is the deployment's
    /// responsibility, not this crate's.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistenceStore for PgPersistenceStore {
    async fn create_execution(&self, row: ExecutionRow) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO executions \
            (id, workflow_id, status, started_at, finished_at, trigger_data, workflow_snapshot, error) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(row.id.to_string())
        .bind(row.workflow_id.to_string())
        .bind(row.status.to_string())
        .bind(row.started_at)
        .bind(row.finished_at)
        .bind(row.trigger_data)
        .bind(row.workflow_snapshot)
        .bind(row.error)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn update_execution(&self, row: ExecutionRow) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            "UPDATE executions SET status = $2, finished_at = $3, error = $4 WHERE id = $1",
        )
        .bind(row.id.to_string())
        .bind(row.status.to_string())
        .bind(row.finished_at)
        .bind(row.error)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::ExecutionNotFound(row.id));
        }
        Ok(())
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<ExecutionRow, PersistenceError> {
        let record = sqlx::query(
            "SELECT id, workflow_id, status, started_at, finished_at, trigger_data, \
            workflow_snapshot, error FROM executions WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?
        .ok_or(PersistenceError::ExecutionNotFound(id))?;

        let status: String = record.try_get("status").map_err(backend_err)?;
        Ok(ExecutionRow {
            id,
            workflow_id: record
                .try_get::<String, _>("workflow_id")
                .map_err(backend_err)?
                .into(),
            status: parse_execution_status(&status)?,
            started_at: record.try_get("started_at").map_err(backend_err)?,
            finished_at: record.try_get("finished_at").map_err(backend_err)?,
            trigger_data: record.try_get("trigger_data").map_err(backend_err)?,
            workflow_snapshot: record.try_get("workflow_snapshot").map_err(backend_err)?,
            error: record.try_get("error").map_err(backend_err)?,
        })
    }

    async fn insert_node_execution(&self, row: NodeExecutionRow) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO node_executions \
            (id, execution_id, node_id, status, started_at, finished_at, input_data, output_data, error) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&row.id)
        .bind(row.execution_id.to_string())
        .bind(row.node_id.to_string())
        .bind(row.status.to_string())
        .bind(row.started_at)
        .bind(row.finished_at)
        .bind(row.input_data)
        .bind(row.output_data)
        .bind(row.error)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PersistenceError::Conflict(row.id.clone())
            }
            _ => backend_err(err),
        })?;
        Ok(())
    }

    async fn update_node_execution(&self, row: NodeExecutionRow) -> Result<(), PersistenceError> {
        sqlx::query(
            "UPDATE node_executions SET status = $2, finished_at = $3, output_data = $4, error = $5 \
            WHERE id = $1",
        )
        .bind(&row.id)
        .bind(row.status.to_string())
        .bind(row.finished_at)
        .bind(row.output_data)
        .bind(row.error)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_node_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<NodeExecutionRow>, PersistenceError> {
        let records = sqlx::query(
            "SELECT id, execution_id, node_id, status, started_at, finished_at, input_data, \
            output_data, error FROM node_executions WHERE execution_id = $1",
        )
        .bind(execution_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        records
            .into_iter()
            .map(|record| {
                let status: String = record.try_get("status").map_err(backend_err)?;
                Ok(NodeExecutionRow {
                    id: record.try_get("id").map_err(backend_err)?,
                    execution_id,
                    node_id: record
                        .try_get::<String, _>("node_id")
                        .map_err(backend_err)?
                        .into(),
                    status: parse_node_state(&status)?,
                    started_at: record.try_get("started_at").map_err(backend_err)?,
                    finished_at: record.try_get("finished_at").map_err(backend_err)?,
                    input_data: record.try_get("input_data").map_err(backend_err)?,
                    output_data: record.try_get("output_data").map_err(backend_err)?,
                    error: record.try_get("error").map_err(backend_err)?,
                })
            })
            .collect()
    }

    async fn upsert_trigger(&self, row: TriggerRow) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO triggers (id, workflow_id, node_id, trigger_type, settings, active) \
            VALUES ($1, $2, $3, $4, $5, $6) \
            ON CONFLICT (id) DO UPDATE SET settings = $5, active = $6",
        )
        .bind(row.id.to_string())
        .bind(row.workflow_id.to_string())
        .bind(row.node_id.to_string())
        .bind(&row.trigger_type)
        .bind(row.settings)
        .bind(row.active)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn get_trigger(&self, id: &TriggerId) -> Result<TriggerRow, PersistenceError> {
        let record = sqlx::query(
            "SELECT id, workflow_id, node_id, trigger_type, settings, active FROM triggers \
            WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?
        .ok_or_else(|| PersistenceError::TriggerNotFound(*id))?;

        Ok(TriggerRow {
            id: *id,
            workflow_id: record
                .try_get::<String, _>("workflow_id")
                .map_err(backend_err)?
                .into(),
            node_id: record
                .try_get::<String, _>("node_id")
                .map_err(backend_err)?
                .into(),
            trigger_type: record.try_get("trigger_type").map_err(backend_err)?,
            settings: record.try_get("settings").map_err(backend_err)?,
            active: record.try_get("active").map_err(backend_err)?,
        })
    }

    async fn list_triggers_for_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<TriggerRow>, PersistenceError> {
        let records = sqlx::query(
            "SELECT id, workflow_id, node_id, trigger_type, settings, active FROM triggers \
            WHERE workflow_id = $1",
        )
        .bind(workflow_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        records
            .into_iter()
            .map(|record| {
                let id: String = record.try_get("id").map_err(backend_err)?;
                Ok(TriggerRow {
                    id: id
                        .parse()
                        .map_err(|_| PersistenceError::Backend(format!("malformed trigger id {id:?}")))?,
                    workflow_id: workflow_id.clone(),
                    node_id: record
                        .try_get::<String, _>("node_id")
                        .map_err(backend_err)?
                        .into(),
                    trigger_type: record.try_get("trigger_type").map_err(backend_err)?,
                    settings: record.try_get("settings").map_err(backend_err)?,
                    active: record.try_get("active").map_err(backend_err)?,
                })
            })
            .collect()
    }

    async fn put_credential(&self, row: CredentialRow) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO credentials \
            (id, owner_id, credential_type, name, encrypted_data, expires_at) \
            VALUES ($1, $2, $3, $4, $5, $6) \
            ON CONFLICT (id) DO UPDATE SET encrypted_data = $5, expires_at = $6, name = $4",
        )
        .bind(row.id.to_string())
        .bind(row.owner_id.to_string())
        .bind(&row.credential_type)
        .bind(&row.name)
        .bind(row.encrypted_data)
        .bind(row.expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }
}

fn parse_execution_status(s: &str) -> Result<weave_execution::ExecutionStatus, PersistenceError> {
    use weave_execution::ExecutionStatus;
    match s {
        "running" => Ok(ExecutionStatus::Running),
        "completed" => Ok(ExecutionStatus::Completed),
        "failed" => Ok(ExecutionStatus::Failed),
        "cancelled" => Ok(ExecutionStatus::Cancelled),
        "partial" => Ok(ExecutionStatus::Partial),
        other => Err(PersistenceError::Backend(format!(
            "unrecognized execution status {other:?}"
        ))),
    }
}

fn parse_node_state(s: &str) -> Result<weave_execution::NodeState, PersistenceError> {
    use weave_execution::NodeState;
    match s {
        "idle" => Ok(NodeState::Idle),
        "queued" => Ok(NodeState::Queued),
        "running" => Ok(NodeState::Running),
        "completed" => Ok(NodeState::Completed),
        "failed" => Ok(NodeState::Failed),
        "cancelled" => Ok(NodeState::Cancelled),
        "skipped" => Ok(NodeState::Skipped),
        other => Err(PersistenceError::Backend(format!(
            "unrecognized node state {other:?}"
        ))),
    }
}
