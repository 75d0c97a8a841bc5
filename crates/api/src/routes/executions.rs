//! `POST /executions`, `GET /executions/{id}`, `GET /executions/{id}/progress`.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use weave_core::{ExecutionId, NodeId, PortItems, WorkflowId};
use weave_facade::{ExecutionDetail, ExecutionResponse, StartExecutionRequest};
use weave_workflow::ParameterValue;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /executions` request body, matching its field names exactly.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExecutionBody {
    workflow_id: WorkflowId,
    #[serde(default)]
    trigger_node_id: Option<NodeId>,
    #[serde(default)]
    node_id: Option<NodeId>,
    #[serde(default)]
    input_data: Option<PortItems>,
    #[serde(default)]
    parameters: Option<HashMap<String, ParameterValue>>,
    #[serde(default)]
    trigger_data: Option<serde_json::Value>,
    #[serde(default)]
    mode: Option<String>,
}

impl From<StartExecutionBody> for StartExecutionRequest {
    fn from(body: StartExecutionBody) -> Self {
        Self {
            workflow_id: body.workflow_id,
            trigger_node_id: body.trigger_node_id,
            node_id: body.node_id,
            input_data: body.input_data,
            parameters: body.parameters,
            trigger_data: body.trigger_data,
            mode: body.mode,
            execution_id: None,
        }
    }
}

/// Mountable router for this crate's `/executions` surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/executions", post(start_execution))
        .route("/executions/:id", get(get_execution))
        .route("/executions/:id/progress", get(get_progress))
}

async fn start_execution(
    State(state): State<AppState>,
    Json(body): Json<StartExecutionBody>,
) -> Result<Json<ExecutionResponse>, ApiError> {
    let response = state.facade.start_execution(body.into()).await?;
    Ok(Json(response))
}

async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<ExecutionId>,
) -> Result<Json<ExecutionDetail>, ApiError> {
    let detail = state.facade.get_execution(id).await?;
    Ok(Json(detail))
}

async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<ExecutionId>,
) -> Result<Json<weave_execution::ExecutionProgress>, ApiError> {
    let progress = state.facade.get_progress(id).await?;
    Ok(Json(progress))
}
