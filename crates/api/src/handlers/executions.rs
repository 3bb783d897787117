use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use db::models::HealingRuleExecutionRow;
use engine::{StartedExecution, Workflow};
use serde_json::Value;
use uuid::Uuid;

use super::super::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteWorkflowDto {
    pub tenant_id: Uuid,
    #[serde(default)]
    pub trigger_source: Value,
}

pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<(StatusCode, Json<StartedExecution>), StatusCode> {
    let row = match db::repository::workflows::get_workflow(&state.pool, payload.tenant_id, id).await {
        Ok(row) => row,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };
    if !row.is_active {
        return Err(StatusCode::CONFLICT);
    }

    let workflow = Workflow::from_row(&row).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;

    let started = state
        .executor
        .start(Arc::new(workflow), payload.tenant_id, None, "manual", payload.trigger_source)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::ACCEPTED, Json(started)))
}

pub async fn run_rule(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<HealingRuleExecutionRow>, StatusCode> {
    match state.rules.run_manual(id).await {
        Ok(row) => Ok(Json(row)),
        Err(rulesvc::RuleSvcError::Database(db::DbError::NotFound)) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
