use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use db::repository::workflows as wf_repo;
use engine::WorkflowDefinition;
use serde_json::Value;
use uuid::Uuid;

use super::super::AppState;

#[derive(serde::Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Uuid,
}

#[derive(serde::Deserialize)]
pub struct CreateWorkflowDto {
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub definition: Value,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: i32,
    #[serde(default)]
    pub max_retries: i32,
    #[serde(default)]
    pub allow_parallel: bool,
}

fn default_timeout_seconds() -> i32 {
    3600
}

pub async fn list(
    Query(q): Query<TenantQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<db::models::HealingWorkflowRow>>, StatusCode> {
    match wf_repo::list_workflows(&state.pool, q.tenant_id).await {
        Ok(workflows) => Ok(Json(workflows)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn get(
    Path(id): Path<Uuid>,
    Query(q): Query<TenantQuery>,
    State(state): State<AppState>,
) -> Result<Json<db::models::HealingWorkflowRow>, StatusCode> {
    match wf_repo::get_workflow(&state.pool, q.tenant_id, id).await {
        Ok(wf) => Ok(Json(wf)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::HealingWorkflowRow>), StatusCode> {
    let definition: WorkflowDefinition =
        serde_json::from_value(payload.definition.clone()).map_err(|_| StatusCode::BAD_REQUEST)?;
    engine::validate_dag(&definition).map_err(|_| StatusCode::BAD_REQUEST)?;

    match wf_repo::create_workflow(
        &state.pool,
        payload.tenant_id,
        &payload.code,
        &payload.name,
        payload.definition,
        payload.timeout_seconds,
        payload.max_retries,
        payload.allow_parallel,
    )
    .await
    {
        Ok(wf) => Ok((StatusCode::CREATED, Json(wf))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match wf_repo::delete_workflow(&state.pool, id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(db::DbError::Constraint(_)) => Err(StatusCode::CONFLICT),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
