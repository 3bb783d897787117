use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use engine::Workflow;
use serde_json::Value;
use uuid::Uuid;

use super::super::AppState;
use super::workflows::TenantQuery;

/// A caller-provided workflow id stands in for the teacher's per-workflow
/// webhook path lookup — there is no `trigger.path` field on the
/// definition to match against (spec §4.4 workflow JSON has no trigger
/// metadata at all; triggering is always explicit).
pub async fn handle_webhook(
    Path(workflow_id): Path<Uuid>,
    Query(q): Query<TenantQuery>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let row = match db::repository::workflows::get_workflow(&state.pool, q.tenant_id, workflow_id).await {
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
        .start(Arc::new(workflow), q.tenant_id, None, "webhook", payload)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({"execution_id": started.execution_id}))))
}
