//! Healing workflow repository functions.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::HealingWorkflowRow};

pub async fn create_workflow(
    pool: &PgPool,
    tenant_id: Uuid,
    code: &str,
    name: &str,
    definition: serde_json::Value,
    timeout_seconds: i32,
    max_retries: i32,
    allow_parallel: bool,
) -> Result<HealingWorkflowRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        HealingWorkflowRow,
        r#"
        INSERT INTO healing_workflows
            (id, tenant_id, code, name, definition, timeout_seconds, max_retries,
             allow_parallel, version, is_active, execute_count, success_count,
             failure_count, avg_duration_ms, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, true, 0, 0, 0, 0, $9, $9)
        RETURNING id, tenant_id, code, name, definition, timeout_seconds, max_retries,
                  allow_parallel, version, is_active, execute_count, success_count,
                  failure_count, avg_duration_ms, created_at, updated_at
        "#,
        id,
        tenant_id,
        code,
        name,
        definition,
        timeout_seconds,
        max_retries,
        allow_parallel,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_workflow(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<HealingWorkflowRow, DbError> {
    let row = sqlx::query_as!(
        HealingWorkflowRow,
        r#"
        SELECT id, tenant_id, code, name, definition, timeout_seconds, max_retries,
               allow_parallel, version, is_active, execute_count, success_count,
               failure_count, avg_duration_ms, created_at, updated_at
        FROM healing_workflows WHERE id = $1 AND tenant_id = $2
        "#,
        id,
        tenant_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

pub async fn list_workflows(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<HealingWorkflowRow>, DbError> {
    let rows = sqlx::query_as!(
        HealingWorkflowRow,
        r#"
        SELECT id, tenant_id, code, name, definition, timeout_seconds, max_retries,
               allow_parallel, version, is_active, execute_count, success_count,
               failure_count, avg_duration_ms, created_at, updated_at
        FROM healing_workflows WHERE tenant_id = $1 ORDER BY created_at DESC
        "#,
        tenant_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Bump `version` and replace `definition`. Re-validating DAG invariants is
/// the caller's responsibility (the `engine` crate parses before calling
/// this).
pub async fn update_definition(
    pool: &PgPool,
    id: Uuid,
    definition: serde_json::Value,
) -> Result<HealingWorkflowRow, DbError> {
    let row = sqlx::query_as!(
        HealingWorkflowRow,
        r#"
        UPDATE healing_workflows
        SET definition = $1, version = version + 1, updated_at = $2
        WHERE id = $3
        RETURNING id, tenant_id, code, name, definition, timeout_seconds, max_retries,
                  allow_parallel, version, is_active, execute_count, success_count,
                  failure_count, avg_duration_ms, created_at, updated_at
        "#,
        definition,
        Utc::now(),
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Folds a completed execution's duration into the workflow's rolling
/// `avg_duration_ms` and increments its counters.
pub async fn record_execution_outcome(
    pool: &PgPool,
    id: Uuid,
    succeeded: bool,
    duration_ms: i64,
) -> Result<(), DbError> {
    let row = sqlx::query!(
        "SELECT execute_count, avg_duration_ms FROM healing_workflows WHERE id = $1",
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    let prev_count = row.execute_count as f64;
    let new_avg = (row.avg_duration_ms * prev_count + duration_ms as f64) / (prev_count + 1.0);

    if succeeded {
        sqlx::query!(
            r#"
            UPDATE healing_workflows
            SET execute_count = execute_count + 1,
                success_count = success_count + 1,
                avg_duration_ms = $1,
                updated_at = $2
            WHERE id = $3
            "#,
            new_avg,
            Utc::now(),
            id,
        )
        .execute(pool)
        .await?;
    } else {
        sqlx::query!(
            r#"
            UPDATE healing_workflows
            SET execute_count = execute_count + 1,
                failure_count = failure_count + 1,
                avg_duration_ms = $1,
                updated_at = $2
            WHERE id = $3
            "#,
            new_avg,
            Utc::now(),
            id,
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Refused if any `healing_executions` row still references this workflow.
pub async fn delete_workflow(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let has_history: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM healing_executions WHERE workflow_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if has_history.0 {
        return Err(DbError::Constraint("workflow has references".into()));
    }

    let result = sqlx::query!("DELETE FROM healing_workflows WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
