//! `scheduled_tasks` repository functions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::ScheduledTaskRow};

#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    name: &str,
    cron_expr: &str,
    template_id: Uuid,
    host_ids: serde_json::Value,
    variables: serde_json::Value,
    timeout_mins: i32,
) -> Result<ScheduledTaskRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as!(
        ScheduledTaskRow,
        r#"
        INSERT INTO scheduled_tasks
            (id, tenant_id, name, cron_expr, template_id, host_ids, variables, timeout_mins,
             is_active, last_status, run_count)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, 'idle', 0)
        RETURNING id, tenant_id, name, cron_expr, template_id, host_ids, variables, timeout_mins,
                  is_active, last_task_id, last_status, last_run_at, next_run_at, run_count
        "#,
        id,
        tenant_id,
        name,
        cron_expr,
        template_id,
        host_ids,
        variables,
        timeout_mins,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<ScheduledTaskRow, DbError> {
    let row = sqlx::query_as!(
        ScheduledTaskRow,
        r#"
        SELECT id, tenant_id, name, cron_expr, template_id, host_ids, variables, timeout_mins,
               is_active, last_task_id, last_status, last_run_at, next_run_at, run_count
        FROM scheduled_tasks WHERE id = $1
        "#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<ScheduledTaskRow>, DbError> {
    let rows = sqlx::query_as!(
        ScheduledTaskRow,
        r#"
        SELECT id, tenant_id, name, cron_expr, template_id, host_ids, variables, timeout_mins,
               is_active, last_task_id, last_status, last_run_at, next_run_at, run_count
        FROM scheduled_tasks WHERE is_active = true
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn set_next_run_at(
    pool: &PgPool,
    id: Uuid,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE scheduled_tasks SET next_run_at = $1 WHERE id = $2",
        next_run_at,
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically claim the scheduled task for a new run: refused (returns
/// `Ok(false)`) if `last_status = 'running'` — at most one in-flight run.
pub async fn try_start_run(pool: &PgPool, id: Uuid, task_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query!(
        r#"
        UPDATE scheduled_tasks
        SET last_status = 'running', last_task_id = $1, last_run_at = $2,
            run_count = run_count + 1
        WHERE id = $3 AND last_status != 'running'
        "#,
        task_id,
        Utc::now(),
        id,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite `last_task_id` once the real task record exists — `try_start_run`
/// claims the slot with a synthetic marker before that id is known.
pub async fn set_last_task_id(pool: &PgPool, id: Uuid, task_id: &str) -> Result<(), DbError> {
    sqlx::query!("UPDATE scheduled_tasks SET last_task_id = $1 WHERE id = $2", task_id, id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn finish_run(pool: &PgPool, id: Uuid, status: &str) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE scheduled_tasks SET last_status = $1 WHERE id = $2",
        status,
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_active(pool: &PgPool, id: Uuid, is_active: bool) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE scheduled_tasks SET is_active = $1 WHERE id = $2",
        is_active,
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Scheduled tasks stuck `running` for longer than `older_than` — used by
/// the cleanup sweep to reconcile against the underlying task record.
pub async fn list_stuck_running(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<Vec<ScheduledTaskRow>, DbError> {
    let rows = sqlx::query_as!(
        ScheduledTaskRow,
        r#"
        SELECT id, tenant_id, name, cron_expr, template_id, host_ids, variables, timeout_mins,
               is_active, last_task_id, last_status, last_run_at, next_run_at, run_count
        FROM scheduled_tasks
        WHERE last_status = 'running' AND last_run_at < $1
        "#,
        older_than,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
