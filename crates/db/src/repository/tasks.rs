//! `tasks` and `task_logs` repository functions.
//!
//! Queue enqueue/dequeue lives in `taskqueue` — this module only persists
//! the row and mirrors status transitions the queue bridge reports back.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::{TaskRow, TaskLogRow}};

#[allow(clippy::too_many_arguments)]
pub async fn create_task(
    pool: &PgPool,
    task_id: &str,
    tenant_id: Uuid,
    task_type: &str,
    name: &str,
    description: Option<&str>,
    params: serde_json::Value,
    priority: i32,
    source: &str,
    created_by: Option<Uuid>,
    timeout_seconds: i32,
) -> Result<TaskRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as!(
        TaskRow,
        r#"
        INSERT INTO tasks
            (task_id, tenant_id, task_type, name, description, params, priority, status,
             progress, source, created_by, timeout_seconds, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 0, $8, $9, $10, $11)
        RETURNING task_id, tenant_id, task_type, name, description, params, priority, status,
                  worker_id, progress, source, result, error, queued_at, locked_at, started_at,
                  finished_at, created_by, timeout_seconds, created_at
        "#,
        task_id,
        tenant_id,
        task_type,
        name,
        description,
        params,
        priority,
        source,
        created_by,
        timeout_seconds,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_task(pool: &PgPool, task_id: &str) -> Result<TaskRow, DbError> {
    let row = sqlx::query_as!(
        TaskRow,
        r#"
        SELECT task_id, tenant_id, task_type, name, description, params, priority, status,
               worker_id, progress, source, result, error, queued_at, locked_at, started_at,
               finished_at, created_by, timeout_seconds, created_at
        FROM tasks WHERE task_id = $1
        "#,
        task_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Permanently remove a task row — used when enqueue fails right after
/// creation (best-effort atomicity, spec §4.8).
pub async fn delete_task(pool: &PgPool, task_id: &str) -> Result<(), DbError> {
    sqlx::query!("DELETE FROM tasks WHERE task_id = $1", task_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_queued(pool: &PgPool, task_id: &str) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE tasks SET status = 'queued', queued_at = $1 WHERE task_id = $2",
        Utc::now(),
        task_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Mirrors a status/progress/worker update reported by the queue bridge.
/// Applies the timestamp appropriate to the target status.
pub async fn update_status(
    pool: &PgPool,
    task_id: &str,
    status: &str,
    progress: i32,
    worker_id: Option<&str>,
) -> Result<(), DbError> {
    let now = Utc::now();
    match status {
        "locked" => {
            sqlx::query!(
                "UPDATE tasks SET status = $1, progress = $2, worker_id = $3, locked_at = $4 WHERE task_id = $5",
                status, progress, worker_id, now, task_id,
            )
            .execute(pool)
            .await?;
        }
        "running" => {
            sqlx::query!(
                "UPDATE tasks SET status = $1, progress = $2, worker_id = $3, started_at = $4 WHERE task_id = $5",
                status, progress, worker_id, now, task_id,
            )
            .execute(pool)
            .await?;
        }
        "success" | "failed" | "cancelled" | "timeout" => {
            sqlx::query!(
                "UPDATE tasks SET status = $1, progress = $2, worker_id = $3, finished_at = $4 WHERE task_id = $5",
                status, progress, worker_id, now, task_id,
            )
            .execute(pool)
            .await?;
        }
        _ => {
            sqlx::query!(
                "UPDATE tasks SET status = $1, progress = $2, worker_id = $3 WHERE task_id = $4",
                status, progress, worker_id, task_id,
            )
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

pub async fn set_result(
    pool: &PgPool,
    task_id: &str,
    result: Option<serde_json::Value>,
    error: Option<&str>,
) -> Result<(), DbError> {
    let status = if error.is_some() { "failed" } else { "success" };
    sqlx::query!(
        r#"
        UPDATE tasks
        SET status = $1, result = $2, error = $3, finished_at = $4, progress = 100
        WHERE task_id = $5
        "#,
        status,
        result,
        error,
        Utc::now(),
        task_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Only `pending|queued|running` tasks are cancellable.
pub async fn cancel_task(pool: &PgPool, task_id: &str) -> Result<(), DbError> {
    let result = sqlx::query!(
        r#"
        UPDATE tasks
        SET status = 'cancelled', finished_at = $1
        WHERE task_id = $2 AND status IN ('pending', 'queued', 'running')
        "#,
        Utc::now(),
        task_id,
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Constraint("task already terminal".into()));
    }

    Ok(())
}

pub async fn list_by_status(pool: &PgPool, status: &str) -> Result<Vec<TaskRow>, DbError> {
    let rows = sqlx::query_as!(
        TaskRow,
        r#"
        SELECT task_id, tenant_id, task_type, name, description, params, priority, status,
               worker_id, progress, source, result, error, queued_at, locked_at, started_at,
               finished_at, created_by, timeout_seconds, created_at
        FROM tasks WHERE status = $1
        "#,
        status,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Tasks `pending` for longer than `older_than`.
pub async fn list_pending_older_than(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<Vec<TaskRow>, DbError> {
    let rows = sqlx::query_as!(
        TaskRow,
        r#"
        SELECT task_id, tenant_id, task_type, name, description, params, priority, status,
               worker_id, progress, source, result, error, queued_at, locked_at, started_at,
               finished_at, created_by, timeout_seconds, created_at
        FROM tasks WHERE status = 'pending' AND created_at < $1
        "#,
        older_than,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_queued_older_than(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<Vec<TaskRow>, DbError> {
    let rows = sqlx::query_as!(
        TaskRow,
        r#"
        SELECT task_id, tenant_id, task_type, name, description, params, priority, status,
               worker_id, progress, source, result, error, queued_at, locked_at, started_at,
               finished_at, created_by, timeout_seconds, created_at
        FROM tasks WHERE status = 'queued' AND queued_at < $1
        "#,
        older_than,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_running_older_than(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<Vec<TaskRow>, DbError> {
    let rows = sqlx::query_as!(
        TaskRow,
        r#"
        SELECT task_id, tenant_id, task_type, name, description, params, priority, status,
               worker_id, progress, source, result, error, queued_at, locked_at, started_at,
               finished_at, created_by, timeout_seconds, created_at
        FROM tasks WHERE status = 'running' AND started_at < $1
        "#,
        older_than,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn append_log(
    pool: &PgPool,
    task_id: &str,
    level: &str,
    source: &str,
    host_name: Option<&str>,
    message: &str,
    data: Option<serde_json::Value>,
) -> Result<TaskLogRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        TaskLogRow,
        r#"
        INSERT INTO task_logs (id, task_id, timestamp, level, source, host_name, message, data)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, task_id, timestamp, level, source, host_name, message, data
        "#,
        id,
        task_id,
        now,
        level,
        source,
        host_name,
        message,
        data,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_logs(pool: &PgPool, task_id: &str) -> Result<Vec<TaskLogRow>, DbError> {
    let rows = sqlx::query_as!(
        TaskLogRow,
        r#"SELECT id, task_id, timestamp, level, source, host_name, message, data
           FROM task_logs WHERE task_id = $1 ORDER BY timestamp ASC"#,
        task_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
