//! `worker_connections` repository functions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::WorkerConnectionRow};

pub async fn find_active(pool: &PgPool, worker_id: &str) -> Result<Option<WorkerConnectionRow>, DbError> {
    let row = sqlx::query_as!(
        WorkerConnectionRow,
        r#"
        SELECT id, worker_id, ip, status, connected_at, last_heartbeat, access_key
        FROM worker_connections WHERE worker_id = $1 AND status = 'active'
        "#,
        worker_id,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn mark_disconnected(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    sqlx::query!("UPDATE worker_connections SET status = 'disconnected' WHERE id = $1", id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_active(
    pool: &PgPool,
    worker_id: &str,
    ip: &str,
    access_key: &str,
) -> Result<WorkerConnectionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        WorkerConnectionRow,
        r#"
        INSERT INTO worker_connections (id, worker_id, ip, status, connected_at, last_heartbeat, access_key)
        VALUES ($1, $2, $3, 'active', $4, $4, $5)
        RETURNING id, worker_id, ip, status, connected_at, last_heartbeat, access_key
        "#,
        id,
        worker_id,
        ip,
        now,
        access_key,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn heartbeat(pool: &PgPool, worker_id: &str) -> Result<(), DbError> {
    let result = sqlx::query!(
        r#"
        UPDATE worker_connections SET last_heartbeat = $1
        WHERE worker_id = $2 AND status = 'active'
        "#,
        Utc::now(),
        worker_id,
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Active connections whose heartbeat is older than `stale_before` — swept
/// to `disconnected` every cleanup cycle.
pub async fn list_stale(pool: &PgPool, stale_before: DateTime<Utc>) -> Result<Vec<WorkerConnectionRow>, DbError> {
    let rows = sqlx::query_as!(
        WorkerConnectionRow,
        r#"
        SELECT id, worker_id, ip, status, connected_at, last_heartbeat, access_key
        FROM worker_connections WHERE status = 'active' AND last_heartbeat < $1
        "#,
        stale_before,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
