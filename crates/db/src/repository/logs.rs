//! `healing_execution_logs` repository functions — append-only.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::HealingExecutionLogRow};

#[allow(clippy::too_many_arguments)]
pub async fn append(
    pool: &PgPool,
    execution_id: &str,
    node_id: &str,
    node_type: &str,
    node_name: &str,
    level: &str,
    message: &str,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    duration_ms: Option<i64>,
    input: serde_json::Value,
    output: serde_json::Value,
    error: Option<serde_json::Value>,
) -> Result<HealingExecutionLogRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        HealingExecutionLogRow,
        r#"
        INSERT INTO healing_execution_logs
            (id, execution_id, node_id, node_type, node_name, level, timestamp, message,
             start_time, end_time, duration_ms, input, output, error)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id, execution_id, node_id, node_type, node_name, level, timestamp, message,
                  start_time, end_time, duration_ms, input, output, error
        "#,
        id,
        execution_id,
        node_id,
        node_type,
        node_name,
        level,
        now,
        message,
        start_time,
        end_time,
        duration_ms,
        input,
        output,
        error,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_for_execution(
    pool: &PgPool,
    execution_id: &str,
) -> Result<Vec<HealingExecutionLogRow>, DbError> {
    let rows = sqlx::query_as!(
        HealingExecutionLogRow,
        r#"
        SELECT id, execution_id, node_id, node_type, node_name, level, timestamp, message,
               start_time, end_time, duration_ms, input, output, error
        FROM healing_execution_logs
        WHERE execution_id = $1
        ORDER BY timestamp ASC
        "#,
        execution_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
