//! `healing_executions` repository functions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::HealingExecutionRow};

/// Create a new execution row in `running` status.
///
/// `execution_id` is the opaque string minted by the caller (the workflow
/// executor) before this row exists, so logs and node-state updates can
/// reference it immediately.
#[allow(clippy::too_many_arguments)]
pub async fn create_execution(
    pool: &PgPool,
    execution_id: &str,
    workflow_id: Uuid,
    rule_id: Option<Uuid>,
    tenant_id: Uuid,
    trigger_type: &str,
    trigger_source: serde_json::Value,
    context: serde_json::Value,
) -> Result<HealingExecutionRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as!(
        HealingExecutionRow,
        r#"
        INSERT INTO healing_executions
            (execution_id, workflow_id, rule_id, tenant_id, trigger_type, trigger_source,
             status, start_time, context, node_states)
        VALUES ($1, $2, $3, $4, $5, $6, 'running', $7, $8, '{}'::jsonb)
        RETURNING execution_id, workflow_id, rule_id, tenant_id, trigger_type, trigger_source,
                  status, start_time, end_time, duration_ms, context, node_states, error_msg
        "#,
        execution_id,
        workflow_id,
        rule_id,
        tenant_id,
        trigger_type,
        trigger_source,
        now,
        context,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_execution(pool: &PgPool, execution_id: &str) -> Result<HealingExecutionRow, DbError> {
    let row = sqlx::query_as!(
        HealingExecutionRow,
        r#"
        SELECT execution_id, workflow_id, rule_id, tenant_id, trigger_type, trigger_source,
               status, start_time, end_time, duration_ms, context, node_states, error_msg
        FROM healing_executions WHERE execution_id = $1
        "#,
        execution_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

pub async fn list_for_workflow(
    pool: &PgPool,
    workflow_id: Uuid,
    limit: i64,
) -> Result<Vec<HealingExecutionRow>, DbError> {
    let rows = sqlx::query_as!(
        HealingExecutionRow,
        r#"
        SELECT execution_id, workflow_id, rule_id, tenant_id, trigger_type, trigger_source,
               status, start_time, end_time, duration_ms, context, node_states, error_msg
        FROM healing_executions
        WHERE workflow_id = $1
        ORDER BY start_time DESC
        LIMIT $2
        "#,
        workflow_id,
        limit,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Merge a single node's state into the `node_states` JSON map.
///
/// Uses the `||` jsonb concatenation operator so concurrent node updates
/// within the same (single-threaded) execution never clobber siblings.
pub async fn merge_node_state(
    pool: &PgPool,
    execution_id: &str,
    node_id: &str,
    state: serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE healing_executions
        SET node_states = node_states || jsonb_build_object($1::text, $2::jsonb)
        WHERE execution_id = $3
        "#,
        node_id,
        state,
        execution_id,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Finalize the execution: status, end_time, duration, full node_states
/// snapshot, and an optional error message.
pub async fn finish_execution(
    pool: &PgPool,
    execution_id: &str,
    status: &str,
    end_time: DateTime<Utc>,
    duration_ms: i64,
    node_states: serde_json::Value,
    error_msg: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE healing_executions
        SET status = $1, end_time = $2, duration_ms = $3, node_states = $4, error_msg = $5
        WHERE execution_id = $6
        "#,
        status,
        end_time,
        duration_ms,
        node_states,
        error_msg,
        execution_id,
    )
    .execute(pool)
    .await?;

    Ok(())
}
