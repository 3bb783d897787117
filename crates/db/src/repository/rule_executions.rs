//! `healing_rule_executions` repository functions.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::HealingRuleExecutionRow};

#[allow(clippy::too_many_arguments)]
pub async fn record(
    pool: &PgPool,
    rule_id: Uuid,
    tenant_id: Uuid,
    status: &str,
    total_tickets_scanned: i32,
    matched_tickets: i32,
    executions_created: i32,
    matched_ticket_infos: serde_json::Value,
    execution_ids: serde_json::Value,
    duration_ms: i64,
    error_msg: Option<&str>,
) -> Result<HealingRuleExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        HealingRuleExecutionRow,
        r#"
        INSERT INTO healing_rule_executions
            (id, rule_id, tenant_id, execution_time, status, total_tickets_scanned,
             matched_tickets, executions_created, matched_ticket_infos, execution_ids,
             duration_ms, error_msg)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id, rule_id, tenant_id, execution_time, status, total_tickets_scanned,
                  matched_tickets, executions_created, matched_ticket_infos, execution_ids,
                  duration_ms, error_msg
        "#,
        id,
        rule_id,
        tenant_id,
        now,
        status,
        total_tickets_scanned,
        matched_tickets,
        executions_created,
        matched_ticket_infos,
        execution_ids,
        duration_ms,
        error_msg,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_for_rule(
    pool: &PgPool,
    rule_id: Uuid,
    limit: i64,
) -> Result<Vec<HealingRuleExecutionRow>, DbError> {
    let rows = sqlx::query_as!(
        HealingRuleExecutionRow,
        r#"
        SELECT id, rule_id, tenant_id, execution_time, status, total_tickets_scanned,
               matched_tickets, executions_created, matched_ticket_infos, execution_ids,
               duration_ms, error_msg
        FROM healing_rule_executions
        WHERE rule_id = $1
        ORDER BY execution_time DESC
        LIMIT $2
        "#,
        rule_id,
        limit,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
