//! Healing rule repository functions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::HealingRuleRow};

#[allow(clippy::too_many_arguments)]
pub async fn create_rule(
    pool: &PgPool,
    tenant_id: Uuid,
    code: &str,
    name: &str,
    trigger_type: &str,
    cron_expr: Option<&str>,
    match_condition: serde_json::Value,
    priority: i32,
    workflow_id: Uuid,
    cooldown_minutes: i32,
    max_executions: i32,
) -> Result<HealingRuleRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        HealingRuleRow,
        r#"
        INSERT INTO healing_rules
            (id, tenant_id, code, name, trigger_type, cron_expr, match_condition,
             priority, workflow_id, cooldown_minutes, max_executions,
             execute_count, success_count, failure_count, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, 0, 0, true, $12, $12)
        RETURNING id, tenant_id, code, name, trigger_type, cron_expr, match_condition,
                  priority, workflow_id, cooldown_minutes, max_executions,
                  execute_count, success_count, failure_count,
                  last_execute_at, next_run_at, is_active, created_at, updated_at
        "#,
        id,
        tenant_id,
        code,
        name,
        trigger_type,
        cron_expr,
        match_condition,
        priority,
        workflow_id,
        cooldown_minutes,
        max_executions,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_rule(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<HealingRuleRow, DbError> {
    let row = sqlx::query_as!(
        HealingRuleRow,
        r#"
        SELECT id, tenant_id, code, name, trigger_type, cron_expr, match_condition,
               priority, workflow_id, cooldown_minutes, max_executions,
               execute_count, success_count, failure_count,
               last_execute_at, next_run_at, is_active, created_at, updated_at
        FROM healing_rules WHERE id = $1 AND tenant_id = $2
        "#,
        id,
        tenant_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Reload a rule by id alone — used by the rule scheduler's cron callback,
/// which only captures the rule id (spec §4.1 "reloading the underlying
/// entity before use is mandatory") and has no tenant context until the row
/// itself supplies one.
pub async fn get_rule_by_id(pool: &PgPool, id: Uuid) -> Result<HealingRuleRow, DbError> {
    let row = sqlx::query_as!(
        HealingRuleRow,
        r#"
        SELECT id, tenant_id, code, name, trigger_type, cron_expr, match_condition,
               priority, workflow_id, cooldown_minutes, max_executions,
               execute_count, success_count, failure_count,
               last_execute_at, next_run_at, is_active, created_at, updated_at
        FROM healing_rules WHERE id = $1
        "#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Every row with `is_active = true AND trigger_type = 'scheduled'`, across
/// all tenants — the rule scheduler registers one cron entry per row.
pub async fn list_active_scheduled_rules(pool: &PgPool) -> Result<Vec<HealingRuleRow>, DbError> {
    let rows = sqlx::query_as!(
        HealingRuleRow,
        r#"
        SELECT id, tenant_id, code, name, trigger_type, cron_expr, match_condition,
               priority, workflow_id, cooldown_minutes, max_executions,
               execute_count, success_count, failure_count,
               last_execute_at, next_run_at, is_active, created_at, updated_at
        FROM healing_rules
        WHERE is_active = true AND trigger_type = 'scheduled'
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Recompute `next_run_at` (called after every schedule mutation).
pub async fn set_next_run_at(
    pool: &PgPool,
    id: Uuid,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE healing_rules SET next_run_at = $1, updated_at = $2 WHERE id = $3",
        next_run_at,
        Utc::now(),
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Apply the post-fire counters: `execute_count++`, `success_count++` xor
/// `failure_count++`, `last_execute_at = now`, and the freshly computed
/// `next_run_at`.
pub async fn record_fire(
    pool: &PgPool,
    id: Uuid,
    succeeded: bool,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let now = Utc::now();
    if succeeded {
        sqlx::query!(
            r#"
            UPDATE healing_rules
            SET execute_count = execute_count + 1,
                success_count = success_count + 1,
                last_execute_at = $1,
                next_run_at = $2,
                updated_at = $1
            WHERE id = $3
            "#,
            now,
            next_run_at,
            id,
        )
        .execute(pool)
        .await?;
    } else {
        sqlx::query!(
            r#"
            UPDATE healing_rules
            SET execute_count = execute_count + 1,
                failure_count = failure_count + 1,
                last_execute_at = $1,
                next_run_at = $2,
                updated_at = $1
            WHERE id = $3
            "#,
            now,
            next_run_at,
            id,
        )
        .execute(pool)
        .await?;
    }
    Ok(())
}

pub async fn set_active(pool: &PgPool, id: Uuid, is_active: bool) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE healing_rules SET is_active = $1, updated_at = $2 WHERE id = $3",
        is_active,
        Utc::now(),
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Refused if any `healing_executions` row still references this rule.
pub async fn delete_rule(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let has_history: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM healing_executions WHERE rule_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if has_history.0 {
        return Err(DbError::Constraint("rule has execution history".into()));
    }

    let result = sqlx::query!("DELETE FROM healing_rules WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
