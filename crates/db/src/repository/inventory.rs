//! Read-only inventory lookups: tickets, hosts, task templates.
//!
//! The match engine's compiled filter is executed here via a dynamic
//! `QueryBuilder` (the predicate tree shape is not known at compile time,
//! so the `query_as!` macro does not apply to `find_tickets`).

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::{TicketRow, HostRow, TaskTemplateRow}};

/// Total number of tickets for a tenant — spec §4.2 step 6
/// ("total_tickets_scanned").
pub async fn count_tickets(pool: &PgPool, tenant_id: Uuid) -> Result<i64, DbError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Run a compiled `match_engine::Filter` against the ticket table.
pub async fn find_tickets(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: &match_engine::CompiledFilter,
    limit: i64,
) -> Result<Vec<TicketRow>, DbError> {
    let mut qb = sqlx::QueryBuilder::new(
        "SELECT id, tenant_id, title, priority, status, category, custom_data, created_at FROM tickets WHERE tenant_id = ",
    );
    qb.push_bind(tenant_id);

    qb.push(" AND (");
    filter.push_into(&mut qb);
    qb.push(")");

    qb.push(" ORDER BY created_at ASC LIMIT ");
    qb.push_bind(limit);

    let rows = qb.build_query_as::<TicketRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Count of tickets matching a compiled filter, with no `LIMIT` — used to
/// report the true `matched_tickets` total even when the rows actually
/// dispatched against are capped (spec §4.2 step 9, §9 open question (c)).
pub async fn count_matching_tickets(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: &match_engine::CompiledFilter,
) -> Result<i64, DbError> {
    let mut qb = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM tickets WHERE tenant_id = ");
    qb.push_bind(tenant_id);
    qb.push(" AND (");
    filter.push_into(&mut qb);
    qb.push(")");

    let row: (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

pub async fn find_host_by_ip(pool: &PgPool, tenant_id: Uuid, ip: &str) -> Result<Option<HostRow>, DbError> {
    let row = sqlx::query_as!(
        HostRow,
        "SELECT id, tenant_id, ip, hostname, created_at FROM hosts WHERE tenant_id = $1 AND ip = $2",
        tenant_id,
        ip,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_host_by_hostname(pool: &PgPool, tenant_id: Uuid, hostname: &str) -> Result<Option<HostRow>, DbError> {
    let row = sqlx::query_as!(
        HostRow,
        "SELECT id, tenant_id, ip, hostname, created_at FROM hosts WHERE tenant_id = $1 AND hostname = $2",
        tenant_id,
        hostname,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_template(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<TaskTemplateRow, DbError> {
    let row = sqlx::query_as!(
        TaskTemplateRow,
        "SELECT id, tenant_id, name, is_active, param_schema, created_at FROM task_templates WHERE id = $1 AND tenant_id = $2",
        id,
        tenant_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}
