//! `git_repositories` and `ticket_plugins` repository functions.
//!
//! Both entities are external configuration (spec §3): the core owns only
//! their sync timer and publishes a notification when it fires — the sync
//! work itself runs on the worker side.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::{GitRepositoryRow, TicketPluginRow}, DbError};

pub async fn list_active_git_repositories(pool: &PgPool) -> Result<Vec<GitRepositoryRow>, DbError> {
    let rows = sqlx::query_as!(
        GitRepositoryRow,
        r#"SELECT id, tenant_id, sync_enabled, sync_cron, next_run_at
           FROM git_repositories WHERE sync_enabled = true AND sync_cron IS NOT NULL"#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn set_git_next_run_at(pool: &PgPool, id: Uuid, next_run_at: Option<DateTime<Utc>>) -> Result<(), DbError> {
    sqlx::query!("UPDATE git_repositories SET next_run_at = $1 WHERE id = $2", next_run_at, id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_git_repository(pool: &PgPool, id: Uuid) -> Result<GitRepositoryRow, DbError> {
    let row = sqlx::query_as!(
        GitRepositoryRow,
        "SELECT id, tenant_id, sync_enabled, sync_cron, next_run_at FROM git_repositories WHERE id = $1",
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}

pub async fn list_active_ticket_plugins(pool: &PgPool) -> Result<Vec<TicketPluginRow>, DbError> {
    let rows = sqlx::query_as!(
        TicketPluginRow,
        r#"SELECT id, tenant_id, sync_enabled, sync_cron, next_run_at
           FROM ticket_plugins WHERE sync_enabled = true AND sync_cron IS NOT NULL"#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn set_ticket_plugin_next_run_at(
    pool: &PgPool,
    id: Uuid,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    sqlx::query!("UPDATE ticket_plugins SET next_run_at = $1 WHERE id = $2", next_run_at, id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_ticket_plugin(pool: &PgPool, id: Uuid) -> Result<TicketPluginRow, DbError> {
    let row = sqlx::query_as!(
        TicketPluginRow,
        "SELECT id, tenant_id, sync_enabled, sync_cron, next_run_at FROM ticket_plugins WHERE id = $1",
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}
