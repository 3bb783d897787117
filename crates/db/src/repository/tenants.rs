//! Read-only tenant lookups. Tenant CRUD itself is out of scope (spec §1).

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::TenantRow, DbError};

pub async fn get_name(pool: &PgPool, tenant_id: Uuid) -> Result<String, DbError> {
    let row = sqlx::query_as!(TenantRow, "SELECT id, name, created_at FROM tenants WHERE id = $1", tenant_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok(row.name)
}
