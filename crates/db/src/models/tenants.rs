//! `tenants` row struct.
//!
//! Tenant CRUD is out of scope (spec §1) — this exists only so the core
//! can denormalize a tenant's name onto task queue messages (spec §4.8)
//! without round-tripping through the external tenant service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
