//! Inventory row structs consumed by the match engine and `task_execute`.
//!
//! Ticket/host CRUD itself is out of scope (spec §1) — these structs exist
//! only so the core can *read* the inventory it matches and dispatches
//! against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A ticket row. Columns named by the match engine (`priority`, `status`,
/// `category`) are first-class; anything else lives in `custom_data`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub custom_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A managed host, looked up by IP or hostname from `task_execute`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HostRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub ip: String,
    pub hostname: String,
    pub created_at: DateTime<Utc>,
}

/// A task template with a declared parameter schema, used to validate
/// `task_execute` / scheduled-task variables before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskTemplateRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// `[{name, type, required, options?}]` — see `taskqueue::templates`.
    pub param_schema: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
