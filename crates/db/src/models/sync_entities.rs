//! `git_repositories` and `ticket_plugins` row structs.
//!
//! Both entities are treated as external configuration here (per spec
//! §3) — the core owns only their sync timers and a next-run-at pointer;
//! the sync work itself runs on the worker side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GitRepositoryRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sync_enabled: bool,
    pub sync_cron: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketPluginRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sync_enabled: bool,
    pub sync_cron: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}
