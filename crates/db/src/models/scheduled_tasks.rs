//! `scheduled_tasks` row struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user-defined recurring task execution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduledTaskRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub cron_expr: String,
    pub template_id: Uuid,
    pub host_ids: serde_json::Value,
    pub variables: serde_json::Value,
    pub timeout_mins: i32,
    pub is_active: bool,
    pub last_task_id: Option<String>,
    pub last_status: String,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub run_count: i64,
}
