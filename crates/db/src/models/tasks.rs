//! `tasks` and `task_logs` row structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A unit of remote work dispatched onto the priority queue.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub task_id: String,
    pub tenant_id: Uuid,
    pub task_type: String,
    pub name: String,
    pub description: Option<String>,
    pub params: serde_json::Value,
    pub priority: i32,
    pub status: String,
    pub worker_id: Option<String>,
    pub progress: i32,
    pub source: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub queued_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub timeout_seconds: i32,
    pub created_at: DateTime<Utc>,
}

/// An append-only task log line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskLogRow {
    pub id: Uuid,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub source: String,
    pub host_name: Option<String>,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
