//! `healing_workflows` row struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted workflow definition row.
///
/// `definition` is the full DAG JSON (`{nodes, connections, variables}`)
/// validated by `engine::parser` before being accepted here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealingWorkflowRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub definition: serde_json::Value,
    pub timeout_seconds: i32,
    pub max_retries: i32,
    pub allow_parallel: bool,
    pub version: i32,
    pub is_active: bool,
    pub execute_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub avg_duration_ms: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
