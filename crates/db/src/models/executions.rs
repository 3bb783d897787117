//! `healing_executions` and `healing_execution_logs` row structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A concrete workflow run.
///
/// `execution_id` is an opaque globally-unique string (not the table's
/// surrogate key — there is none, `execution_id` *is* the primary key) so
/// callers never need to round-trip a `Uuid` through JSON twice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealingExecutionRow {
    pub execution_id: String,
    pub workflow_id: Uuid,
    pub rule_id: Option<Uuid>,
    pub tenant_id: Uuid,
    pub trigger_type: String,
    pub trigger_source: serde_json::Value,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub context: serde_json::Value,
    /// `{node_id: NodeState}` — see `engine::models::NodeState`.
    pub node_states: serde_json::Value,
    pub error_msg: Option<String>,
}

/// A structured per-node log line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealingExecutionLogRow {
    pub id: Uuid,
    pub execution_id: String,
    pub node_id: String,
    pub node_type: String,
    pub node_name: String,
    pub level: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub error: Option<serde_json::Value>,
}
