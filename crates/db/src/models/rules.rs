//! `healing_rules` and `healing_rule_executions` row structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted remediation rule row.
///
/// `trigger_type` is `"scheduled"` or `"manual"`; `match_condition` is the
/// recursive condition tree JSON described by the match engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealingRuleRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub trigger_type: String,
    pub cron_expr: Option<String>,
    pub match_condition: serde_json::Value,
    pub priority: i32,
    pub workflow_id: Uuid,
    pub cooldown_minutes: i32,
    pub max_executions: i32,
    pub execute_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_execute_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A per-fire summary row in `healing_rule_executions`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealingRuleExecutionRow {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub tenant_id: Uuid,
    pub execution_time: DateTime<Utc>,
    pub status: String,
    pub total_tickets_scanned: i32,
    pub matched_tickets: i32,
    pub executions_created: i32,
    pub matched_ticket_infos: serde_json::Value,
    pub execution_ids: serde_json::Value,
    pub duration_ms: i64,
    pub error_msg: Option<String>,
}
