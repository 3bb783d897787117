//! Rule scheduler state machine (spec §4.2).
//!
//! One `RuleScheduler` owns a cron core of its own (named `"rule"` in the
//! registry) and tracks which cron handle belongs to which rule id, since
//! `cron_core::CronCore` itself has no concept of a rule — only an opaque
//! `JobHandle`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron_core::{CronCore, JobHandle};
use db::models::{HealingRuleExecutionRow, HealingRuleRow, TicketRow};
use db::DbPool;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::error::RuleSvcError;

/// Tuning knobs for a rule fire (spec §9 open question (c)).
#[derive(Debug, Clone)]
pub struct RuleSchedulerConfig {
    /// Cap on how many matched items are actually dispatched to workflow
    /// executions in a single fire. `matched_tickets` on the resulting
    /// `HealingRuleExecution` still reports the true, uncapped match count.
    pub max_matched_items: usize,
}

impl Default for RuleSchedulerConfig {
    fn default() -> Self {
        Self { max_matched_items: 500 }
    }
}

/// Accumulated result of one rule fire, built up by `RuleScheduler::evaluate`
/// and persisted once at the end (spec §4.2 steps 1-11: the "open ...
/// optimistic, downgraded later" record is an in-memory accumulator here,
/// since `healing_rule_executions` is a ledger insert, not a row mutated in
/// place).
#[derive(Default)]
struct FireResult {
    status: String,
    reason: Option<String>,
    total_tickets_scanned: i32,
    matched_tickets: i32,
    executions_created: i32,
    matched_ticket_infos: Vec<Value>,
    execution_ids: Vec<String>,
    /// Whether the rule actually reached step 6 ("Match") of the per-fire
    /// state machine, as opposed to short-circuiting on the inactive,
    /// cooldown, or quota checks (spec §4.2 steps 3-5). Only an attempted
    /// fire touches `execute_count`/`last_execute_at` — a short-circuited
    /// tick must leave both alone, or the cooldown window could never
    /// clear once a rule starts ticking faster than it (spec §4.2 step 4,
    /// §8 scenario 2).
    attempted: bool,
}

/// Steps 3-5 of the per-fire state machine: the inactive/cooldown/quota
/// short-circuits. Returns `Some(result)` (with `attempted: false`) if the
/// fire stops here, or `None` if the rule should proceed to step 6
/// ("Match"). Kept pure (no `self`/pool) so the gating logic is testable
/// without a database.
fn gate(rule: &HealingRuleRow, now: DateTime<Utc>) -> Option<FireResult> {
    if !rule.is_active {
        return Some(FireResult {
            status: "no_match".into(),
            reason: Some("rule inactive".into()),
            ..Default::default()
        });
    }

    if let Some(last) = rule.last_execute_at {
        if last + chrono::Duration::minutes(rule.cooldown_minutes as i64) > now {
            return Some(FireResult {
                status: "no_match".into(),
                reason: Some("cooldown".into()),
                ..Default::default()
            });
        }
    }

    if rule.max_executions > 0 && rule.execute_count >= rule.max_executions as i64 {
        return Some(FireResult {
            status: "no_match".into(),
            reason: Some("quota".into()),
            ..Default::default()
        });
    }

    None
}

/// Evaluates remediation rules on their cron schedule and dispatches
/// workflow executions for whatever they match (spec §4.2).
pub struct RuleScheduler {
    pool: DbPool,
    executor: Arc<engine::WorkflowExecutor>,
    cron: Arc<CronCore>,
    config: RuleSchedulerConfig,
    handles: Mutex<HashMap<Uuid, JobHandle>>,
}

impl RuleScheduler {
    pub fn new(
        pool: DbPool,
        executor: Arc<engine::WorkflowExecutor>,
        cron: Arc<CronCore>,
        config: RuleSchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self { pool, executor, cron, config, handles: Mutex::new(HashMap::new()) })
    }

    /// Load every `is_active=true AND trigger_type='scheduled'` rule and
    /// register it with the cron core (spec §4.2 "Startup").
    pub async fn start(self: &Arc<Self>) -> Result<(), RuleSvcError> {
        let rules = db::repository::rules::list_active_scheduled_rules(&self.pool).await?;
        for rule in rules {
            if let Err(err) = self.register(&rule).await {
                error!(rule_id = %rule.id, error = %err, "failed to register scheduled rule at startup");
            }
        }
        Ok(())
    }

    async fn register(self: &Arc<Self>, rule: &HealingRuleRow) -> Result<(), RuleSvcError> {
        let Some(cron_expr) = rule.cron_expr.clone() else {
            warn!(rule_id = %rule.id, "scheduled rule has no cron_expr, skipping registration");
            return Ok(());
        };

        let this = Arc::clone(self);
        let rule_id = rule.id;
        let handle = self.cron.add(&cron_expr, move || {
            let this = Arc::clone(&this);
            async move {
                this.fire(rule_id).await;
            }
        })?;

        self.handles.lock().insert(rule.id, handle);

        let next_fire_at = self.cron.next_fire_at(handle);
        db::repository::rules::set_next_run_at(&self.pool, rule.id, next_fire_at).await?;
        Ok(())
    }

    /// Remove then re-add a rule's cron entry after its schedule or match
    /// condition changes (spec §4.2 `refresh`).
    pub async fn refresh(self: &Arc<Self>, rule_id: Uuid) -> Result<(), RuleSvcError> {
        self.remove(rule_id);
        let rule = db::repository::rules::get_rule_by_id(&self.pool, rule_id).await?;
        if rule.is_active && rule.trigger_type == "scheduled" {
            self.register(&rule).await?;
        }
        Ok(())
    }

    /// Unregister a rule's cron entry after it is disabled or deleted (spec
    /// §4.2 `remove`). Idempotent.
    pub fn remove(&self, rule_id: Uuid) {
        if let Some(handle) = self.handles.lock().remove(&rule_id) {
            self.cron.remove(handle);
        }
    }

    /// Evaluate a rule immediately, skipping the cron path but following the
    /// same state machine (spec §4.2 `run_manual`).
    pub async fn run_manual(&self, rule_id: Uuid) -> Result<HealingRuleExecutionRow, RuleSvcError> {
        self.fire_inner(rule_id).await
    }

    #[instrument(skip(self))]
    async fn fire(&self, rule_id: Uuid) {
        if let Err(err) = self.fire_inner(rule_id).await {
            error!(rule_id = %rule_id, error = %err, "rule fire failed");
        }
    }

    async fn fire_inner(&self, rule_id: Uuid) -> Result<HealingRuleExecutionRow, RuleSvcError> {
        let start = Utc::now();
        // Reloading before use is mandatory (spec §4.1) — the cron callback
        // only captured the rule id.
        let rule = db::repository::rules::get_rule_by_id(&self.pool, rule_id).await?;

        let result = match self.evaluate(&rule).await {
            Ok(result) => result,
            // An infrastructure error here only ever occurs past the
            // inactive/cooldown/quota gate (see `evaluate`), so it is
            // itself a (failed) attempt.
            Err(err) => {
                FireResult { status: "failed".into(), reason: Some(err.to_string()), attempted: true, ..Default::default() }
            }
        };

        let duration_ms = (Utc::now() - start).num_milliseconds();
        let succeeded = result.status != "failed";
        let next_run_at = self.handles.lock().get(&rule_id).and_then(|h| self.cron.next_fire_at(*h));

        // Only an attempted fire bumps `execute_count`/`last_execute_at` —
        // a tick that short-circuited on the inactive/cooldown/quota checks
        // still needs its `next_run_at` advanced so the cron keeps ticking,
        // but must not touch the counters or the cooldown clock (spec §4.2
        // step 4, §8 scenario 2).
        if result.attempted {
            db::repository::rules::record_fire(&self.pool, rule_id, succeeded, next_run_at).await?;
        } else {
            db::repository::rules::set_next_run_at(&self.pool, rule_id, next_run_at).await?;
        }

        let row = db::repository::rule_executions::record(
            &self.pool,
            rule_id,
            rule.tenant_id,
            &result.status,
            result.total_tickets_scanned,
            result.matched_tickets,
            result.executions_created,
            Value::Array(result.matched_ticket_infos),
            Value::Array(result.execution_ids.into_iter().map(Value::String).collect()),
            duration_ms,
            result.reason.as_deref(),
        )
        .await?;

        Ok(row)
    }

    /// Steps 3-10 of the per-fire state machine. Domain outcomes (`no_match`,
    /// `failed`) are returned as `Ok`; only infrastructure failures (db,
    /// match-condition compile errors) propagate as `Err`, letting
    /// `fire_inner` still persist a `failed` record with the error message.
    async fn evaluate(&self, rule: &HealingRuleRow) -> Result<FireResult, RuleSvcError> {
        if let Some(result) = gate(rule, Utc::now()) {
            return Ok(result);
        }

        // Past this point the rule is genuinely attempting a match (spec
        // §4.2 step 6) — `execute_count`/`last_execute_at` must be touched
        // for this fire, unlike the short-circuits `gate` covers.
        let mut result = FireResult { attempted: true, ..Default::default() };

        let filter = match_engine::compile(&rule.match_condition)?;
        result.total_tickets_scanned = db::repository::inventory::count_tickets(&self.pool, rule.tenant_id).await? as i32;

        let full_match_count =
            db::repository::inventory::count_matching_tickets(&self.pool, rule.tenant_id, &filter).await?;
        result.matched_tickets = full_match_count as i32;

        if full_match_count == 0 {
            result.status = "no_match".into();
            return Ok(result);
        }

        if full_match_count as usize > self.config.max_matched_items {
            warn!(
                rule_id = %rule.id, full_match_count, cap = self.config.max_matched_items,
                "rule matched more tickets than the processing cap; truncating",
            );
        }

        let tickets = db::repository::inventory::find_tickets(
            &self.pool,
            rule.tenant_id,
            &filter,
            self.config.max_matched_items as i64,
        )
        .await?;

        let workflow_row = db::repository::workflows::get_workflow(&self.pool, rule.tenant_id, rule.workflow_id).await?;
        if !workflow_row.is_active {
            result.status = "failed".into();
            result.reason = Some("workflow inactive".into());
            return Ok(result);
        }
        let workflow = Arc::new(engine::models::Workflow::from_row(&workflow_row)?);

        let total_items = tickets.len();
        let mut any_succeeded = false;
        let mut any_failed = false;

        for (item_index, ticket) in tickets.iter().enumerate() {
            let matched_item = shape_ticket(ticket);
            result.matched_ticket_infos.push(json!({"id": ticket.id, "title": ticket.title}));

            let trigger_source = json!({
                "rule": {"id": rule.id, "code": rule.code, "name": rule.name},
                "matched_item": matched_item,
                "item_index": item_index,
                "total_items": total_items,
                "trigger_type": "scheduled",
                "trigger_time": Utc::now(),
            });

            match self
                .executor
                .start(Arc::clone(&workflow), rule.tenant_id, Some(rule.id), "scheduled", trigger_source)
                .await
            {
                Ok(started) => {
                    any_succeeded = true;
                    result.execution_ids.push(started.execution_id);
                    result.executions_created += 1;
                }
                Err(err) => {
                    any_failed = true;
                    warn!(
                        rule_id = %rule.id, ticket_id = %ticket.id, error = %err,
                        "failed to start workflow execution for matched ticket",
                    );
                }
            }
        }

        result.status = if any_succeeded && !any_failed {
            "success".into()
        } else if any_succeeded && any_failed {
            "partial".into()
        } else {
            "failed".into()
        };

        Ok(result)
    }
}

/// Expand a ticket's `custom_data` blob into an inlined map alongside its
/// first-class columns (spec §4.2 step 9).
fn shape_ticket(ticket: &TicketRow) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("id".into(), json!(ticket.id));
    map.insert("title".into(), json!(ticket.title));
    map.insert("priority".into(), json!(ticket.priority));
    map.insert("status".into(), json!(ticket.status));
    map.insert("category".into(), json!(ticket.category));
    if let Value::Object(custom) = &ticket.custom_data {
        for (k, v) in custom {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(custom_data: Value) -> TicketRow {
        TicketRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "disk almost full".into(),
            priority: Some("P1".into()),
            status: Some("open".into()),
            category: Some("infra".into()),
            custom_data,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn shape_ticket_inlines_custom_data_alongside_columns() {
        let t = ticket(json!({"host": "10.0.0.5", "disk_pct": 97}));
        let shaped = shape_ticket(&t);
        assert_eq!(shaped["title"], json!("disk almost full"));
        assert_eq!(shaped["host"], json!("10.0.0.5"));
        assert_eq!(shaped["disk_pct"], json!(97));
    }

    #[test]
    fn shape_ticket_never_lets_custom_data_override_first_class_columns() {
        let t = ticket(json!({"title": "attacker-controlled"}));
        let shaped = shape_ticket(&t);
        assert_eq!(shaped["title"], json!("disk almost full"));
    }

    #[test]
    fn shape_ticket_handles_non_object_custom_data() {
        let t = ticket(Value::Null);
        let shaped = shape_ticket(&t);
        assert_eq!(shaped["title"], json!("disk almost full"));
    }

    fn rule(cooldown_minutes: i32, max_executions: i32) -> HealingRuleRow {
        HealingRuleRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            code: "r1".into(),
            name: "r1".into(),
            trigger_type: "scheduled".into(),
            cron_expr: Some("0 */1 * * * *".into()),
            match_condition: json!({"field": "priority", "operator": "equals", "value": "P1", "source": "ticket"}),
            priority: 0,
            workflow_id: Uuid::new_v4(),
            cooldown_minutes,
            max_executions,
            execute_count: 0,
            success_count: 0,
            failure_count: 0,
            last_execute_at: None,
            next_run_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gate_passes_through_an_active_rule_with_no_history() {
        assert!(gate(&rule(30, 0), Utc::now()).is_none());
    }

    #[test]
    fn gate_short_circuits_an_inactive_rule_without_touching_counters() {
        let mut r = rule(30, 0);
        r.is_active = false;
        let result = gate(&r, Utc::now()).unwrap();
        assert_eq!(result.status, "no_match");
        assert_eq!(result.reason.as_deref(), Some("rule inactive"));
        assert!(!result.attempted);
    }

    #[test]
    fn gate_short_circuits_within_the_cooldown_window_without_marking_an_attempt() {
        let mut r = rule(30, 0);
        r.last_execute_at = Some(Utc::now() - chrono::Duration::minutes(10));
        let result = gate(&r, Utc::now()).unwrap();
        assert_eq!(result.reason.as_deref(), Some("cooldown"));
        assert!(!result.attempted);
    }

    #[test]
    fn gate_lets_the_rule_through_once_the_cooldown_window_has_elapsed() {
        let mut r = rule(30, 0);
        r.last_execute_at = Some(Utc::now() - chrono::Duration::minutes(31));
        assert!(gate(&r, Utc::now()).is_none());
    }

    #[test]
    fn gate_cooldown_of_zero_never_blocks() {
        let mut r = rule(0, 0);
        r.last_execute_at = Some(Utc::now());
        assert!(gate(&r, Utc::now()).is_none());
    }

    #[test]
    fn gate_short_circuits_once_the_quota_is_exhausted() {
        let mut r = rule(30, 5);
        r.execute_count = 5;
        let result = gate(&r, Utc::now()).unwrap();
        assert_eq!(result.reason.as_deref(), Some("quota"));
        assert!(!result.attempted);
    }

    #[test]
    fn gate_max_executions_of_zero_disables_the_quota_check() {
        let mut r = rule(30, 0);
        r.execute_count = 1_000_000;
        assert!(gate(&r, Utc::now()).is_none());
    }

    #[test]
    fn fire_result_defaults_to_empty_counters() {
        let result = FireResult::default();
        assert_eq!(result.total_tickets_scanned, 0);
        assert!(result.execution_ids.is_empty());
    }
}
