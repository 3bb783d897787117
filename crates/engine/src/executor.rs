//! Workflow execution engine (spec §4.6).
//!
//! `WorkflowExecutor` is the central orchestrator: it validates the DAG,
//! walks it node-by-node through the registered `ExecutableNode`
//! implementations, and persists per-node and per-execution bookkeeping as
//! it goes. An execution is single-threaded internally — node output and
//! `variables` mutation never race within one run (spec §5).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use db::DbPool;
use nodes::traits::{CancelToken, Collaborators, ExecutionContext};
use nodes::NodeRegistry;

use crate::dag::validate_dag;
use crate::models::{ErrorHandle, ExecutionSummary, NodeState, NodeType, TimelineEntry, Workflow};
use crate::EngineError;

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Base delay for exponential back-off between node retries
    /// (spec §9 open question (a)).
    pub retry_base_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { retry_base_delay: Duration::from_millis(200) }
    }
}

/// Synchronous side-effect of [`WorkflowExecutor::start`]: the execution
/// row created before the run is launched.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StartedExecution {
    pub execution_id: String,
    pub workflow_id: Uuid,
}

/// Orchestrates workflow runs against a shared node registry and
/// collaborator set. One instance is constructed per process and shared
/// (behind an `Arc`) across every rule fire, manual trigger, and webhook.
pub struct WorkflowExecutor {
    pool: DbPool,
    registry: NodeRegistry,
    collaborators: Collaborators,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(pool: DbPool, registry: NodeRegistry, collaborators: Collaborators, config: ExecutorConfig) -> Self {
        Self { pool, registry, collaborators, config }
    }

    /// Start an execution: create the `HealingExecution` row in `running`,
    /// seed `global_context`, launch the interpreter as an independent
    /// asynchronous task, and return immediately (spec §4.6 intro, §5
    /// "workflow executions run as independent asynchronous tasks").
    #[instrument(skip(self, workflow, trigger_source), fields(workflow_id = %workflow.id, code = %workflow.code))]
    pub async fn start(
        self: &Arc<Self>,
        workflow: Arc<Workflow>,
        tenant_id: Uuid,
        rule_id: Option<Uuid>,
        trigger_type: &str,
        trigger_source: Value,
    ) -> Result<StartedExecution, EngineError> {
        let execution_id = format!("exec-{}", Uuid::new_v4());

        let global_context = json!({
            "trigger": trigger_source.clone(),
            "workflow": {"id": workflow.id, "name": workflow.name, "code": workflow.code},
        });
        let context = json!({"variables": global_context.clone()});

        let row = db::repository::executions::create_execution(
            &self.pool,
            &execution_id,
            workflow.id,
            rule_id,
            tenant_id,
            trigger_type,
            trigger_source,
            context,
        )
        .await?;

        let executor = Arc::clone(self);
        let wf = Arc::clone(&workflow);
        let exec_id = row.execution_id.clone();
        let start_time = row.start_time;

        tokio::spawn(async move {
            if let Err(err) = executor.run(&wf, tenant_id, &exec_id, start_time, global_context).await {
                error!(execution_id = %exec_id, error = %err, "workflow execution terminated with an engine error");
            }
        });

        Ok(StartedExecution { execution_id: row.execution_id, workflow_id: row.workflow_id })
    }

    /// Run the interpreter loop to completion and return the summary.
    /// Used directly by `start`'s spawned task, and by callers (tests,
    /// the CLI's `validate`/manual-run paths) that want to await the
    /// full run rather than fire-and-forget.
    #[instrument(skip(self, variables), fields(execution_id = %execution_id))]
    pub async fn run(
        &self,
        workflow: &Workflow,
        tenant_id: Uuid,
        execution_id: &str,
        start_time: DateTime<Utc>,
        mut variables: Value,
    ) -> Result<ExecutionSummary, EngineError> {
        let parsed = validate_dag(&workflow.definition)?;

        self.log(execution_id, "__execution__", "execution", "execution", "info",
            &format!("execution started (workflow='{}', start_node='{}')", workflow.code, parsed.start_node),
            None, None, None, Value::Null, Value::Null, None).await;

        let cancel = CancelToken::new();
        let mut node_states: HashMap<String, NodeState> = HashMap::new();
        let mut timeline: Vec<TimelineEntry> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(parsed.start_node.clone());

        let mut failure: Option<String> = None;

        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id.clone()) {
                continue;
            }
            let node = parsed.node_map.get(&node_id).expect("queued only validated node ids");

            let rendered_log = if node.node_type == NodeType::TicketUpdate && wants_rendered_log(&node.config) {
                Some(render_timeline_so_far(execution_id, &timeline))
            } else {
                None
            };

            let node_started_at = Utc::now();
            let mut attempts = 0u32;
            let max_attempts = if node.error_handle == ErrorHandle::Retry {
                (workflow.max_retries.max(0) as u32) + 1
            } else {
                1
            };

            let outcome = loop {
                attempts += 1;
                let mut ctx = ExecutionContext {
                    tenant_id,
                    execution_id,
                    node_id: &node_id,
                    node_name: &node.name,
                    variables: &mut variables,
                    cancel: &cancel,
                    collaborators: &self.collaborators,
                    rendered_log: rendered_log.as_deref(),
                };

                let Some(executor) = self.registry.get(node.node_type.as_str()) else {
                    break Err(EngineError::UnknownNodeType(node.node_type.as_str().to_string()));
                };

                match executor.execute(&node.config, &mut ctx).await {
                    Ok(outcome) => break Ok(outcome),
                    Err(node_err) => {
                        if attempts < max_attempts {
                            let delay = self.config.retry_base_delay * 2u32.pow(attempts - 1);
                            warn!(
                                node_id = %node_id, attempt = attempts, max_attempts, delay_ms = delay.as_millis() as u64,
                                "node failed, retrying: {}", node_err.message,
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        break Err(EngineError::NodeFailed { node_id: node_id.clone(), message: node_err.message });
                    }
                }
            };

            let ended_at = Utc::now();
            let duration_ms = (ended_at - node_started_at).num_milliseconds();

            match outcome {
                Ok(outcome) => {
                    let state = NodeState {
                        status: "success".to_string(),
                        started_at: node_started_at,
                        ended_at: Some(ended_at),
                        duration_ms: Some(duration_ms),
                        attempts,
                        error: None,
                    };
                    self.persist_node(execution_id, &node_id, &node.node_type, &node.name, &state,
                        node.config.clone(), outcome.output.clone(), None).await?;
                    timeline.push(TimelineEntry {
                        node_id: node_id.clone(), node_name: node.name.clone(), status: "success".to_string(), duration_ms,
                    });
                    node_states.insert(node_id.clone(), state);

                    let next = match outcome.next_nodes {
                        Some(explicit) => explicit,
                        None => next_nodes_for(node, &variables)?,
                    };
                    for successor in next {
                        if !visited.contains(&successor) {
                            queue.push_back(successor);
                        }
                    }
                }

                Err(EngineError::NodeFailed { node_id: failed_id, message }) => {
                    let state = NodeState {
                        status: "failed".to_string(),
                        started_at: node_started_at,
                        ended_at: Some(ended_at),
                        duration_ms: Some(duration_ms),
                        attempts,
                        error: Some(message.clone()),
                    };
                    self.persist_node(execution_id, &failed_id, &node.node_type, &node.name, &state,
                        node.config.clone(), Value::Null, Some(json!({"message": message}))).await?;
                    timeline.push(TimelineEntry {
                        node_id: failed_id.clone(), node_name: node.name.clone(), status: "failed".to_string(), duration_ms,
                    });
                    node_states.insert(failed_id.clone(), state);

                    match node.error_handle {
                        ErrorHandle::Continue => {
                            let next = next_nodes_for(node, &variables)?;
                            for successor in next {
                                if !visited.contains(&successor) {
                                    queue.push_back(successor);
                                }
                            }
                        }
                        ErrorHandle::Stop | ErrorHandle::Retry => {
                            failure = Some(format!("node '{}' failed: {}", node.name, message));
                            break;
                        }
                    }
                }

                Err(other) => {
                    failure = Some(other.to_string());
                    break;
                }
            }
        }

        let end_time = Utc::now();
        let duration_ms = (end_time - start_time).num_milliseconds();
        let status = if failure.is_some() { "failed" } else { "success" };
        let succeeded = node_states.values().filter(|s| s.status == "success").count();
        let failed = node_states.values().filter(|s| s.status == "failed").count();

        let node_states_json = serde_json::to_value(&node_states)?;
        db::repository::executions::finish_execution(
            &self.pool, execution_id, status, end_time, duration_ms, node_states_json, failure.as_deref(),
        )
        .await?;
        db::repository::workflows::record_execution_outcome(&self.pool, workflow.id, status == "success", duration_ms)
            .await?;

        let summary_level = if status == "success" { "info" } else { "error" };
        self.log(execution_id, "__execution__", "execution", "execution", summary_level,
            &format!("execution {status} in {duration_ms}ms: {succeeded} succeeded, {failed} failed"),
            None, None, None, Value::Null, Value::Null,
            failure.as_ref().map(|m| json!({"message": m}))).await;

        info!(execution_id, status, duration_ms, succeeded, failed, "workflow execution finished");

        Ok(ExecutionSummary {
            execution_id: execution_id.to_string(),
            status: status.to_string(),
            duration_ms,
            node_count: node_states.len(),
            succeeded,
            failed,
            timeline,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_node(
        &self,
        execution_id: &str,
        node_id: &str,
        node_type: &NodeType,
        node_name: &str,
        state: &NodeState,
        input: Value,
        output: Value,
        error: Option<Value>,
    ) -> Result<(), EngineError> {
        db::repository::executions::merge_node_state(&self.pool, execution_id, node_id, serde_json::to_value(state)?)
            .await?;

        let level = if state.status == "failed" { "error" } else { "info" };
        let message = match &state.error {
            Some(msg) => format!("node '{node_name}' failed: {msg}"),
            None => format!("node '{node_name}' completed"),
        };
        self.log(
            execution_id, node_id, node_type.as_str(), node_name, level, &message,
            Some(state.started_at), state.ended_at, state.duration_ms, input, output, error,
        )
        .await;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn log(
        &self,
        execution_id: &str,
        node_id: &str,
        node_type: &str,
        node_name: &str,
        level: &str,
        message: &str,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        duration_ms: Option<i64>,
        input: Value,
        output: Value,
        error: Option<Value>,
    ) {
        if let Err(err) = db::repository::logs::append(
            &self.pool, execution_id, node_id, node_type, node_name, level, message,
            start_time, end_time, duration_ms, input, output, error,
        )
        .await
        {
            warn!(execution_id, node_id, "failed to persist execution log line: {}", err);
        }
    }
}

/// A `ticket_update` node wants the rendered timeline appended to its
/// comment when `config.updates.comment.include_logs` is `true`.
fn wants_rendered_log(config: &Value) -> bool {
    config
        .get("updates")
        .and_then(|u| u.get("comment"))
        .and_then(|c| c.get("include_logs"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn render_timeline_so_far(execution_id: &str, timeline: &[TimelineEntry]) -> String {
    let mut out = format!("Execution {execution_id} so far:");
    for entry in timeline {
        out.push('\n');
        out.push_str(&format!("  [{}] {} — {} ({} ms)", entry.node_id, entry.node_name, entry.status, entry.duration_ms));
    }
    out
}

/// Resolve a node's successors when its executor didn't override them
/// (spec §4.6 step 3). Only `condition` branches; every other kind uses
/// its declared `next_nodes` list verbatim.
fn next_nodes_for(node: &crate::models::WorkflowNode, variables: &Value) -> Result<Vec<String>, EngineError> {
    if node.node_type != NodeType::Condition {
        return Ok(node.next_nodes.clone());
    }

    let expression = node
        .config
        .get("expression")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::NodeFailed {
            node_id: node.id.clone(),
            message: "unsupported expression".to_string(),
        })?;

    let result = nodes::condition::evaluate(expression, variables)
        .map_err(|e| EngineError::NodeFailed { node_id: node.id.clone(), message: e.message })?;

    let branch = if result { node.next_nodes.first() } else { node.next_nodes.get(1) };
    Ok(branch.cloned().into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorHandle, WorkflowNode};
    use serde_json::json;

    fn node(id: &str, node_type: NodeType, next_nodes: &[&str], config: Value) -> crate::models::WorkflowNode {
        WorkflowNode {
            id: id.to_string(),
            node_type,
            name: format!("node {id}"),
            config,
            next_nodes: next_nodes.iter().map(|s| s.to_string()).collect(),
            error_handle: ErrorHandle::Stop,
        }
    }

    #[test]
    fn non_condition_nodes_use_declared_next_nodes() {
        let n = node("n1", NodeType::DataProcess, &["a", "b"], json!({}));
        assert_eq!(next_nodes_for(&n, &json!({})).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn condition_node_takes_true_branch() {
        let n = node("c", NodeType::Condition, &["t", "f"], json!({"expression": "{{x}} == 1"}));
        assert_eq!(next_nodes_for(&n, &json!({"x": 1})).unwrap(), vec!["t"]);
    }

    #[test]
    fn condition_node_takes_false_branch() {
        let n = node("c", NodeType::Condition, &["t", "f"], json!({"expression": "{{x}} == 1"}));
        assert_eq!(next_nodes_for(&n, &json!({"x": 2})).unwrap(), vec!["f"]);
    }

    #[test]
    fn condition_node_missing_expression_fails() {
        let n = node("c", NodeType::Condition, &["t", "f"], json!({}));
        assert!(next_nodes_for(&n, &json!({})).is_err());
    }

    #[test]
    fn wants_rendered_log_reads_nested_flag() {
        assert!(wants_rendered_log(&json!({"updates": {"comment": {"include_logs": true}}})));
        assert!(!wants_rendered_log(&json!({"updates": {"comment": {"include_logs": false}}})));
        assert!(!wants_rendered_log(&json!({})));
    }

    #[test]
    fn render_timeline_so_far_lists_every_entry() {
        let timeline = vec![
            TimelineEntry { node_id: "n1".into(), node_name: "Start".into(), status: "success".into(), duration_ms: 5 },
            TimelineEntry { node_id: "n2".into(), node_name: "Check".into(), status: "failed".into(), duration_ms: 12 },
        ];
        let rendered = render_timeline_so_far("exec-1", &timeline);
        assert!(rendered.contains("exec-1"));
        assert!(rendered.contains("Start"));
        assert!(rendered.contains("Check"));
    }

    #[test]
    fn execution_summary_render_text_includes_counts_and_timeline() {
        let summary = ExecutionSummary {
            execution_id: "exec-2".into(),
            status: "success".into(),
            duration_ms: 42,
            node_count: 1,
            succeeded: 1,
            failed: 0,
            timeline: vec![TimelineEntry {
                node_id: "n1".into(), node_name: "Start".into(), status: "success".into(), duration_ms: 5,
            }],
        };
        let text = summary.render_text();
        assert!(text.contains("exec-2"));
        assert!(text.contains("1 succeeded"));
        assert!(text.contains("Start"));
    }

    #[test]
    fn workflow_from_row_rejects_malformed_definition() {
        let row = db::models::HealingWorkflowRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            code: "wf".into(),
            name: "wf".into(),
            definition: json!({"not": "a workflow definition"}),
            timeout_seconds: 3600,
            max_retries: 0,
            allow_parallel: false,
            version: 1,
            is_active: true,
            execute_count: 0,
            success_count: 0,
            failure_count: 0,
            avg_duration_ms: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(Workflow::from_row(&row).is_err());
    }
}
