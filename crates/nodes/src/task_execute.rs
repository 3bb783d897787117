//! The `task_execute` node — dispatches a task to remote hosts and polls it
//! to completion (spec §4.7, the most intricate node kind).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::traits::{CreateTaskRequest, ExecutableNode, ExecutionContext, HostRef, NodeOutcome, TaskStatusView};
use crate::NodeError;

pub struct TaskExecuteNode;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

fn resolve_hosts(config: &Value, variables: &Value) -> Vec<String> {
    let raw = match config.get("hosts") {
        Some(Value::String(s)) => resolver::resolve(s, variables),
        Some(Value::Array(items)) => {
            let resolved: Vec<Value> = items
                .iter()
                .map(|item| match item.as_str() {
                    Some(s) => resolver::resolve(s, variables),
                    None => item.clone(),
                })
                .collect();
            Value::Array(resolved)
        }
        _ => Value::Null,
    };

    match raw {
        Value::String(s) => s.split(',').map(|h| h.trim().to_string()).filter(|h| !h.is_empty()).collect(),
        Value::Array(items) => items
            .into_iter()
            .flat_map(|v| match v {
                Value::String(s) => vec![s],
                other => vec![other.to_string()],
            })
            .collect(),
        _ => Vec::new(),
    }
}

async fn resolve_host_refs(
    ctx: &ExecutionContext<'_>,
    identifiers: &[String],
    match_by: &str,
) -> Result<(Vec<HostRef>, Vec<String>), NodeError> {
    let mut found = Vec::new();
    let mut not_found = Vec::new();

    for identifier in identifiers {
        let lookup = if match_by == "hostname" {
            ctx.collaborators.hosts.find_by_hostname(ctx.tenant_id, identifier).await?
        } else {
            ctx.collaborators.hosts.find_by_ip(ctx.tenant_id, identifier).await?
        };
        match lookup {
            Some(host) => found.push(host),
            None => not_found.push(identifier.clone()),
        }
    }

    Ok((found, not_found))
}

fn task_name(node_name: &str, variables: &Value) -> String {
    let ticket = resolver::extract(variables, "global_context.trigger.ticket");
    match ticket.get("title").and_then(Value::as_str) {
        Some(title) => format!("self-healing workflow task - {node_name} {title}"),
        None => format!("self-healing workflow task - {node_name}"),
    }
}

#[async_trait]
impl ExecutableNode for TaskExecuteNode {
    async fn execute(&self, config: &Value, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        let template_id = config
            .get("template_id")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse::<i64>().ok())))
            .ok_or_else(|| NodeError::new("task_execute: missing or unparseable template_id"))?;

        let match_by = config.get("host_match_by").and_then(Value::as_str).unwrap_or("ip");
        let timeout_secs = config
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let output_var = config.get("output").and_then(Value::as_str).unwrap_or("task_result");

        let requested = resolve_hosts(config, ctx.variables);

        let resolve_start = Instant::now();
        let (found, not_found) = resolve_host_refs(ctx, &requested, match_by).await?;
        tracing::info!(
            node = %ctx.node_name,
            requested = requested.len(),
            found = found.len(),
            not_found = not_found.len(),
            duration_ms = resolve_start.elapsed().as_millis() as u64,
            "task_execute: host resolution complete"
        );

        if found.is_empty() {
            return Err(NodeError::with_detail(
                "no hosts resolved for task_execute",
                json!({"requested": requested, "found": [], "not_found": not_found}),
            ));
        }

        let variables = config
            .get("variables")
            .map(|v| resolver::resolve_tree(v, ctx.variables))
            .unwrap_or_else(|| json!({}));

        let host_ids: Vec<Value> = found.iter().map(|h| Value::String(h.id.to_string())).collect();
        let params = json!({
            "hosts": host_ids,
            "variables": variables,
            "timeout": timeout_secs,
            "template_id": template_id,
        });

        let name = task_name(ctx.node_name, ctx.variables);

        let create_start = Instant::now();
        let task_id = ctx
            .collaborators
            .tasks
            .create_and_enqueue(CreateTaskRequest {
                tenant_id: ctx.tenant_id,
                task_type: "template".to_string(),
                name,
                params,
                priority: 5,
                source: "workflow".to_string(),
                timeout_seconds: timeout_secs as i32,
            })
            .await?;
        tracing::info!(
            node = %ctx.node_name,
            task_id = %task_id,
            duration_ms = create_start.elapsed().as_millis() as u64,
            "task_execute: task created and enqueued"
        );

        let poll_start = Instant::now();
        let deadline = Duration::from_secs(timeout_secs);
        let status = loop {
            if ctx.cancel.is_cancelled() {
                let _ = ctx.collaborators.tasks.cancel(&task_id).await;
                return Err(NodeError::with_detail("cancelled", json!({"task_id": task_id})));
            }

            let status = ctx.collaborators.tasks.get_status(&task_id).await?;
            if status.is_terminal() {
                break status;
            }

            if poll_start.elapsed() >= deadline {
                return Err(NodeError::with_detail(
                    "task_execute: timed out waiting for task completion",
                    json!({"task_id": task_id}),
                ));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        };

        tracing::info!(
            node = %ctx.node_name,
            task_id = %task_id,
            status = %status.status,
            duration_ms = poll_start.elapsed().as_millis() as u64,
            "task_execute: task reached terminal status"
        );

        let summary = normalize_result(&status, not_found.len());

        let mut output = json!({
            "task_id": task_id,
            "status": status.status,
            "hosts_found": found.len(),
            "hosts_requested": requested.len(),
        });
        if !not_found.is_empty() {
            output["hosts_not_found"] = json!(not_found);
            output["warning"] = json!(format!("{} of {} requested hosts were not found", not_found.len(), requested.len()));
        }
        output["execution_details"] = summary.clone();

        if let Some(obj) = ctx.variables.as_object_mut() {
            obj.insert(output_var.to_string(), output.clone());
        }

        Ok(NodeOutcome::simple(output))
    }
}

fn normalize_result(status: &TaskStatusView, not_found_count: usize) -> Value {
    let (success, failed, total) = status
        .result
        .as_ref()
        .map(|r| {
            let success = r.get("success").and_then(Value::as_i64).unwrap_or(0);
            let failed = r.get("failed").and_then(Value::as_i64).unwrap_or(0);
            let total = r.get("total").and_then(Value::as_i64).unwrap_or(success + failed);
            (success, failed, total)
        })
        .unwrap_or((0, 0, 0));

    json!({
        "success": success,
        "failed": failed + not_found_count as i64,
        "total": total + not_found_count as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockHostLookup, MockTaskClient, TestHarness};
    use crate::traits::Collaborators;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn harness_with_host(ip: &str) -> TestHarness {
        let host_id = Uuid::new_v4();
        let collaborators = Collaborators {
            hosts: Arc::new(MockHostLookup::new().with_ip(ip, host_id)),
            tasks: Arc::new(MockTaskClient::succeeding()),
            tickets: Arc::new(crate::mock::MockTicketWriter::new()),
            credentials: Arc::new(crate::mock::MockCredentialService),
        };
        TestHarness::with_collaborators(collaborators)
    }

    #[tokio::test]
    async fn dispatches_and_normalizes_result() {
        let harness = harness_with_host("10.0.0.5");
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({
            "template_id": 7,
            "hosts": ["10.0.0.5"],
            "host_match_by": "ip",
            "timeout": 5,
        });
        let out = TaskExecuteNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["status"], "success");
        assert_eq!(out.output["hosts_found"], 1);
        assert_eq!(ctx.variables["task_result"]["status"], "success");
    }

    #[tokio::test]
    async fn zero_hosts_found_fails_the_node() {
        let harness = harness_with_host("10.0.0.5");
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({
            "template_id": 7,
            "hosts": ["10.0.0.99"],
            "host_match_by": "ip",
        });
        let err = TaskExecuteNode.execute(&config, &mut ctx).await.unwrap_err();
        assert!(err.message.contains("no hosts resolved"));
    }

    #[tokio::test]
    async fn missing_template_id_fails() {
        let harness = harness_with_host("10.0.0.5");
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let err = TaskExecuteNode
            .execute(&json!({"hosts": ["10.0.0.5"]}), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.message.contains("template_id"));
    }
}
