//! The `ticket_update` node (spec §4.7).
//!
//! Failure here never fails the workflow — it's logged and reported back
//! as `{updated:false, error}` on the node's own output.

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

pub struct TicketUpdateNode;

fn resolve_ticket_id(config: &Value, ctx: &ExecutionContext<'_>) -> Option<Value> {
    if let Some(var) = config.get("ticket_var").and_then(Value::as_str) {
        let ticket = resolver::extract(ctx.variables, var);
        let id = ticket.get("id").cloned().unwrap_or(ticket);
        if !id.is_null() {
            return Some(id);
        }
    }
    if let Some(literal) = config.get("ticket_id") {
        if let Some(s) = literal.as_str() {
            let resolved = resolver::resolve(s, ctx.variables);
            if !resolved.is_null() {
                return Some(resolved);
            }
        } else {
            return Some(literal.clone());
        }
    }
    None
}

#[async_trait]
impl ExecutableNode for TicketUpdateNode {
    async fn execute(&self, config: &Value, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        let Some(ticket_id) = resolve_ticket_id(config, ctx) else {
            tracing::warn!(node = %ctx.node_name, "ticket_update: could not resolve ticket reference");
            return Ok(NodeOutcome::simple(serde_json::json!({
                "updated": false,
                "error": "ticket reference could not be resolved",
            })));
        };

        let mut updates = config.get("updates").cloned().unwrap_or_else(|| serde_json::json!({}));

        let include_logs = updates
            .get("comment")
            .and_then(|c| c.get("include_logs"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if include_logs {
            if let Some(comment) = updates.get_mut("comment").and_then(Value::as_object_mut) {
                let template = comment.get("template").and_then(Value::as_str).unwrap_or("").to_string();
                let mut rendered = resolver::resolve_string(&template, ctx.variables);
                if let Some(log) = ctx.rendered_log {
                    rendered.push_str("\n\n");
                    rendered.push_str(log);
                }
                comment.insert("rendered".to_string(), Value::String(rendered));
            }
        }

        let updates = resolver::resolve_tree(&updates, ctx.variables);

        match ctx.collaborators.tickets.update(ctx.tenant_id, ticket_id, updates).await {
            Ok(()) => Ok(NodeOutcome::simple(serde_json::json!({"updated": true}))),
            Err(e) => {
                tracing::warn!(node = %ctx.node_name, error = %e, "ticket_update failed");
                Ok(NodeOutcome::simple(serde_json::json!({"updated": false, "error": e.message})))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTicketWriter, TestHarness};
    use crate::traits::Collaborators;
    use serde_json::json;
    use std::sync::Arc;

    fn harness_with_writer(fail: bool) -> (TestHarness, Arc<MockTicketWriter>) {
        let writer = Arc::new(MockTicketWriter { calls: Default::default(), fail });
        let collaborators = Collaborators {
            hosts: Arc::new(crate::mock::MockHostLookup::new()),
            tasks: Arc::new(crate::mock::MockTaskClient::succeeding()),
            tickets: writer.clone(),
            credentials: Arc::new(crate::mock::MockCredentialService),
        };
        (TestHarness::with_collaborators(collaborators), writer)
    }

    #[tokio::test]
    async fn updates_ticket_by_literal_id() {
        let (harness, writer) = harness_with_writer(false);
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"ticket_id": 42, "updates": {"status": "resolved"}});
        let out = TicketUpdateNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["updated"], true);
        assert_eq!(writer.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_does_not_fail_the_node() {
        let (harness, _writer) = harness_with_writer(true);
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"ticket_id": 42, "updates": {"status": "resolved"}});
        let out = TicketUpdateNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["updated"], false);
        assert!(out.output["error"].is_string());
    }

    #[tokio::test]
    async fn unresolvable_ticket_reports_updated_false() {
        let (harness, _writer) = harness_with_writer(false);
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let out = TicketUpdateNode.execute(&json!({"updates": {}}), &mut ctx).await.unwrap();
        assert_eq!(out.output["updated"], false);
    }
}
