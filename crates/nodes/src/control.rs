//! The `control` node — `wait` / `terminate` (spec §4.7).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

pub struct ControlNode;

#[async_trait]
impl ExecutableNode for ControlNode {
    async fn execute(&self, config: &Value, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        let action = config.get("action").and_then(Value::as_str).unwrap_or_default();

        match action {
            "wait" => {
                let duration = config.get("duration").and_then(Value::as_u64).unwrap_or(10);
                let step = Duration::from_millis(200);
                let mut waited = Duration::ZERO;
                let total = Duration::from_secs(duration);
                while waited < total {
                    if ctx.cancel.is_cancelled() {
                        return Err(NodeError::new("cancelled"));
                    }
                    let remaining = total - waited;
                    tokio::time::sleep(remaining.min(step)).await;
                    waited += step.min(remaining);
                }
                Ok(NodeOutcome::simple(serde_json::json!({"action": "wait", "duration": duration})))
            }
            "terminate" => {
                let reason = config.get("reason").and_then(Value::as_str).unwrap_or("terminated");
                Ok(NodeOutcome::branching(
                    serde_json::json!({"action": "terminate", "reason": reason}),
                    Vec::new(),
                ))
            }
            other => Err(NodeError::new(format!("unknown control action '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::TestHarness;
    use serde_json::json;

    #[tokio::test]
    async fn wait_sleeps_for_duration() {
        let harness = TestHarness::new();
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"action": "wait", "duration": 0});
        let out = ControlNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["action"], "wait");
    }

    #[tokio::test]
    async fn terminate_returns_empty_next_nodes() {
        let harness = TestHarness::new();
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"action": "terminate", "reason": "manual stop"});
        let out = ControlNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.next_nodes, Some(Vec::new()));
    }

    #[tokio::test]
    async fn unknown_action_fails() {
        let harness = TestHarness::new();
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let err = ControlNode.execute(&json!({"action": "bogus"}), &mut ctx).await.unwrap_err();
        assert!(err.message.contains("bogus"));
    }
}
