//! `start` / `end` nodes — both no-ops (spec §4.7).

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

pub struct StartNode;
pub struct EndNode;

#[async_trait]
impl ExecutableNode for StartNode {
    async fn execute(&self, _config: &Value, _ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::simple(json!({"message": "workflow started", "time": Utc::now()})))
    }
}

#[async_trait]
impl ExecutableNode for EndNode {
    async fn execute(&self, _config: &Value, _ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::simple(json!({"message": "workflow ended", "time": Utc::now()})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::TestHarness;

    #[tokio::test]
    async fn start_and_end_are_no_ops() {
        let harness = TestHarness::new();
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let out = StartNode.execute(&json!({}), &mut ctx).await.unwrap();
        assert_eq!(out.output["message"], "workflow started");

        let out = EndNode.execute(&json!({}), &mut ctx).await.unwrap();
        assert_eq!(out.output["message"], "workflow ended");
    }
}
