//! The `data_process` node — `extract` then `transform` (spec §4.7, §4.5).

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

pub struct DataProcessNode;

#[async_trait]
impl ExecutableNode for DataProcessNode {
    async fn execute(&self, config: &Value, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        let mut extracted = Map::new();
        let mut transformed = Map::new();

        if let Some(extract) = config.get("extract").and_then(Value::as_object) {
            for (target_var, path) in extract {
                let path = path.as_str().ok_or_else(|| {
                    NodeError::new(format!("extract path for '{target_var}' must be a string"))
                })?;
                let value = resolver::extract(ctx.variables, path);
                set_variable(ctx.variables, target_var, value.clone());
                extracted.insert(target_var.clone(), value);
            }
        }

        if let Some(transform) = config.get("transform").and_then(Value::as_object) {
            for (var, spec) in transform {
                let input = resolver::extract(ctx.variables, var);
                let transform = resolver::Transform::parse(spec)
                    .map_err(|e| NodeError::new(format!("transform '{var}': {e}")))?;
                let output = transform
                    .apply(&input)
                    .map_err(|e| NodeError::new(format!("transform '{var}': {e}")))?;
                set_variable(ctx.variables, var, output.clone());
                transformed.insert(var.clone(), output);
            }
        }

        Ok(NodeOutcome::simple(serde_json::json!({
            "extracted": Value::Object(extracted),
            "transformed": Value::Object(transformed),
        })))
    }
}

/// Bind `value` into the root variables object under `name`, replacing any
/// existing top-level entry. `data_process` only ever targets top-level
/// variable slots — nested assignment is not part of the spec's dialect.
fn set_variable(variables: &mut Value, name: &str, value: Value) {
    if let Some(obj) = variables.as_object_mut() {
        obj.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::TestHarness;
    use serde_json::json;

    #[tokio::test]
    async fn extract_binds_values() {
        let harness = TestHarness::new();
        let mut vars = json!({"ticket": {"title": "disk full"}});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"extract": {"title": "ticket.title"}});
        let out = DataProcessNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["extracted"]["title"], "disk full");
        assert_eq!(ctx.variables["title"], "disk full");
    }

    #[tokio::test]
    async fn transform_applies_named_function() {
        let harness = TestHarness::new();
        let mut vars = json!({"hosts": ["a", "b", "a"]});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"transform": {"hosts": "unique"}});
        let out = DataProcessNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["transformed"]["hosts"], json!(["a", "b"]));
        assert_eq!(ctx.variables["hosts"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn extract_then_transform_in_order() {
        let harness = TestHarness::new();
        let mut vars = json!({"items": [1, 2, 3]});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({
            "extract": {"count_source": "items"},
            "transform": {"count_source": "len"}
        });
        let out = DataProcessNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["transformed"]["count_source"], json!(3));
    }
}
