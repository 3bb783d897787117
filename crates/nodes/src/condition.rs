//! The `condition` node — branches on `config.expression` (spec §4.7).
//!
//! The expression grammar is a small curated set of predicates, not a
//! general scripting language: a single comparison or presence check
//! against resolved `{{...}}` variables.
//!
//! Grammar (whitespace-separated):
//!   `<lhs> == <rhs>` | `!=` | `>` | `<` | `>=` | `<=`
//!   `exists <lhs>`
//!   `<lhs>` (bare — truthy check)
//!
//! `<lhs>`/`<rhs>` are `{{path}}` expressions or literals (numbers,
//! `true`/`false`, or bare strings).

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

pub struct ConditionNode;

const COMPARISON_OPS: &[&str] = &["==", "!=", ">=", "<=", ">", "<"];

fn resolve_operand(raw: &str, variables: &Value) -> Value {
    let raw = raw.trim();
    if raw.contains("{{") {
        return resolver::resolve(raw, variables);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Value::from(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        other => Value::String(other.to_string()),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluate a condition node's expression against resolved variables.
///
/// Exposed so the workflow executor (which owns the DAG and therefore the
/// node's declared `next_nodes`) can resolve `[true_branch, false_branch]`
/// itself — this node reports the boolean, not a node id, since it has no
/// access to the workflow definition.
pub fn evaluate(expression: &str, variables: &Value) -> Result<bool, NodeError> {
    let expression = expression.trim();

    if let Some(rest) = expression.strip_prefix("exists ") {
        return Ok(!resolve_operand(rest, variables).is_null());
    }

    for op in COMPARISON_OPS {
        if let Some(pos) = expression.find(op) {
            let lhs = resolve_operand(&expression[..pos], variables);
            let rhs = resolve_operand(&expression[pos + op.len()..], variables);
            return Ok(match *op {
                "==" => lhs == rhs,
                "!=" => lhs != rhs,
                ">" => as_f64(&lhs).zip(as_f64(&rhs)).map(|(a, b)| a > b).ok_or_else(|| {
                    NodeError::new("unsupported expression")
                })?,
                "<" => as_f64(&lhs).zip(as_f64(&rhs)).map(|(a, b)| a < b).ok_or_else(|| {
                    NodeError::new("unsupported expression")
                })?,
                ">=" => as_f64(&lhs).zip(as_f64(&rhs)).map(|(a, b)| a >= b).ok_or_else(|| {
                    NodeError::new("unsupported expression")
                })?,
                "<=" => as_f64(&lhs).zip(as_f64(&rhs)).map(|(a, b)| a <= b).ok_or_else(|| {
                    NodeError::new("unsupported expression")
                })?,
                _ => unreachable!(),
            });
        }
    }

    if expression.is_empty() {
        return Err(NodeError::new("unsupported expression"));
    }

    Ok(is_truthy(&resolve_operand(expression, variables)))
}

#[async_trait]
impl ExecutableNode for ConditionNode {
    async fn execute(&self, config: &Value, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError> {
        let expression = config
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::new("unsupported expression"))?;

        let result = evaluate(expression, ctx.variables)?;
        let branch = if result { "true_branch" } else { "false_branch" };

        Ok(NodeOutcome::simple(serde_json::json!({"result": result, "branch": branch})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::TestHarness;
    use serde_json::json;

    #[tokio::test]
    async fn true_branch_on_equality() {
        let harness = TestHarness::new();
        let mut vars = json!({"status": "open"});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"expression": "{{status}} == open"});
        let out = ConditionNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["result"], true);
        assert!(out.next_nodes.is_none());
    }

    #[tokio::test]
    async fn false_branch_on_mismatch() {
        let harness = TestHarness::new();
        let mut vars = json!({"count": 1});
        let mut ctx = harness.ctx(&mut vars);
        let config = json!({"expression": "{{count}} > 5"});
        let out = ConditionNode.execute(&config, &mut ctx).await.unwrap();
        assert_eq!(out.output["result"], false);
        assert!(out.next_nodes.is_none());
    }

    #[tokio::test]
    async fn exists_checks_presence() {
        let harness = TestHarness::new();
        let mut vars = json!({"a": 1});
        let mut ctx = harness.ctx(&mut vars);
        let out = ConditionNode
            .execute(&json!({"expression": "exists {{missing}}"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out.output["result"], false);
    }

    #[tokio::test]
    async fn missing_expression_is_unsupported() {
        let harness = TestHarness::new();
        let mut vars = json!({});
        let mut ctx = harness.ctx(&mut vars);
        let err = ConditionNode.execute(&json!({}), &mut ctx).await.unwrap_err();
        assert_eq!(err.message, "unsupported expression");
    }
}
