//! A pure in-memory evaluator for [`Condition`] trees.
//!
//! The production path compiles a tree into SQL (`compile.rs`) so the
//! storage layer filters at the source; this evaluator exists for unit
//! tests and anywhere a condition tree needs checking against a single
//! already-loaded JSON document instead of a table.

use crate::condition::{Condition, LogicOp};
use crate::operator::Operator;

/// Evaluate `condition` against `item`, a JSON object whose known columns
/// (`priority`, `status`, `category`, `title`) sit at the top level and
/// everything else is reachable through `custom_data`.
pub fn evaluate(condition: &Condition, item: &serde_json::Value) -> bool {
    match condition {
        Condition::Leaf(leaf) => evaluate_leaf(leaf, item),
        Condition::Group { logic_op, items } => {
            if items.is_empty() {
                return true;
            }
            match logic_op {
                LogicOp::And => items.iter().all(|c| evaluate(c, item)),
                LogicOp::Or => items.iter().any(|c| evaluate(c, item)),
            }
        }
    }
}

fn resolve_field<'a>(item: &'a serde_json::Value, field: &str) -> Option<&'a serde_json::Value> {
    const KNOWN: &[&str] = &["priority", "status", "category", "title"];

    if KNOWN.contains(&field) {
        return item.get(field);
    }

    let path = field.strip_prefix("custom_data.").unwrap_or(field);
    let mut cursor = item.get("custom_data").unwrap_or(&serde_json::Value::Null);
    for part in path.split('.') {
        cursor = cursor.get(part)?;
    }
    Some(cursor)
}

fn as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn evaluate_leaf(leaf: &crate::condition::LeafPredicate, item: &serde_json::Value) -> bool {
    let field_value = match resolve_field(item, &leaf.field) {
        Some(v) => v,
        None => &serde_json::Value::Null,
    };

    match leaf.operator {
        Operator::Equals => as_text(field_value) == as_text(&leaf.value),
        Operator::NotEquals => as_text(field_value) != as_text(&leaf.value),
        Operator::Contains => as_text(field_value).contains(&as_text(&leaf.value)),
        Operator::NotContains => !as_text(field_value).contains(&as_text(&leaf.value)),
        Operator::StartsWith => as_text(field_value).starts_with(&as_text(&leaf.value)),
        Operator::EndsWith => as_text(field_value).ends_with(&as_text(&leaf.value)),
        Operator::GreaterThan => match (as_f64(field_value), as_f64(&leaf.value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        Operator::LessThan => match (as_f64(field_value), as_f64(&leaf.value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        Operator::In => match &leaf.value {
            serde_json::Value::Array(arr) => arr.iter().any(|v| as_text(v) == as_text(field_value)),
            other => as_text(other) == as_text(field_value),
        },
        Operator::NotIn => match &leaf.value {
            serde_json::Value::Array(arr) => !arr.iter().any(|v| as_text(v) == as_text(field_value)),
            other => as_text(other) != as_text(field_value),
        },
    }
}
