//! `match_engine` — the recursive boolean-tree predicate evaluator used by
//! the rule scheduler to select tenant-scoped inventory items.
//!
//! Only the `ticket` inventory source is supported in this core (spec §4.3).

pub mod condition;
pub mod compile;
pub mod error;
pub mod eval;
pub mod operator;

pub use condition::{infer_source, Condition, LogicOp, MatchConditionDto};
pub use compile::CompiledFilter;
pub use error::MatchError;
pub use eval::evaluate;
pub use operator::Operator;

/// Parse and compile a raw `match_condition` JSON document into a
/// [`CompiledFilter`], validating the inventory source along the way.
///
/// Only `source = "ticket"` is accepted; anything else is rejected even
/// if a tree could otherwise be compiled, since this core has no other
/// inventory kind to query.
pub fn compile(raw: &serde_json::Value) -> Result<CompiledFilter, MatchError> {
    let dto: MatchConditionDto = serde_json::from_value(raw.clone())
        .map_err(|e| MatchError::Malformed(e.to_string()))?;

    let source = infer_source(&dto)?;
    if source != "ticket" {
        return Err(MatchError::UnsupportedSource(source));
    }

    let condition = Condition::parse(&dto)?;
    Ok(CompiledFilter::from_condition(condition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> Condition {
        let dto: MatchConditionDto = serde_json::from_value(raw).unwrap();
        Condition::parse(&dto).unwrap()
    }

    #[test]
    fn leaf_condition_parses_and_evaluates() {
        let raw = json!({"field": "priority", "operator": "equals", "value": "P1", "source": "ticket"});
        let condition = parse(raw);
        assert!(evaluate(&condition, &json!({"priority": "P1"})));
        assert!(!evaluate(&condition, &json!({"priority": "P2"})));
    }

    #[test]
    fn composite_or_combines_leaf_and_children() {
        let raw = json!({
            "field": "priority", "operator": "equals", "value": "P1", "source": "ticket",
            "logic_op": "or",
            "conditions": [
                {"field": "status", "operator": "equals", "value": "open"}
            ]
        });
        let condition = parse(raw);
        assert!(evaluate(&condition, &json!({"priority": "P1", "status": "closed"})));
        assert!(evaluate(&condition, &json!({"priority": "P2", "status": "open"})));
        assert!(!evaluate(&condition, &json!({"priority": "P2", "status": "closed"})));
    }

    #[test]
    fn composite_and_is_the_default_logic_op() {
        let raw = json!({
            "field": "priority", "operator": "equals", "value": "P1", "source": "ticket",
            "conditions": [
                {"field": "status", "operator": "equals", "value": "open"}
            ]
        });
        let condition = parse(raw);
        assert!(evaluate(&condition, &json!({"priority": "P1", "status": "open"})));
        assert!(!evaluate(&condition, &json!({"priority": "P1", "status": "closed"})));
    }

    #[test]
    fn missing_source_is_refused() {
        let raw = json!({"field": "priority", "operator": "equals", "value": "P1"});
        assert!(matches!(compile(&raw), Err(MatchError::SourceNotInferable)));
    }

    #[test]
    fn unsupported_source_is_rejected_even_when_compilable() {
        let raw = json!({"field": "cpu", "operator": "greater_than", "value": 90, "source": "host"});
        assert!(matches!(compile(&raw), Err(MatchError::UnsupportedSource(s)) if s == "host"));
    }

    #[test]
    fn dotted_custom_data_field_resolves() {
        let raw = json!({"field": "custom_data.host", "operator": "equals", "value": "10.0.0.5", "source": "ticket"});
        let condition = parse(raw);
        let item = json!({"custom_data": {"host": "10.0.0.5"}});
        assert!(evaluate(&condition, &item));
    }

    #[test]
    fn in_operator_checks_array_membership() {
        let raw = json!({"field": "priority", "operator": "in", "value": ["P1", "P2"], "source": "ticket"});
        let condition = parse(raw);
        assert!(evaluate(&condition, &json!({"priority": "P2"})));
        assert!(!evaluate(&condition, &json!({"priority": "P3"})));
    }

    #[test]
    fn incomplete_leaf_without_field_or_operator_is_rejected() {
        let raw = json!({"field": "priority", "source": "ticket"});
        let dto: MatchConditionDto = serde_json::from_value(raw).unwrap();
        assert!(matches!(Condition::parse(&dto), Err(MatchError::IncompleteLeaf)));
    }
}
