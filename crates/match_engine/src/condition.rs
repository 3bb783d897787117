//! The recursive match-condition tree — both its wire shape (as authored
//! by a rule editor) and its parsed, compile-ready form.

use serde::{Deserialize, Serialize};

use crate::error::MatchError;
use crate::operator::Operator;

/// `{and, or}` — default `and` when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    And,
    Or,
}

impl Default for LogicOp {
    fn default() -> Self {
        Self::And
    }
}

/// The wire shape stored as JSON on `healing_rules.match_condition`.
///
/// A node with `field` and `operator` set and no `conditions` is a leaf.
/// A node with `conditions` is a composite that combines its own leaf (if
/// `field`/`operator` are also present) with its children under `logic_op`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchConditionDto {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Option<serde_json::Value>,
    pub source: Option<String>,
    #[serde(default)]
    pub logic_op: LogicOp,
    pub conditions: Option<Vec<MatchConditionDto>>,
}

/// A leaf predicate ready for compilation: `field <op> value`.
#[derive(Debug, Clone)]
pub struct LeafPredicate {
    pub field: String,
    pub operator: Operator,
    pub value: serde_json::Value,
}

/// The parsed, compile-ready condition tree.
#[derive(Debug, Clone)]
pub enum Condition {
    Leaf(LeafPredicate),
    Group {
        logic_op: LogicOp,
        items: Vec<Condition>,
    },
}

impl Condition {
    /// Parse a [`MatchConditionDto`] into a [`Condition`], recursively.
    ///
    /// A node is a leaf if it has no nested `conditions`; otherwise it is
    /// a group whose items are its own leaf (if `field`/`operator` present)
    /// followed by each child, parsed the same way.
    pub fn parse(dto: &MatchConditionDto) -> Result<Condition, MatchError> {
        let own_leaf = Self::try_leaf(dto)?;

        match &dto.conditions {
            None => own_leaf
                .map(Condition::Leaf)
                .ok_or(MatchError::IncompleteLeaf),
            Some(children) if children.is_empty() => own_leaf
                .map(Condition::Leaf)
                .ok_or(MatchError::IncompleteLeaf),
            Some(children) => {
                let mut items = Vec::with_capacity(children.len() + 1);
                if let Some(leaf) = own_leaf {
                    items.push(Condition::Leaf(leaf));
                }
                for child in children {
                    items.push(Condition::parse(child)?);
                }
                Ok(Condition::Group {
                    logic_op: dto.logic_op,
                    items,
                })
            }
        }
    }

    fn try_leaf(dto: &MatchConditionDto) -> Result<Option<LeafPredicate>, MatchError> {
        match (&dto.field, &dto.operator) {
            (Some(field), Some(operator)) => Ok(Some(LeafPredicate {
                field: field.clone(),
                operator: Operator::parse(operator)?,
                value: dto.value.clone().unwrap_or(serde_json::Value::Null),
            })),
            (None, None) => Ok(None),
            _ => Err(MatchError::IncompleteLeaf),
        }
    }
}

/// Resolve the inventory source a tree applies to.
///
/// If the root declares `source`, that wins. Otherwise the first
/// non-empty `source` found by depth-first search into `conditions` is
/// used. An error is returned if none is found anywhere.
pub fn infer_source(dto: &MatchConditionDto) -> Result<String, MatchError> {
    fn search(dto: &MatchConditionDto) -> Option<String> {
        if let Some(s) = &dto.source {
            if !s.is_empty() {
                return Some(s.clone());
            }
        }
        if let Some(children) = &dto.conditions {
            for child in children {
                if let Some(found) = search(child) {
                    return Some(found);
                }
            }
        }
        None
    }

    search(dto).ok_or(MatchError::SourceNotInferable)
}
