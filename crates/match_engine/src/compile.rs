//! Compiles a parsed [`Condition`] tree into a Postgres `WHERE` fragment.
//!
//! Compiled once per rule fire and pushed into a `QueryBuilder` alongside
//! the mandatory `tenant_id` filter — see `db::repository::inventory::find_tickets`.

use sqlx::{Postgres, QueryBuilder};

use crate::condition::{Condition, LogicOp};
use crate::error::MatchError;
use crate::operator::Operator;

/// Columns that exist directly on the `tickets` table. Anything else is
/// resolved as a dotted path into the `custom_data` JSONB column.
const KNOWN_COLUMNS: &[&str] = &["priority", "status", "category", "title"];

/// A condition tree that has been source-checked and is ready to compile.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    condition: Condition,
}

impl CompiledFilter {
    pub fn from_condition(condition: Condition) -> Self {
        Self { condition }
    }

    /// Push this filter's SQL fragment (without the enclosing `tenant_id`
    /// clause) into `qb`, binding every leaf value in tree order.
    pub fn push_into<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        push_condition(&self.condition, qb);
    }
}

fn push_condition<'a>(condition: &'a Condition, qb: &mut QueryBuilder<'a, Postgres>) {
    match condition {
        Condition::Leaf(leaf) => push_leaf(leaf, qb),
        Condition::Group { logic_op, items } => {
            if items.is_empty() {
                qb.push("TRUE");
                return;
            }
            let joiner = match logic_op {
                LogicOp::And => " AND ",
                LogicOp::Or => " OR ",
            };
            qb.push("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    qb.push(joiner);
                }
                qb.push("(");
                push_condition(item, qb);
                qb.push(")");
            }
            qb.push(")");
        }
    }
}

/// Either a direct column reference or a JSONB path into `custom_data`,
/// the latter bound as a `text[]` parameter rather than interpolated —
/// path segments come from tenant-authored rule JSON and must never be
/// spliced into the query text (spec §4.3 "dotted access").
enum FieldExpr<'a> {
    Column(&'a str),
    CustomDataPath(Vec<&'a str>),
}

fn field_expr(field: &str) -> FieldExpr<'_> {
    if KNOWN_COLUMNS.contains(&field) {
        return FieldExpr::Column(field);
    }
    let path = field.strip_prefix("custom_data.").unwrap_or(field);
    FieldExpr::CustomDataPath(path.split('.').collect())
}

fn push_field<'a>(expr: FieldExpr<'a>, qb: &mut QueryBuilder<'a, Postgres>) {
    match expr {
        FieldExpr::Column(col) => {
            qb.push(col);
        }
        FieldExpr::CustomDataPath(parts) => {
            qb.push("(custom_data #>> ")
                .push_bind(parts.into_iter().map(str::to_string).collect::<Vec<_>>())
                .push("::text[])");
        }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_as_f64(value: &serde_json::Value) -> Result<f64, MatchError> {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| MatchError::Malformed(format!("'{n}' is not a finite number"))),
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| MatchError::Malformed(format!("'{s}' is not numeric"))),
        other => Err(MatchError::Malformed(format!("{other} is not numeric"))),
    }
}

fn push_leaf<'a>(leaf: &'a crate::condition::LeafPredicate, qb: &mut QueryBuilder<'a, Postgres>) {
    match leaf.operator {
        Operator::Equals => {
            push_field(field_expr(&leaf.field), qb);
            qb.push(" = ").push_bind(value_as_text(&leaf.value));
        }
        Operator::NotEquals => {
            push_field(field_expr(&leaf.field), qb);
            qb.push(" != ").push_bind(value_as_text(&leaf.value));
        }
        Operator::Contains => {
            push_field(field_expr(&leaf.field), qb);
            qb.push(" LIKE ").push_bind(format!("%{}%", escape_like(&value_as_text(&leaf.value))));
        }
        Operator::NotContains => {
            push_field(field_expr(&leaf.field), qb);
            qb.push(" NOT LIKE ").push_bind(format!("%{}%", escape_like(&value_as_text(&leaf.value))));
        }
        Operator::StartsWith => {
            push_field(field_expr(&leaf.field), qb);
            qb.push(" LIKE ").push_bind(format!("{}%", escape_like(&value_as_text(&leaf.value))));
        }
        Operator::EndsWith => {
            push_field(field_expr(&leaf.field), qb);
            qb.push(" LIKE ").push_bind(format!("%{}", escape_like(&value_as_text(&leaf.value))));
        }
        Operator::GreaterThan => {
            let v = value_as_f64(&leaf.value).unwrap_or(f64::NAN);
            qb.push("(");
            push_field(field_expr(&leaf.field), qb);
            qb.push(")::numeric > ").push_bind(v);
        }
        Operator::LessThan => {
            let v = value_as_f64(&leaf.value).unwrap_or(f64::NAN);
            qb.push("(");
            push_field(field_expr(&leaf.field), qb);
            qb.push(")::numeric < ").push_bind(v);
        }
        Operator::In | Operator::NotIn => {
            let items: Vec<String> = match &leaf.value {
                serde_json::Value::Array(arr) => arr.iter().map(value_as_text).collect(),
                other => vec![value_as_text(other)],
            };
            let not = matches!(leaf.operator, Operator::NotIn);
            push_field(field_expr(&leaf.field), qb);
            qb.push(if not { " NOT IN (" } else { " IN (" });
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push_bind(item.clone());
            }
            if items.is_empty() {
                // An empty set makes IN vacuously false and NOT IN vacuously true.
                qb.push_bind(String::new());
            }
            qb.push(")");
        }
    }
}
