//! The variable resolver (spec §4.5, §9 "Variable resolution types").
//!
//! Two surfaces, deliberately kept separate per the design note: [`resolve`]
//! returns `any` (a whole-string single expression preserves the resolved
//! value's original JSON type) and [`resolve_string`] is the convenience
//! wrapper that always stringifies its result.

use serde_json::Value;

use crate::jsonpath;

/// A single `{{...}}` expression, split into its path and optional default.
struct Expr<'a> {
    path: &'a str,
    default: Option<&'a str>,
}

impl<'a> Expr<'a> {
    fn parse(raw: &'a str) -> Self {
        match raw.split_once("|default:") {
            Some((path, default)) => Expr { path: path.trim(), default: Some(default.trim()) },
            None => Expr { path: raw.trim(), default: None },
        }
    }
}

/// Find the next `{{...}}` occurrence in `s`, returning
/// `(prefix, expr_inner, suffix)`.
fn next_expr(s: &str) -> Option<(&str, &str, &str)> {
    let start = s.find("{{")?;
    let rel_end = s[start..].find("}}")?;
    let end = start + rel_end;
    Some((&s[..start], &s[start + 2..end], &s[end + 2..]))
}

/// Resolve every `{{path}}` / `{{path|default:literal}}` expression in
/// `template` against `variables`.
///
/// If `template` is *exactly* one expression with nothing else around it,
/// the resolved value's original type is preserved (a number stays a
/// number, an object stays an object). Otherwise every interpolation is
/// stringified and spliced into the surrounding text.
pub fn resolve(template: &str, variables: &Value) -> Value {
    let Some((prefix, inner, suffix)) = next_expr(template) else {
        return Value::String(template.to_string());
    };

    if prefix.is_empty() && suffix.is_empty() {
        return resolve_expr(inner, variables);
    }

    let mut out = String::from(prefix);
    out.push_str(&stringify(&resolve_expr(inner, variables)));
    out.push_str(&resolve_string(suffix, variables));
    Value::String(out)
}

/// Convenience wrapper over [`resolve`] that always returns a string.
pub fn resolve_string(template: &str, variables: &Value) -> String {
    stringify(&resolve(template, variables))
}

fn resolve_expr(raw: &str, variables: &Value) -> Value {
    let expr = Expr::parse(raw);
    let resolved = jsonpath::extract(variables, expr.path);
    if resolved.is_null() {
        if let Some(default) = expr.default {
            return Value::String(default.to_string());
        }
    }
    resolved
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Walk an arbitrary JSON tree (e.g. a node's `config` subtree) and
/// resolve every string leaf as a template. Non-string leaves pass
/// through unchanged.
pub fn resolve_tree(value: &Value, variables: &Value) -> Value {
    match value {
        Value::String(s) => resolve(s, variables),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_tree(v, variables)).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_tree(v, variables));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_string_expression_preserves_type() {
        let vars = json!({"count": 42});
        assert_eq!(resolve("{{count}}", &vars), json!(42));
    }

    #[test]
    fn mixed_string_stringifies() {
        let vars = json!({"name": "node-a"});
        assert_eq!(resolve("host={{name}}", &vars), json!("host=node-a"));
    }

    #[test]
    fn nested_path_resolves() {
        let vars = json!({"global_context": {"trigger": {"matched_item": {"custom_data": {"host": "10.0.0.5"}}}}});
        assert_eq!(
            resolve("{{global_context.trigger.matched_item.custom_data.host}}", &vars),
            json!("10.0.0.5")
        );
    }

    #[test]
    fn default_applies_when_missing() {
        let vars = json!({});
        assert_eq!(resolve("{{missing|default:fallback}}", &vars), json!("fallback"));
    }

    #[test]
    fn default_does_not_apply_when_present() {
        let vars = json!({"x": "present"});
        assert_eq!(resolve("{{x|default:fallback}}", &vars), json!("present"));
    }

    #[test]
    fn plain_text_with_no_expression_is_passthrough() {
        assert_eq!(resolve("plain text", &json!({})), json!("plain text"));
    }

    #[test]
    fn resolve_tree_walks_nested_config() {
        let vars = json!({"host": "10.0.0.5"});
        let config = json!({"hosts": ["{{host}}"], "nested": {"k": "{{host}}"}});
        assert_eq!(
            resolve_tree(&config, &vars),
            json!({"hosts": ["10.0.0.5"], "nested": {"k": "10.0.0.5"}})
        );
    }
}
