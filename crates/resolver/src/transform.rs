//! The transform library callable from `data_process` nodes (spec §4.5).
//!
//! `len|count, join(sep), first, last, toString, default(value), format(template, ...),
//! contains, unique`. A transform spec is either a bare string — `"len"`,
//! `"join(, )"` — or a structured object `{function, input|args, default?, template?}`
//! for callers that already have the pieces apart instead of a parenthesised string.

use serde_json::Value;

use crate::error::ResolverError;

/// A parsed, ready-to-apply transform.
#[derive(Debug, Clone)]
pub struct Transform {
    pub function: String,
    pub args: Vec<String>,
    pub default: Option<Value>,
    pub template: Option<String>,
}

impl Transform {
    /// Parse a transform spec from either a bare string (`"join(,)"`) or a
    /// structured JSON object (`{function, args, default, template}`).
    pub fn parse(spec: &Value) -> Result<Self, ResolverError> {
        match spec {
            Value::String(s) => Ok(Self::parse_str(s)),
            Value::Object(map) => {
                let function = map
                    .get("function")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ResolverError::MalformedSpec("missing 'function'".into()))?
                    .to_string();

                let args = match map.get("args") {
                    Some(Value::Array(items)) => items.iter().map(value_to_arg).collect(),
                    Some(Value::String(s)) => vec![s.clone()],
                    _ => Vec::new(),
                };

                Ok(Self {
                    function,
                    args,
                    default: map.get("default").cloned(),
                    template: map.get("template").and_then(Value::as_str).map(str::to_string),
                })
            }
            other => Err(ResolverError::MalformedSpec(format!(
                "transform spec must be a string or object, got {other}"
            ))),
        }
    }

    fn parse_str(s: &str) -> Self {
        if let Some(open) = s.find('(') {
            if let Some(close) = s.rfind(')') {
                let function = s[..open].trim().to_string();
                let inner = &s[open + 1..close];
                let args: Vec<String> = if inner.trim().is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').map(|a| a.to_string()).collect()
                };
                let template = if function == "format" && !args.is_empty() {
                    Some(args[0].clone())
                } else {
                    None
                };
                return Self { function, args, default: None, template };
            }
        }
        Self { function: s.trim().to_string(), args: Vec::new(), default: None, template: None }
    }

    /// Apply this transform to `input`.
    pub fn apply(&self, input: &Value) -> Result<Value, ResolverError> {
        apply_named(&self.function, input, &self.args, self.default.as_ref(), self.template.as_deref())
    }
}

fn value_to_arg(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn apply_named(
    function: &str,
    input: &Value,
    args: &[String],
    default: Option<&Value>,
    template: Option<&str>,
) -> Result<Value, ResolverError> {
    match function {
        "len" | "count" => {
            let n = match input {
                Value::Array(a) => a.len(),
                Value::String(s) => s.chars().count(),
                Value::Object(o) => o.len(),
                Value::Null => 0,
                _ => {
                    return Err(ResolverError::TransformFailed {
                        name: function.into(),
                        message: "input is not a collection".into(),
                    })
                }
            };
            Ok(Value::from(n))
        }
        "join" => {
            let sep = args.first().map(String::as_str).unwrap_or(",");
            match input {
                Value::Array(items) => {
                    let joined = items.iter().map(stringify).collect::<Vec<_>>().join(sep);
                    Ok(Value::String(joined))
                }
                other => Ok(Value::String(stringify(other))),
            }
        }
        "first" => match input {
            Value::Array(items) => Ok(items.first().cloned().unwrap_or(Value::Null)),
            other => Ok(other.clone()),
        },
        "last" => match input {
            Value::Array(items) => Ok(items.last().cloned().unwrap_or(Value::Null)),
            other => Ok(other.clone()),
        },
        "toString" => Ok(Value::String(stringify(input))),
        "default" => match input {
            Value::Null => Ok(default
                .cloned()
                .or_else(|| args.first().map(|a| Value::String(a.clone())))
                .unwrap_or(Value::Null)),
            other => Ok(other.clone()),
        },
        "format" => {
            let tpl = template
                .or(args.first().map(String::as_str))
                .ok_or_else(|| ResolverError::MalformedSpec("format requires a template".into()))?;
            let mut out = tpl.replace("{value}", &stringify(input));
            for (i, arg) in args.iter().skip(1).enumerate() {
                out = out.replace(&format!("{{{i}}}"), arg);
            }
            Ok(Value::String(out))
        }
        "contains" => {
            let needle = args.first().cloned().unwrap_or_default();
            let found = match input {
                Value::Array(items) => items.iter().any(|v| stringify(v) == needle),
                other => stringify(other).contains(&needle),
            };
            Ok(Value::Bool(found))
        }
        "unique" => match input {
            Value::Array(items) => {
                let mut seen = Vec::new();
                let mut out = Vec::new();
                for item in items {
                    let key = stringify(item);
                    if !seen.contains(&key) {
                        seen.push(key);
                        out.push(item.clone());
                    }
                }
                Ok(Value::Array(out))
            }
            other => Ok(other.clone()),
        },
        other => Err(ResolverError::UnknownTransform(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(spec: Value, input: &Value) -> Value {
        Transform::parse(&spec).unwrap().apply(input).unwrap()
    }

    #[test]
    fn len_counts_array() {
        assert_eq!(apply(json!("len"), &json!([1, 2, 3])), json!(3));
    }

    #[test]
    fn join_with_separator() {
        assert_eq!(apply(json!("join(, )"), &json!(["a", "b"])), json!("a, b"));
    }

    #[test]
    fn first_and_last() {
        let items = json!(["x", "y", "z"]);
        assert_eq!(apply(json!("first"), &items), json!("x"));
        assert_eq!(apply(json!("last"), &items), json!("z"));
    }

    #[test]
    fn default_only_applies_to_null() {
        assert_eq!(apply(json!({"function":"default","default":"fallback"}), &Value::Null), json!("fallback"));
        assert_eq!(apply(json!({"function":"default","default":"fallback"}), &json!("present")), json!("present"));
    }

    #[test]
    fn format_substitutes_value_placeholder() {
        let spec = json!({"function":"format","template":"count={value}"});
        assert_eq!(apply(spec, &json!(5)), json!("count=5"));
    }

    #[test]
    fn contains_checks_array_membership() {
        assert_eq!(apply(json!({"function":"contains","args":["b"]}), &json!(["a","b"])), json!(true));
    }

    #[test]
    fn unique_dedups_preserving_order() {
        assert_eq!(apply(json!("unique"), &json!([1, 2, 1, 3, 2])), json!([1, 2, 3]));
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert!(matches!(
            Transform::parse(&json!("bogus")).unwrap().apply(&json!(1)),
            Err(ResolverError::UnknownTransform(name)) if name == "bogus"
        ));
    }
}
