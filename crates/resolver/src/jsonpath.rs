//! A small JSONPath-like extractor over `serde_json::Value`.
//!
//! Supported dialect (spec §4.5): `field`, `object.field`, `array[i]`,
//! `array[*]`, `array[*].field`. A missing key at any step of the walk
//! yields `Value::Null` rather than an error — callers (node executors,
//! the variable resolver) treat absence as an untyped null, never a
//! hard failure.

use serde_json::Value;

#[derive(Debug, Clone)]
enum Segment {
    Field(String),
    Index(usize),
    Wildcard,
}

/// Parse `path` into its dotted/bracketed segments.
///
/// `a.b[0].c` -> `[Field(a), Field(b), Index(0), Field(c)]`
/// `items[*].name` -> `[Field(items), Wildcard, Field(name)]`
fn parse_segments(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for dotted in path.split('.') {
        if dotted.is_empty() {
            continue;
        }
        let mut rest = dotted;
        // Pull off the leading field name (if any) before the first `[`.
        if let Some(bracket_pos) = rest.find('[') {
            let field = &rest[..bracket_pos];
            if !field.is_empty() {
                segments.push(Segment::Field(field.to_string()));
            }
            rest = &rest[bracket_pos..];

            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else { break };
                let inner = &stripped[..close];
                if inner == "*" {
                    segments.push(Segment::Wildcard);
                } else if let Ok(idx) = inner.parse::<usize>() {
                    segments.push(Segment::Index(idx));
                }
                rest = &stripped[close + 1..];
            }
        } else {
            segments.push(Segment::Field(rest.to_string()));
        }
    }

    segments
}

/// Extract the value at `path` from `root`.
///
/// `array[*]` and `array[*].field` flatten one level: the result is a
/// JSON array gathering each element (or each element's `field`).
/// Anything unresolved along the way — a missing field, an
/// out-of-bounds index, indexing into a non-array — resolves to `null`.
pub fn extract(root: &Value, path: &str) -> Value {
    let segments = parse_segments(path);
    walk(root, &segments)
}

fn walk(current: &Value, segments: &[Segment]) -> Value {
    let Some((head, tail)) = segments.split_first() else {
        return current.clone();
    };

    match head {
        Segment::Field(name) => match current.get(name) {
            Some(v) => walk(v, tail),
            None => Value::Null,
        },
        Segment::Index(idx) => match current.get(idx) {
            Some(v) => walk(v, tail),
            None => Value::Null,
        },
        Segment::Wildcard => match current.as_array() {
            Some(items) => {
                let flattened: Vec<Value> = items.iter().map(|item| walk(item, tail)).collect();
                Value::Array(flattened)
            }
            None => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_field() {
        let root = json!({"name": "host-1"});
        assert_eq!(extract(&root, "name"), json!("host-1"));
    }

    #[test]
    fn nested_field() {
        let root = json!({"custom_data": {"host": "10.0.0.5"}});
        assert_eq!(extract(&root, "custom_data.host"), json!("10.0.0.5"));
    }

    #[test]
    fn array_index() {
        let root = json!({"items": ["a", "b", "c"]});
        assert_eq!(extract(&root, "items[1]"), json!("b"));
    }

    #[test]
    fn array_wildcard_flattens() {
        let root = json!({"items": [1, 2, 3]});
        assert_eq!(extract(&root, "items[*]"), json!([1, 2, 3]));
    }

    #[test]
    fn array_wildcard_with_field() {
        let root = json!({"hosts": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(extract(&root, "hosts[*].name"), json!(["a", "b"]));
    }

    #[test]
    fn missing_key_is_null() {
        let root = json!({"a": 1});
        assert_eq!(extract(&root, "b"), Value::Null);
        assert_eq!(extract(&root, "a.b.c"), Value::Null);
    }

    #[test]
    fn out_of_bounds_index_is_null() {
        let root = json!({"items": [1, 2]});
        assert_eq!(extract(&root, "items[9]"), Value::Null);
    }
}
