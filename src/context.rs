//! Render context flattening.
//!
//! Templates address values with dotted paths such as
//! `investor.primary_owner.full_name`. Callers hand over an arbitrarily
//! nested JSON object; flattening turns it into a single-level map keyed by
//! those dotted paths so token lookup is one hash probe.

use std::collections::HashMap;

use serde_json::Value;

/// Flatten a nested context into a map from dot-joined path to leaf value.
///
/// Every non-object value is a leaf, arrays included. Key order within an
/// object does not matter; nesting depth is unbounded. A non-object root
/// yields an empty map.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use longan::context::flatten_context;
///
/// let flat = flatten_context(&json!({
///     "investor": { "primary_owner": { "full_name": "Ada Lovelace" } },
///     "commitment": 250000,
/// }));
/// assert_eq!(flat["investor.primary_owner.full_name"], json!("Ada Lovelace"));
/// assert_eq!(flat["commitment"], json!(250000));
/// ```
pub fn flatten_context(context: &Value) -> HashMap<String, Value> {
    let mut flat = HashMap::new();
    if let Value::Object(map) = context {
        for (key, value) in map {
            flatten_into(key.clone(), value, &mut flat);
        }
    }
    flat
}

fn flatten_into(path: String, value: &Value, flat: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(format!("{path}.{key}"), child, flat);
            }
        }
        leaf => {
            flat.insert(path, leaf.clone());
        }
    }
}

/// Render a leaf value the way it appears in document text.
///
/// Strings pass through, numbers and booleans use their JSON notation and
/// anything else renders as the empty string.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_flatten_mixed_depths() {
        let flat = flatten_context(&json!({
            "fund": { "name": "Evergreen I", "manager": { "email": "gp@example.com" } },
            "signed": true,
        }));
        assert_eq!(flat.len(), 3);
        assert_eq!(flat["fund.name"], json!("Evergreen I"));
        assert_eq!(flat["fund.manager.email"], json!("gp@example.com"));
        assert_eq!(flat["signed"], json!(true));
    }

    #[test]
    fn test_arrays_and_null_are_leaves() {
        let flat = flatten_context(&json!({
            "tags": ["a", "b"],
            "middle_name": null,
        }));
        assert_eq!(flat["tags"], json!(["a", "b"]));
        assert_eq!(flat["middle_name"], Value::Null);
    }

    #[test]
    fn test_non_object_root_flattens_to_nothing() {
        assert!(flatten_context(&json!("just a string")).is_empty());
        assert!(flatten_context(&json!(null)).is_empty());
        assert!(flatten_context(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_empty_objects_contribute_no_keys() {
        let flat = flatten_context(&json!({ "a": {}, "b": { "c": 1 } }));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["b.c"], json!(1));
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(scalar_to_string(&json!("text")), "text");
        assert_eq!(scalar_to_string(&json!(42)), "42");
        assert_eq!(scalar_to_string(&json!(2.5)), "2.5");
        assert_eq!(scalar_to_string(&json!(false)), "false");
        assert_eq!(scalar_to_string(&Value::Null), "");
        assert_eq!(scalar_to_string(&json!([1])), "");
    }

    proptest! {
        #[test]
        fn prop_single_chain_flattens_to_joined_key(
            segments in proptest::collection::vec("[a-z][a-z0-9_]{0,7}", 1..5),
            leaf in "[ -~]{0,16}",
        ) {
            let mut value = Value::String(leaf.clone());
            for segment in segments.iter().rev() {
                let mut map = serde_json::Map::new();
                map.insert(segment.clone(), value);
                value = Value::Object(map);
            }
            let flat = flatten_context(&value);
            prop_assert_eq!(flat.len(), 1);
            prop_assert_eq!(flat.get(&segments.join(".")), Some(&Value::String(leaf)));
        }
    }
}
