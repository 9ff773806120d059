//! Deterministic JSON canonicalization.
//!
//! Stable bytes for content ids, fingerprints and byte-identical diff output:
//! - object keys are sorted lexicographically at every depth
//! - arrays preserve order
//! - output is minified

use serde::Serialize;
use serde_json::{Map, Value};

/// Deep-sort object keys of a JSON value.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for k in keys {
                sorted.insert(k.clone(), canonicalize(&map[k.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serialize any value to canonical JSON bytes.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_vec(&canonicalize(&v))
}

/// Serialize any value to a canonical JSON string.
pub fn to_canonical_json_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_keys_are_sorted_and_arrays_kept() {
        let v = json!({ "b": [ { "z": 1, "a": 2 } ], "a": null });
        assert_eq!(
            to_canonical_json_string(&v).unwrap(),
            r#"{"a":null,"b":[{"a":2,"z":1}]}"#
        );
    }
}
