//! Flattening of upstream JSON objects into string maps.
//!
//! The gRPC responses carry `map<string, string>`, so every top-level value
//! of the upstream object is rendered as text. Strings pass through
//! unquoted; every other value (number, boolean, null, array, object) uses
//! its compact JSON encoding. Types are not recoverable from the result.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Render a single JSON value as display text.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert an upstream object into a string map with the same key set.
#[must_use]
pub fn to_string_map(object: &Map<String, Value>) -> HashMap<String, String> {
    object
        .iter()
        .map(|(key, value)| (key.clone(), stringify(value)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(stringify(&json!("Al Haram")), "Al Haram");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(24.4672)), "24.4672");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(null)), "null");
    }

    #[test]
    fn test_composites_use_compact_json() {
        assert_eq!(stringify(&json!([1, "a"])), r#"[1,"a"]"#);
        assert_eq!(stringify(&json!({"wkid": 4326})), r#"{"wkid":4326}"#);
    }

    #[test]
    fn test_key_set_preserved() {
        let body = json!({
            "district": "Quba",
            "parcelCount": 3,
            "active": false,
            "extent": {"xmin": 1.5},
            "fields": [],
            "note": null
        });
        let object = body.as_object().unwrap();

        let map = to_string_map(object);

        assert_eq!(map.len(), object.len());
        for key in object.keys() {
            assert!(map.contains_key(key), "missing key {key}");
        }
        assert_eq!(map["district"], "Quba");
        assert_eq!(map["parcelCount"], "3");
        assert_eq!(map["active"], "false");
        assert_eq!(map["extent"], r#"{"xmin":1.5}"#);
        assert_eq!(map["fields"], "[]");
        assert_eq!(map["note"], "null");
    }

    #[test]
    fn test_empty_object() {
        assert!(to_string_map(&Map::new()).is_empty());
    }
}
