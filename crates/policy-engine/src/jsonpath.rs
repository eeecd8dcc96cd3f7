//! Dot-separated JSON path resolution (spec §4.2 JSON-path resolution).
//!
//! Traversal fails (returns `None`) on a `null`, a non-object, or an absent
//! key at any segment. Arrays are not indexable by numeric segments in v1.

use serde_json::Value;

#[must_use]
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_path() {
        let payload = json!({"order": {"id": "o1"}});
        assert_eq!(resolve(&payload, "order.id").unwrap(), "o1");
    }

    #[test]
    fn top_level_field_resolves() {
        let payload = json!({"amount": 100});
        assert_eq!(resolve(&payload, "amount").unwrap(), 100);
    }

    #[test]
    fn missing_intermediate_object_short_circuits() {
        let payload = json!({"order": null});
        assert!(resolve(&payload, "order.id").is_none());
    }

    #[test]
    fn non_object_intermediate_short_circuits() {
        let payload = json!({"order": "o1"});
        assert!(resolve(&payload, "order.id").is_none());
    }

    #[test]
    fn absent_key_is_undefined() {
        let payload = json!({});
        assert!(resolve(&payload, "missing").is_none());
    }
}
