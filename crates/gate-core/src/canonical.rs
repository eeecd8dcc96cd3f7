//! Canonical JSON form and policy hashing (spec §3, Hash stability in §8).
//!
//! The canonical form sorts object keys lexicographically at every depth;
//! the hash is the hex SHA-256 of that serialization. Two `PolicySpec`
//! values that differ only in key order therefore hash identically.

use crate::policy::PolicySpec;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Recursively sort object keys, leaving arrays and scalars untouched.
/// Grounded on the same canonicalization idea used for policy-migration
/// audit hashes elsewhere in this ecosystem: a `BTreeMap` fold gives a
/// deterministic key order independent of input order.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Hex SHA-256 of the canonical JSON serialization of `value`.
#[must_use]
pub fn hash_canonical_value(value: &Value) -> String {
    let canonical = canonicalize(value);
    // `serde_json::to_vec` on a `Value` built from a sorted `Map` preserves
    // insertion order, which is the sorted order we just constructed.
    let bytes = serde_json::to_vec(&canonical).expect("Value serialization cannot fail");
    let digest = Sha256::digest(&bytes);
    format!("{digest:x}")
}

/// Hex SHA-256 of the canonical serialization of a [`PolicySpec`].
///
/// # Panics
/// Panics if `spec` cannot be represented as `serde_json::Value`, which does
/// not happen for well-formed `PolicySpec` values produced by this crate.
#[must_use]
pub fn hash_policy_spec(spec: &PolicySpec) -> String {
    let value = serde_json::to_value(spec).expect("PolicySpec serialization cannot fail");
    hash_canonical_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_keys_in_different_order_hash_identically() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 1}});
        let b = json!({"a": {"x": 1, "y": 2}, "b": 1});
        assert_eq!(hash_canonical_value(&a), hash_canonical_value(&b));
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(hash_canonical_value(&a), hash_canonical_value(&b));
    }

    #[test]
    fn arrays_preserve_order_significance() {
        let a = json!({"a": [1, 2, 3]});
        let b = json!({"a": [3, 2, 1]});
        assert_ne!(hash_canonical_value(&a), hash_canonical_value(&b));
    }
}
