// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Deep Merge Service
//!
//! The value-combination policy shared by every merge operation in the
//! pipeline. Given an ordered sequence of secrets, produces the single
//! secret that represents left-to-right application.
//!
//! ## Policy
//!
//! For two values `(a, b)` meeting at the same key:
//!
//! - both mappings → recurse key-wise
//! - both sequences → concatenate `a` then `b` (duplicates and order
//!   preserved)
//! - anything else → `b` wins (right-biased override)
//! - a key present on only one side is taken as-is
//!
//! Absent keys never appear in the output. The operation is associative
//! but **not** commutative: sequence append and right bias both depend on
//! order. `merge(x, x) == x` holds exactly when `x` contains no sequences
//! (sequences double).

use serde_json::Value;

use crate::value_objects::Secret;

/// Merges two values per the deep-merge policy, `b` taking precedence.
pub fn merge_values(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            let mut merged = left;
            for (key, right_value) in right {
                let combined = match merged.remove(&key) {
                    Some(left_value) => merge_values(left_value, right_value),
                    None => right_value,
                };
                merged.insert(key, combined);
            }
            Value::Object(merged)
        }
        (Value::Array(mut left), Value::Array(right)) => {
            left.extend(right);
            Value::Array(left)
        }
        // Scalars, and any mixed scalar/compound pairing: right wins.
        (_, b) => b,
    }
}

/// Merges two secrets, `b` taking precedence key-wise.
pub fn merge_secrets(a: Secret, b: Secret) -> Secret {
    match merge_values(Value::Object(a.into_map()), Value::Object(b.into_map())) {
        Value::Object(map) => Secret::from_map(map),
        _ => unreachable!("merging two objects always yields an object"),
    }
}

/// Folds an ordered sequence of secrets left-to-right.
///
/// An empty sequence yields an empty secret.
pub fn merge_all<I: IntoIterator<Item = Secret>>(secrets: I) -> Secret {
    secrets.into_iter().fold(Secret::new(), merge_secrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn secret(json: &str) -> Secret {
        Secret::from_json_bytes(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_mappings_recurse() {
        let merged = merge_secrets(
            secret(r#"{"db":{"host":"h1","port":5432}}"#),
            secret(r#"{"db":{"host":"h2"}}"#),
        );
        assert_eq!(merged.get("db").unwrap(), &json!({"host": "h2", "port": 5432}));
    }

    #[test]
    fn test_sequences_concatenate() {
        let merged = merge_secrets(secret(r#"{"tags":["x"]}"#), secret(r#"{"tags":["y","x"]}"#));
        assert_eq!(merged.get("tags").unwrap(), &json!(["x", "y", "x"]));
    }

    #[test]
    fn test_right_bias_on_scalars_and_mixed_types() {
        let merged = merge_secrets(secret(r#"{"a":1,"b":[1],"c":{"k":1}}"#), secret(r#"{"a":2,"b":3,"c":[4]}"#));
        assert_eq!(merged.get("a").unwrap(), &json!(2));
        assert_eq!(merged.get("b").unwrap(), &json!(3));
        assert_eq!(merged.get("c").unwrap(), &json!([4]));
    }

    #[test]
    fn test_one_sided_keys_are_taken() {
        let merged = merge_secrets(secret(r#"{"only_left":1}"#), secret(r#"{"only_right":2}"#));
        assert_eq!(merged.get("only_left").unwrap(), &json!(1));
        assert_eq!(merged.get("only_right").unwrap(), &json!(2));
    }

    #[test]
    fn test_idempotent_without_sequences() {
        let x = secret(r#"{"db":{"host":"h1","nested":{"flag":true}},"count":3}"#);
        assert_eq!(merge_secrets(x.clone(), x.clone()), x);
    }

    #[test]
    fn test_sequences_double_on_self_merge() {
        let x = secret(r#"{"tags":["a"]}"#);
        let merged = merge_secrets(x.clone(), x);
        assert_eq!(merged.get("tags").unwrap(), &json!(["a", "a"]));
    }

    #[test]
    fn test_merge_all_declared_order() {
        let merged = merge_all(vec![
            secret(r#"{"db":{"host":"h1","tags":["x"]}}"#),
            secret(r#"{"db":{"host":"h2","tags":["y"]}}"#),
        ]);
        assert_eq!(merged.get("db").unwrap(), &json!({"host": "h2", "tags": ["x", "y"]}));
    }

    // Bounded generator for arbitrary JSON values: scalars, small arrays,
    // small objects, two levels deep.
    fn arb_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(json!(null)),
            any::<bool>().prop_map(|b| json!(b)),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(|s| json!(s)),
        ];
        leaf.prop_recursive(2, 16, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..3).prop_map(serde_json::Value::Array),
                proptest::collection::btree_map("[a-z]{1,4}", inner, 0..3).prop_map(|m| {
                    serde_json::Value::Object(m.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        // merge([merge([a, b]), c]) == merge([a, b, c])
        #[test]
        fn prop_associative(
            a in proptest::collection::btree_map("[a-z]{1,4}", arb_value(), 0..4),
            b in proptest::collection::btree_map("[a-z]{1,4}", arb_value(), 0..4),
            c in proptest::collection::btree_map("[a-z]{1,4}", arb_value(), 0..4),
        ) {
            let s = |m: &std::collections::BTreeMap<String, serde_json::Value>| {
                Secret::from_map(m.clone().into_iter().collect())
            };
            let two_step = merge_secrets(merge_secrets(s(&a), s(&b)), s(&c));
            let flat = merge_all(vec![s(&a), s(&b), s(&c)]);
            prop_assert_eq!(two_step, flat);
        }

        // Keys in later items override earlier scalar keys at the same path.
        #[test]
        fn prop_right_biased(key in "[a-z]{1,4}", left in any::<i32>(), right in any::<i32>()) {
            let mut a = Secret::new();
            a.insert(key.clone(), json!(left));
            let mut b = Secret::new();
            b.insert(key.clone(), json!(right));
            let merged = merge_secrets(a, b);
            prop_assert_eq!(merged.get(&key).unwrap(), &json!(right));
        }
    }
}
