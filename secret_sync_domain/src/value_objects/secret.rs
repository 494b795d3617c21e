// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Value Object
//!
//! A secret is an unordered mapping from string key to a dynamically-typed
//! value: null, boolean, number, string, ordered sequence, or nested
//! mapping, with unbounded depth and no schema. Equality is structural.
//!
//! The value union is `serde_json::Value`, whose default map representation
//! is a BTreeMap - keys iterate alphabetically, which is exactly the
//! canonical ordering the merge store requires when bundles are hashed and
//! persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SyncError;

/// Unordered string-keyed mapping of secret material.
///
/// Wraps the JSON object form so the deep-merge policy and the diff engine
/// operate on one concrete representation, with encode/decode at the wire
/// boundary surfacing [`SyncError::DecodeError`] / [`SyncError::EncodeError`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(Map<String, Value>);

impl Secret {
    /// Creates an empty secret
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an existing JSON object map
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Decodes a secret from UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DecodeError`] when the payload is not a JSON
    /// object.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| SyncError::decode_error(format!("invalid JSON: {e}")))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SyncError::decode_error(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Encodes the secret as canonical UTF-8 JSON (alphabetical key order).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::EncodeError`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, SyncError> {
        serde_json::to_vec(&self.0).map_err(|e| SyncError::encode_error(e.to_string()))
    }

    /// Returns the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the secret, returning the underlying map
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns the value at a key, if present
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a key/value pair
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the number of top-level keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the secret has no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Secret {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Secret {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roundtrip() {
        let secret = Secret::from_json_bytes(br#"{"db":{"host":"h1","port":5432}}"#).unwrap();
        let bytes = secret.to_json_bytes().unwrap();
        assert_eq!(Secret::from_json_bytes(&bytes).unwrap(), secret);
    }

    #[test]
    fn test_structural_equality_ignores_key_order() {
        let a = Secret::from_json_bytes(br#"{"x":1,"y":2}"#).unwrap();
        let b = Secret::from_json_bytes(br#"{"y":2,"x":1}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_encoding_is_alphabetical() {
        let secret = Secret::from_json_bytes(br#"{"zeta":1,"alpha":2}"#).unwrap();
        let encoded = String::from_utf8(secret.to_json_bytes().unwrap()).unwrap();
        assert_eq!(encoded, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(Secret::from_json_bytes(b"[1,2,3]").is_err());
        assert!(Secret::from_json_bytes(b"\"scalar\"").is_err());
        assert!(Secret::from_json_bytes(b"not json").is_err());
    }

    #[test]
    fn test_nested_access() {
        let mut secret = Secret::new();
        secret.insert("db", json!({"host": "h1"}));
        assert_eq!(secret.get("db").unwrap()["host"], "h1");
        assert_eq!(secret.len(), 1);
    }
}
