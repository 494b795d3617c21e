// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bundle Entity
//!
//! The merged result for one target: a mapping from output secret name to
//! [`Secret`]. A bundle is identified by its [`BundleId`] - a pure function
//! of the ordered source sequence that produced it, not of its contents -
//! and persisted in the merge store at the deterministic bundle path.
//!
//! Keys iterate in lexicographic order, which keeps the persisted JSON
//! canonical and the diff output deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value_objects::Secret;
use crate::SyncError;

/// Mapping from output secret name to merged secret.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(BTreeMap<String, Secret>);

impl Bundle {
    /// Creates an empty bundle
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Decodes a bundle from UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DecodeError`] when the payload is not a JSON
    /// object of objects.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes).map_err(|e| SyncError::decode_error(format!("corrupt bundle: {e}")))
    }

    /// Encodes the bundle as canonical UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::EncodeError`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, SyncError> {
        serde_json::to_vec(&self.0).map_err(|e| SyncError::encode_error(e.to_string()))
    }

    /// Returns the secret stored under a name
    pub fn get(&self, name: &str) -> Option<&Secret> {
        self.0.get(name)
    }

    /// Inserts or replaces a secret
    pub fn insert(&mut self, name: impl Into<String>, secret: Secret) {
        self.0.insert(name.into(), secret);
    }

    /// Returns the underlying name → secret map
    pub fn secrets(&self) -> &BTreeMap<String, Secret> {
        &self.0
    }

    /// Iterates over (name, secret) pairs in lexicographic name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Secret)> {
        self.0.iter()
    }

    /// Returns the number of secrets
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the bundle is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Secret)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (String, Secret)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Secret>> for Bundle {
    fn from(map: BTreeMap<String, Secret>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut bundle = Bundle::new();
        bundle.insert("db", Secret::from_json_bytes(br#"{"host":"h1"}"#).unwrap());
        let bytes = bundle.to_json_bytes().unwrap();
        assert_eq!(Bundle::from_json_bytes(&bytes).unwrap(), bundle);
    }

    #[test]
    fn test_decode_rejects_corrupt_payloads() {
        assert!(Bundle::from_json_bytes(b"[]").is_err());
        assert!(Bundle::from_json_bytes(b"{\"db\": 3}").is_err());
        assert!(Bundle::from_json_bytes(b"{").is_err());
    }

    #[test]
    fn test_iteration_is_lexicographic() {
        let mut bundle = Bundle::new();
        bundle.insert("zeta", Secret::new());
        bundle.insert("alpha", Secret::new());
        let names: Vec<_> = bundle.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
