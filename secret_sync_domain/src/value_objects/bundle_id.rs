// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bundle Identity Value Object
//!
//! Deterministic, content-free identifier for a merge bundle. The identity
//! is derived purely from the ordered sequence of resolved source paths, so
//! the same import declaration always lands at the same merge-store key
//! across runs and platforms, and reordering imports yields a different
//! identity (merge order is significant).
//!
//! ## Derivation
//!
//! `bundle_id = hex(sha256(join(paths, NUL)))[..32]` - 128 bits of the
//! digest, which is plenty for collision resistance at any realistic fleet
//! size. The NUL joiner cannot occur inside a validated [`SecretPath`], so
//! distinct sequences can never produce the same joined input.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};

use super::secret_path::SecretPath;

/// Number of lowercase-hex characters in a bundle id (128 bits)
pub const BUNDLE_ID_LEN: usize = 32;

/// Deterministic identifier for a merge bundle.
///
/// Equality and hashing follow the hex string; two bundles built from the
/// same ordered source sequence are the same bundle wherever they are
/// computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Computes the bundle id for an ordered sequence of resolved source
    /// paths.
    pub fn from_sources<P: AsRef<str>>(sources: &[P]) -> Self {
        let mut hasher = Sha256::new();
        for (index, path) in sources.iter().enumerate() {
            if index > 0 {
                hasher.update([0u8]);
            }
            hasher.update(path.as_ref().as_bytes());
        }
        let digest = hasher.finalize();
        let mut hex_digest = hex::encode(digest);
        hex_digest.truncate(BUNDLE_ID_LEN);
        Self(hex_digest)
    }

    /// Returns the hex identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Merge-store object key for a target's canonical bundle:
/// `<merge_prefix>/bundles/<target_name>/<bundle_id>.json`
pub fn bundle_object_key(merge_prefix: &SecretPath, target_name: &str, id: &BundleId) -> String {
    format!("{merge_prefix}/bundles/{target_name}/{id}.json")
}

/// Merge-store object key for a target's per-bundle reference:
/// `<merge_prefix>/targets/<target_name>/<bundle_id>`
pub fn target_reference_key(merge_prefix: &SecretPath, target_name: &str, id: &BundleId) -> String {
    format!("{merge_prefix}/targets/{target_name}/{id}")
}
