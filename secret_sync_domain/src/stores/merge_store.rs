// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Store Port
//!
//! Capability trait for the intermediate staging store holding bundles
//! between the merge and sync phases. The raw operations are a flat
//! key/value surface; the bundle-level operations are provided on top of
//! them so every adapter shares one persisted layout:
//!
//! ```text
//! <prefix>/bundles/<target>/<bundle_id>.json   canonical bundle
//! <prefix>/targets/<target>/<bundle_id>        per-target reference
//! ```
//!
//! Version lineage (`<prefix>/versions/...`) is layered on the same raw
//! surface by the versioning store in the infrastructure layer.

use async_trait::async_trait;

use crate::entities::Bundle;
use crate::value_objects::bundle_id::{bundle_object_key, target_reference_key};
use crate::value_objects::{BundleId, SecretPath};
use crate::SyncError;

/// Intermediate staging store capability.
#[async_trait]
pub trait MergeStore: Send + Sync {
    /// Lists keys under a prefix (non-recursive flat listing).
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SyncError>;

    /// Reads the payload at a key.
    async fn read(&self, key: &str) -> Result<Vec<u8>, SyncError>;

    /// Writes a payload at a key, replacing any existing payload.
    async fn write(&self, key: &str, payload: &[u8]) -> Result<(), SyncError>;

    /// Deletes the payload at a key; deleting a missing key is not an
    /// error.
    async fn delete(&self, key: &str) -> Result<(), SyncError>;

    /// Writes a target's bundle at its deterministic path.
    async fn put_bundle(
        &self,
        prefix: &SecretPath,
        target: &str,
        id: &BundleId,
        bundle: &Bundle,
    ) -> Result<(), SyncError> {
        let payload = bundle.to_json_bytes()?;
        self.write(&bundle_object_key(prefix, target, id), &payload).await
    }

    /// Reads a target's bundle from its deterministic path.
    async fn get_bundle(&self, prefix: &SecretPath, target: &str, id: &BundleId) -> Result<Bundle, SyncError> {
        let payload = self.read(&bundle_object_key(prefix, target, id)).await?;
        Bundle::from_json_bytes(&payload)
    }

    /// Deletes a target's bundle.
    async fn delete_bundle(&self, prefix: &SecretPath, target: &str, id: &BundleId) -> Result<(), SyncError> {
        self.delete(&bundle_object_key(prefix, target, id)).await
    }

    /// Records a successful merge by writing the per-target reference,
    /// whose payload is the bundle's object key.
    async fn put_reference(&self, prefix: &SecretPath, target: &str, id: &BundleId) -> Result<(), SyncError> {
        let key = target_reference_key(prefix, target, id);
        let payload = bundle_object_key(prefix, target, id);
        self.write(&key, payload.as_bytes()).await
    }
}
