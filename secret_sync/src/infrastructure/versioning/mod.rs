// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Versioning Store
//!
//! Optional version lineage over the merge store, for rollback and audit.
//!
//! ## Layout
//!
//! ```text
//! <prefix>/versions/<target>/<secret>/v<N>.json       snapshots
//! <prefix>/versions/<target>/<secret>/metadata.json   latest-version record
//! ```
//!
//! Versions for one target/secret are dense and monotonic starting at 1.
//! `store_version` assigns the timestamp when the caller leaves it zero
//! and prunes snapshots beyond the retention window after each write.
//! Rollback is a synthesis: the old payload is stored again, producing a
//! fresh `v<N+1>` whose data equals the rolled-back version.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use secret_sync_domain::stores::MergeStore;
use secret_sync_domain::value_objects::{Secret, SecretPath};
use secret_sync_domain::SyncError;

/// Default number of versions retained per secret
pub const DEFAULT_RETAIN_VERSIONS: usize = 10;

/// One versioned snapshot of a secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// `<target>/<secret>` the snapshot belongs to
    pub path: String,

    /// Monotonic version number, starting at 1
    pub version: u64,

    /// The snapshotted secret
    pub data: Secret,

    /// Unix timestamp (seconds); assigned at write time when zero
    pub timestamp: i64,

    /// SHA-256 of the canonical JSON encoding of `data`
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionMetadata {
    latest: u64,
    updated_at: i64,
}

/// Version lineage over a merge store.
pub struct VersioningStore {
    store: Arc<dyn MergeStore>,
    prefix: SecretPath,
    retain_versions: usize,
}

impl VersioningStore {
    pub fn new(store: Arc<dyn MergeStore>, prefix: SecretPath, retain_versions: usize) -> Self {
        Self {
            store,
            prefix,
            retain_versions: retain_versions.max(1),
        }
    }

    fn version_key(&self, target: &str, secret: &str, version: u64) -> String {
        format!("{}/versions/{target}/{secret}/v{version}.json", self.prefix)
    }

    fn metadata_key(&self, target: &str, secret: &str) -> String {
        format!("{}/versions/{target}/{secret}/metadata.json", self.prefix)
    }

    async fn read_metadata(&self, target: &str, secret: &str) -> Result<Option<VersionMetadata>, SyncError> {
        match self.store.read(&self.metadata_key(target, secret)).await {
            Ok(payload) => {
                let metadata = serde_json::from_slice(&payload)
                    .map_err(|e| SyncError::decode_error(format!("corrupt version metadata: {e}")))?;
                Ok(Some(metadata))
            }
            Err(SyncError::NotFound(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Stores a new version of `target`/`secret` and returns its number.
    ///
    /// A zero `timestamp` is replaced with the current time. After the
    /// write, snapshots older than the retention window are deleted.
    pub async fn store_version(
        &self,
        target: &str,
        secret: &str,
        data: &Secret,
        timestamp: i64,
    ) -> Result<u64, SyncError> {
        let latest = self.read_metadata(target, secret).await?.map(|m| m.latest).unwrap_or(0);
        let version = latest + 1;

        let encoded = data.to_json_bytes()?;
        let record = VersionRecord {
            path: format!("{target}/{secret}"),
            version,
            data: data.clone(),
            timestamp: if timestamp == 0 { Utc::now().timestamp() } else { timestamp },
            hash: hex::encode(Sha256::digest(&encoded)),
        };

        let payload = serde_json::to_vec(&record).map_err(|e| SyncError::encode_error(e.to_string()))?;
        self.store.write(&self.version_key(target, secret, version), &payload).await?;

        let metadata = VersionMetadata {
            latest: version,
            updated_at: record.timestamp,
        };
        let metadata_payload =
            serde_json::to_vec(&metadata).map_err(|e| SyncError::encode_error(e.to_string()))?;
        self.store.write(&self.metadata_key(target, secret), &metadata_payload).await?;

        // Keep the newest retain_versions snapshots.
        if version > self.retain_versions as u64 {
            let cutoff = version - self.retain_versions as u64;
            for stale in 1..=cutoff {
                self.store.delete(&self.version_key(target, secret, stale)).await?;
            }
            debug!(target, secret, cutoff, "pruned stale versions");
        }

        Ok(version)
    }

    /// Reads one specific version.
    pub async fn get_version(&self, target: &str, secret: &str, version: u64) -> Result<VersionRecord, SyncError> {
        let payload = self.store.read(&self.version_key(target, secret, version)).await?;
        serde_json::from_slice(&payload).map_err(|e| SyncError::decode_error(format!("corrupt version record: {e}")))
    }

    /// Reads the newest version, if any exist.
    pub async fn get_latest(&self, target: &str, secret: &str) -> Result<Option<VersionRecord>, SyncError> {
        match self.read_metadata(target, secret).await? {
            Some(metadata) => Ok(Some(self.get_version(target, secret, metadata.latest).await?)),
            None => Ok(None),
        }
    }

    /// Lists all retained versions, newest first.
    pub async fn list_versions(&self, target: &str, secret: &str) -> Result<Vec<VersionRecord>, SyncError> {
        let dir = format!("{}/versions/{target}/{secret}/", self.prefix);
        let mut records = Vec::new();

        for key in self.store.list(&dir).await? {
            let Some(file) = key.strip_prefix(&dir) else { continue };
            if file == "metadata.json" {
                continue;
            }
            let payload = self.store.read(&key).await?;
            let record: VersionRecord = serde_json::from_slice(&payload)
                .map_err(|e| SyncError::decode_error(format!("corrupt version record at {key}: {e}")))?;
            records.push(record);
        }

        records.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(records)
    }

    /// Rolls back to an old version by re-storing its payload, producing
    /// a new head version with identical data.
    pub async fn rollback(&self, target: &str, secret: &str, version: u64) -> Result<u64, SyncError> {
        let record = self.get_version(target, secret, version).await?;
        self.store_version(target, secret, &record.data, 0).await
    }
}
