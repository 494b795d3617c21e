// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Shared fixtures for the end-to-end pipeline tests: an in-memory store
//! set wired into an orchestrator, plus a fault-injecting source store
//! for failure-path scenarios.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use secret_sync::application::{MergePhase, Orchestrator, RunOptions, SyncPhase};
use secret_sync::infrastructure::metrics::NoopObserver;
use secret_sync::infrastructure::resilience::{BreakerSet, RetryPolicy};
use secret_sync::infrastructure::stores::{
    MemoryMergeStore, MemorySourceStore, MemoryTargetStoreProvider,
};
use secret_sync::infrastructure::traversal::TraversalLimits;
use secret_sync::infrastructure::versioning::VersioningStore;
use secret_sync_domain::entities::{Operation, Source, Target};
use secret_sync_domain::stores::{ChildEntry, SourceStore};
use secret_sync_domain::value_objects::{AccountId, Secret, SecretPath};
use secret_sync_domain::SyncError;

/// Source store wrapper that fails reads of chosen paths a configured
/// number of times before delegating.
pub struct FlakySourceStore {
    inner: Arc<MemorySourceStore>,
    remaining_failures: Mutex<HashMap<String, u32>>,
}

impl FlakySourceStore {
    pub fn new(inner: Arc<MemorySourceStore>) -> Self {
        Self {
            inner,
            remaining_failures: Mutex::new(HashMap::new()),
        }
    }

    /// Makes the next `times` reads of `path` fail with a timeout
    pub fn fail_reads(&self, path: &str, times: u32) {
        self.remaining_failures.lock().insert(path.to_string(), times);
    }
}

#[async_trait]
impl SourceStore for FlakySourceStore {
    async fn list(&self, prefix: &SecretPath) -> Result<Vec<ChildEntry>, SyncError> {
        self.inner.list(prefix).await
    }

    async fn get(&self, path: &SecretPath) -> Result<Secret, SyncError> {
        {
            let mut failures = self.remaining_failures.lock();
            if let Some(remaining) = failures.get_mut(path.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SyncError::Timeout(format!("injected timeout reading {path}")));
                }
            }
        }
        self.inner.get(path).await
    }
}

/// In-memory pipeline fixture.
pub struct Fixture {
    pub source: Arc<MemorySourceStore>,
    pub flaky: Arc<FlakySourceStore>,
    pub merge: Arc<MemoryMergeStore>,
    pub target_stores: Arc<MemoryTargetStoreProvider>,
    pub merge_prefix: SecretPath,
    pub retain_versions: usize,
}

impl Fixture {
    pub fn new() -> Self {
        let source = Arc::new(MemorySourceStore::new());
        Self {
            flaky: Arc::new(FlakySourceStore::new(source.clone())),
            source,
            merge: Arc::new(MemoryMergeStore::new()),
            target_stores: Arc::new(MemoryTargetStoreProvider::new()),
            merge_prefix: path("sync"),
            retain_versions: 10,
        }
    }

    /// Seeds one source-store leaf
    pub fn seed(&self, leaf: &str, json: &str) {
        self.source.insert(&path(leaf), secret(json));
    }

    /// Builds an orchestrator over the fixture's stores.
    pub fn orchestrator(
        &self,
        sources: Vec<Source>,
        targets: Vec<Target>,
        versioning: bool,
    ) -> Result<Orchestrator, SyncError> {
        let breakers = Arc::new(BreakerSet::with_settings(50, Duration::from_secs(60)));
        let retry = fast_retry();

        let versioning_store = versioning.then(|| {
            Arc::new(VersioningStore::new(
                self.merge.clone(),
                self.merge_prefix.clone(),
                self.retain_versions,
            ))
        });

        let merge_phase = MergePhase::new(
            self.flaky.clone(),
            self.merge.clone(),
            versioning_store,
            self.merge_prefix.clone(),
            TraversalLimits::default(),
            breakers.clone(),
            retry.clone(),
        );
        let sync_phase = SyncPhase::new(self.merge.clone(), self.target_stores.clone(), breakers, retry);

        Orchestrator::new(
            sources,
            targets,
            self.merge_prefix.clone(),
            merge_phase,
            sync_phase,
            Arc::new(NoopObserver),
        )
    }
}

/// Millisecond-scale retry policy so failure tests stay fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        jitter: 0.0,
    }
}

pub fn path(raw: &str) -> SecretPath {
    SecretPath::parse(raw).expect("test path is valid")
}

pub fn secret(json: &str) -> Secret {
    Secret::from_json_bytes(json.as_bytes()).expect("test secret is valid JSON")
}

pub fn account(n: u8) -> AccountId {
    AccountId::parse(&format!("{:012}", u64::from(n))).expect("test account id is valid")
}

pub fn source(name: &str) -> Source {
    Source::new(name, path(&format!("kv/{name}")))
}

pub fn target(name: &str, n: u8, imports: &[&str]) -> Target {
    Target::new(name, account(n), imports.iter().map(|i| (*i).into()).collect())
}

pub fn run_options(operation: Operation) -> RunOptions {
    RunOptions {
        operation,
        compute_diff: true,
        ..RunOptions::default()
    }
}
