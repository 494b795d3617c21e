// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Phase
//!
//! Per-target execution of the first pipeline phase: read the target's
//! imports in declared order, deep-merge them, and write the resulting
//! bundle to the merge store at its deterministic path.
//!
//! ## Procedure
//!
//! 1. For each planned import: enumerate a source's leaves via traversal
//!    and group them by output secret name (last path segment), or read
//!    a dependency target's bundle as a pre-merged source
//! 2. Deep-merge the contributions in declared import order
//! 3. Diff the result against the previous bundle at the same path
//! 4. Write the bundle (skipped under dry-run); a fully successful merge
//!    also advances the per-target reference, and versioning (when
//!    enabled) snapshots every added or modified secret
//!
//! A failed import is recorded in `failed_imports` and the remaining
//! imports still contribute to a best-effort bundle, but the target's
//! outcome is marked failed and the reference is left at the last
//! successful merge, which is what dependent targets read.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::entities::{Bundle, Phase, TargetOutcome};
use secret_sync_domain::services::deep_merge::merge_secrets;
use secret_sync_domain::services::SecretDiff;
use secret_sync_domain::stores::{MergeStore, SourceStore};
use secret_sync_domain::value_objects::{Secret, SecretPath};
use secret_sync_domain::SyncError;

use crate::infrastructure::resilience::{retry_with_backoff, BreakerSet, RetryPolicy};
use crate::infrastructure::traversal::{enumerate_leaves, TraversalLimits};
use crate::infrastructure::versioning::VersioningStore;

use super::bundle_plan::{PlannedImport, TargetPlan};

/// Per-run options for the merge phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergePhaseOptions {
    pub dry_run: bool,
    pub compute_diff: bool,
}

/// Merge-phase executor, shared by all workers.
pub struct MergePhase {
    source_store: Arc<dyn SourceStore>,
    merge_store: Arc<dyn MergeStore>,
    versioning: Option<Arc<VersioningStore>>,
    merge_prefix: SecretPath,
    limits: TraversalLimits,
    breakers: Arc<BreakerSet>,
    retry: RetryPolicy,
}

impl MergePhase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_store: Arc<dyn SourceStore>,
        merge_store: Arc<dyn MergeStore>,
        versioning: Option<Arc<VersioningStore>>,
        merge_prefix: SecretPath,
        limits: TraversalLimits,
        breakers: Arc<BreakerSet>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source_store,
            merge_store,
            versioning,
            merge_prefix,
            limits,
            breakers,
            retry,
        }
    }

    /// Merges one target. Failures are embedded in the returned outcome;
    /// this never panics the worker.
    pub async fn merge_target(
        &self,
        plan: &TargetPlan,
        options: &MergePhaseOptions,
        cancel: &CancellationToken,
    ) -> TargetOutcome {
        let started = Instant::now();
        let target_name = plan.target.name.clone();

        let mut merged = Bundle::new();
        let mut failed_imports: Vec<String> = Vec::new();
        let mut retries_total: u32 = 0;

        for import in &plan.imports {
            if cancel.is_cancelled() {
                return self.outcome(plan, started, retries_total, &merged, None, Some(SyncError::cancelled()), failed_imports);
            }

            match self.read_import(import, cancel).await {
                Ok((contribution, retries)) => {
                    retries_total += retries;
                    for (name, secret) in contribution.iter() {
                        let combined = match merged.get(name) {
                            Some(existing) => merge_secrets(existing.clone(), secret.clone()),
                            None => secret.clone(),
                        };
                        merged.insert(name.clone(), combined);
                    }
                }
                Err((error, retries)) => {
                    retries_total += retries;
                    warn!(target = %target_name, import = import.name(), error = %error, "import failed");
                    failed_imports.push(import.name().to_string());
                }
            }
        }

        // Previous bundle at the deterministic path; absent on first run.
        let previous = match self.read_previous(plan, cancel).await {
            Ok(previous) => previous,
            Err(error) => {
                return self.outcome(plan, started, retries_total, &merged, None, Some(error), failed_imports)
            }
        };
        let diff = SecretDiff::between_bundles(&previous, &merged);

        if !options.dry_run {
            if let Err(error) = self.write_bundle(plan, &merged, &diff, failed_imports.is_empty(), cancel).await {
                return self.outcome(plan, started, retries_total, &merged, Some(diff), Some(error), failed_imports);
            }
        }

        info!(
            target = %target_name,
            secrets = merged.len(),
            added = diff.totals.added,
            modified = diff.totals.modified,
            removed = diff.totals.removed,
            dry_run = options.dry_run,
            "merge complete"
        );

        let attached_diff = (options.dry_run || options.compute_diff).then_some(diff);
        self.outcome(plan, started, retries_total, &merged, attached_diff, None, failed_imports)
    }

    /// Reads one import's contribution as a name → secret mapping.
    async fn read_import(
        &self,
        import: &PlannedImport,
        cancel: &CancellationToken,
    ) -> Result<(Bundle, u32), (SyncError, u32)> {
        match import {
            PlannedImport::Source { prefix, .. } => {
                let breaker = self.breakers.breaker("source-store");
                let traversal = retry_with_backoff(&self.retry, &breaker, "traverse-source", cancel, || {
                    enumerate_leaves(self.source_store.as_ref(), prefix, &self.limits, cancel)
                })
                .await;
                let mut retries = traversal.retries;
                let leaves = match traversal.result {
                    Ok(outcome) => outcome.leaves,
                    Err(error) => return Err((error, retries)),
                };

                let mut contribution = Bundle::new();
                for leaf in leaves {
                    let read = retry_with_backoff(&self.retry, &breaker, "read-secret", cancel, || {
                        self.source_store.get(&leaf)
                    })
                    .await;
                    retries += read.retries;
                    match read.result {
                        Ok(secret) => {
                            let output_name = leaf.last_segment().to_string();
                            let combined = match contribution.get(&output_name) {
                                Some(existing) => merge_secrets(existing.clone(), secret),
                                None => secret,
                            };
                            contribution.insert(output_name, combined);
                        }
                        Err(error) => return Err((error, retries)),
                    }
                }
                Ok((contribution, retries))
            }
            PlannedImport::Target { name, bundle_key, .. } => {
                let breaker = self.breakers.breaker("merge-store");
                let read = retry_with_backoff(&self.retry, &breaker, "read-dependency-bundle", cancel, || {
                    self.merge_store.read(bundle_key)
                })
                .await;
                match read.result {
                    Ok(payload) => match Bundle::from_json_bytes(&payload) {
                        Ok(bundle) => Ok((bundle, read.retries)),
                        Err(error) => Err((error, read.retries)),
                    },
                    Err(SyncError::NotFound(_)) => Err((
                        SyncError::not_found(format!("dependency target {name:?} has no merged bundle yet")),
                        read.retries,
                    )),
                    Err(error) => Err((error, read.retries)),
                }
            }
        }
    }

    async fn read_previous(&self, plan: &TargetPlan, cancel: &CancellationToken) -> Result<Bundle, SyncError> {
        let breaker = self.breakers.breaker("merge-store");
        let read = retry_with_backoff(&self.retry, &breaker, "read-previous-bundle", cancel, || {
            self.merge_store.read(&plan.bundle_key)
        })
        .await;
        match read.result {
            Ok(payload) => Bundle::from_json_bytes(&payload),
            Err(SyncError::NotFound(_)) => Ok(Bundle::new()),
            Err(error) => Err(error),
        }
    }

    async fn write_bundle(
        &self,
        plan: &TargetPlan,
        merged: &Bundle,
        diff: &SecretDiff,
        fully_successful: bool,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let breaker = self.breakers.breaker("merge-store");
        let target_name = &plan.target.name;

        let write = retry_with_backoff(&self.retry, &breaker, "write-bundle", cancel, || async {
            self.merge_store
                .put_bundle(&self.merge_prefix, target_name, &plan.bundle_id, merged)
                .await
        })
        .await;
        write.result?;

        // The reference only advances on a fully successful merge, so
        // dependents of a partially failed target keep reading the last
        // good bundle.
        if fully_successful {
            let reference = retry_with_backoff(&self.retry, &breaker, "write-reference", cancel, || async {
                self.merge_store
                    .put_reference(&self.merge_prefix, target_name, &plan.bundle_id)
                    .await
            })
            .await;
            reference.result?;
        }

        if let Some(versioning) = &self.versioning {
            for change in &diff.changes {
                let snapshot: Option<&Secret> = match change.change_type {
                    secret_sync_domain::services::ChangeType::Added
                    | secret_sync_domain::services::ChangeType::Modified => change.new_value.as_ref(),
                    _ => None,
                };
                if let Some(secret) = snapshot {
                    versioning.store_version(target_name, &change.path, secret, 0).await?;
                }
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn outcome(
        &self,
        plan: &TargetPlan,
        started: Instant,
        retries: u32,
        merged: &Bundle,
        diff: Option<SecretDiff>,
        error: Option<SyncError>,
        failed_imports: Vec<String>,
    ) -> TargetOutcome {
        let success = error.is_none() && failed_imports.is_empty();
        let mut outcome = TargetOutcome {
            target: plan.target.name.clone(),
            phase: Phase::Merge,
            success,
            error: error.map(|e| e.to_string()).or_else(|| {
                (!failed_imports.is_empty()).then(|| format!("failed imports: {}", failed_imports.join(", ")))
            }),
            duration_ms: started.elapsed().as_millis() as u64,
            retries,
            details: Default::default(),
            diff,
        };
        outcome.details.secrets_processed = merged.len();
        outcome.details.source_paths = plan.source_paths.clone();
        outcome.details.destination = Some(plan.bundle_key.clone());
        outcome.details.role_hint = plan.target.role_arn.clone();
        outcome.details.failed_imports = failed_imports;
        outcome
    }
}
