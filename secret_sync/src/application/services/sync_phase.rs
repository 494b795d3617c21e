// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sync Phase
//!
//! Per-target execution of the second pipeline phase: reconcile the
//! target store against the target's merged bundle.
//!
//! ## Procedure
//!
//! 1. Read the bundle at the deterministic bundle path
//! 2. List the target store under the target's namespace, checking both
//!    the canonical name and the leading-slash variant left behind by
//!    older naming conventions
//! 3. Diff current against desired; create added entries, update
//!    modified ones, and delete orphans (both name variants) only when
//!    `delete_orphans` is set
//!
//! Writes always use the canonical form, so a second run against
//! unchanged inputs is a no-op.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::entities::{Bundle, Phase, TargetOutcome};
use secret_sync_domain::services::{ChangeType, SecretDiff};
use secret_sync_domain::stores::{MergeStore, TargetStore};
use secret_sync_domain::value_objects::Secret;
use secret_sync_domain::SyncError;

use crate::infrastructure::resilience::{retry_with_backoff, BreakerSet, RetryPolicy};
use crate::infrastructure::stores::TargetStoreProvider;

use super::bundle_plan::TargetPlan;

/// Per-run options for the sync phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncPhaseOptions {
    pub dry_run: bool,
    pub compute_diff: bool,
    pub delete_orphans: bool,
}

/// Sync-phase executor, shared by all workers.
pub struct SyncPhase {
    merge_store: Arc<dyn MergeStore>,
    target_stores: Arc<dyn TargetStoreProvider>,
    breakers: Arc<BreakerSet>,
    retry: RetryPolicy,
}

impl SyncPhase {
    pub fn new(
        merge_store: Arc<dyn MergeStore>,
        target_stores: Arc<dyn TargetStoreProvider>,
        breakers: Arc<BreakerSet>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            merge_store,
            target_stores,
            breakers,
            retry,
        }
    }

    /// Reconciles one target. Failures are embedded in the returned
    /// outcome.
    pub async fn sync_target(
        &self,
        plan: &TargetPlan,
        options: &SyncPhaseOptions,
        cancel: &CancellationToken,
    ) -> TargetOutcome {
        let started = Instant::now();
        let mut retries_total: u32 = 0;

        let result = self
            .sync_inner(plan, options, cancel, &mut retries_total)
            .await;

        match result {
            Ok((diff, applied)) => {
                info!(
                    target = %plan.target.name,
                    added = diff.totals.added,
                    modified = diff.totals.modified,
                    removed = diff.totals.removed,
                    applied,
                    dry_run = options.dry_run,
                    "sync complete"
                );
                let mut outcome = TargetOutcome::success(&plan.target.name, Phase::Sync, started.elapsed().as_millis() as u64);
                outcome.retries = retries_total;
                outcome.details.secrets_processed = applied;
                outcome.details.source_paths = vec![plan.bundle_key.clone()];
                outcome.details.destination = Some(self.destination(plan));
                outcome.details.role_hint = plan.target.role_arn.clone();
                outcome.diff = (options.dry_run || options.compute_diff).then_some(diff);
                outcome
            }
            Err(error) => {
                warn!(target = %plan.target.name, error = %error, "sync failed");
                let mut outcome = TargetOutcome::failure(
                    &plan.target.name,
                    Phase::Sync,
                    started.elapsed().as_millis() as u64,
                    error.to_string(),
                );
                outcome.retries = retries_total;
                outcome.details.destination = Some(self.destination(plan));
                outcome.details.role_hint = plan.target.role_arn.clone();
                outcome
            }
        }
    }

    fn destination(&self, plan: &TargetPlan) -> String {
        match (&plan.target.region, &plan.target.secret_prefix) {
            (Some(region), Some(prefix)) => format!("{}/{region}/{prefix}", plan.target.account_id),
            (Some(region), None) => format!("{}/{region}", plan.target.account_id),
            (None, Some(prefix)) => format!("{}/{prefix}", plan.target.account_id),
            (None, None) => plan.target.account_id.to_string(),
        }
    }

    /// The canonical target-store name for one bundle entry.
    fn canonical_name(plan: &TargetPlan, secret_name: &str) -> String {
        match &plan.target.secret_prefix {
            Some(prefix) => format!("{prefix}/{secret_name}"),
            None => secret_name.to_string(),
        }
    }

    async fn sync_inner(
        &self,
        plan: &TargetPlan,
        options: &SyncPhaseOptions,
        cancel: &CancellationToken,
        retries_total: &mut u32,
    ) -> Result<(SecretDiff, usize), SyncError> {
        let store = self.target_stores.store_for(&plan.target)?;
        let merge_breaker = self.breakers.breaker("merge-store");
        let target_breaker = self.breakers.breaker("target-store");

        // 1. The bundle the merge phase produced for this exact import
        //    sequence.
        let read = retry_with_backoff(&self.retry, &merge_breaker, "read-bundle", cancel, || {
            self.merge_store.read(&plan.bundle_key)
        })
        .await;
        *retries_total += read.retries;
        let bundle = match read.result {
            Ok(payload) => Bundle::from_json_bytes(&payload)?,
            Err(SyncError::NotFound(_)) => {
                return Err(SyncError::not_found(format!(
                    "no bundle at {:?}; run the merge phase first",
                    plan.bundle_key
                )))
            }
            Err(error) => return Err(error),
        };

        let desired: BTreeMap<String, Secret> = bundle
            .iter()
            .map(|(name, secret)| (Self::canonical_name(plan, name), secret.clone()))
            .collect();

        // 2. Current state, folding the leading-slash variant onto the
        //    canonical name so either spelling counts as present.
        let (current, variants) = self.read_current(plan, store.as_ref(), cancel, retries_total).await?;

        // 3. Reconcile.
        let diff = SecretDiff::between(&current, &desired);
        let mut applied = 0usize;

        if !options.dry_run {
            for change in &diff.changes {
                if cancel.is_cancelled() {
                    return Err(SyncError::cancelled());
                }
                match change.change_type {
                    ChangeType::Added | ChangeType::Modified => {
                        let payload = change
                            .new_value
                            .as_ref()
                            .ok_or_else(|| SyncError::internal_error("change without new value"))?
                            .to_json_bytes()?;
                        let write =
                            retry_with_backoff(&self.retry, &target_breaker, "put-secret", cancel, || {
                                store.put(&change.path, &payload, None)
                            })
                            .await;
                        *retries_total += write.retries;
                        write.result?;
                        applied += 1;
                    }
                    ChangeType::Removed if options.delete_orphans => {
                        // Remove every spelling we saw, canonical included.
                        let names = variants.get(&change.path).cloned().unwrap_or_else(|| vec![change.path.clone()]);
                        for name in names {
                            let delete =
                                retry_with_backoff(&self.retry, &target_breaker, "delete-secret", cancel, || {
                                    store.delete(&name)
                                })
                                .await;
                            *retries_total += delete.retries;
                            delete.result?;
                        }
                        applied += 1;
                    }
                    ChangeType::Removed | ChangeType::Unchanged => {}
                }
            }
        }

        Ok((diff, applied))
    }

    /// Lists and reads the target store under the target's namespace.
    ///
    /// Returns the canonical-name → secret map plus, per canonical name,
    /// every actual spelling encountered (for orphan deletion).
    async fn read_current(
        &self,
        plan: &TargetPlan,
        store: &dyn TargetStore,
        cancel: &CancellationToken,
        retries_total: &mut u32,
    ) -> Result<(BTreeMap<String, Secret>, HashMap<String, Vec<String>>), SyncError> {
        let target_breaker = self.breakers.breaker("target-store");

        // Both naming conventions are listed: the canonical prefix and
        // the leading-slash variant.
        let prefixes: Vec<Option<String>> = match &plan.target.secret_prefix {
            Some(prefix) => vec![Some(prefix.to_string()), Some(format!("/{prefix}"))],
            None => vec![None],
        };

        let mut current: BTreeMap<String, Secret> = BTreeMap::new();
        let mut variants: HashMap<String, Vec<String>> = HashMap::new();

        for prefix in prefixes {
            let listing = retry_with_backoff(&self.retry, &target_breaker, "list-secrets", cancel, || {
                store.list_all(prefix.as_deref())
            })
            .await;
            *retries_total += listing.retries;

            for entry in listing.result? {
                let canonical = entry.name.trim_start_matches('/').to_string();
                let spellings = variants.entry(canonical.clone()).or_default();
                if spellings.contains(&entry.name) {
                    continue;
                }
                spellings.push(entry.name.clone());

                if current.contains_key(&canonical) {
                    continue;
                }

                let read = retry_with_backoff(&self.retry, &target_breaker, "get-secret", cancel, || {
                    store.get(&entry.handle)
                })
                .await;
                *retries_total += read.retries;
                let payload = read.result?;
                current.insert(canonical, Secret::from_json_bytes(&payload)?);
            }
        }

        Ok((current, variants))
    }
}
