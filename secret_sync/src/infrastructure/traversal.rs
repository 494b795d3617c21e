// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Traversal
//!
//! Breadth-first enumeration of the leaf secrets below a source-store
//! prefix, with an explicit work queue, cycle detection, and hard bounds.
//!
//! ## Behavior
//!
//! - Child names pass through the path validator; invalid names are
//!   counted and skipped with a warning, never aborting the traversal
//! - `AccessDenied` on a subtree logs and skips the subtree; any other
//!   listing error propagates
//! - Traversal refuses to descend past `max_depth` (`DepthExceeded`) and
//!   to emit more than `max_secrets_per_mount` leaves (`CountExceeded`),
//!   both fail-fast
//! - When the pending queue grows past the compaction threshold it is
//!   deduplicated in place, preserving order; the threshold is explicit
//!   or derived as `min(1000, max(1, max_secrets_per_mount / 100))`
//! - Cycles (a store reporting a directory that leads back to a visited
//!   prefix) are broken by a visited set on canonical paths

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::warn;

use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::stores::SourceStore;
use secret_sync_domain::value_objects::SecretPath;
use secret_sync_domain::SyncError;

/// Upper bound the adaptive compaction threshold never exceeds
const COMPACTION_CEILING: usize = 1000;

/// Traversal bounds, sourced from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalLimits {
    /// Maximum directory depth below the prefix
    pub max_depth: usize,

    /// Maximum number of leaves emitted per traversal
    pub max_secrets_per_mount: usize,

    /// Explicit queue-compaction threshold; derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_compaction_threshold: Option<usize>,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_secrets_per_mount: 10_000,
            queue_compaction_threshold: None,
        }
    }
}

impl TraversalLimits {
    /// Effective compaction threshold:
    /// `min(1000, max(1, max_secrets_per_mount / 100))` unless explicit.
    pub fn compaction_threshold(&self) -> usize {
        self.queue_compaction_threshold
            .unwrap_or_else(|| COMPACTION_CEILING.min((self.max_secrets_per_mount / 100).max(1)))
    }
}

/// Result of one traversal.
#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    /// Leaf secret paths in breadth-first discovery order
    pub leaves: Vec<SecretPath>,

    /// Child names rejected by the path validator
    pub invalid_children: usize,

    /// Subtrees skipped due to access denial
    pub denied_subtrees: usize,
}

/// Enumerates all leaf secret paths below `prefix`.
///
/// # Errors
///
/// - [`SyncError::DepthExceeded`] / [`SyncError::CountExceeded`] when a
///   bound is hit
/// - [`SyncError::Cancelled`] when the run's token fires
/// - any non-permission listing error, propagated
pub async fn enumerate_leaves(
    store: &dyn SourceStore,
    prefix: &SecretPath,
    limits: &TraversalLimits,
    cancel: &CancellationToken,
) -> Result<TraversalOutcome, SyncError> {
    let threshold = limits.compaction_threshold();
    let mut outcome = TraversalOutcome::default();
    let mut visited: HashSet<SecretPath> = HashSet::new();
    let mut queue: VecDeque<(SecretPath, usize)> = VecDeque::new();
    queue.push_back((prefix.clone(), 0));

    while let Some((node, depth)) = queue.pop_front() {
        if cancel.is_cancelled() {
            return Err(SyncError::cancelled());
        }
        if !visited.insert(node.clone()) {
            continue;
        }

        let children = match store.list(&node).await {
            Ok(children) => children,
            Err(SyncError::AccessDenied(reason)) => {
                warn!(prefix = %node, reason = %reason, "skipping denied subtree");
                outcome.denied_subtrees += 1;
                continue;
            }
            Err(other) => return Err(other),
        };

        for child in children {
            let joined = match node.join(child.name()) {
                Ok(joined) => joined,
                Err(error) => {
                    warn!(prefix = %node, child = child.name(), error = %error, "skipping invalid child name");
                    outcome.invalid_children += 1;
                    continue;
                }
            };

            if child.is_directory() {
                if depth + 1 > limits.max_depth {
                    return Err(SyncError::DepthExceeded(format!(
                        "traversal of {prefix} exceeded max depth {} at {joined}",
                        limits.max_depth
                    )));
                }
                if !visited.contains(&joined) {
                    queue.push_back((joined, depth + 1));
                }
            } else {
                if outcome.leaves.len() >= limits.max_secrets_per_mount {
                    return Err(SyncError::CountExceeded(format!(
                        "traversal of {prefix} exceeded {} secrets",
                        limits.max_secrets_per_mount
                    )));
                }
                outcome.leaves.push(joined);
            }
        }

        if queue.len() > threshold {
            compact(&mut queue);
        }
    }

    Ok(outcome)
}

/// Deduplicates the pending queue in place, preserving first-seen order.
fn compact(queue: &mut VecDeque<(SecretPath, usize)>) {
    let mut seen: HashSet<SecretPath> = HashSet::with_capacity(queue.len());
    queue.retain(|(path, _)| seen.insert(path.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::stores::MemorySourceStore;
    use secret_sync_domain::value_objects::Secret;

    fn path(raw: &str) -> SecretPath {
        SecretPath::parse(raw).unwrap()
    }

    fn secret() -> Secret {
        Secret::from_json_bytes(br#"{"k":"v"}"#).unwrap()
    }

    fn store_with(paths: &[&str]) -> MemorySourceStore {
        let store = MemorySourceStore::new();
        for p in paths {
            store.insert(&path(p), secret());
        }
        store
    }

    #[tokio::test]
    async fn test_enumerates_nested_leaves_breadth_first() {
        let store = store_with(&["kv/app/db", "kv/app/api", "kv/app/deep/inner"]);
        let outcome = enumerate_leaves(
            &store,
            &path("kv/app"),
            &TraversalLimits::default(),
            &CancellationToken::unarmed(),
        )
        .await
        .unwrap();

        let leaves: Vec<&str> = outcome.leaves.iter().map(|p| p.as_str()).collect();
        // Shallow leaves first (breadth-first), then the nested one.
        assert_eq!(leaves, vec!["kv/app/api", "kv/app/db", "kv/app/deep/inner"]);
        assert_eq!(outcome.invalid_children, 0);
    }

    #[tokio::test]
    async fn test_depth_bound_fails_fast() {
        let store = store_with(&["kv/a/b/c/d/leaf"]);
        let limits = TraversalLimits {
            max_depth: 2,
            ..TraversalLimits::default()
        };
        let result = enumerate_leaves(&store, &path("kv"), &limits, &CancellationToken::unarmed()).await;
        assert!(matches!(result, Err(SyncError::DepthExceeded(_))));
    }

    #[tokio::test]
    async fn test_count_bound_fails_fast() {
        let store = store_with(&["kv/a", "kv/b", "kv/c"]);
        let limits = TraversalLimits {
            max_secrets_per_mount: 2,
            ..TraversalLimits::default()
        };
        let result = enumerate_leaves(&store, &path("kv"), &limits, &CancellationToken::unarmed()).await;
        assert!(matches!(result, Err(SyncError::CountExceeded(_))));
    }

    #[tokio::test]
    async fn test_denied_subtree_is_skipped() {
        let store = store_with(&["kv/open/a", "kv/locked/b"]);
        store.deny(&path("kv/locked"));
        let outcome = enumerate_leaves(
            &store,
            &path("kv"),
            &TraversalLimits::default(),
            &CancellationToken::unarmed(),
        )
        .await
        .unwrap();

        let leaves: Vec<&str> = outcome.leaves.iter().map(|p| p.as_str()).collect();
        assert_eq!(leaves, vec!["kv/open/a"]);
        assert_eq!(outcome.denied_subtrees, 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_traversal() {
        let store = store_with(&["kv/a"]);
        let cancel = CancellationToken::unarmed();
        cancel.cancel();
        let result = enumerate_leaves(&store, &path("kv"), &TraversalLimits::default(), &cancel).await;
        assert!(matches!(result, Err(SyncError::Cancelled(_))));
    }

    #[test]
    fn test_adaptive_compaction_threshold() {
        let explicit = TraversalLimits {
            queue_compaction_threshold: Some(7),
            ..TraversalLimits::default()
        };
        assert_eq!(explicit.compaction_threshold(), 7);

        let small = TraversalLimits {
            max_secrets_per_mount: 50,
            queue_compaction_threshold: None,
            ..TraversalLimits::default()
        };
        assert_eq!(small.compaction_threshold(), 1);

        let large = TraversalLimits {
            max_secrets_per_mount: 1_000_000,
            queue_compaction_threshold: None,
            ..TraversalLimits::default()
        };
        assert_eq!(large.compaction_threshold(), 1000);

        let default = TraversalLimits::default();
        assert_eq!(default.compaction_threshold(), 100);
    }

    #[test]
    fn test_compact_preserves_order() {
        let mut queue: VecDeque<(SecretPath, usize)> = VecDeque::new();
        queue.push_back((path("a"), 1));
        queue.push_back((path("b"), 1));
        queue.push_back((path("a"), 2));
        compact(&mut queue);
        let paths: Vec<&str> = queue.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["a", "b"]);
    }
}
