// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Diff Computation Service
//!
//! Computes the per-target change set between a "current" and a "desired"
//! secret mapping and aggregates change counts into run-wide totals.
//!
//! ## Contract
//!
//! For each path present in either side: only in desired → `added`; only
//! in current → `removed`; both and structurally equal → `unchanged`;
//! otherwise `modified`. Entries are ordered lexicographically by path so
//! output is deterministic. Applying a diff to `current` (with orphan
//! deletion) reproduces `desired` exactly.
//!
//! Rendering (human, side-by-side, JSON, compact) lives in the
//! infrastructure layer; this module owns only the computation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::ops::AddAssign;

use crate::entities::Bundle;
use crate::value_objects::Secret;

/// Classification of a single path's change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
    Unchanged,
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Removed => "removed",
            ChangeType::Unchanged => "unchanged",
        };
        write!(f, "{label}")
    }
}

/// One path's change between current and desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretChange {
    /// Secret path (output name within the bundle / target store)
    pub path: String,

    /// Change classification
    pub change_type: ChangeType,

    /// Value on the current side, absent for `added`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Secret>,

    /// Value on the desired side, absent for `removed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Secret>,
}

/// Aggregated change counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffTotals {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffTotals {
    /// Total number of entries across all change types
    pub fn total(&self) -> usize {
        self.added + self.modified + self.removed + self.unchanged
    }

    /// Number of entries that represent actual drift
    pub fn changed(&self) -> usize {
        self.added + self.modified + self.removed
    }

    /// True when nothing would change
    pub fn is_zero_sum(&self) -> bool {
        self.changed() == 0
    }
}

impl AddAssign for DiffTotals {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.modified += other.modified;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
    }
}

/// Ordered change set for one target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecretDiff {
    /// Changes ordered lexicographically by path
    pub changes: Vec<SecretChange>,

    /// Counts per change type
    pub totals: DiffTotals,
}

impl SecretDiff {
    /// Computes the diff between two secret mappings.
    pub fn between(current: &BTreeMap<String, Secret>, desired: &BTreeMap<String, Secret>) -> Self {
        let mut changes = Vec::new();
        let mut totals = DiffTotals::default();

        // BTreeMap keys are already sorted; a merged walk keeps the output
        // lexicographic without a separate sort.
        let mut paths: Vec<&String> = current.keys().chain(desired.keys()).collect();
        paths.sort();
        paths.dedup();

        for path in paths {
            let change = match (current.get(path.as_str()), desired.get(path.as_str())) {
                (None, Some(new)) => {
                    totals.added += 1;
                    SecretChange {
                        path: path.clone(),
                        change_type: ChangeType::Added,
                        old_value: None,
                        new_value: Some(new.clone()),
                    }
                }
                (Some(old), None) => {
                    totals.removed += 1;
                    SecretChange {
                        path: path.clone(),
                        change_type: ChangeType::Removed,
                        old_value: Some(old.clone()),
                        new_value: None,
                    }
                }
                (Some(old), Some(new)) if old == new => {
                    totals.unchanged += 1;
                    SecretChange {
                        path: path.clone(),
                        change_type: ChangeType::Unchanged,
                        old_value: Some(old.clone()),
                        new_value: Some(new.clone()),
                    }
                }
                (Some(old), Some(new)) => {
                    totals.modified += 1;
                    SecretChange {
                        path: path.clone(),
                        change_type: ChangeType::Modified,
                        old_value: Some(old.clone()),
                        new_value: Some(new.clone()),
                    }
                }
                (None, None) => unreachable!("path came from one of the two maps"),
            };
            changes.push(change);
        }

        Self { changes, totals }
    }

    /// Computes the diff between two bundles.
    pub fn between_bundles(current: &Bundle, desired: &Bundle) -> Self {
        Self::between(current.secrets(), desired.secrets())
    }

    /// True when nothing would change
    pub fn is_zero_sum(&self) -> bool {
        self.totals.is_zero_sum()
    }
}
