// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Report Entities
//!
//! Per-target outcomes and the run-wide report the orchestrator hands back
//! to the caller. The report owns the exit-code contract:
//!
//! - `2` when any target result is failed
//! - `1` when the aggregate diff shows drift (added + modified + removed > 0)
//! - `0` otherwise

use serde::{Deserialize, Serialize};

use crate::services::diff::{DiffTotals, SecretDiff};
use crate::value_objects::RunId;

/// Which pipeline operation a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Merge,
    Sync,
    #[default]
    Both,
}

impl Operation {
    /// True when the run includes the merge phase
    pub fn includes_merge(&self) -> bool {
        matches!(self, Operation::Merge | Operation::Both)
    }

    /// True when the run includes the sync phase
    pub fn includes_sync(&self) -> bool {
        matches!(self, Operation::Sync | Operation::Both)
    }
}

/// Diff output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Human,
    SideBySide,
    Json,
    Compact,
}

/// Phase a target outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Merge,
    Sync,
}

/// Operation-level detail attached to a target outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDetails {
    /// Number of secrets the operation touched
    pub secrets_processed: usize,

    /// Resolved source paths, in declared import order
    #[serde(default)]
    pub source_paths: Vec<String>,

    /// Where the operation wrote (bundle path or target-store namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Role the target-store client assumed, when one was configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_hint: Option<String>,

    /// Imports that failed to read; non-empty marks the outcome failed
    #[serde(default)]
    pub failed_imports: Vec<String>,
}

/// Result of one per-target operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    /// Target name
    pub target: String,

    /// Phase the operation ran in
    pub phase: Phase,

    /// Whether the operation succeeded
    pub success: bool,

    /// Error message for failed operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration of the operation in milliseconds
    pub duration_ms: u64,

    /// Number of retries the operation consumed
    #[serde(default)]
    pub retries: u32,

    /// Operation detail
    #[serde(default)]
    pub details: OutcomeDetails,

    /// Per-target diff, present when diffing was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<SecretDiff>,
}

impl TargetOutcome {
    /// Creates a successful outcome
    pub fn success(target: impl Into<String>, phase: Phase, duration_ms: u64) -> Self {
        Self {
            target: target.into(),
            phase,
            success: true,
            error: None,
            duration_ms,
            retries: 0,
            details: OutcomeDetails::default(),
            diff: None,
        }
    }

    /// Creates a failed outcome
    pub fn failure(target: impl Into<String>, phase: Phase, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            phase,
            success: false,
            error: Some(error.into()),
            duration_ms,
            retries: 0,
            details: OutcomeDetails::default(),
            diff: None,
        }
    }
}

/// Exit code when any target failed
pub const EXIT_FAILED: i32 = 2;
/// Exit code when the run succeeded but found drift
pub const EXIT_DRIFT: i32 = 1;
/// Exit code for a clean, drift-free run
pub const EXIT_CLEAN: i32 = 0;

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Request identifier allocated at run entry
    pub run_id: RunId,

    /// Outcomes in completion order
    pub outcomes: Vec<TargetOutcome>,

    /// Aggregated diff counts across both phases
    pub totals: DiffTotals,
}

impl RunReport {
    /// Creates a report for a run
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            outcomes: Vec::new(),
            totals: DiffTotals::default(),
        }
    }

    /// Number of successful outcomes
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Number of failed outcomes
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    /// Derives the process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 {
            EXIT_FAILED
        } else if !self.totals.is_zero_sum() {
            EXIT_DRIFT
        } else {
            EXIT_CLEAN
        }
    }
}
