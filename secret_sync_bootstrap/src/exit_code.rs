// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Process exit codes for the synchronizer.
//!
//! ## Run Contract
//!
//! A completed run maps directly onto CI-friendly codes:
//!
//! - **0**: no changes (clean)
//! - **1**: changes present (drift; used with dry-run gating)
//! - **2**: one or more targets failed
//!
//! Startup failures that prevent a run from beginning use BSD
//! `sysexits.h`-style codes so shells can tell configuration problems
//! apart from sync failures.

use std::fmt;

use secret_sync_domain::SyncError;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed with no changes (0)
    #[default]
    Clean = 0,

    /// Run completed and found or applied changes (1)
    Drift = 1,

    /// Run completed with one or more failed targets (2)
    Failed = 2,

    /// Command line usage error (64)
    UsageError = 64,

    /// Configuration error: bad config file, unresolved import,
    /// dependency cycle (78)
    ConfigError = 78,

    /// Internal software error (70)
    Software = 70,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a completed run's derived code (0/1/2) onto the enum
    pub fn from_run_code(code: i32) -> Self {
        match code {
            0 => ExitCode::Clean,
            1 => ExitCode::Drift,
            _ => ExitCode::Failed,
        }
    }

    /// Maps a startup error onto an exit code
    pub fn from_startup_error(error: &SyncError) -> Self {
        if error.is_configuration() {
            ExitCode::ConfigError
        } else {
            ExitCode::Software
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitCode::Clean => "clean",
            ExitCode::Drift => "drift",
            ExitCode::Failed => "failed",
            ExitCode::UsageError => "usage error",
            ExitCode::ConfigError => "configuration error",
            ExitCode::Software => "internal error",
        };
        write!(f, "{} ({})", label, self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_contract() {
        assert_eq!(ExitCode::from_run_code(0), ExitCode::Clean);
        assert_eq!(ExitCode::from_run_code(1), ExitCode::Drift);
        assert_eq!(ExitCode::from_run_code(2), ExitCode::Failed);
        assert_eq!(ExitCode::Failed.as_i32(), 2);
    }

    #[test]
    fn test_startup_error_mapping() {
        assert_eq!(
            ExitCode::from_startup_error(&SyncError::CycleDetected("x -> x".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from_startup_error(&SyncError::internal_error("boom")),
            ExitCode::Software
        );
    }
}
