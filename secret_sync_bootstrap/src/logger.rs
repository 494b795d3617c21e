// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Initialization
//!
//! Installs the global tracing subscriber for the process. Filtering
//! follows `RUST_LOG` when set, otherwise the level passed by the CLI
//! (`--verbose` maps to debug). All pipeline activity logs through
//! structured `tracing` fields; the run id is attached by the
//! orchestrator's span, not here.

use tracing_subscriber::EnvFilter;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-oriented compact console output
    #[default]
    Text,

    /// One JSON object per line, for log shippers
    Json,
}

/// Initializes the global tracing subscriber.
///
/// Safe to call once per process; later calls are ignored (the first
/// subscriber wins), which keeps tests that initialize logging from
/// panicking.
pub fn init(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("secret_sync={default_level},warn")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    // A second init (tests, embedding) keeps the existing subscriber.
    drop(result);
}
