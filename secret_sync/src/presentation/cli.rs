// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! The subcommand selects the operation (`merge`, `sync`, or `run` for
//! both); shared run flags override the corresponding configuration
//! defaults per invocation.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use secret_sync_domain::entities::{Operation, OutputFormat};
use secret_sync_domain::value_objects::Parallelism;

use crate::application::RunOptions;
use crate::infrastructure::config::SyncConfig;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "secret_sync")]
#[command(about = concat!("Secret Sync RS v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed file for the local in-memory source store (JSON mapping of
    /// path to secret), for dry runs and demos
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Merge sources into per-target bundles in the merge store
    Merge {
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Reconcile target stores against previously merged bundles
    Sync {
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Merge, then sync (the full pipeline)
    Run {
        #[command(flatten)]
        flags: RunFlags,
    },
}

impl Commands {
    /// The operation this subcommand performs
    pub fn operation(&self) -> Operation {
        match self {
            Commands::Merge { .. } => Operation::Merge,
            Commands::Sync { .. } => Operation::Sync,
            Commands::Run { .. } => Operation::Both,
        }
    }

    /// The shared run flags
    pub fn flags(&self) -> &RunFlags {
        match self {
            Commands::Merge { flags } | Commands::Sync { flags } | Commands::Run { flags } => flags,
        }
    }
}

/// Run flags shared by all subcommands; each overrides the matching
/// configuration default when present.
#[derive(Args, Debug, Clone, Default)]
pub struct RunFlags {
    /// Compute and report changes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep scheduling remaining targets after a failure
    #[arg(long)]
    pub continue_on_error: bool,

    /// Concurrent per-target operations (1-64)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Compute per-target diffs even outside dry runs
    #[arg(long)]
    pub diff: bool,

    /// Diff output format: human, side-by-side, json, compact
    #[arg(long, value_parser = parse_output_format)]
    pub output_format: Option<OutputFormat>,

    /// Show real values in diffs instead of masking them
    #[arg(long)]
    pub show_values: bool,

    /// Delete target-store secrets that are no longer in the bundle
    #[arg(long)]
    pub delete_orphans: bool,

    /// Restrict the run to these targets (plus their imports)
    #[arg(short, long)]
    pub target: Vec<String>,
}

fn parse_output_format(raw: &str) -> Result<OutputFormat, String> {
    match raw {
        "human" => Ok(OutputFormat::Human),
        "side-by-side" => Ok(OutputFormat::SideBySide),
        "json" => Ok(OutputFormat::Json),
        "compact" => Ok(OutputFormat::Compact),
        other => Err(format!(
            "unknown output format {other:?} (expected human, side-by-side, json, or compact)"
        )),
    }
}

impl Cli {
    /// Combines configuration defaults with this invocation's flags.
    pub fn run_options(&self, config: &SyncConfig) -> RunOptions {
        let flags = self.command.flags();
        RunOptions {
            operation: self.command.operation(),
            targets: flags.target.clone(),
            dry_run: flags.dry_run || config.dry_run,
            continue_on_error: flags.continue_on_error || config.continue_on_error,
            parallelism: flags.parallelism.map(Parallelism::new).unwrap_or(config.parallelism),
            compute_diff: flags.diff || config.compute_diff,
            output_format: flags.output_format.unwrap_or(config.output_format),
            show_values: flags.show_values || config.show_values,
            delete_orphans: flags.delete_orphans || config.delete_orphans,
        }
    }
}
