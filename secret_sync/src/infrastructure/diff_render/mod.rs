// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Diff Rendering
//!
//! Presentation of a run's diffs in four formats:
//!
//! - `human` - per-target sections with colored `+`/`-`/`~` lines and a
//!   closing succeeded/failed summary
//! - `side-by-side` - aligned two-column old/new view, values masked
//!   unless `show_values` is set
//! - `json` - machine-readable, masking applied by the same rule
//! - `compact` - a single `±N +A ~M -R` line for CI status
//!
//! Masking rules live in [`mask`]; computation lives in the domain's diff
//! service. This module only formats.

pub mod mask;

use colored::Colorize;
use serde_json::json;

use secret_sync_domain::entities::{OutputFormat, RunReport, TargetOutcome};
use secret_sync_domain::services::{ChangeType, DiffTotals, SecretChange};
use secret_sync_domain::value_objects::Secret;

use mask::masked_secret;

/// Column width for the side-by-side layout
const COLUMN_WIDTH: usize = 44;

/// Rendering options.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Disables masking
    pub show_values: bool,
    /// Enables ANSI color (human format only)
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            show_values: false,
            color: true,
        }
    }
}

/// Renders a run report in the selected format.
pub fn render_report(report: &RunReport, options: &RenderOptions) -> String {
    match options.format {
        OutputFormat::Human => render_human(report, options),
        OutputFormat::SideBySide => render_side_by_side(report, options),
        OutputFormat::Json => render_json(report, options),
        OutputFormat::Compact => render_compact(&report.totals),
    }
}

fn change_marker(change: ChangeType) -> &'static str {
    match change {
        ChangeType::Added => "+",
        ChangeType::Modified => "~",
        ChangeType::Removed => "-",
        ChangeType::Unchanged => " ",
    }
}

fn colorize(marker_line: String, change: ChangeType, color: bool) -> String {
    if !color {
        return marker_line;
    }
    match change {
        ChangeType::Added => marker_line.green().to_string(),
        ChangeType::Modified => marker_line.yellow().to_string(),
        ChangeType::Removed => marker_line.red().to_string(),
        ChangeType::Unchanged => marker_line,
    }
}

fn render_human(report: &RunReport, options: &RenderOptions) -> String {
    let mut out = String::new();

    for outcome in &report.outcomes {
        let Some(diff) = &outcome.diff else { continue };
        let phase = match outcome.phase {
            secret_sync_domain::entities::Phase::Merge => "merge",
            secret_sync_domain::entities::Phase::Sync => "sync",
        };
        out.push_str(&format!(
            "{} ({phase}): +{} ~{} -{}\n",
            outcome.target, diff.totals.added, diff.totals.modified, diff.totals.removed
        ));

        for change in &diff.changes {
            if change.change_type == ChangeType::Unchanged {
                continue;
            }
            let line = format!("  {} {}\n", change_marker(change.change_type), change.path);
            out.push_str(&colorize(line, change.change_type, options.color));
        }
    }

    for outcome in report.outcomes.iter().filter(|o| !o.success) {
        let line = format!(
            "failed: {} ({})\n",
            outcome.target,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
        out.push_str(&if options.color { line.red().to_string() } else { line });
    }

    out.push_str(&format!(
        "{} succeeded, {} failed, {} added, {} modified, {} removed\n",
        report.succeeded(),
        report.failed(),
        report.totals.added,
        report.totals.modified,
        report.totals.removed
    ));
    out
}

fn display_value(secret: Option<&Secret>, show_values: bool) -> String {
    match secret {
        None => "(absent)".to_string(),
        Some(secret) if show_values => {
            serde_json::to_string(secret.as_map()).unwrap_or_else(|_| "(unrenderable)".to_string())
        }
        Some(secret) => masked_secret(secret).to_string(),
    }
}

fn render_side_by_side(report: &RunReport, options: &RenderOptions) -> String {
    let mut out = String::new();

    let width = COLUMN_WIDTH;
    for outcome in &report.outcomes {
        let Some(diff) = &outcome.diff else { continue };
        out.push_str(&format!("== {} ==\n", outcome.target));
        out.push_str(&format!("{:<width$} | {}\n", "current", "desired"));

        for change in &diff.changes {
            if change.change_type == ChangeType::Unchanged {
                continue;
            }
            let old = display_value(change.old_value.as_ref(), options.show_values);
            let new = display_value(change.new_value.as_ref(), options.show_values);
            out.push_str(&format!(
                "{} {}\n",
                change_marker(change.change_type),
                change.path
            ));
            out.push_str(&format!("  {:<width$} | {}\n", truncate(&old), truncate(&new)));
        }
    }

    out
}

fn truncate(rendered: &str) -> String {
    if rendered.chars().count() <= COLUMN_WIDTH {
        return rendered.to_string();
    }
    let cut: String = rendered.chars().take(COLUMN_WIDTH - 1).collect();
    format!("{cut}…")
}

fn change_json(change: &SecretChange, show_values: bool) -> serde_json::Value {
    let value_of = |secret: &Option<Secret>| -> serde_json::Value {
        match secret {
            None => serde_json::Value::Null,
            Some(secret) if show_values => {
                serde_json::to_value(secret.as_map()).unwrap_or(serde_json::Value::Null)
            }
            Some(secret) => masked_secret(secret),
        }
    };

    json!({
        "path": change.path,
        "change": change.change_type.to_string(),
        "old_value": value_of(&change.old_value),
        "new_value": value_of(&change.new_value),
    })
}

fn outcome_json(outcome: &TargetOutcome, show_values: bool) -> serde_json::Value {
    json!({
        "target": outcome.target,
        "phase": outcome.phase,
        "success": outcome.success,
        "error": outcome.error,
        "duration_ms": outcome.duration_ms,
        "retries": outcome.retries,
        "failed_imports": outcome.details.failed_imports,
        "changes": outcome
            .diff
            .as_ref()
            .map(|diff| diff.changes.iter().map(|c| change_json(c, show_values)).collect::<Vec<_>>()),
    })
}

fn render_json(report: &RunReport, options: &RenderOptions) -> String {
    let document = json!({
        "run_id": report.run_id.to_string(),
        "totals": report.totals,
        "exit_code": report.exit_code(),
        "targets": report.outcomes.iter().map(|o| outcome_json(o, options.show_values)).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
}

fn render_compact(totals: &DiffTotals) -> String {
    format!(
        "±{} +{} ~{} -{}",
        totals.changed(),
        totals.added,
        totals.modified,
        totals.removed
    )
}
