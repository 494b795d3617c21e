// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! Core entities of the synchronization domain: named sources, sync
//! targets (static and dynamic), discovered account metadata, and the
//! per-run report types.

pub mod account_info;
pub mod bundle;
pub mod run_report;
pub mod source;
pub mod target;

pub use account_info::AccountInfo;
pub use bundle::Bundle;
pub use run_report::{Operation, OutcomeDetails, OutputFormat, Phase, RunReport, TargetOutcome};
pub use source::Source;
pub use target::{DynamicTarget, ImportRef, Target};
