// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Identifier Value Object
//!
//! ULID-backed identifier allocated once per pipeline run. The run id is
//! attached to every log line, error, and result so activity across
//! concurrent workers can be correlated back to the invocation that caused
//! it. ULIDs are time-ordered, so sorting run ids sorts runs
//! chronologically.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use ulid::Ulid;

/// Run-scoped request identifier.
///
/// Freshly generated by the orchestrator at run entry and propagated through
/// tracing spans and per-target outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    /// Generates a fresh run id
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parses a run id from its canonical string form
    pub fn parse(raw: &str) -> Result<Self, ulid::DecodeError> {
        Ulid::from_string(raw).map(Self)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
