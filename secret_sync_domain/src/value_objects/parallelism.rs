// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parallelism Value Object
//!
//! Bounded worker-pool width for per-target operations. The orchestrator
//! schedules at most this many concurrent merge or sync operations within a
//! dependency layer.
//!
//! The bound is clamped on construction: at least one worker (the pipeline
//! must make progress), at most [`Parallelism::MAX_WORKERS`] (per-target
//! operations are I/O-heavy and store providers throttle aggressively past
//! a few dozen concurrent callers).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounded number of concurrent per-target workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parallelism(usize);

impl Parallelism {
    /// Minimum number of workers (always at least 1)
    pub const MIN_WORKERS: usize = 1;

    /// Maximum number of workers
    pub const MAX_WORKERS: usize = 64;

    /// Default worker count
    pub const DEFAULT_WORKERS: usize = 4;

    /// Creates a new `Parallelism`, clamping to the valid range
    pub fn new(count: usize) -> Self {
        Self(count.clamp(Self::MIN_WORKERS, Self::MAX_WORKERS))
    }

    /// Returns the number of workers
    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self(Self::DEFAULT_WORKERS)
    }
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Parallelism {
    fn from(count: usize) -> Self {
        Self::new(count)
    }
}
