// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Utilities
//!
//! Supervised execution for the per-target worker pool.

pub mod supervisor;

pub use supervisor::{join_worker, spawn_worker, WorkerResult};
