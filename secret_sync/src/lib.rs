// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Sync Application Layer
//!
//! The executable half of the synchronization engine, layered over the
//! domain crate:
//!
//! - **application** - the pipeline orchestrator and the merge/sync phase
//!   executors, composed from domain services and store ports
//! - **infrastructure** - source traversal, account discovery, resilience
//!   (retry + circuit breaker), bundle versioning, diff rendering,
//!   configuration loading, metrics, in-memory store adapters, and task
//!   supervision
//! - **presentation** - the command-line interface

pub mod application;
pub mod infrastructure;
pub mod presentation;
