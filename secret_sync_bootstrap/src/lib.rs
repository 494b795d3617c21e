// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Sync Bootstrap
//!
//! Process-entry concerns shared by the binary and the tests: tracing
//! initialization, shutdown coordination with cancellation tokens, signal
//! wiring, and exit-code mapping.
//!
//! The bootstrap layer owns everything that happens before and after the
//! pipeline runs; the pipeline itself only ever sees a
//! [`CancellationToken`](shutdown::CancellationToken) and returns a report
//! the exit-code mapper consumes.

pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

pub use exit_code::ExitCode;
pub use shutdown::{CancellationToken, ShutdownCoordinator};
