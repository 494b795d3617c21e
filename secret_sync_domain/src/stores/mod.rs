// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Capability Ports
//!
//! Async traits the infrastructure layer implements against concrete
//! providers. The domain defines the contracts only; provider SDK bindings
//! live outside this workspace's scope.
//!
//! All four ports speak [`SyncError`](crate::SyncError): `NotFound`,
//! `AccessDenied`, and the transient kinds (`Timeout`, `RateLimited`,
//! `NetworkError`) are the error surface adapters are expected to map
//! provider errors onto.

pub mod account_directory;
pub mod merge_store;
pub mod source_store;
pub mod target_store;

pub use account_directory::AccountDirectory;
pub use merge_store::MergeStore;
pub use source_store::{ChildEntry, SourceStore};
pub use target_store::{ListPage, TargetEntry, TargetStore};
