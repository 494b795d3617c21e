// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Adapters
//!
//! Implementations of the domain's store ports. Only the in-memory
//! adapters live in this workspace; provider SDK bindings are external
//! collaborators that implement the same ports.
//!
//! [`TargetStoreProvider`] hands out one shared client per target
//! account/region; clients are created once and reused by every worker
//! that touches the same account.

pub mod memory;

use std::sync::Arc;

use secret_sync_domain::entities::Target;
use secret_sync_domain::stores::TargetStore;
use secret_sync_domain::SyncError;

pub use memory::{
    MemoryAccountDirectory, MemoryMergeStore, MemorySourceStore, MemoryTargetStore, MemoryTargetStoreProvider,
};

/// Hands out the target-store client for a target's account and region.
pub trait TargetStoreProvider: Send + Sync {
    /// Returns the (shared) client for this target's account/region.
    fn store_for(&self, target: &Target) -> Result<Arc<dyn TargetStore>, SyncError>;
}
