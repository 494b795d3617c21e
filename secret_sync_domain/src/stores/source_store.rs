// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Store Port
//!
//! Capability trait for the hierarchical source store. Listing a prefix
//! yields children that are either leaf secrets or directory markers
//! (names with a trailing slash); traversal re-queues directories and
//! emits leaves.

use async_trait::async_trait;

use crate::value_objects::{Secret, SecretPath};
use crate::SyncError;

/// One child of a listed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildEntry {
    /// A leaf secret; the name is the final path segment
    Leaf(String),

    /// A sub-prefix; the name is the segment without its trailing slash
    Directory(String),
}

impl ChildEntry {
    /// Parses a raw child name as returned by a provider: a trailing
    /// slash marks a directory.
    pub fn from_raw(raw: &str) -> Self {
        match raw.strip_suffix('/') {
            Some(name) => ChildEntry::Directory(name.to_string()),
            None => ChildEntry::Leaf(raw.to_string()),
        }
    }

    /// Returns the child's bare name
    pub fn name(&self) -> &str {
        match self {
            ChildEntry::Leaf(name) | ChildEntry::Directory(name) => name,
        }
    }

    /// True for directory markers
    pub fn is_directory(&self) -> bool {
        matches!(self, ChildEntry::Directory(_))
    }
}

/// Hierarchical source store capability.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Lists the immediate children of a prefix.
    ///
    /// # Errors
    ///
    /// `NotFound` when the prefix does not exist, `AccessDenied` when the
    /// caller may not list it, or a transient error.
    async fn list(&self, prefix: &SecretPath) -> Result<Vec<ChildEntry>, SyncError>;

    /// Reads the secret at a leaf path.
    async fn get(&self, path: &SecretPath) -> Result<Secret, SyncError>;
}
