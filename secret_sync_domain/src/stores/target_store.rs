// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Target Store Port
//!
//! Capability trait for a flat secret store scoped to one account and
//! region. Providers paginate their listings; the port exposes single
//! pages and the core aggregates them via [`TargetStore::list_all`].
//!
//! `put` carries create-or-update semantics: the adapter decides between
//! create and update based on existence. Implementations must be safe for
//! concurrent use - one client is shared by all workers targeting the
//! same account.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::SyncError;

/// One listed secret: its flat name plus the provider's handle (e.g. an
/// ARN) used for subsequent point reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub name: String,
    pub handle: String,
}

/// One page of a target-store listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<TargetEntry>,
    /// Opaque continuation token; `None` on the final page
    pub next: Option<String>,
}

/// Flat, per-account secret store capability.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Lists one page of secrets, optionally restricted to a name prefix.
    async fn list_page(&self, prefix: Option<&str>, page: Option<String>) -> Result<ListPage, SyncError>;

    /// Reads a secret's payload (UTF-8 JSON mapping) by name or handle.
    async fn get(&self, name_or_handle: &str) -> Result<Vec<u8>, SyncError>;

    /// Creates or updates a secret.
    async fn put(&self, name: &str, payload: &[u8], tags: Option<&HashMap<String, String>>)
        -> Result<(), SyncError>;

    /// Deletes a secret by name.
    async fn delete(&self, name: &str) -> Result<(), SyncError>;

    /// Aggregates all listing pages.
    async fn list_all(&self, prefix: Option<&str>) -> Result<Vec<TargetEntry>, SyncError> {
        let mut entries = Vec::new();
        let mut token = None;
        loop {
            let page = self.list_page(prefix, token).await?;
            entries.extend(page.entries);
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(entries)
    }
}
