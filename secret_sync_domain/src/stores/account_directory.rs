// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Account Directory Port
//!
//! Capability trait for the account directory service used by dynamic
//! target discovery: flat and per-OU account enumeration, OU hierarchy
//! walks, tag lookup, and opaque parameter reads for external account
//! lists.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::entities::AccountInfo;
use crate::value_objects::AccountId;
use crate::SyncError;

/// Account directory capability.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Enumerates every account in the directory.
    async fn list_all(&self) -> Result<Vec<AccountInfo>, SyncError>;

    /// Enumerates the accounts directly inside one organizational unit.
    async fn list_in_ou(&self, ou_id: &str) -> Result<Vec<AccountInfo>, SyncError>;

    /// Enumerates the child organizational units of one unit.
    async fn list_child_ous(&self, ou_id: &str) -> Result<Vec<String>, SyncError>;

    /// Fetches an account's tags.
    async fn get_tags(&self, account_id: &AccountId) -> Result<HashMap<String, String>, SyncError>;

    /// Reads an opaque parameter (external-list discovery).
    async fn get_parameter(&self, name: &str) -> Result<String, SyncError>;
}
