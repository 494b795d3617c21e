// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Account Info Entity
//!
//! Metadata for one account as reported by the account directory. Tags may
//! be absent entirely; an account with no tag map never matches a tag
//! filter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::value_objects::AccountId;

/// Account metadata from the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account identifier
    pub id: AccountId,

    /// Human-readable account name
    pub name: String,

    /// Contact email, when the directory exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Lifecycle status (e.g. ACTIVE, SUSPENDED)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Organizational unit the account was found in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,

    /// Key/value tags; absent when the directory has none for the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

impl AccountInfo {
    /// Creates a minimal account record
    pub fn new(id: AccountId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            status: None,
            organizational_unit: None,
            tags: None,
        }
    }

    /// Returns the tag value for a key, if the account has tags at all
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    /// Checks the status against an exclusion list, case-insensitively
    pub fn status_excluded(&self, excluded: &[String]) -> bool {
        match &self.status {
            Some(status) => excluded.iter().any(|e| e.eq_ignore_ascii_case(status)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(status: Option<&str>) -> AccountInfo {
        AccountInfo {
            status: status.map(String::from),
            ..AccountInfo::new(AccountId::parse("123456789012").unwrap(), "Workload_A")
        }
    }

    #[test]
    fn test_status_exclusion_is_case_insensitive() {
        let suspended = account(Some("SUSPENDED"));
        assert!(suspended.status_excluded(&["suspended".to_string()]));
        assert!(!suspended.status_excluded(&["closed".to_string()]));
        assert!(!account(None).status_excluded(&["suspended".to_string()]));
    }

    #[test]
    fn test_tag_lookup_without_tags() {
        assert_eq!(account(None).tag("Env"), None);
    }
}
