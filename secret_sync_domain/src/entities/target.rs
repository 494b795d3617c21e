// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Target Entities
//!
//! Sync destinations. A [`Target`] is a named destination bound to an
//! account, carrying an ordered import list whose elements name either a
//! source or another target (inheritance). Targets are created from static
//! configuration or expanded from a [`DynamicTarget`] template by account
//! discovery before a run starts, and are immutable during the run.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::value_objects::{AccountId, SecretPath};

/// Ordered import declaration element.
///
/// Refers to a source name or a target name; which one is decided when the
/// dependency graph is built, sources taking precedence over targets with
/// the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportRef(String);

impl ImportRef {
    /// Creates an import reference
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the referenced name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ImportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImportRef {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Named sync destination bound to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name; the identity used by the dependency graph and the
    /// merge-store layout
    pub name: String,

    /// Account the target store lives in
    pub account_id: AccountId,

    /// Optional region for the target store client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Ordered imports; each names a source or another target
    #[serde(default)]
    pub imports: Vec<ImportRef>,

    /// Optional prefix applied to target-store secret names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_prefix: Option<SecretPath>,

    /// Optional role to assume when writing to the target account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

impl Target {
    /// Creates a target with the given name, account, and imports
    pub fn new(name: impl Into<String>, account_id: AccountId, imports: Vec<ImportRef>) -> Self {
        Self {
            name: name.into(),
            account_id,
            region: None,
            imports,
            secret_prefix: None,
            role_arn: None,
        }
    }

    /// Sets the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the target-store secret prefix
    pub fn with_secret_prefix(mut self, prefix: SecretPath) -> Self {
        self.secret_prefix = Some(prefix);
        self
    }

    /// Sets the role to assume
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }
}

/// Template variable expanded in dynamic-target role ARNs
pub const ROLE_ARN_ACCOUNT_VAR: &str = "{AccountId}";

/// Template producing zero or more targets at run start via discovery.
///
/// Discovered account names are sanitized into target names; a collision
/// with a static target leaves the static target in place (the dynamic one
/// is skipped with a warning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicTarget {
    /// Template name, used in diagnostics only
    pub name: String,

    /// Organizational units to enumerate; empty means the whole directory
    #[serde(default)]
    pub ou_ids: Vec<String>,

    /// Whether OU enumeration descends into child OUs
    #[serde(default)]
    pub recursive: bool,

    /// Opaque external-list reference (e.g. a parameter-store URI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_list: Option<String>,

    /// Imports applied to discovered targets that match no fuzzy rule
    #[serde(default)]
    pub default_imports: Vec<ImportRef>,

    /// Region applied to produced targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Secret prefix applied to produced targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_prefix: Option<SecretPath>,

    /// Role ARN template; `{AccountId}` expands to the discovered account id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn_template: Option<String>,
}

impl DynamicTarget {
    /// Expands the role ARN template for a discovered account
    pub fn expand_role_arn(&self, account_id: &AccountId) -> Option<String> {
        self.role_arn_template
            .as_ref()
            .map(|template| template.replace(ROLE_ARN_ACCOUNT_VAR, account_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountId {
        AccountId::parse("123456789012").unwrap()
    }

    #[test]
    fn test_target_builder() {
        let target = Target::new("prod", account(), vec!["base".into(), "stage".into()])
            .with_region("us-east-1")
            .with_secret_prefix(SecretPath::parse("app").unwrap());
        assert_eq!(target.imports.len(), 2);
        assert_eq!(target.imports[0].as_str(), "base");
        assert_eq!(target.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_role_arn_expansion() {
        let template = DynamicTarget {
            name: "sandbox".to_string(),
            ou_ids: vec!["ou-root".to_string()],
            recursive: true,
            external_list: None,
            default_imports: vec!["base".into()],
            region: None,
            secret_prefix: None,
            role_arn_template: Some("arn:aws:iam::{AccountId}:role/sync".to_string()),
        };
        assert_eq!(
            template.expand_role_arn(&account()).unwrap(),
            "arn:aws:iam::123456789012:role/sync"
        );
    }
}
