// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Path Value Object
//!
//! Canonical, validated slash-delimited path within a store. This is the
//! single choke point for path hygiene: every path arriving from the source
//! store, discovery sources, or configuration passes through
//! [`SecretPath::parse`] before it is used in I/O.
//!
//! ## Canonicalization and Rejection
//!
//! - Exactly one trailing slash is stripped if present
//! - The result must be non-empty
//! - Rejected outright: `..` anywhere, NUL bytes, `//`, a leading `/`
//!
//! A well-formed path's segments are all non-empty, which the rejection
//! rules guarantee by construction.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::SyncError;

/// Validated slash-delimited path within a source, merge, or target store.
///
/// Construction via [`SecretPath::parse`] is the only way to obtain one, so
/// holding a `SecretPath` is proof the path passed validation. The type is
/// immutable; [`SecretPath::join`] returns a new validated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SecretPath(String);

impl SecretPath {
    /// Parses and canonicalizes a raw path string.
    ///
    /// Strips exactly one trailing slash, then rejects empty results,
    /// parent references (`..`), NUL bytes, consecutive slashes, and
    /// leading slashes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPath`] describing the first rule the
    /// input violated.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        // Rejection rules apply to the raw input: canonicalization must not
        // turn a rejected spelling (`a//`) into an accepted one (`a/`).
        if raw.starts_with('/') {
            return Err(SyncError::invalid_path(format!("path has a leading slash: {raw:?}")));
        }
        if raw.contains("//") {
            return Err(SyncError::invalid_path(format!(
                "path contains consecutive slashes: {raw:?}"
            )));
        }
        if raw.contains('\0') {
            return Err(SyncError::invalid_path("path contains a NUL byte"));
        }
        if raw.contains("..") {
            return Err(SyncError::invalid_path(format!(
                "path contains a parent reference: {raw:?}"
            )));
        }

        let canonical = raw.strip_suffix('/').unwrap_or(raw);
        if canonical.is_empty() {
            return Err(SyncError::invalid_path("path is empty"));
        }

        Ok(Self(canonical.to_string()))
    }

    /// Returns the canonical path string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path segments in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns the final path segment (the leaf name)
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the number of segments
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// Appends a child segment, re-validating the result.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPath`] when the joined path violates any
    /// validation rule (e.g. the child itself contains `..`).
    pub fn join(&self, child: &str) -> Result<Self, SyncError> {
        if child.is_empty() {
            return Err(SyncError::invalid_path("child segment is empty"));
        }
        Self::parse(&format!("{}/{}", self.0, child))
    }

    /// Checks whether this path lies under the given prefix
    pub fn starts_with(&self, prefix: &SecretPath) -> bool {
        self.0 == prefix.0 || self.0.starts_with(&format!("{}/", prefix.0))
    }
}

impl Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SecretPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Deserialization re-validates: paths stored in config files or bundles go
// through the same rules as paths arriving from live stores.
impl<'de> Deserialize<'de> for SecretPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        SecretPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_accepts_simple_paths() {
        assert_eq!(SecretPath::parse("a/b/c").unwrap().as_str(), "a/b/c");
        assert_eq!(SecretPath::parse("single").unwrap().as_str(), "single");
    }

    #[test]
    fn test_parse_strips_one_trailing_slash() {
        assert_eq!(SecretPath::parse("a/b/").unwrap().as_str(), "a/b");
        // Two trailing slashes are consecutive slashes, not canonicalizable
        assert!(SecretPath::parse("a/b//").is_err());
    }

    #[test]
    fn test_parse_rejects_unsafe_paths() {
        assert!(SecretPath::parse("").is_err());
        assert!(SecretPath::parse("/").is_err());
        assert!(SecretPath::parse("/abs").is_err());
        assert!(SecretPath::parse("a//b").is_err());
        assert!(SecretPath::parse("a/../b").is_err());
        assert!(SecretPath::parse("..").is_err());
        assert!(SecretPath::parse("a/b\0c").is_err());
    }

    #[test]
    fn test_segments_and_leaf() {
        let path = SecretPath::parse("env/prod/db").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["env", "prod", "db"]);
        assert_eq!(path.last_segment(), "db");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_join() {
        let base = SecretPath::parse("env/prod").unwrap();
        assert_eq!(base.join("db").unwrap().as_str(), "env/prod/db");
        assert!(base.join("../escape").is_err());
        assert!(base.join("").is_err());
    }

    #[test]
    fn test_starts_with() {
        let prefix = SecretPath::parse("env/prod").unwrap();
        assert!(SecretPath::parse("env/prod/db").unwrap().starts_with(&prefix));
        assert!(SecretPath::parse("env/prod").unwrap().starts_with(&prefix));
        assert!(!SecretPath::parse("env/production").unwrap().starts_with(&prefix));
    }

    proptest! {
        // Printable segments joined by single slashes are always accepted.
        #[test]
        fn prop_accepts_printable_segmented_paths(
            segments in proptest::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6)
        ) {
            // Filter out segments that happen to be ".." or contain it
            prop_assume!(segments.iter().all(|s| !s.contains("..")));
            let joined = segments.join("/");
            let parsed = SecretPath::parse(&joined).unwrap();
            prop_assert_eq!(parsed.as_str(), joined.as_str());
        }

        // Every string containing a forbidden construct is rejected.
        #[test]
        fn prop_rejects_forbidden_constructs(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
            for bad in ["..", "\0", "//"] {
                let candidate = format!("{prefix}{bad}{suffix}");
                prop_assert!(SecretPath::parse(&candidate).is_err());
            }
            let leading = format!("/{prefix}");
            prop_assert!(SecretPath::parse(&leading).is_err());
        }
    }
}
