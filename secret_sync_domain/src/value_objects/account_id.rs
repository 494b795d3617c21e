// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Account Identifier Value Object
//!
//! Twelve-decimal-digit account identifier with validation on construction.
//! Target declarations and discovered accounts both carry this type, so an
//! unvalidated account id never reaches a store client.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::SyncError;

/// Validated 12-decimal-digit account identifier.
///
/// The format invariant is enforced at every construction site, including
/// deserialization from configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Number of decimal digits in a well-formed account id
    pub const DIGITS: usize = 12;

    /// Parses an account id, enforcing the 12-decimal-digit invariant.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidAccountId`] when the input has the wrong
    /// length or contains a non-digit character.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        if Self::is_well_formed(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(SyncError::InvalidAccountId(format!(
                "expected {} decimal digits, got {raw:?}",
                Self::DIGITS
            )))
        }
    }

    /// Checks whether a string has the shape of an account id without
    /// constructing one. Used by the name resolver's classification step.
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == Self::DIGITS && raw.bytes().all(|b| b.is_ascii_digit())
    }

    /// Returns the account id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        AccountId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = AccountId::parse("123456789012").unwrap();
        assert_eq!(id.as_str(), "123456789012");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(AccountId::parse("12345678901").is_err());
        assert!(AccountId::parse("1234567890123").is_err());
        assert!(AccountId::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert!(AccountId::parse("12345678901a").is_err());
        assert!(AccountId::parse("123456 89012").is_err());
    }

    #[test]
    fn test_is_well_formed() {
        assert!(AccountId::is_well_formed("000000000000"));
        assert!(!AccountId::is_well_formed("111111111111111"));
    }
}
