// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Entity
//!
//! A named reference to a prefix in the hierarchical source store. Identity
//! is the name: two sources with the same name are the same source, and
//! import declarations refer to sources by name only.

use serde::{Deserialize, Serialize};

use crate::value_objects::SecretPath;

/// Named source-store prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Source name; the identity used by import declarations
    pub name: String,

    /// Prefix in the source store below which this source's secrets live
    pub prefix: SecretPath,
}

impl Source {
    /// Creates a new source
    pub fn new(name: impl Into<String>, prefix: SecretPath) -> Self {
        Self {
            name: name.into(),
            prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_name() {
        let a = Source::new("base", SecretPath::parse("kv/base").unwrap());
        assert_eq!(a.name, "base");
        assert_eq!(a.prefix.as_str(), "kv/base");
    }
}
