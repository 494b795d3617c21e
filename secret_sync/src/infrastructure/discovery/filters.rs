// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tag Filters
//!
//! Account selection by tag. A single filter matches when the account's
//! value for the filter key equals / contains / wildcard-matches any of
//! the filter's values; all comparisons are case-insensitive. Filters
//! combine with `AND` (default) or `OR`. An account with no tag map, or
//! missing the filter key, never matches that filter.
//!
//! Wildcards: `*` matches any substring including the empty one, `?`
//! matches exactly one character.

use serde::{Deserialize, Serialize};

use secret_sync_domain::entities::AccountInfo;

/// Comparison operator for one tag filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOperator {
    #[default]
    Equals,
    Contains,
    Wildcard,
}

/// How multiple filters combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagCombination {
    #[default]
    And,
    Or,
}

/// One tag filter: key, candidate values, and comparison operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub key: String,

    #[serde(default)]
    pub values: Vec<String>,

    #[serde(default)]
    pub operator: TagOperator,
}

impl TagFilter {
    /// Checks one account against this filter.
    pub fn matches(&self, account: &AccountInfo) -> bool {
        let Some(actual) = account.tag(&self.key) else {
            return false;
        };
        let actual_lower = actual.to_lowercase();

        self.values.iter().any(|candidate| match self.operator {
            TagOperator::Equals => candidate.eq_ignore_ascii_case(actual),
            TagOperator::Contains => actual_lower.contains(&candidate.to_lowercase()),
            TagOperator::Wildcard => wildcard_match(&candidate.to_lowercase(), &actual_lower),
        })
    }
}

/// Checks an account against a filter list under the given combination.
///
/// An empty filter list matches everything.
pub fn filters_match(filters: &[TagFilter], combination: TagCombination, account: &AccountInfo) -> bool {
    if filters.is_empty() {
        return true;
    }
    match combination {
        TagCombination::And => filters.iter().all(|f| f.matches(account)),
        TagCombination::Or => filters.iter().any(|f| f.matches(account)),
    }
}

/// Glob match with `*` (zero or more) and `?` (exactly one).
///
/// Iterative two-pointer algorithm with star backtracking; linear in
/// practice and free of recursion.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            // Backtrack: let the last star consume one more character.
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
