// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Name Resolution Service
//!
//! Fuzzy matching of account names to target declarations, plus the
//! classification of free-form references into accounts, targets, or
//! source prefixes.
//!
//! ## Normalization Pipeline
//!
//! Applied strictly in this order:
//!
//! 1. optional lowercasing
//! 2. strip configured prefixes (longest first, case-insensitive)
//! 3. strip configured suffixes (longest first)
//! 4. optional key normalization: `_` → `-`, drop anything that is not
//!    alphanumeric or a hyphen, collapse consecutive hyphens, trim
//!    leading/trailing hyphens
//!
//! ## Match Strategies
//!
//! - `exact` - the normalized name must match the pattern as a full
//!   string (the pattern gets a `(?i)` prefix under case-insensitive
//!   rules)
//! - `fuzzy` / `loose` - the pattern is wrapped in `.*` anchors on both sides and
//!   matched anywhere; substring and token-overlap heuristics are tried
//!   as fallbacks (tokens split on `-`, `_`, `.`, and whitespace, tokens
//!   shorter than 2 characters dropped, 60% or more overlap counts)
//!
//! Fuzzy candidates are examined over targets sorted by name; the first
//! match wins, which keeps resolution deterministic across runs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value_objects::AccountId;
use crate::SyncError;

/// Minimum token length considered by the overlap heuristic
const MIN_TOKEN_LEN: usize = 2;

/// Minimum token length considered by the token-substring heuristic
const MIN_SUBSTRING_TOKEN_LEN: usize = 3;

/// Fraction of overlapping tokens (against the smaller token set) that
/// counts as a fuzzy match
const TOKEN_OVERLAP_THRESHOLD: f64 = 0.6;

/// How patterns are matched against names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Exact,
    #[default]
    Fuzzy,
    Loose,
}

/// Confidence tier of a resolution, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    AccountId,
    Exact,
    Normalized,
    Fuzzy,
}

/// Classified reference produced by [`NameResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedReference {
    /// The input identified a known account
    Account {
        id: AccountId,
        name: String,
        confidence: MatchConfidence,
    },

    /// The input did not identify an account; treat it as a source-store
    /// prefix reference (the default classification)
    SourcePrefix { reference: String },
}

/// Normalization rules applied before matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRules {
    /// Lowercase names before any other step
    #[serde(default)]
    pub case_insensitive: bool,

    /// Prefixes stripped from names (longest first, case-insensitive)
    #[serde(default)]
    pub strip_prefixes: Vec<String>,

    /// Suffixes stripped from names (longest first)
    #[serde(default)]
    pub strip_suffixes: Vec<String>,

    /// Apply key normalization (`_` → `-`, strip punctuation, collapse
    /// hyphens)
    #[serde(default)]
    pub normalize_keys: bool,
}

impl NameRules {
    /// Runs the full normalization pipeline on a name.
    pub fn normalize(&self, name: &str) -> String {
        let mut result = if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        };

        let mut prefixes: Vec<&String> = self.strip_prefixes.iter().collect();
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        for prefix in prefixes {
            if result.len() >= prefix.len()
                && result.is_char_boundary(prefix.len())
                && result[..prefix.len()].eq_ignore_ascii_case(prefix)
            {
                result = result[prefix.len()..].to_string();
                break;
            }
        }

        let mut suffixes: Vec<&String> = self.strip_suffixes.iter().collect();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        for suffix in suffixes {
            if result.len() >= suffix.len()
                && result.is_char_boundary(result.len() - suffix.len())
                && result[result.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
            {
                result.truncate(result.len() - suffix.len());
                break;
            }
        }

        if self.normalize_keys {
            result = normalize_key(&result);
        }

        result
    }
}

/// Key normalization: `_` → `-`, drop non-alphanumeric-non-hyphen,
/// collapse consecutive hyphens, trim boundary hyphens.
fn normalize_key(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c == '_' { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_was_hyphen = false;
    for c in replaced.chars() {
        if c == '-' {
            if !last_was_hyphen {
                collapsed.push('-');
            }
            last_was_hyphen = true;
        } else {
            collapsed.push(c);
            last_was_hyphen = false;
        }
    }

    collapsed.trim_matches('-').to_string()
}

/// Splits a name into comparison tokens, dropping short fragments.
fn tokenize(name: &str) -> Vec<String> {
    name.split(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// Name resolver over a set of known accounts.
pub struct NameResolver {
    rules: NameRules,
    strategy: MatchStrategy,
    // Sorted by account name: fuzzy candidates are examined in this order
    // and the first match wins.
    accounts: BTreeMap<String, AccountId>,
}

impl NameResolver {
    /// Creates a resolver over the given known accounts
    pub fn new(rules: NameRules, strategy: MatchStrategy, accounts: impl IntoIterator<Item = (String, AccountId)>) -> Self {
        Self {
            rules,
            strategy,
            accounts: accounts.into_iter().collect(),
        }
    }

    /// Returns the configured rules
    pub fn rules(&self) -> &NameRules {
        &self.rules
    }

    /// Matches a name against a configured pattern using the resolver's
    /// strategy.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfiguration`] when the pattern is not
    /// a valid regular expression.
    pub fn matches_pattern(&self, name: &str, pattern: &str) -> Result<bool, SyncError> {
        let normalized = self.rules.normalize(name);
        let flags = if self.rules.case_insensitive { "(?i)" } else { "" };

        match self.strategy {
            MatchStrategy::Exact => {
                let regex = compile(&format!("^{flags}(?:{pattern})$"))?;
                Ok(regex.is_match(&normalized))
            }
            MatchStrategy::Fuzzy | MatchStrategy::Loose => {
                let regex = compile(&format!("{flags}.*(?:{pattern}).*"))?;
                if regex.is_match(&normalized) {
                    return Ok(true);
                }
                Ok(fuzzy_heuristics(&normalized, &self.rules.normalize(pattern)))
            }
        }
    }

    /// Classifies a free-form reference.
    ///
    /// Tiers, strongest first: a well-formed account id belonging to a
    /// known account; an exact case-insensitive account-name match; a
    /// normalized-form match; a fuzzy match. Anything else is a
    /// source-prefix reference.
    pub fn resolve(&self, input: &str) -> ResolvedReference {
        if AccountId::is_well_formed(input) {
            if let Some((name, id)) = self.accounts.iter().find(|(_, id)| id.as_str() == input) {
                return ResolvedReference::Account {
                    id: id.clone(),
                    name: name.clone(),
                    confidence: MatchConfidence::AccountId,
                };
            }
        }

        for (name, id) in &self.accounts {
            if name.eq_ignore_ascii_case(input) {
                return ResolvedReference::Account {
                    id: id.clone(),
                    name: name.clone(),
                    confidence: MatchConfidence::Exact,
                };
            }
        }

        let normalized_input = self.rules.normalize(input);
        for (name, id) in &self.accounts {
            if self.rules.normalize(name) == normalized_input {
                return ResolvedReference::Account {
                    id: id.clone(),
                    name: name.clone(),
                    confidence: MatchConfidence::Normalized,
                };
            }
        }

        if matches!(self.strategy, MatchStrategy::Fuzzy | MatchStrategy::Loose) {
            for (name, id) in &self.accounts {
                if fuzzy_heuristics(&normalized_input, &self.rules.normalize(name)) {
                    return ResolvedReference::Account {
                        id: id.clone(),
                        name: name.clone(),
                        confidence: MatchConfidence::Fuzzy,
                    };
                }
            }
        }

        ResolvedReference::SourcePrefix {
            reference: input.to_string(),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, SyncError> {
    Regex::new(pattern).map_err(|e| SyncError::invalid_config(format!("invalid match pattern {pattern:?}: {e}")))
}

/// Substring and token-overlap fallbacks for fuzzy matching.
fn fuzzy_heuristics(left: &str, right: &str) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    let left_lower = left.to_lowercase();
    let right_lower = right.to_lowercase();

    // Whole-string containment either way.
    if left_lower.contains(&right_lower) || right_lower.contains(&left_lower) {
        return true;
    }

    let left_tokens = tokenize(&left_lower);
    let right_tokens = tokenize(&right_lower);
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return false;
    }

    // Token overlap against the smaller token set.
    let overlap = left_tokens.iter().filter(|t| right_tokens.contains(t)).count();
    let smaller = left_tokens.len().min(right_tokens.len());
    if overlap as f64 / smaller as f64 >= TOKEN_OVERLAP_THRESHOLD {
        return true;
    }

    // Token-level substring: a sufficiently long token of one side
    // appearing inside the other side's full string.
    left_tokens
        .iter()
        .any(|t| t.len() >= MIN_SUBSTRING_TOKEN_LEN && right_lower.contains(t.as_str()))
        || right_tokens
            .iter()
            .any(|t| t.len() >= MIN_SUBSTRING_TOKEN_LEN && left_lower.contains(t.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> AccountId {
        AccountId::parse(id).unwrap()
    }

    fn resolver(strategy: MatchStrategy) -> NameResolver {
        let rules = NameRules {
            case_insensitive: true,
            strip_prefixes: vec![],
            strip_suffixes: vec![],
            normalize_keys: true,
        };
        NameResolver::new(
            rules,
            strategy,
            vec![
                ("Data_Engineers_Sandbox".to_string(), account("111122223333")),
                ("Platform_Prod".to_string(), account("444455556666")),
            ],
        )
    }

    #[test]
    fn test_normalization_pipeline() {
        let rules = NameRules {
            case_insensitive: true,
            strip_prefixes: vec!["corp-".to_string(), "corp".to_string()],
            strip_suffixes: vec!["-aws".to_string()],
            normalize_keys: true,
        };
        // Longest prefix wins; suffix stripped afterwards; key
        // normalization collapses the leftovers.
        assert_eq!(rules.normalize("Corp-Data__Team!-aws"), "data-team");
    }

    #[test]
    fn test_normalize_key_edge_cases() {
        assert_eq!(normalize_key("--a__b!!c--"), "a-b-c");
        assert_eq!(normalize_key("___"), "");
    }

    #[test]
    fn test_exact_strategy_full_match_only() {
        let resolver = resolver(MatchStrategy::Exact);
        assert!(resolver.matches_pattern("platform-prod", "platform-prod").unwrap());
        assert!(!resolver.matches_pattern("platform-prod-extra", "platform-prod").unwrap());
    }

    #[test]
    fn test_fuzzy_strategy_matches_anywhere() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        assert!(resolver.matches_pattern("platform-prod-extra", "prod").unwrap());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let resolver = resolver(MatchStrategy::Exact);
        assert!(matches!(
            resolver.matches_pattern("x", "(unclosed"),
            Err(SyncError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_resolve_account_id_tier() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        match resolver.resolve("111122223333") {
            ResolvedReference::Account { confidence, name, .. } => {
                assert_eq!(confidence, MatchConfidence::AccountId);
                assert_eq!(name, "Data_Engineers_Sandbox");
            }
            other => panic!("expected account, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_exact_name_tier() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        match resolver.resolve("data_engineers_sandbox") {
            ResolvedReference::Account { confidence, .. } => assert_eq!(confidence, MatchConfidence::Exact),
            other => panic!("expected account, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_normalized_tier() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        match resolver.resolve("data-engineers-sandbox") {
            ResolvedReference::Account { confidence, .. } => assert_eq!(confidence, MatchConfidence::Normalized),
            other => panic!("expected account, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_fuzzy_tier_via_token_substring() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        match resolver.resolve("dataengineering") {
            ResolvedReference::Account { confidence, name, .. } => {
                assert_eq!(confidence, MatchConfidence::Fuzzy);
                assert_eq!(name, "Data_Engineers_Sandbox");
            }
            other => panic!("expected account, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_falls_through_to_source_prefix() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        // Wrong length for an account id and no name resembles it.
        match resolver.resolve("111111111111111") {
            ResolvedReference::SourcePrefix { reference } => assert_eq!(reference, "111111111111111"),
            other => panic!("expected source prefix, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_12_digit_id_falls_through() {
        let resolver = resolver(MatchStrategy::Fuzzy);
        assert!(matches!(
            resolver.resolve("999999999999"),
            ResolvedReference::SourcePrefix { .. }
        ));
    }

    #[test]
    fn test_token_overlap() {
        // 2 of 2 input tokens overlap the candidate's 3: 100% of the
        // smaller set.
        assert!(fuzzy_heuristics("data-engineers", "data-engineers-sandbox"));
        // 0 overlapping tokens and no containment.
        assert!(!fuzzy_heuristics("billing-ops", "data-engineers-sandbox"));
    }
}
