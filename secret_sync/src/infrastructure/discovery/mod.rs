// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Account Discovery
//!
//! Dynamic target enumeration: resolves a [`DynamicTarget`] template into
//! the concrete accounts it covers and expands those accounts into
//! targets.
//!
//! ## Mechanisms
//!
//! - **OU traversal** - one or more organizational units, optionally
//!   recursive; per-OU children and accounts are cached in memory behind
//!   a read-write lock with a configurable TTL (default one hour). A
//!   child-OU listing failure is logged and skipped, never aborting the
//!   walk.
//! - **External list** - an opaque parameter reference resolving to a
//!   JSON array of ids, a JSON array of `{id, name}` objects, or a
//!   comma-separated id list. A malformed id is skipped with a warning.
//! - **Whole directory** - when the template names no OUs and no external
//!   list.
//!
//! Results are deduplicated by account id, first seen wins. Tag filters
//! (`AND`/`OR`) and status exclusions are applied after enumeration.
//!
//! ## Target Construction
//!
//! Discovered names are sanitized to `[A-Za-z0-9_]` (spaces and dashes
//! become underscores, anything else is dropped); an empty result falls
//! back to `account_<id>`, and a collision with an earlier discovered
//! target appends the first six characters of the account id. A collision
//! with a static target skips the dynamic one with a warning. Imports
//! come from the first configured match rule whose pattern matches the
//! account name and resolves to a static target; otherwise the template's
//! default imports apply.

pub mod filters;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::entities::{AccountInfo, DynamicTarget, Target};
use secret_sync_domain::services::NameResolver;
use secret_sync_domain::stores::AccountDirectory;
use secret_sync_domain::value_objects::AccountId;
use secret_sync_domain::SyncError;

pub use filters::{filters_match, wildcard_match, TagCombination, TagFilter, TagOperator};

/// Default OU cache TTL (one hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Maps an account-name pattern to a static target whose imports a
/// discovered account inherits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRule {
    pub pattern: String,
    pub target: String,
}

struct CachedOu {
    child_ous: Vec<String>,
    accounts: Vec<AccountInfo>,
    fetched_at: Instant,
}

/// Account discovery service with a TTL'd per-OU cache.
pub struct AccountDiscovery {
    directory: Arc<dyn AccountDirectory>,
    cache_ttl: Duration,
    cache: RwLock<HashMap<String, Arc<CachedOu>>>,
}

impl AccountDiscovery {
    pub fn new(directory: Arc<dyn AccountDirectory>, cache_ttl: Duration) -> Self {
        Self {
            directory,
            cache_ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Enumerates the accounts a template covers, before filtering.
    pub async fn enumerate(
        &self,
        template: &DynamicTarget,
        cancel: &CancellationToken,
    ) -> Result<Vec<AccountInfo>, SyncError> {
        let mut accounts = if let Some(reference) = &template.external_list {
            self.from_external_list(reference).await?
        } else if template.ou_ids.is_empty() {
            self.directory.list_all().await?
        } else {
            let mut gathered = Vec::new();
            for ou in &template.ou_ids {
                if cancel.is_cancelled() {
                    return Err(SyncError::cancelled());
                }
                if template.recursive {
                    gathered.extend(self.walk_ou(ou, cancel).await?);
                } else {
                    gathered.extend(self.ou_contents(ou).await?.accounts.clone());
                }
            }
            gathered
        };

        // Dedup by id, first seen wins.
        let mut seen: HashSet<AccountId> = HashSet::new();
        accounts.retain(|account| seen.insert(account.id.clone()));
        Ok(accounts)
    }

    /// Enumerates and filters: tag filters under the given combination,
    /// then status exclusions.
    pub async fn discover(
        &self,
        template: &DynamicTarget,
        tag_filters: &[TagFilter],
        combination: TagCombination,
        exclude_statuses: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<AccountInfo>, SyncError> {
        let mut accounts = self.enumerate(template, cancel).await?;
        accounts.retain(|account| {
            filters_match(tag_filters, combination, account) && !account.status_excluded(exclude_statuses)
        });
        debug!(template = %template.name, matched = accounts.len(), "discovery complete");
        Ok(accounts)
    }

    /// Recursive OU walk over the cached hierarchy. Child-OU failures are
    /// logged and skipped.
    async fn walk_ou(&self, root: &str, cancel: &CancellationToken) -> Result<Vec<AccountInfo>, SyncError> {
        let mut accounts = Vec::new();
        let mut pending = vec![root.to_string()];
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(ou) = pending.pop() {
            if cancel.is_cancelled() {
                return Err(SyncError::cancelled());
            }
            if !visited.insert(ou.clone()) {
                continue;
            }

            match self.ou_contents(&ou).await {
                Ok(contents) => {
                    accounts.extend(contents.accounts.clone());
                    pending.extend(contents.child_ous.clone());
                }
                Err(error) if ou == root => return Err(error),
                Err(error) => {
                    warn!(ou = %ou, error = %error, "skipping unreadable child OU");
                }
            }
        }

        Ok(accounts)
    }

    /// Returns one OU's children and accounts, from cache when fresh.
    async fn ou_contents(&self, ou_id: &str) -> Result<Arc<CachedOu>, SyncError> {
        {
            let cache = self.cache.read();
            if let Some(cached) = cache.get(ou_id) {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(Arc::clone(cached));
                }
            }
        }

        // Fetch outside any lock; insertion is idempotent, so two racing
        // fetches of the same OU are harmless.
        let accounts = self.directory.list_in_ou(ou_id).await?;
        let child_ous = match self.directory.list_child_ous(ou_id).await {
            Ok(children) => children,
            Err(error) => {
                warn!(ou = %ou_id, error = %error, "child OU listing failed, continuing with accounts only");
                Vec::new()
            }
        };

        let entry = Arc::new(CachedOu {
            child_ous,
            accounts,
            fetched_at: Instant::now(),
        });
        self.cache.write().insert(ou_id.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Resolves an external-list reference into account records.
    async fn from_external_list(&self, reference: &str) -> Result<Vec<AccountInfo>, SyncError> {
        let raw = self.directory.get_parameter(reference).await?;
        Ok(parse_external_list(&raw))
    }
}

/// Parses an external account list: a JSON array of id strings, a JSON
/// array of `{id, name}` objects, or a comma-separated id list. Invalid
/// ids are skipped with a warning.
pub fn parse_external_list(raw: &str) -> Vec<AccountInfo> {
    #[derive(Deserialize)]
    struct IdName {
        id: String,
        name: Option<String>,
    }

    let mut accounts = Vec::new();
    let mut push = |id_raw: &str, name: Option<&str>| match AccountId::parse(id_raw.trim()) {
        Ok(id) => {
            let display = name.map(str::to_string).unwrap_or_else(|| id.to_string());
            accounts.push(AccountInfo::new(id, display));
        }
        Err(error) => {
            warn!(id = id_raw, error = %error, "skipping malformed external-list account");
        }
    };

    if let Ok(ids) = serde_json::from_str::<Vec<String>>(raw) {
        for id in &ids {
            push(id, None);
        }
    } else if let Ok(entries) = serde_json::from_str::<Vec<IdName>>(raw) {
        for entry in &entries {
            push(&entry.id, entry.name.as_deref());
        }
    } else {
        for id in raw.split(',').filter(|s| !s.trim().is_empty()) {
            push(id, None);
        }
    }

    accounts
}

/// Sanitizes an account name into a target name: spaces and dashes
/// become underscores, anything outside `[A-Za-z0-9_]` is dropped.
pub fn sanitize_target_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| {
            if c == ' ' || c == '-' {
                Some('_')
            } else if c.is_ascii_alphanumeric() || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Expands discovered accounts into concrete targets.
///
/// `resolver` supplies the pattern matching used by import-inheritance
/// rules; `static_targets` are consulted for both collision handling and
/// rule resolution.
pub fn expand_dynamic_targets(
    template: &DynamicTarget,
    accounts: &[AccountInfo],
    static_targets: &[Target],
    resolver: &NameResolver,
    rules: &[MatchRule],
) -> Vec<Target> {
    let static_names: HashSet<&str> = static_targets.iter().map(|t| t.name.as_str()).collect();
    let static_by_name: HashMap<&str, &Target> = static_targets.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut produced: Vec<Target> = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();

    for account in accounts {
        let mut name = sanitize_target_name(&account.name);
        if name.is_empty() {
            name = format!("account_{}", account.id);
        }

        if static_names.contains(name.as_str()) {
            warn!(
                target = %name,
                account = %account.id,
                "discovered target collides with a static target, skipping"
            );
            continue;
        }

        if !taken.insert(name.clone()) {
            let suffixed = format!("{name}_{}", &account.id.as_str()[..6]);
            warn!(target = %name, renamed = %suffixed, "discovered name collision, suffixing");
            name = suffixed;
            if !taken.insert(name.clone()) {
                warn!(target = %name, account = %account.id, "suffixed name still collides, skipping");
                continue;
            }
        }

        let imports = rules
            .iter()
            .find_map(|rule| {
                let matched = resolver.matches_pattern(&account.name, &rule.pattern).unwrap_or(false);
                if matched {
                    static_by_name.get(rule.target.as_str()).map(|t| t.imports.clone())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| template.default_imports.clone());

        let mut target = Target::new(name, account.id.clone(), imports);
        target.region = template.region.clone();
        target.secret_prefix = template.secret_prefix.clone();
        target.role_arn = template.expand_role_arn(&account.id);
        produced.push(target);
    }

    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::stores::MemoryAccountDirectory;
    use secret_sync_domain::entities::ImportRef;
    use secret_sync_domain::services::{MatchStrategy, NameRules};

    fn account(id: &str, name: &str) -> AccountInfo {
        AccountInfo::new(AccountId::parse(id).unwrap(), name)
    }

    fn template(ou_ids: &[&str], recursive: bool) -> DynamicTarget {
        DynamicTarget {
            name: "discovered".to_string(),
            ou_ids: ou_ids.iter().map(|s| s.to_string()).collect(),
            recursive,
            external_list: None,
            default_imports: vec![ImportRef::from("base")],
            region: None,
            secret_prefix: None,
            role_arn_template: None,
        }
    }

    #[tokio::test]
    async fn test_recursive_ou_walk_with_broken_child() {
        let directory = MemoryAccountDirectory::new();
        directory.add_account(account("111111111111", "root-acct"), Some("ou-root"));
        directory.add_account(account("222222222222", "child-acct"), Some("ou-child"));
        directory.add_account(account("333333333333", "broken-acct"), Some("ou-broken"));
        directory.add_child_ou("ou-root", "ou-child");
        directory.add_child_ou("ou-root", "ou-broken");
        directory.break_ou("ou-broken");

        let discovery = AccountDiscovery::new(Arc::new(directory), DEFAULT_CACHE_TTL);
        let accounts = discovery
            .enumerate(&template(&["ou-root"], true), &CancellationToken::unarmed())
            .await
            .unwrap();

        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"root-acct"));
        assert!(names.contains(&"child-acct"));
        // A failing child-OU listing degrades that OU to accounts-only
        // instead of aborting the walk.
        assert!(names.contains(&"broken-acct"));
    }

    #[tokio::test]
    async fn test_dedup_preserves_first_seen() {
        let directory = MemoryAccountDirectory::new();
        directory.add_account(account("111111111111", "twice"), Some("ou-a"));
        let dup = account("111111111111", "twice-again");
        directory.add_account(dup, Some("ou-b"));

        let discovery = AccountDiscovery::new(Arc::new(directory), DEFAULT_CACHE_TTL);
        let accounts = discovery
            .enumerate(&template(&["ou-a", "ou-b"], false), &CancellationToken::unarmed())
            .await
            .unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "twice");
    }

    #[test]
    fn test_parse_external_list_forms() {
        let from_ids = parse_external_list(r#"["111111111111","222222222222"]"#);
        assert_eq!(from_ids.len(), 2);

        let from_objects = parse_external_list(r#"[{"id":"111111111111","name":"Alpha"}]"#);
        assert_eq!(from_objects[0].name, "Alpha");

        let from_csv = parse_external_list("111111111111, 222222222222");
        assert_eq!(from_csv.len(), 2);

        // Malformed ids are skipped, not fatal.
        let partial = parse_external_list(r#"["111111111111","nope"]"#);
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn test_sanitize_target_name() {
        assert_eq!(sanitize_target_name("Data Engineers-Sandbox"), "Data_Engineers_Sandbox");
        assert_eq!(sanitize_target_name("acct!@#"), "acct");
        assert_eq!(sanitize_target_name("日本"), "");
    }

    fn expansion_fixture() -> (Vec<Target>, NameResolver) {
        let statics = vec![
            Target::new(
                "sandbox_baseline",
                AccountId::parse("999999999999").unwrap(),
                vec![ImportRef::from("base"), ImportRef::from("sandbox_extras")],
            ),
            Target::new("Existing_Acct", AccountId::parse("888888888888").unwrap(), vec![]),
        ];
        let resolver = NameResolver::new(
            NameRules {
                case_insensitive: true,
                normalize_keys: true,
                ..NameRules::default()
            },
            MatchStrategy::Fuzzy,
            vec![],
        );
        (statics, resolver)
    }

    #[test]
    fn test_expand_inherits_imports_via_rule() {
        let (statics, resolver) = expansion_fixture();
        let accounts = [account("111111111111", "Team Sandbox One")];
        let rules = [MatchRule {
            pattern: "sandbox".to_string(),
            target: "sandbox_baseline".to_string(),
        }];

        let produced = expand_dynamic_targets(&template(&[], false), &accounts, &statics, &resolver, &rules);
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].name, "Team_Sandbox_One");
        assert_eq!(
            produced[0].imports,
            vec![ImportRef::from("base"), ImportRef::from("sandbox_extras")]
        );
    }

    #[test]
    fn test_expand_uses_default_imports_without_rule() {
        let (statics, resolver) = expansion_fixture();
        let accounts = [account("111111111111", "Billing Prod")];
        let produced = expand_dynamic_targets(&template(&[], false), &accounts, &statics, &resolver, &[]);
        assert_eq!(produced[0].imports, vec![ImportRef::from("base")]);
    }

    #[test]
    fn test_expand_skips_static_collision() {
        let (statics, resolver) = expansion_fixture();
        let accounts = [account("111111111111", "Existing Acct")];
        let produced = expand_dynamic_targets(&template(&[], false), &accounts, &statics, &resolver, &[]);
        assert!(produced.is_empty());
    }

    #[test]
    fn test_expand_suffixes_discovered_collision() {
        let (statics, resolver) = expansion_fixture();
        let accounts = [account("111111111111", "Same Name"), account("222222222222", "Same-Name")];
        let produced = expand_dynamic_targets(&template(&[], false), &accounts, &statics, &resolver, &[]);
        assert_eq!(produced.len(), 2);
        assert_eq!(produced[0].name, "Same_Name");
        assert_eq!(produced[1].name, "Same_Name_222222");
    }

    #[test]
    fn test_expand_fallback_name_and_role_arn() {
        let (statics, resolver) = expansion_fixture();
        let mut tpl = template(&[], false);
        tpl.role_arn_template = Some("arn:aws:iam::{AccountId}:role/sync".to_string());
        let accounts = [account("111111111111", "!!!")];
        let produced = expand_dynamic_targets(&tpl, &accounts, &statics, &resolver, &[]);
        assert_eq!(produced[0].name, "account_111111111111");
        assert_eq!(
            produced[0].role_arn.as_deref(),
            Some("arn:aws:iam::111111111111:role/sync")
        );
    }
}
