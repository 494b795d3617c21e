// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! The full configuration surface of the synchronizer as nested,
//! serde-deserializable settings structs with defaults, loaded from a
//! TOML file layered under `SECRET_SYNC_`-prefixed environment
//! overrides (`SECRET_SYNC_DISCOVERY__CACHE_TTL_SECS=60` overrides
//! `discovery.cache_ttl_secs`).
//!
//! Run-scoped options (`dry_run`, `parallelism`, ...) hold the defaults
//! the CLI can override per invocation; declaration sections (`sources`,
//! `targets`, `dynamic_targets`) define the sync topology.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use secret_sync_domain::entities::{DynamicTarget, Operation, OutputFormat, Source, Target};
use secret_sync_domain::services::{MatchStrategy, NameRules};
use secret_sync_domain::value_objects::{Parallelism, SecretPath};
use secret_sync_domain::SyncError;

use crate::infrastructure::discovery::{MatchRule, TagCombination, TagFilter};
use crate::infrastructure::traversal::TraversalLimits;
use crate::infrastructure::versioning::DEFAULT_RETAIN_VERSIONS;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SECRET_SYNC";

/// Default merge-store prefix
const DEFAULT_MERGE_PREFIX: &str = "secret-sync";

/// Versioning settings for the merge store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningSettings {
    pub enabled: bool,
    pub retain_versions: usize,
}

impl Default for VersioningSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            retain_versions: DEFAULT_RETAIN_VERSIONS,
        }
    }
}

/// Merge-store settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeStoreSettings {
    pub versioning: VersioningSettings,
}

/// Account-discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// OU cache time-to-live in seconds
    pub cache_ttl_secs: u64,

    /// Tag filters applied to discovered accounts
    pub tag_filters: Vec<TagFilter>,

    /// How tag filters combine
    pub tag_combination: TagCombination,

    /// Account statuses excluded from discovery (case-insensitive)
    pub exclude_statuses: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            tag_filters: Vec::new(),
            tag_combination: TagCombination::And,
            exclude_statuses: Vec::new(),
        }
    }
}

impl DiscoverySettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Name-matching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameMatchingSettings {
    pub strategy: MatchStrategy,
    pub case_insensitive: bool,
    pub normalize_keys: bool,
    pub strip_prefixes: Vec<String>,
    pub strip_suffixes: Vec<String>,

    /// Pattern → static-target rules for import inheritance
    pub rules: Vec<MatchRule>,
}

impl Default for NameMatchingSettings {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Fuzzy,
            case_insensitive: true,
            normalize_keys: true,
            strip_prefixes: Vec::new(),
            strip_suffixes: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl NameMatchingSettings {
    /// Builds the domain normalization rules from these settings
    pub fn name_rules(&self) -> NameRules {
        NameRules {
            case_insensitive: self.case_insensitive,
            strip_prefixes: self.strip_prefixes.clone(),
            strip_suffixes: self.strip_suffixes.clone(),
            normalize_keys: self.normalize_keys,
        }
    }
}

/// Complete configuration for the synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    // Run defaults (the CLI overrides these per invocation)
    pub operation: Operation,
    pub dry_run: bool,
    pub continue_on_error: bool,
    pub parallelism: Parallelism,
    pub compute_diff: bool,
    pub output_format: OutputFormat,
    pub show_values: bool,
    pub delete_orphans: bool,

    /// Merge-store key prefix
    pub merge_prefix: SecretPath,

    // Topology
    pub sources: Vec<Source>,
    pub targets: Vec<Target>,
    pub dynamic_targets: Vec<DynamicTarget>,

    // Component settings
    pub source: TraversalLimits,
    pub merge_store: MergeStoreSettings,
    pub discovery: DiscoverySettings,
    pub name_matching: NameMatchingSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            operation: Operation::Both,
            dry_run: false,
            continue_on_error: false,
            parallelism: Parallelism::default(),
            compute_diff: false,
            output_format: OutputFormat::Human,
            show_values: false,
            delete_orphans: false,
            merge_prefix: SecretPath::parse(DEFAULT_MERGE_PREFIX).expect("default merge prefix is valid"),
            sources: Vec::new(),
            targets: Vec::new(),
            dynamic_targets: Vec::new(),
            source: TraversalLimits::default(),
            merge_store: MergeStoreSettings::default(),
            discovery: DiscoverySettings::default(),
            name_matching: NameMatchingSettings::default(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from an optional TOML file plus environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfiguration`] for unreadable files,
    /// malformed TOML, or values that fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self, SyncError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings: SyncConfig = builder
            .build()
            .map_err(|e| SyncError::invalid_config(format!("cannot load configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| SyncError::invalid_config(format!("invalid configuration: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Structural validation beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), SyncError> {
        let mut names = std::collections::HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(SyncError::invalid_config(format!(
                    "duplicate source name {:?}",
                    source.name
                )));
            }
        }

        let mut target_names = std::collections::HashSet::new();
        for target in &self.targets {
            if !target_names.insert(target.name.as_str()) {
                return Err(SyncError::invalid_config(format!(
                    "duplicate target name {:?}",
                    target.name
                )));
            }
        }

        for rule in &self.name_matching.rules {
            if !target_names.contains(rule.target.as_str()) {
                return Err(SyncError::invalid_config(format!(
                    "name-matching rule references unknown target {:?}",
                    rule.target
                )));
            }
        }

        Ok(())
    }
}
