// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bundle Planning
//!
//! Resolves every target's ordered import list into the concrete source
//! sequence that defines its bundle identity, before any phase runs.
//!
//! A source import resolves to the source's store prefix; a target import
//! resolves to that target's merge-store bundle key (the bundle acts as a
//! pre-merged source). Because targets are planned layer by layer, a
//! dependency's bundle identity is always known before its dependents
//! are planned, and the whole plan is a pure function of configuration -
//! a sync-only run computes the same bundle keys a merge run wrote.

use std::collections::{BTreeSet, HashMap};

use secret_sync_domain::entities::{Source, Target};
use secret_sync_domain::services::{DependencyGraph, NodeRef};
use secret_sync_domain::value_objects::bundle_id::bundle_object_key;
use secret_sync_domain::value_objects::{BundleId, SecretPath};
use secret_sync_domain::SyncError;

/// One resolved import.
#[derive(Debug, Clone)]
pub enum PlannedImport {
    /// Import of a source-store prefix
    Source { name: String, prefix: SecretPath },

    /// Import of another target's merged bundle
    Target {
        name: String,
        bundle_id: BundleId,
        bundle_key: String,
    },
}

impl PlannedImport {
    /// Name of the imported source or target
    pub fn name(&self) -> &str {
        match self {
            PlannedImport::Source { name, .. } | PlannedImport::Target { name, .. } => name,
        }
    }

    /// The resolved path contributing to the bundle identity
    pub fn resolved_path(&self) -> String {
        match self {
            PlannedImport::Source { prefix, .. } => prefix.to_string(),
            PlannedImport::Target { bundle_key, .. } => bundle_key.clone(),
        }
    }
}

/// Per-target resolution: imports, identity, and merge-store location.
#[derive(Debug, Clone)]
pub struct TargetPlan {
    pub target: Target,
    pub imports: Vec<PlannedImport>,
    pub source_paths: Vec<String>,
    pub bundle_id: BundleId,
    pub bundle_key: String,
}

/// The full run plan: per-target plans plus the ordered merge layers.
pub struct BundlePlan {
    plans: HashMap<String, TargetPlan>,
    layers: Vec<Vec<String>>,
}

impl BundlePlan {
    /// Builds the plan for the given subset (or all targets).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnresolvedImport`] when a planned target's
    /// import refers to a name the graph does not know, or when a
    /// dependency is missing from the subset (the caller is expected to
    /// pass a closure).
    pub fn build(
        graph: &DependencyGraph,
        sources: &[Source],
        targets: &[Target],
        subset: Option<&BTreeSet<String>>,
        merge_prefix: &SecretPath,
    ) -> Result<Self, SyncError> {
        let sources_by_name: HashMap<&str, &Source> = sources.iter().map(|s| (s.name.as_str(), s)).collect();
        let targets_by_name: HashMap<&str, &Target> = targets.iter().map(|t| (t.name.as_str(), t)).collect();

        let layers = graph.layers(subset);
        let mut plans: HashMap<String, TargetPlan> = HashMap::new();

        for layer in &layers {
            for target_name in layer {
                let target = targets_by_name.get(target_name.as_str()).ok_or_else(|| {
                    SyncError::unresolved_import(format!("planned target {target_name:?} is not declared"))
                })?;

                let mut imports = Vec::with_capacity(target.imports.len());
                for import in &target.imports {
                    let planned = match graph.classify_import(import) {
                        Some(NodeRef::Source(name)) => {
                            let source = sources_by_name.get(name.as_str()).ok_or_else(|| {
                                SyncError::unresolved_import(format!("source {name:?} has no declaration"))
                            })?;
                            PlannedImport::Source {
                                name,
                                prefix: source.prefix.clone(),
                            }
                        }
                        Some(NodeRef::Target(name)) => {
                            let dependency = plans.get(&name).ok_or_else(|| {
                                SyncError::unresolved_import(format!(
                                    "target {target_name:?} depends on unplanned target {name:?}"
                                ))
                            })?;
                            PlannedImport::Target {
                                name,
                                bundle_id: dependency.bundle_id.clone(),
                                bundle_key: dependency.bundle_key.clone(),
                            }
                        }
                        None => {
                            return Err(SyncError::unresolved_import(format!(
                                "target {target_name:?} imports unknown name {:?}",
                                import.as_str()
                            )))
                        }
                    };
                    imports.push(planned);
                }

                let source_paths: Vec<String> = imports.iter().map(PlannedImport::resolved_path).collect();
                let bundle_id = BundleId::from_sources(&source_paths);
                let bundle_key = bundle_object_key(merge_prefix, target_name, &bundle_id);

                plans.insert(
                    target_name.clone(),
                    TargetPlan {
                        target: (*target).clone(),
                        imports,
                        source_paths,
                        bundle_id,
                        bundle_key,
                    },
                );
            }
        }

        Ok(Self { plans, layers })
    }

    /// The ordered merge layers
    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    /// All planned target names, flattened in layer order
    pub fn target_names(&self) -> Vec<String> {
        self.layers.iter().flatten().cloned().collect()
    }

    /// Looks up one target's plan
    pub fn plan_for(&self, target: &str) -> Option<&TargetPlan> {
        self.plans.get(target)
    }
}
