// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dependency Graph Service
//!
//! Directed acyclic graph over targets and sources, built from each
//! target's ordered import list. An edge `A → B` means "B must be merged
//! before A" (A imports B).
//!
//! ## Responsibilities
//!
//! - **Build**: resolve every import to a source or target node, failing
//!   with `UnresolvedImport` otherwise (a source shadows a target with the
//!   same name)
//! - **Cycle rejection**: depth-first validation naming the offending
//!   cycle, self-imports included
//! - **Layering**: partition targets into ordered layers such that every
//!   target-to-target edge points to a strictly lower layer; layer 0 holds
//!   targets with no target dependencies
//! - **Subsetting**: expand a requested target set to the transitive
//!   closure of its imports (sources are terminal)

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

use crate::entities::{ImportRef, Source, Target};
use crate::SyncError;

/// A node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Source(String),
    Target(String),
}

impl NodeRef {
    /// Returns the node's name
    pub fn name(&self) -> &str {
        match self {
            NodeRef::Source(name) | NodeRef::Target(name) => name,
        }
    }
}

/// Validated DAG over targets and sources with layering support.
pub struct DependencyGraph {
    graph: DiGraph<NodeRef, ()>,
    source_nodes: HashMap<String, NodeIndex>,
    target_nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Builds and validates the graph.
    ///
    /// # Errors
    ///
    /// - [`SyncError::UnresolvedImport`] when an import names neither a
    ///   source nor a target
    /// - [`SyncError::CycleDetected`] when target imports form a cycle;
    ///   the message names the cycle path
    pub fn build(sources: &[Source], targets: &[Target]) -> Result<Self, SyncError> {
        let mut graph = DiGraph::new();
        let mut source_nodes = HashMap::new();
        let mut target_nodes = HashMap::new();

        for source in sources {
            let index = graph.add_node(NodeRef::Source(source.name.clone()));
            source_nodes.insert(source.name.clone(), index);
        }
        for target in targets {
            let index = graph.add_node(NodeRef::Target(target.name.clone()));
            target_nodes.insert(target.name.clone(), index);
        }

        for target in targets {
            let from = target_nodes[&target.name];
            for import in &target.imports {
                let to = source_nodes
                    .get(import.as_str())
                    .or_else(|| target_nodes.get(import.as_str()))
                    .copied()
                    .ok_or_else(|| {
                        SyncError::unresolved_import(format!(
                            "target {:?} imports {:?}, which names no source or target",
                            target.name,
                            import.as_str()
                        ))
                    })?;
                graph.add_edge(from, to, ());
            }
        }

        let built = Self {
            graph,
            source_nodes,
            target_nodes,
        };
        built.reject_cycles()?;
        Ok(built)
    }

    /// True when the name refers to a source node
    pub fn is_source(&self, name: &str) -> bool {
        self.source_nodes.contains_key(name)
    }

    /// True when the name refers to a target node (and no source shadows it)
    pub fn is_target(&self, name: &str) -> bool {
        !self.is_source(name) && self.target_nodes.contains_key(name)
    }

    /// Depth-first cycle rejection over target edges, naming the cycle.
    fn reject_cycles(&self) -> Result<(), SyncError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Grey,
            Black,
        }

        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|i| (i, Color::White)).collect();

        // Recursive DFS bounded by target count; the graph is small
        // relative to stack depth (hundreds of targets, not millions).
        fn visit(
            graph: &DiGraph<NodeRef, ()>,
            node: NodeIndex,
            colors: &mut HashMap<NodeIndex, Color>,
            stack: &mut Vec<NodeIndex>,
        ) -> Result<(), SyncError> {
            colors.insert(node, Color::Grey);
            stack.push(node);

            for next in graph.neighbors(node) {
                match colors[&next] {
                    Color::Grey => {
                        // Back-edge: the cycle runs from `next`'s position
                        // on the stack through `node` and back.
                        let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                        let mut names: Vec<&str> =
                            stack[start..].iter().map(|n| graph[*n].name()).collect();
                        names.push(graph[next].name());
                        return Err(SyncError::CycleDetected(names.join(" -> ")));
                    }
                    Color::White => visit(graph, next, colors, stack)?,
                    Color::Black => {}
                }
            }

            stack.pop();
            colors.insert(node, Color::Black);
            Ok(())
        }

        let mut stack = Vec::new();
        let mut roots: Vec<NodeIndex> = self.target_nodes.values().copied().collect();
        roots.sort();
        for root in roots {
            if colors[&root] == Color::White {
                visit(&self.graph, root, &mut colors, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Computes the layer index for every target: 0 for targets with no
    /// target dependencies, otherwise one past the highest dependency
    /// layer.
    fn target_layers(&self) -> HashMap<String, usize> {
        fn layer_of(
            graph: &DiGraph<NodeRef, ()>,
            node: NodeIndex,
            memo: &mut HashMap<NodeIndex, usize>,
        ) -> usize {
            if let Some(layer) = memo.get(&node) {
                return *layer;
            }
            let layer = graph
                .neighbors(node)
                .filter(|next| matches!(graph[*next], NodeRef::Target(_)))
                .map(|next| layer_of(graph, next, memo) + 1)
                .max()
                .unwrap_or(0);
            memo.insert(node, layer);
            layer
        }

        let mut memo = HashMap::new();
        self.target_nodes
            .iter()
            .map(|(name, index)| (name.clone(), layer_of(&self.graph, *index, &mut memo)))
            .collect()
    }

    /// Produces the ordered merge layers for the given target subset (or
    /// all targets). Members of a layer are sorted by name; every
    /// target-to-target edge points from a higher layer to a lower one.
    pub fn layers(&self, subset: Option<&BTreeSet<String>>) -> Vec<Vec<String>> {
        let layer_indices = self.target_layers();
        let mut layers: Vec<Vec<String>> = Vec::new();

        let mut names: Vec<&String> = layer_indices
            .keys()
            .filter(|name| subset.is_none_or(|s| s.contains(*name)))
            .collect();
        names.sort();

        for name in names {
            let layer = layer_indices[name];
            while layers.len() <= layer {
                layers.push(Vec::new());
            }
            layers[layer].push(name.clone());
        }

        // A subset can leave intermediate layers empty; drop them while
        // preserving relative order.
        layers.retain(|layer| !layer.is_empty());
        layers
    }

    /// Expands requested target names to the transitive closure of their
    /// target imports.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnresolvedImport`] when a requested name is
    /// not a known target.
    pub fn closure(&self, requested: &[String]) -> Result<BTreeSet<String>, SyncError> {
        let mut result = BTreeSet::new();
        let mut pending: Vec<NodeIndex> = Vec::new();

        for name in requested {
            let index = self.target_nodes.get(name).copied().ok_or_else(|| {
                SyncError::unresolved_import(format!("requested target {name:?} is not declared"))
            })?;
            pending.push(index);
        }

        while let Some(node) = pending.pop() {
            if let NodeRef::Target(name) = &self.graph[node] {
                if result.insert(name.clone()) {
                    pending.extend(
                        self.graph
                            .neighbors(node)
                            .filter(|next| matches!(self.graph[*next], NodeRef::Target(_))),
                    );
                }
            }
        }

        Ok(result)
    }

    /// Classifies one import as a source or target reference.
    pub fn classify_import(&self, import: &ImportRef) -> Option<NodeRef> {
        if self.source_nodes.contains_key(import.as_str()) {
            Some(NodeRef::Source(import.as_str().to_string()))
        } else if self.target_nodes.contains_key(import.as_str()) {
            Some(NodeRef::Target(import.as_str().to_string()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{AccountId, SecretPath};

    fn source(name: &str) -> Source {
        Source::new(name, SecretPath::parse(&format!("kv/{name}")).unwrap())
    }

    fn target(name: &str, imports: &[&str]) -> Target {
        Target::new(
            name,
            AccountId::parse("123456789012").unwrap(),
            imports.iter().map(|i| ImportRef::from(*i)).collect(),
        )
    }

    #[test]
    fn test_unresolved_import_rejected() {
        let result = DependencyGraph::build(&[source("a")], &[target("t", &["missing"])]);
        assert!(matches!(result, Err(SyncError::UnresolvedImport(_))));
    }

    #[test]
    fn test_cycle_rejected_and_named() {
        let targets = [target("x", &["y"]), target("y", &["x"])];
        match DependencyGraph::build(&[], &targets) {
            Err(SyncError::CycleDetected(cycle)) => {
                assert!(cycle == "x -> y -> x" || cycle == "y -> x -> y", "got {cycle}");
            }
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_self_import_rejected() {
        match DependencyGraph::build(&[], &[target("t", &["t"])]) {
            Err(SyncError::CycleDetected(cycle)) => assert_eq!(cycle, "t -> t"),
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_layering_inheritance_chain() {
        let sources = [source("a"), source("b"), source("c")];
        let targets = [target("stage", &["a", "b"]), target("prod", &["stage", "c"])];
        let graph = DependencyGraph::build(&sources, &targets).unwrap();
        assert_eq!(graph.layers(None), vec![vec!["stage".to_string()], vec!["prod".to_string()]]);
    }

    #[test]
    fn test_layering_no_forward_edges() {
        let sources = [source("a")];
        let targets = [
            target("t0", &["a"]),
            target("t1", &["t0"]),
            target("t2", &["t0", "t1"]),
            target("u0", &["a"]),
        ];
        let graph = DependencyGraph::build(&sources, &targets).unwrap();
        let layers = graph.layers(None);

        // Total partition of the target set.
        let all: Vec<String> = layers.iter().flatten().cloned().collect();
        assert_eq!(all.len(), 4);

        // Every import points to an equal-or-lower... strictly lower layer.
        let layer_of = |name: &str| layers.iter().position(|l| l.iter().any(|n| n == name)).unwrap();
        assert!(layer_of("t1") > layer_of("t0"));
        assert!(layer_of("t2") > layer_of("t1"));
        assert_eq!(layer_of("u0"), 0);
    }

    #[test]
    fn test_closure_expands_imports() {
        let sources = [source("a")];
        let targets = [target("base", &["a"]), target("mid", &["base"]), target("top", &["mid"])];
        let graph = DependencyGraph::build(&sources, &targets).unwrap();

        let closure = graph.closure(&["top".to_string()]).unwrap();
        assert_eq!(
            closure.into_iter().collect::<Vec<_>>(),
            vec!["base".to_string(), "mid".to_string(), "top".to_string()]
        );
    }

    #[test]
    fn test_closure_rejects_unknown_target() {
        let graph = DependencyGraph::build(&[source("a")], &[target("t", &["a"])]).unwrap();
        assert!(graph.closure(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_source_shadows_target_on_name_clash() {
        let sources = [source("shared")];
        let targets = [target("shared", &[]), target("user", &["shared"])];
        let graph = DependencyGraph::build(&sources, &targets).unwrap();
        assert_eq!(
            graph.classify_import(&ImportRef::from("shared")),
            Some(NodeRef::Source("shared".to_string()))
        );
    }
}
