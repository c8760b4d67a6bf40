//! Dependency graph over resolved include edges.

use crudmap_core::model::{EdgeTarget, IncludeEdge};
use std::collections::{BTreeMap, HashSet};

/// A resolved directive, before expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectInclude {
    pub source: String,
    pub raw: String,
    pub line: usize,
    pub target: EdgeTarget,
    pub candidates: Vec<String>,
}

/// Files as nodes, direct includes as edges, in source order per file.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    direct: BTreeMap<String, Vec<DirectInclude>>,
}

struct Traversal<'g> {
    graph: &'g DependencyGraph,
    origin: &'g str,
    max_depth: usize,
    on_path: HashSet<&'g str>,
    expanded: HashSet<&'g str>,
    edges: Vec<IncludeEdge>,
}

impl<'g> Traversal<'g> {
    fn visit(&mut self, file: &'g str, depth: usize) {
        let graph = self.graph;
        for include in graph.direct(file) {
            let target = match &include.target {
                EdgeTarget::Resolved(path) if self.on_path.contains(path.as_str()) => {
                    tracing::debug!("{}: {} includes {} again", self.origin, file, path);
                    EdgeTarget::Circular(path.clone())
                }
                other => other.clone(),
            };
            self.edges.push(IncludeEdge {
                origin: self.origin.to_string(),
                source: include.source.clone(),
                raw: include.raw.clone(),
                target: target.clone(),
                depth,
                line: include.line,
                candidates: include.candidates.clone(),
            });

            let EdgeTarget::Resolved(next) = &include.target else {
                continue;
            };
            let next = next.as_str();
            if !matches!(target, EdgeTarget::Resolved(_)) || !self.expanded.insert(next) {
                continue;
            }
            if depth >= self.max_depth {
                tracing::debug!("{}: depth limit {} reached at {}", self.origin, self.max_depth, next);
                continue;
            }
            self.on_path.insert(next);
            self.visit(next, depth + 1);
            self.on_path.remove(next);
        }
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, include: DirectInclude) {
        self.direct
            .entry(include.source.clone())
            .or_default()
            .push(include);
    }

    /// Direct includes of `file`, in source order.
    pub fn direct(&self, file: &str) -> &[DirectInclude] {
        self.direct.get(file).map_or(&[], Vec::as_slice)
    }

    /// Files with at least one include, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.direct.keys().map(String::as_str)
    }

    pub fn edge_count(&self) -> usize {
        self.direct.values().map(Vec::len).sum()
    }

    /// Depth-first expansion from `origin`. Direct includes are depth 1.
    ///
    /// A file already on the current path yields a `Circular` edge and is not
    /// re-expanded; a file already expanded elsewhere in this traversal is
    /// recorded but not expanded twice.
    pub fn expand(&self, origin: &str, max_depth: usize) -> Vec<IncludeEdge> {
        let Some((origin, _)) = self.direct.get_key_value(origin) else {
            return Vec::new();
        };
        let mut traversal = Traversal {
            graph: self,
            origin,
            max_depth,
            on_path: HashSet::from([origin.as_str()]),
            expanded: HashSet::from([origin.as_str()]),
            edges: Vec::new(),
        };
        traversal.visit(origin, 1);
        traversal.edges
    }

    /// Expansion from every file that has includes, in sorted order.
    pub fn expand_all(&self, max_depth: usize) -> Vec<IncludeEdge> {
        self.sources()
            .flat_map(|origin| self.expand(origin, max_depth))
            .collect()
    }
}
