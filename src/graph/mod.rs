//! The workspace dependency graph.
//!
//! Packages are nodes keyed by name; an edge `A -> B` means A declares a
//! dependency that resolves to workspace package B (an *internal* edge).
//! Declared dependencies that match no workspace package are external and do
//! not appear here; the classifier deals with them per target.
//!
//! The graph is immutable once built. Cycles are allowed to exist
//! structurally; the selection engine decides whether they are fatal.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use thiserror::Error;

use crate::core::name::PackageName;
use crate::core::package::Package;
use crate::core::workspace::{InvalidMember, Workspace};
use crate::util::diagnostic::Diagnostic;

/// Error constructing the workspace graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(
        "duplicate package `{name}` (declared at `{}` and `{}`)",
        .first.display(),
        .second.display()
    )]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl GraphError {
    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GraphError::DuplicatePackage { name, first, second } => {
                Diagnostic::error(format!("duplicate package `{}`", name))
                    .with_context(format!("first declared at `{}`", first.display()))
                    .with_context(format!("also declared at `{}`", second.display()))
                    .with_suggestion("help: rename one of the packages so names are unique")
            }
        }
    }
}

/// The immutable workspace dependency graph.
#[derive(Debug)]
pub struct WorkspaceGraph {
    /// Internal-edge structure
    graph: DiGraph<PackageName, ()>,

    /// Map from package name to node index
    nodes: HashMap<PackageName, NodeIndex>,

    /// All packages, keyed by name for deterministic iteration
    packages: BTreeMap<PackageName, Package>,

    /// Members excluded at load time for malformed manifests
    invalid: Vec<InvalidMember>,
}

impl WorkspaceGraph {
    /// Build the graph from a loaded workspace.
    ///
    /// Fails only on duplicate package names; dependency names that match no
    /// workspace package are external by definition and create no edge.
    pub fn build(workspace: &Workspace) -> Result<Self, GraphError> {
        let mut packages: BTreeMap<PackageName, Package> = BTreeMap::new();
        for pkg in workspace.packages() {
            if let Some(existing) = packages.get(&pkg.name()) {
                return Err(GraphError::DuplicatePackage {
                    name: pkg.name().to_string(),
                    first: existing.location().to_path_buf(),
                    second: pkg.location().to_path_buf(),
                });
            }
            packages.insert(pkg.name(), pkg.clone());
        }

        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for name in packages.keys() {
            let node = graph.add_node(*name);
            nodes.insert(*name, node);
        }

        for (name, pkg) in &packages {
            let consumer = nodes[name];
            for dep_name in pkg.dependencies().keys() {
                if dep_name == name.as_str() {
                    tracing::warn!("package `{}` declares a dependency on itself", name);
                    continue;
                }
                if let Some(&dependency) = nodes.get(dep_name.as_str()) {
                    graph.add_edge(consumer, dependency, ());
                }
            }
        }

        tracing::debug!(
            "workspace graph: {} package(s), {} internal edge(s)",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(WorkspaceGraph {
            graph,
            nodes,
            packages,
            invalid: workspace.invalid_members().to_vec(),
        })
    }

    /// Get a package by name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Whether a package with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// All packages in name order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// All package names in order.
    pub fn names(&self) -> Vec<PackageName> {
        self.packages.keys().copied().collect()
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Members excluded at load time for malformed manifests.
    pub fn invalid_members(&self) -> &[InvalidMember] {
        &self.invalid
    }

    /// Direct internal dependencies of a package, in name order.
    pub fn dependencies(&self, name: &str) -> Vec<PackageName> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Direct internal dependents (consumers) of a package, in name order.
    pub fn dependents(&self, name: &str) -> Vec<PackageName> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<PackageName> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<PackageName> = self
            .graph
            .neighbors_directed(node, dir)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out
    }

    /// Every package transitively depended on by a seed, seeds included.
    pub fn descendants(&self, seeds: &BTreeSet<PackageName>) -> BTreeSet<PackageName> {
        self.reachable(seeds, Direction::Outgoing)
    }

    /// Every package that transitively depends on a seed, seeds included.
    pub fn ancestors(&self, seeds: &BTreeSet<PackageName>) -> BTreeSet<PackageName> {
        self.reachable(seeds, Direction::Incoming)
    }

    fn reachable(&self, seeds: &BTreeSet<PackageName>, dir: Direction) -> BTreeSet<PackageName> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<PackageName> = seeds.iter().copied().collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(&node) = self.nodes.get(current.as_str()) else {
                continue;
            };
            for neighbor in self.graph.neighbors_directed(node, dir) {
                stack.push(self.graph[neighbor]);
            }
        }

        visited
    }
}
