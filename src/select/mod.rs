//! Selection engine: which packages to act on, in what order.
//!
//! A selection request starts from seeds (explicit names plus change
//! detection), optionally expands along the graph (ancestors, descendants),
//! filters (private packages, admission predicate), and orders the survivors
//! dependency-first. Ordering is fully deterministic: ties are broken
//! lexically, and cycles are either fatal or collapsed into lexically
//! ordered units under the opt-in degraded mode.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::core::manifest::BuildKind;
use crate::core::name::PackageName;
use crate::core::package::Package;
use crate::graph::WorkspaceGraph;
use crate::scm::ChangeDetector;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A selection request. Fields combine freely.
#[derive(Debug, Clone, Default)]
pub struct SelectionRequest {
    /// Package names requested directly
    pub targets: Vec<String>,

    /// Seed the selection with packages changed since the compare ref
    pub changed: bool,

    /// Also select every package that transitively depends on a seed
    pub ancestors: bool,

    /// Also select every package a seed transitively depends on
    pub descendants: bool,

    /// Allow private packages that were not explicitly named
    pub include_private: bool,

    /// Degraded mode: order cycle members deterministically instead of
    /// failing
    pub dangerously_ignore_circular_dependencies: bool,
}

/// An ordered selection: for every internal edge `A -> B` between members,
/// B precedes A.
#[derive(Debug, Default)]
pub struct Selection {
    /// Build order, dependencies first
    pub order: Vec<PackageName>,

    /// Non-fatal findings (ignored cycles)
    pub warnings: Vec<Diagnostic>,
}

impl Selection {
    /// Number of selected packages.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing matched. Not an error; callers decide.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Error computing a selection.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("unknown package `{name}`")]
    UnknownPackage { name: String },

    #[error(
        "cannot select `{name}`: its manifest at `{}` is invalid ({error})",
        .path.display()
    )]
    InvalidMember {
        name: String,
        path: PathBuf,
        error: String,
    },

    #[error("circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("failed to determine changed packages")]
    ChangeDetection {
        #[source]
        source: anyhow::Error,
    },
}

impl SelectError {
    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            SelectError::UnknownPackage { name } => {
                Diagnostic::error(format!("unknown package `{}`", name))
                    .with_suggestion(suggestions::PACKAGE_NOT_FOUND)
            }
            SelectError::InvalidMember { name, path, error } => {
                Diagnostic::error(format!("cannot select `{}`", name))
                    .with_location(path.clone())
                    .with_context(error.clone())
                    .with_suggestion("help: fix the manifest before selecting this package")
            }
            SelectError::CircularDependency { cycle } => {
                Diagnostic::error("circular dependency between workspace packages")
                    .with_context(format!("cycle: {}", cycle.join(" -> ")))
                    .with_suggestion(suggestions::CYCLE)
            }
            SelectError::ChangeDetection { source } => {
                Diagnostic::error("failed to determine changed packages")
                    .with_context(format!("{:#}", source))
            }
        }
    }
}

/// Admission predicate for build operations: managed kinds always qualify,
/// unmanaged packages only when they can build themselves.
pub fn buildable(pkg: &Package) -> bool {
    match pkg.build_kind() {
        BuildKind::App | BuildKind::EsmView | BuildKind::View | BuildKind::Library => true,
        BuildKind::Unmanaged => pkg.has_script("build"),
    }
}

/// Admission predicate for test operations.
pub fn testable(pkg: &Package) -> bool {
    pkg.has_script("test")
}

/// Compute the selection for a request.
pub fn select(
    graph: &WorkspaceGraph,
    request: &SelectionRequest,
    changes: &dyn ChangeDetector,
    admit: &dyn Fn(&Package) -> bool,
) -> Result<Selection, SelectError> {
    // Every explicit target must resolve before anything else runs.
    let mut explicit = BTreeSet::new();
    for name in &request.targets {
        if graph.contains(name) {
            explicit.insert(PackageName::new(name));
            continue;
        }
        if let Some(broken) = graph
            .invalid_members()
            .iter()
            .find(|m| m.name.as_deref() == Some(name.as_str()))
        {
            return Err(SelectError::InvalidMember {
                name: name.clone(),
                path: broken.path.clone(),
                error: broken.error.clone(),
            });
        }
        return Err(SelectError::UnknownPackage { name: name.clone() });
    }

    let mut seeds = explicit.clone();
    if request.changed {
        let changed = changes
            .changed_packages(graph)
            .map_err(|source| SelectError::ChangeDetection { source })?;
        seeds.extend(changed);
    }

    let mut set = seeds.clone();
    if request.descendants {
        set.extend(graph.descendants(&seeds));
    }
    if request.ancestors {
        set.extend(graph.ancestors(&seeds));
    }

    // Private packages ride along only when asked for by name or flag.
    set.retain(|name| {
        let Some(pkg) = graph.package(name) else {
            return false;
        };
        if pkg.is_private() && !request.include_private && !explicit.contains(name) {
            return false;
        }
        admit(pkg)
    });

    let (order, warnings) = order_packages(
        graph,
        &set,
        request.dangerously_ignore_circular_dependencies,
    )?;

    Ok(Selection { order, warnings })
}

/// Order a set of packages dependency-first over the induced subgraph.
///
/// Strongly connected components with more than one member are cycles:
/// fatal unless `ignore_cycles`, in which case each component is emitted as
/// one lexically ordered unit.
fn order_packages(
    graph: &WorkspaceGraph,
    set: &BTreeSet<PackageName>,
    ignore_cycles: bool,
) -> Result<(Vec<PackageName>, Vec<Diagnostic>), SelectError> {
    let mut sub = DiGraph::<PackageName, ()>::new();
    let mut index_of: HashMap<PackageName, NodeIndex> = HashMap::new();
    for name in set {
        index_of.insert(*name, sub.add_node(*name));
    }
    for name in set {
        for dep in graph.dependencies(name) {
            if let Some(&dep_node) = index_of.get(&dep) {
                sub.add_edge(index_of[name], dep_node, ());
            }
        }
    }

    let mut warnings = Vec::new();

    let sccs = tarjan_scc(&sub);
    let mut component_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut members: Vec<Vec<PackageName>> = Vec::with_capacity(sccs.len());
    for (component, scc) in sccs.iter().enumerate() {
        let mut names: Vec<PackageName> = scc.iter().map(|&n| sub[n]).collect();
        names.sort();

        if names.len() > 1 {
            let cycle: Vec<String> = names.iter().map(|n| n.to_string()).collect();
            if !ignore_cycles {
                return Err(SelectError::CircularDependency { cycle });
            }
            warnings.push(
                Diagnostic::warning(format!(
                    "ignoring a circular dependency among {} packages",
                    cycle.len()
                ))
                .with_context(format!("cycle: {}", cycle.join(" -> ")))
                .with_suggestion(suggestions::CYCLE),
            );
        }

        for &node in scc {
            component_of.insert(node, component);
        }
        members.push(names);
    }

    // Condensed dependency sets between components (a DAG by construction).
    let mut pending: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); members.len()];
    let mut consumers: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); members.len()];
    for edge in sub.edge_indices() {
        if let Some((from, to)) = sub.edge_endpoints(edge) {
            let (cf, ct) = (component_of[&from], component_of[&to]);
            if cf != ct {
                pending[cf].insert(ct);
                consumers[ct].insert(cf);
            }
        }
    }

    // Kahn's algorithm, always taking the ready unit with the lexically
    // smallest representative so the order is stable across runs.
    let mut ready: BTreeSet<(PackageName, usize)> = (0..members.len())
        .filter(|&c| pending[c].is_empty())
        .map(|c| (members[c][0], c))
        .collect();

    let mut order = Vec::with_capacity(set.len());
    while let Some(&(rep, component)) = ready.iter().next() {
        ready.remove(&(rep, component));
        order.extend(members[component].iter().copied());

        for &consumer in &consumers[component] {
            pending[consumer].remove(&component);
            if pending[consumer].is_empty() {
                ready.insert((members[consumer][0], consumer));
            }
        }
    }

    Ok((order, warnings))
}
