//! High-level operations behind the CLI surface.

pub mod build;

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::package::Package;
use crate::graph::WorkspaceGraph;
use crate::scm::{GitChangeDetector, NoChanges};
use crate::select::{select, Selection, SelectionRequest};
use crate::util::config::WorkspaceConfig;
use crate::util::context::WorkspaceContext;
use crate::util::diagnostic::suggestions;

/// Selector fields shared by the build and test operations. They map
/// one-to-one onto the CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Selectors {
    /// Package names requested directly
    pub packages: Vec<String>,

    /// Package directories requested directly (resolved to names)
    pub paths: Vec<PathBuf>,

    /// Also act on transitive consumers of the selected packages
    pub ancestors: bool,

    /// Also act on transitive dependencies of the selected packages
    pub descendants: bool,

    /// Seed the selection from source-control changes
    pub changed: bool,

    /// Ref that `changed` compares against; falls back to config, then `main`
    pub compare_branch: Option<String>,

    /// Allow private packages that were not explicitly named
    pub include_private: bool,

    /// Degraded cycle handling
    pub dangerously_ignore_circular_dependencies: bool,
}

/// Turn CLI selectors into an ordered selection over the graph.
///
/// With no selector at all the operation applies to the whole workspace,
/// minus private packages unless `--private` is given.
pub(crate) fn plan_selection(
    ctx: &WorkspaceContext,
    graph: &WorkspaceGraph,
    config: &WorkspaceConfig,
    selectors: &Selectors,
    admit: &dyn Fn(&Package) -> bool,
) -> Result<Selection> {
    let mut targets = selectors.packages.clone();
    for path in &selectors.paths {
        let absolute = if path.is_absolute() {
            path.clone()
        } else {
            ctx.root().join(path)
        };
        match graph.packages().find(|p| p.root() == absolute) {
            Some(pkg) => targets.push(pkg.name().to_string()),
            None => bail!(
                "no workspace package at `{}`\n{}",
                path.display(),
                suggestions::PACKAGE_NOT_FOUND
            ),
        }
    }

    let selective = !targets.is_empty()
        || selectors.changed
        || selectors.ancestors
        || selectors.descendants;
    if !selective {
        // Whole-workspace default. Private packages join only when asked
        // for; naming them here would make them look explicitly selected.
        targets = graph
            .packages()
            .filter(|p| selectors.include_private || !p.is_private())
            .map(|p| p.name().to_string())
            .collect();
    }

    let request = SelectionRequest {
        targets,
        changed: selectors.changed,
        ancestors: selectors.ancestors,
        descendants: selectors.descendants,
        include_private: selectors.include_private,
        dangerously_ignore_circular_dependencies: selectors
            .dangerously_ignore_circular_dependencies,
    };

    let selection = if selectors.changed {
        let compare = selectors
            .compare_branch
            .clone()
            .or_else(|| config.build.compare_branch.clone())
            .unwrap_or_else(|| "main".to_string());
        select(graph, &request, &GitChangeDetector::new(ctx.root(), compare), admit)?
    } else {
        select(graph, &request, &NoChanges, admit)?
    };

    Ok(selection)
}
