//! Implementation of `armada build`.

use anyhow::Result;

use crate::builder::{BuildReport, Orchestrator};
use crate::core::workspace::Workspace;
use crate::graph::WorkspaceGraph;
use crate::ops::{plan_selection, Selectors};
use crate::resolve::InstalledTree;
use crate::select::buildable;
use crate::util::config::WorkspaceConfig;
use crate::util::context::WorkspaceContext;
use crate::util::diagnostic;

/// Options for the build operation.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Target selectors
    pub selectors: Selectors,

    /// Print the computed build order as JSON instead of building
    pub dry_run: bool,
}

/// Build the selected packages in dependency order.
///
/// The graph is validated and the whole selection computed before the first
/// build step runs, so an invalid request never leaves partial work behind.
pub fn build(ctx: &WorkspaceContext, opts: &BuildOptions) -> Result<BuildReport> {
    let ws = Workspace::load(ctx.root())?;

    for member in ws.invalid_members() {
        tracing::warn!(
            "ignoring member with invalid manifest at {}: {}",
            member.path.display(),
            member.error
        );
    }

    let config = WorkspaceConfig::load_or_default(&ctx.config_path());
    let graph = WorkspaceGraph::build(&ws)?;

    let selection = plan_selection(ctx, &graph, &config, &opts.selectors, &buildable)?;

    if selection.is_empty() {
        tracing::info!("no workspaces to build");
        return Ok(BuildReport::default());
    }

    for warning in &selection.warnings {
        diagnostic::emit(warning, ctx.color());
    }

    tracing::debug!(
        "building in order: {:?}",
        selection.order.iter().map(|n| n.as_str()).collect::<Vec<_>>()
    );

    if opts.dry_run {
        println!("{}", serde_json::to_string_pretty(&selection.order)?);
        return Ok(BuildReport::default());
    }

    let resolver = InstalledTree::new(ctx.root());
    let orchestrator = Orchestrator::new(ctx, &graph, &config, &resolver);
    let report = orchestrator.run(&selection)?;

    Ok(report)
}
