//! `armada deps` command
//!
//! Prints a target's dependency classification: the bundled/external
//! partition, the effective resolutions, and any version conflicts.

use anyhow::Result;

use crate::cli::DepsArgs;
use armada::classify::{classify, ExternalPolicy};
use armada::core::Workspace;
use armada::graph::WorkspaceGraph;
use armada::resolve::InstalledTree;
use armada::select::SelectError;
use armada::util::config::WorkspaceConfig;
use armada::util::{diagnostic, WorkspaceContext};

pub fn execute(args: DepsArgs) -> Result<()> {
    let ctx = WorkspaceContext::new()?;
    let ws = Workspace::load(ctx.root())?;
    let config = WorkspaceConfig::load_or_default(&ctx.config_path());
    let graph = WorkspaceGraph::build(&ws)?;

    let Some(pkg) = graph.package(&args.package) else {
        return Err(SelectError::UnknownPackage {
            name: args.package.clone(),
        }
        .into());
    };

    let policy = ExternalPolicy::for_target(&config.build.externals, pkg);
    let resolver = InstalledTree::new(ctx.root());
    let record = classify(&graph, &args.package, &policy, &resolver)?;

    for conflict in &record.conflicts {
        diagnostic::emit(&conflict.to_diagnostic(), ctx.color());
    }

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}
