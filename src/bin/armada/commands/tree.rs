//! `armada tree` command

use std::collections::HashSet;

use anyhow::Result;

use crate::cli::TreeArgs;
use armada::core::Workspace;
use armada::graph::WorkspaceGraph;
use armada::util::WorkspaceContext;
use armada::PackageName;

pub fn execute(args: TreeArgs) -> Result<()> {
    let ctx = WorkspaceContext::new()?;
    let ws = Workspace::load(ctx.root())?;
    let graph = WorkspaceGraph::build(&ws)?;

    // Roots are packages no other member depends on.
    let roots: Vec<PackageName> = graph
        .packages()
        .filter(|p| graph.dependents(&p.name()).is_empty())
        .map(|p| p.name())
        .collect();

    let max_depth = args.depth.unwrap_or(usize::MAX);
    let mut seen = HashSet::new();
    for root in roots {
        print_tree(&graph, root, 0, max_depth, &mut seen);
    }

    Ok(())
}

fn print_tree(
    graph: &WorkspaceGraph,
    name: PackageName,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<PackageName>,
) {
    if depth > max_depth {
        return;
    }

    let is_repeat = !seen.insert(name);

    let prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}├── ", "│   ".repeat(depth - 1))
    };

    let marker = if is_repeat { " (*)" } else { "" };

    let version = graph
        .package(&name)
        .map(|p| p.version().to_string())
        .unwrap_or_default();
    println!("{}{} v{}{}", prefix, name, version, marker);

    if is_repeat {
        return;
    }

    for dep in graph.dependencies(&name) {
        print_tree(graph, dep, depth + 1, max_depth, seen);
    }
}
