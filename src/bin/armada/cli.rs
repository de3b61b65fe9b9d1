//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Armada - a monorepo build orchestrator for package workspaces
#[derive(Parser)]
#[command(name = "armada")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build workspace packages in dependency order
    Build(BuildArgs),

    /// Run workspace test scripts in dependency order
    Test(TestArgs),

    /// Display the workspace dependency tree
    Tree(TreeArgs),

    /// Show a package's dependency classification as JSON
    Deps(DepsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Selector flags shared by build and test.
#[derive(Args, Clone)]
pub struct SelectorArgs {
    /// Package names to act on (default: the whole workspace)
    pub packages: Vec<String>,

    /// Package directories to act on
    #[arg(long)]
    pub path: Vec<PathBuf>,

    /// Also select every package that depends on the selected ones
    #[arg(long)]
    pub ancestors: bool,

    /// Also select every package the selected ones depend on
    #[arg(long)]
    pub descendants: bool,

    /// Select packages changed since the comparison branch
    #[arg(long)]
    pub changed: bool,

    /// Branch to compare against for --changed
    #[arg(long)]
    pub compare_branch: Option<String>,

    /// Include private packages that were not explicitly named
    #[arg(long)]
    pub private: bool,

    /// Build despite circular dependencies, in a degraded deterministic order
    #[arg(long)]
    pub dangerously_ignore_circular_dependencies: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub selectors: SelectorArgs,

    /// Print the computed build order as JSON instead of building
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct TestArgs {
    #[command(flatten)]
    pub selectors: SelectorArgs,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Maximum depth to display
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Package to classify
    pub package: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
