//! Armada CLI - a monorepo build orchestrator

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use armada::builder::BuildError;
use armada::graph::GraphError;
use armada::select::SelectError;
use armada::util::diagnostic;
use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        report(&e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("armada=debug")
    } else {
        EnvFilter::new("armada=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, cli.verbose, !cli.no_color),
        Commands::Test(args) => commands::test::execute(args, cli.verbose, !cli.no_color),
        Commands::Tree(args) => commands::tree::execute(args),
        Commands::Deps(args) => commands::deps::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error, using the rich diagnostic form for the kinds that carry
/// one.
fn report(err: &anyhow::Error) {
    let color = std::env::var_os("NO_COLOR").is_none();

    if let Some(e) = err.downcast_ref::<SelectError>() {
        diagnostic::emit(&e.to_diagnostic(), color);
        return;
    }
    if let Some(e) = err.downcast_ref::<GraphError>() {
        diagnostic::emit(&e.to_diagnostic(), color);
        return;
    }
    if let Some(e) = err.downcast_ref::<BuildError>() {
        diagnostic::emit(&e.to_diagnostic(), color);
        return;
    }

    eprintln!("error: {:#}", err);
}
