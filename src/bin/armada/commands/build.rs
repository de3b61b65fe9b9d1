//! `armada build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use crate::commands::to_selectors;
use armada::ops::build::{build, BuildOptions};
use armada::util::WorkspaceContext;

pub fn execute(args: BuildArgs, verbose: bool, color: bool) -> Result<()> {
    let mut ctx = WorkspaceContext::new()?;
    ctx.set_verbose(verbose);
    ctx.set_color(color);

    let opts = BuildOptions {
        selectors: to_selectors(args.selectors),
        dry_run: args.dry_run,
    };

    let report = build(&ctx, &opts)?;

    for name in &report.built {
        eprintln!("    Finished `{}`", name);
    }

    Ok(())
}
