//! `armada test` command

use anyhow::Result;

use crate::cli::TestArgs;
use crate::commands::to_selectors;
use armada::ops::test::{test, TestOptions};
use armada::util::WorkspaceContext;

pub fn execute(args: TestArgs, verbose: bool, color: bool) -> Result<()> {
    let mut ctx = WorkspaceContext::new()?;
    ctx.set_verbose(verbose);
    ctx.set_color(color);

    let opts = TestOptions {
        selectors: to_selectors(args.selectors),
    };

    let tested = test(&ctx, &opts)?;

    for name in &tested {
        eprintln!("      Passed `{}`", name);
    }

    Ok(())
}
