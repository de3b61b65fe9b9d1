//! CLI command implementations.

pub mod build;
pub mod completions;
pub mod deps;
pub mod test;
pub mod tree;

use armada::ops::Selectors;

use crate::cli::SelectorArgs;

/// Map shared selector flags onto operation selectors.
pub fn to_selectors(args: SelectorArgs) -> Selectors {
    Selectors {
        packages: args.packages,
        paths: args.path,
        ancestors: args.ancestors,
        descendants: args.descendants,
        changed: args.changed,
        compare_branch: args.compare_branch,
        include_private: args.private,
        dangerously_ignore_circular_dependencies: args.dangerously_ignore_circular_dependencies,
    }
}
