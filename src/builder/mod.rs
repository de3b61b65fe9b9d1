//! Build orchestration.
//!
//! The orchestrator walks a selection in order and dispatches each package to
//! its build strategy: standalone targets go through the artifact-compiler
//! shim, library-path targets through the transpiler shim, unmanaged packages
//! through their own build script. Compilation itself lives behind narrow
//! interfaces; what this module owns is ordering, dispatch, the output
//! manifest, and fail-fast error policy.

pub mod orchestrator;
pub mod output;
pub mod script;
pub mod shim;

use anyhow::Error;
use thiserror::Error as ThisError;

use crate::core::name::PackageName;
use crate::util::diagnostic::{suggestions, Diagnostic};

pub use orchestrator::Orchestrator;
pub use script::ScriptRunner;
pub use shim::{ArtifactCompiler, CommandCompiler, CompileOutput, CompileRequest};

/// Error from a build run.
#[derive(Debug, ThisError)]
pub enum BuildError {
    #[error("building `{package}` failed")]
    StepFailed {
        package: String,
        #[source]
        source: Error,
    },
}

impl BuildError {
    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::StepFailed { package, source } => {
                Diagnostic::error(format!("building `{}` failed", package))
                    .with_context(format!("{:#}", source))
                    .with_suggestion(suggestions::BUILD_FAILED)
            }
        }
    }
}

/// What a build run accomplished before finishing or failing.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Packages built, in completion order
    pub built: Vec<PackageName>,
}
