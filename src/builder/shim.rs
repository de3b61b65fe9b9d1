//! Compiler shims.
//!
//! Armada never compiles anything itself. Standalone and library-path builds
//! both go through the same narrow interface: a request describing the target
//! and its dependency split goes in, entry-point locations come out. The
//! shipped implementation shells out to a configured executable, passing the
//! request as JSON on stdin and reading the report from stdout.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::manifest::BuildKind;
use crate::util::diagnostic::suggestions;
use crate::util::process::{find_executable, ProcessBuilder};

/// Default artifact compiler executable for app and esm-view targets.
pub const DEFAULT_COMPILER: &str = "armada-bundler";

/// Default transpiler executable for library and view targets.
pub const DEFAULT_TRANSPILER: &str = "armada-transpiler";

/// Everything a shim needs to build one target.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest<'a> {
    /// Target package name
    pub name: &'a str,

    /// Target build kind
    pub kind: BuildKind,

    /// Absolute package directory
    pub package_dir: &'a Path,

    /// Where outputs must land
    pub output_dir: &'a Path,

    /// Effective versions embedded into the artifact
    pub bundled: &'a BTreeMap<String, String>,

    /// Effective versions the host provides at runtime (the import map)
    pub external: &'a BTreeMap<String, String>,
}

/// What a shim reports back: enough to locate the primary entry outputs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    /// Primary script entry, relative to the output directory
    pub js_entry_point: Option<String>,

    /// Primary style entry, relative to the output directory
    pub css_entry_point: Option<String>,
}

/// A build backend for one target.
pub trait ArtifactCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput>;
}

/// Shim that invokes an external compiler executable.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
}

impl CommandCompiler {
    /// Create a shim for the named executable. The lookup happens at compile
    /// time, not construction, so a missing tool only fails builds that
    /// actually need it.
    pub fn new(program: impl Into<String>) -> Self {
        CommandCompiler {
            program: program.into(),
        }
    }
}

impl ArtifactCompiler for CommandCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput> {
        let program = find_executable(&self.program).with_context(|| {
            format!(
                "compiler `{}` not found on PATH\n{}",
                self.program,
                suggestions::SHIM_NOT_FOUND
            )
        })?;

        let payload = serde_json::to_vec(request)?;

        tracing::debug!("invoking `{}` for `{}`", self.program, request.name);
        let output = ProcessBuilder::new(&program)
            .arg(request.name)
            .cwd(request.package_dir)
            .stdin(payload)
            .exec_and_check()?;

        serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "compiler `{}` returned a malformed entry-point report",
                self.program
            )
        })
    }
}
