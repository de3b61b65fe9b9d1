//! Workspace context threaded through every operation.
//!
//! There is no ambient global state: the resolved workspace root and output
//! preferences are carried explicitly into the graph builder, classifier and
//! orchestrator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::workspace::Workspace;
use crate::util::config::CONFIG_FILE;

/// Resolved invocation context: where the workspace is, and how to talk to
/// the user.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    /// Absolute workspace root
    root: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl WorkspaceContext {
    /// Resolve the context from the current directory, walking upward to the
    /// workspace root.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let root = Workspace::find_root(&cwd)?;
        Ok(Self::at_root(root))
    }

    /// Create a context for a known workspace root.
    pub fn at_root(root: PathBuf) -> Self {
        WorkspaceContext {
            root,
            verbose: false,
            color: true,
        }
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The workspace configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }
}
