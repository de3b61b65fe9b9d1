//! Workspace configuration file support.
//!
//! Armada reads an optional `armada.toml` next to the root manifest. It holds
//! orchestration policy that does not belong in any one package: the default
//! compare branch, workspace-wide externally-provided package names, and the
//! shim commands the orchestrator dispatches to.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Workspace configuration file name.
pub const CONFIG_FILE: &str = "armada.toml";

/// Workspace-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceConfig {
    /// Build policy
    pub build: BuildSettings,

    /// External tool commands
    pub commands: CommandSettings,
}

/// Build policy settings from the `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildSettings {
    /// Branch that `--changed` compares against when none is given
    pub compare_branch: Option<String>,

    /// Package names provided by the host environment for every target
    pub externals: Vec<String>,
}

/// Shim command settings from the `[commands]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CommandSettings {
    /// Artifact compiler executable for app and esm-view targets
    pub compiler: Option<String>,

    /// Transpiler executable for library and view targets
    pub transpiler: Option<String>,

    /// Package manager used for script pass-through builds
    pub package_manager: Option<String>,
}

impl WorkspaceConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file is absent
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}
