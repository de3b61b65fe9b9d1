//! Workspace discovery and member loading.
//!
//! The workspace root is the directory whose `package.json` declares member
//! globs under `workspaces`. Every matching member manifest is loaded and
//! validated up front; a malformed member does not abort the load, it is
//! recorded and only becomes fatal if a later selection names it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::core::manifest::{peek_name, Manifest, MANIFEST_FILE};
use crate::core::package::Package;

/// Error locating a workspace root.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(
        "could not find a workspace root in `{}` or any parent directory\n\
         help: the root package.json must declare member globs under `workspaces`",
        .dir.display()
    )]
    RootNotFound { dir: PathBuf },
}

/// A member manifest that failed to load or validate.
///
/// Kept around so explicit selectors can fail with the real cause instead of
/// a generic unknown-package error.
#[derive(Debug, Clone)]
pub struct InvalidMember {
    /// Manifest path of the broken member
    pub path: PathBuf,

    /// Best-effort name, when the JSON was readable enough to contain one
    pub name: Option<String>,

    /// What went wrong
    pub error: String,
}

/// The loaded workspace: root path plus every member package.
#[derive(Debug)]
pub struct Workspace {
    /// Absolute workspace root
    root: PathBuf,

    /// Valid member packages, in discovery order (sorted by manifest path)
    packages: Vec<Package>,

    /// Members whose manifests failed validation
    invalid: Vec<InvalidMember>,
}

/// Just enough of the root manifest to find member globs.
#[derive(Debug, Deserialize)]
struct RootGlobs {
    #[serde(default)]
    workspaces: Vec<String>,
}

impl Workspace {
    /// Load the workspace rooted at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let root_manifest = root.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&root_manifest).with_context(|| {
            format!("failed to read workspace manifest: {}", root_manifest.display())
        })?;

        let globs: RootGlobs = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", root_manifest.display()))?;

        if globs.workspaces.is_empty() {
            anyhow::bail!(
                "{} does not declare any `workspaces` member globs",
                root_manifest.display()
            );
        }

        let mut manifest_paths = BTreeSet::new();
        for pattern in &globs.workspaces {
            let expr = format!("{}/{}/{}", root.display(), pattern, MANIFEST_FILE);
            let matches = glob::glob(&expr)
                .with_context(|| format!("invalid workspace glob `{}`", pattern))?;
            for entry in matches {
                let path = entry.with_context(|| format!("failed to scan glob `{}`", pattern))?;
                manifest_paths.insert(path);
            }
        }

        tracing::debug!(
            "discovered {} member manifest(s) under {}",
            manifest_paths.len(),
            root.display()
        );

        let mut packages = Vec::new();
        let mut invalid = Vec::new();
        for path in manifest_paths {
            match Manifest::load(&path).and_then(|m| Package::from_manifest(m, root)) {
                Ok(pkg) => packages.push(pkg),
                Err(err) => {
                    tracing::warn!("skipping malformed member at {}: {:#}", path.display(), err);
                    invalid.push(InvalidMember {
                        name: peek_name(&path),
                        path,
                        error: format!("{:#}", err),
                    });
                }
            }
        }

        Ok(Workspace {
            root: root.to_path_buf(),
            packages,
            invalid,
        })
    }

    /// Find the workspace root by walking upward from `start`.
    pub fn find_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
        let mut current = start.to_path_buf();
        loop {
            let manifest = current.join(MANIFEST_FILE);
            if manifest.is_file() {
                let is_root = std::fs::read_to_string(&manifest)
                    .ok()
                    .and_then(|c| serde_json::from_str::<RootGlobs>(&c).ok())
                    .is_some_and(|g| !g.workspaces.is_empty());
                if is_root {
                    return Ok(current);
                }
            }
            if !current.pop() {
                return Err(WorkspaceError::RootNotFound {
                    dir: start.to_path_buf(),
                });
            }
        }
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All valid member packages.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Members whose manifests failed validation.
    pub fn invalid_members(&self) -> &[InvalidMember] {
        &self.invalid
    }

    /// Find the member whose directory is `path` (workspace-relative or
    /// absolute). Used by `--path` selectors.
    pub fn package_at(&self, path: &Path) -> Option<&Package> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        self.packages.iter().find(|p| p.root() == absolute)
    }
}
