//! Package - a workspace member with its manifest and resolved location.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use semver::Version;

use crate::core::manifest::{BuildKind, Manifest};
use crate::core::name::PackageName;

/// A workspace package: validated manifest plus its place in the workspace.
///
/// Packages are constructed once per orchestration run and never mutated;
/// the graph, classifier and selection engine all share them read-only.
#[derive(Debug, Clone)]
pub struct Package {
    /// The package name
    name: PackageName,

    /// The parsed manifest
    manifest: Manifest,

    /// Absolute package directory
    root: PathBuf,

    /// Directory relative to the workspace root
    location: PathBuf,
}

impl Package {
    /// Create a package from a manifest, anchored to a workspace root.
    pub fn from_manifest(manifest: Manifest, workspace_root: &Path) -> Result<Self> {
        let root = manifest
            .manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let location = pathdiff::diff_paths(&root, workspace_root)
            .unwrap_or_else(|| root.clone());

        Ok(Package {
            name: PackageName::new(&manifest.name),
            manifest,
            root,
            location,
        })
    }

    /// Get the package name.
    pub fn name(&self) -> PackageName {
        self.name
    }

    /// Get the package version.
    pub fn version(&self) -> &Version {
        &self.manifest.version
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Absolute package directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory relative to the workspace root.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Declared dependencies: name -> version specifier.
    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.manifest.dependencies
    }

    /// Whether the package is private.
    pub fn is_private(&self) -> bool {
        self.manifest.private
    }

    /// The build kind marker.
    pub fn build_kind(&self) -> BuildKind {
        self.manifest.build_kind
    }

    /// Externally-provided package names declared by this package.
    pub fn externals(&self) -> &[String] {
        &self.manifest.externals
    }

    /// License identifier, if declared.
    pub fn license(&self) -> Option<&str> {
        self.manifest.license.as_deref()
    }

    /// Look up a lifecycle script.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.manifest.script(name)
    }

    /// Whether the package declares a lifecycle script.
    pub fn has_script(&self, name: &str) -> bool {
        self.script(name).is_some()
    }

    /// Where build outputs for this package land.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("dist")
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.manifest.version)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Package {}

impl std::hash::Hash for Package {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
