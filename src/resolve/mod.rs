//! Installed-version lookup.
//!
//! Version reconciliation never merges semver ranges. The single version that
//! is actually installed wins, and this module answers "which version is
//! that" for a dependency name. Lookup is advisory: an unknown name returns
//! `None` rather than failing, and the classifier records the gap.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

/// Answers which version of a dependency is installed.
pub trait PackageResolver {
    /// The single installed version for `name`, or `None` when the name is
    /// not present in the snapshot.
    fn resolved_version(&self, name: &str) -> Option<Version>;
}

/// Resolver backed by the workspace's installed dependency tree
/// (`node_modules/<name>/package.json`).
#[derive(Debug)]
pub struct InstalledTree {
    modules_dir: PathBuf,
}

/// The one field we need from an installed manifest.
#[derive(Debug, Deserialize)]
struct InstalledManifest {
    version: Option<String>,
}

impl InstalledTree {
    /// Create a resolver rooted at a workspace directory.
    pub fn new(workspace_root: &Path) -> Self {
        InstalledTree {
            modules_dir: workspace_root.join("node_modules"),
        }
    }
}

impl PackageResolver for InstalledTree {
    fn resolved_version(&self, name: &str) -> Option<Version> {
        // Scoped names contain a separator and nest one directory deeper.
        let manifest_path = self.modules_dir.join(name).join("package.json");
        let content = std::fs::read_to_string(&manifest_path).ok()?;
        let manifest: InstalledManifest = serde_json::from_str(&content).ok()?;
        let version = Version::parse(&manifest.version?).ok();
        if version.is_none() {
            tracing::debug!(
                "installed manifest at {} has an unparseable version",
                manifest_path.display()
            );
        }
        version
    }
}

/// In-memory snapshot resolver.
#[derive(Debug, Default)]
pub struct Snapshot {
    versions: BTreeMap<String, Version>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an installed version.
    pub fn insert(&mut self, name: impl Into<String>, version: Version) {
        self.versions.insert(name.into(), version);
    }
}

impl FromIterator<(String, Version)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Version)>>(iter: I) -> Self {
        Snapshot {
            versions: iter.into_iter().collect(),
        }
    }
}

impl PackageResolver for Snapshot {
    fn resolved_version(&self, name: &str) -> Option<Version> {
        self.versions.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install(root: &Path, name: &str, version: &str) {
        let dir = root.join("node_modules").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{ "name": "{}", "version": "{}" }}"#, name, version),
        )
        .unwrap();
    }

    #[test]
    fn test_installed_tree_lookup() {
        let tmp = TempDir::new().unwrap();
        install(tmp.path(), "react", "18.2.0");
        install(tmp.path(), "@acme/tokens", "2.0.1");

        let resolver = InstalledTree::new(tmp.path());
        assert_eq!(
            resolver.resolved_version("react"),
            Some(Version::new(18, 2, 0))
        );
        assert_eq!(
            resolver.resolved_version("@acme/tokens"),
            Some(Version::new(2, 0, 1))
        );
        assert_eq!(resolver.resolved_version("absent"), None);
    }

    #[test]
    fn test_snapshot_lookup() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("lodash", Version::new(4, 17, 21));

        assert_eq!(
            snapshot.resolved_version("lodash"),
            Some(Version::new(4, 17, 21))
        );
        assert_eq!(snapshot.resolved_version("underscore"), None);
    }
}
