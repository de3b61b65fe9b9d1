//! `package.json` manifest parsing and schema.
//!
//! The manifest is the single source of truth for a workspace package:
//! identity, declared dependencies, build scripts, and the `armada` section
//! that marks how the package is built. Shapes are validated here, at the
//! boundary, so the graph algorithms never see a half-formed package.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::name::is_valid_name;

/// Manifest file name, one per package directory.
pub const MANIFEST_FILE: &str = "package.json";

/// How a package is built, from the manifest's `armada.type` marker.
///
/// This is a closed enumeration: the orchestrator dispatches on it
/// exhaustively, and a new kind is an explicit schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildKind {
    /// Standalone application bundle
    App,
    /// Standalone ES-module view, consumed by a host at runtime
    EsmView,
    /// Embeddable view, built as a library
    View,
    /// Plain library
    Library,
    /// No marker: the package builds itself through its own `build` script
    #[default]
    Unmanaged,
}

impl BuildKind {
    /// Standalone kinds produce a self-contained compiled artifact.
    pub fn is_standalone(&self) -> bool {
        matches!(self, BuildKind::App | BuildKind::EsmView)
    }

    /// Library-path kinds are transpiled and published with a manifest
    /// declaring their dependency partition.
    pub fn is_library_like(&self) -> bool {
        matches!(self, BuildKind::View | BuildKind::Library)
    }

    /// Source kinds are pulled directly into a consumer's own bundle when
    /// depended upon inside the workspace; everything else stays an
    /// installed package dependency.
    pub fn is_source_dependency(&self) -> bool {
        self.is_library_like()
    }
}

impl std::fmt::Display for BuildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildKind::App => "app",
            BuildKind::EsmView => "esm-view",
            BuildKind::View => "view",
            BuildKind::Library => "library",
            BuildKind::Unmanaged => "unmanaged",
        };
        write!(f, "{}", s)
    }
}

/// The validated manifest of one workspace package.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Package name (scoped names allowed)
    pub name: String,

    /// Parsed package version
    pub version: Version,

    /// Declared dependencies: name -> version specifier
    pub dependencies: BTreeMap<String, String>,

    /// Private packages are excluded from incidental selection
    pub private: bool,

    /// Build kind from the `armada.type` marker
    pub build_kind: BuildKind,

    /// Externally-provided package names declared by this package
    pub externals: Vec<String>,

    /// Lifecycle scripts: name -> shell command
    pub scripts: BTreeMap<String, String>,

    /// Workspace member glob patterns (root manifest only)
    pub workspaces: Vec<String>,

    /// License identifier
    pub license: Option<String>,

    /// Where this manifest was loaded from
    pub manifest_path: PathBuf,
}

/// Raw manifest as deserialized from JSON.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,

    version: Option<String>,

    #[serde(default)]
    private: bool,

    #[serde(default)]
    dependencies: BTreeMap<String, String>,

    #[serde(default)]
    scripts: BTreeMap<String, String>,

    #[serde(default)]
    workspaces: Vec<String>,

    #[serde(default)]
    license: Option<String>,

    #[serde(default)]
    armada: Option<RawArmadaSection>,
}

/// Raw `armada` section.
#[derive(Debug, Default, Deserialize)]
struct RawArmadaSection {
    #[serde(rename = "type")]
    kind: Option<BuildKind>,

    #[serde(default)]
    externals: Vec<String>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let name = raw
            .name
            .with_context(|| format!("manifest at {} has no `name`", path.display()))?;
        if !is_valid_name(&name) {
            anyhow::bail!(
                "manifest at {} has an invalid package name `{}`",
                path.display(),
                name
            );
        }

        let version = raw
            .version
            .with_context(|| format!("manifest at {} has no `version`", path.display()))?;
        let version = Version::parse(&version)
            .with_context(|| format!("invalid version `{}` in {}", version, path.display()))?;

        let armada = raw.armada.unwrap_or_default();

        Ok(Manifest {
            name,
            version,
            dependencies: raw.dependencies,
            private: raw.private,
            build_kind: armada.kind.unwrap_or_default(),
            externals: armada.externals,
            scripts: raw.scripts,
            workspaces: raw.workspaces,
            license: raw.license,
            manifest_path: path.to_path_buf(),
        })
    }

    /// Whether the manifest declares workspace members (workspace root).
    pub fn is_workspace_root(&self) -> bool {
        !self.workspaces.is_empty()
    }

    /// Look up a lifecycle script.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }
}

/// Best-effort name extraction from a manifest that failed validation, so a
/// broken member can still be reported against an explicit selector.
pub fn peek_name(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value.get("name")?.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_manifest() {
        let content = r#"{
            "name": "@acme/button",
            "version": "1.2.0",
            "dependencies": { "react": "^18.2.0" },
            "armada": { "type": "library" }
        }"#;

        let manifest = Manifest::parse(content, Path::new("pkg/package.json")).unwrap();
        assert_eq!(manifest.name, "@acme/button");
        assert_eq!(manifest.version, Version::new(1, 2, 0));
        assert_eq!(manifest.build_kind, BuildKind::Library);
        assert_eq!(manifest.dependencies.get("react").unwrap(), "^18.2.0");
        assert!(!manifest.private);
    }

    #[test]
    fn test_parse_esm_view_with_externals() {
        let content = r#"{
            "name": "dashboard",
            "version": "0.3.1",
            "armada": { "type": "esm-view", "externals": ["react", "react-dom"] }
        }"#;

        let manifest = Manifest::parse(content, Path::new("package.json")).unwrap();
        assert_eq!(manifest.build_kind, BuildKind::EsmView);
        assert_eq!(manifest.externals, vec!["react", "react-dom"]);
    }

    #[test]
    fn test_unmarked_manifest_is_unmanaged() {
        let content = r#"{
            "name": "legacy-tool",
            "version": "2.0.0",
            "scripts": { "build": "make all" }
        }"#;

        let manifest = Manifest::parse(content, Path::new("package.json")).unwrap();
        assert_eq!(manifest.build_kind, BuildKind::Unmanaged);
        assert_eq!(manifest.script("build"), Some("make all"));
    }

    #[test]
    fn test_missing_name_fails() {
        let content = r#"{ "version": "1.0.0" }"#;
        let err = Manifest::parse(content, Path::new("package.json")).unwrap_err();
        assert!(err.to_string().contains("no `name`"));
    }

    #[test]
    fn test_invalid_name_fails() {
        let content = r#"{ "name": "Not Valid!", "version": "1.0.0" }"#;
        let err = Manifest::parse(content, Path::new("package.json")).unwrap_err();
        assert!(err.to_string().contains("invalid package name"));
    }

    #[test]
    fn test_bad_version_fails() {
        let content = r#"{ "name": "pkg", "version": "latest" }"#;
        let err = Manifest::parse(content, Path::new("package.json")).unwrap_err();
        assert!(err.to_string().contains("invalid version"));
    }

    #[test]
    fn test_workspace_root_manifest() {
        let content = r#"{
            "name": "monorepo-root",
            "version": "0.0.0",
            "private": true,
            "workspaces": ["packages/*", "apps/*"]
        }"#;

        let manifest = Manifest::parse(content, Path::new("package.json")).unwrap();
        assert!(manifest.is_workspace_root());
        assert!(manifest.private);
        assert_eq!(manifest.workspaces.len(), 2);
    }
}
