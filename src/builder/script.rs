//! Script pass-through builds.
//!
//! Unmanaged packages are opaque: they declare a `build` (or `test`)
//! lifecycle script and armada runs it through the package manager in the
//! package's own directory.

use anyhow::{bail, Context, Result};

use crate::core::package::Package;
use crate::util::process::{find_package_manager, ProcessBuilder};

/// Runs package lifecycle scripts via the workspace package manager.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    /// Configured package manager name, if any
    preference: Option<String>,
}

impl ScriptRunner {
    /// Create a runner with an optional configured package manager.
    pub fn new(preference: Option<String>) -> Self {
        ScriptRunner { preference }
    }

    /// Run a lifecycle script of a package and wait for completion.
    pub fn run(&self, pkg: &Package, script: &str) -> Result<()> {
        if !pkg.has_script(script) {
            bail!("package `{}` has no `{}` script", pkg.name(), script);
        }

        let manager = find_package_manager(self.preference.as_deref()).with_context(|| {
            match &self.preference {
                Some(name) => format!("package manager `{}` not found on PATH", name),
                None => "no package manager (yarn, npm, pnpm) found on PATH".to_string(),
            }
        })?;

        tracing::debug!("running `{}` script for `{}`", script, pkg.name());
        let output = ProcessBuilder::new(&manager)
            .args(["run", script])
            .cwd(pkg.root())
            .exec_and_check()
            .with_context(|| format!("`{}` script failed for `{}`", script, pkg.name()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!("{}", stdout.trim_end());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;
    use std::path::Path;
    use tempfile::TempDir;

    fn package(root: &Path, scripts: &str) -> Package {
        let dir = root.join("tool");
        std::fs::create_dir_all(&dir).unwrap();
        let content = format!(
            r#"{{ "name": "tool", "version": "1.0.0", "scripts": {} }}"#,
            scripts
        );
        let manifest = Manifest::parse(&content, &dir.join("package.json")).unwrap();
        Package::from_manifest(manifest, root).unwrap()
    }

    #[test]
    fn test_missing_script_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let pkg = package(tmp.path(), r#"{}"#);
        let runner = ScriptRunner::new(Some("true".to_string()));
        let err = runner.run(&pkg, "build").unwrap_err();
        assert!(err.to_string().contains("no `build` script"));
    }

    #[test]
    fn test_successful_script() {
        let tmp = TempDir::new().unwrap();
        let pkg = package(tmp.path(), r#"{ "build": "exit 0" }"#);
        // `true` ignores its arguments and succeeds, standing in for a real
        // package manager.
        let runner = ScriptRunner::new(Some("true".to_string()));
        runner.run(&pkg, "build").unwrap();
    }

    #[test]
    fn test_failing_script_surfaces_package() {
        let tmp = TempDir::new().unwrap();
        let pkg = package(tmp.path(), r#"{ "build": "exit 1" }"#);
        let runner = ScriptRunner::new(Some("false".to_string()));
        let err = runner.run(&pkg, "build").unwrap_err();
        assert!(format!("{:#}", err).contains("`build` script failed for `tool`"));
    }

    #[test]
    fn test_unknown_package_manager() {
        let tmp = TempDir::new().unwrap();
        let pkg = package(tmp.path(), r#"{ "build": "exit 0" }"#);
        let runner = ScriptRunner::new(Some("not-a-package-manager".to_string()));
        let err = runner.run(&pkg, "build").unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }
}
