//! Output manifest emission.
//!
//! Every managed build ends by writing a manifest into the output directory
//! that declares the classifier's partition verbatim: installed requirements
//! under `dependencies`, embedded names under `bundledDependencies`, plus the
//! entry points the shim reported.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::builder::shim::CompileOutput;
use crate::classify::ResolutionRecord;
use crate::core::manifest::MANIFEST_FILE;
use crate::core::package::Package;

/// Write the output `package.json` for a built target. Returns its path.
pub fn write_output_manifest(
    pkg: &Package,
    record: &ResolutionRecord,
    entry: &CompileOutput,
) -> Result<PathBuf> {
    let out_dir = pkg.output_dir();
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    // Runtime requirements: workspace deps kept as packages, plus the
    // externally provided side of the partition at its effective versions.
    let mut dependencies = record.workspace_dependencies.clone();
    dependencies.extend(
        record
            .external_resolutions
            .iter()
            .map(|(name, version)| (name.clone(), version.clone())),
    );

    let bundled: Vec<&String> = record.bundled_resolutions.keys().collect();

    let mut manifest = Map::new();
    manifest.insert("name".into(), json!(pkg.name().as_str()));
    manifest.insert("version".into(), json!(pkg.version().to_string()));
    if let Some(license) = pkg.license() {
        manifest.insert("license".into(), json!(license));
    }
    manifest.insert("dependencies".into(), json!(dependencies));
    manifest.insert("bundledDependencies".into(), json!(bundled));
    if let Some(js) = &entry.js_entry_point {
        manifest.insert("module".into(), json!(js));
    }
    if let Some(css) = &entry.css_entry_point {
        manifest.insert("style".into(), json!(css));
    }

    let path = out_dir.join(MANIFEST_FILE);
    let content = serde_json::to_string_pretty(&Value::Object(manifest))?;
    std::fs::write(&path, content + "\n")
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}
