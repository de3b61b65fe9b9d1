//! Per-target dependency classification.
//!
//! Before a target is built, its full dependency closure is walked and every
//! external package is assigned to exactly one side of a partition: bundled
//! into the artifact, or resolved externally at runtime by the host. The
//! split itself is policy handed in by the caller; this module does the
//! propagation and version reconciliation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use semver::VersionReq;
use serde::Serialize;
use thiserror::Error;

use crate::core::name::PackageName;
use crate::core::package::Package;
use crate::graph::WorkspaceGraph;
use crate::resolve::PackageResolver;
use crate::util::diagnostic::VersionConflict;

/// Which external package names are provided by the host at runtime.
///
/// Purely an input: the union of workspace-wide configuration and the
/// target's own `armada.externals` list. The classifier never derives it.
#[derive(Debug, Clone, Default)]
pub struct ExternalPolicy {
    provided: BTreeSet<String>,
}

impl ExternalPolicy {
    /// Build a policy from any collection of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExternalPolicy {
            provided: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The effective policy for one target: workspace-wide names plus the
    /// target's own declarations.
    pub fn for_target(workspace_externals: &[String], target: &Package) -> Self {
        let mut provided: BTreeSet<String> = workspace_externals.iter().cloned().collect();
        provided.extend(target.externals().iter().cloned());
        ExternalPolicy { provided }
    }

    /// Whether the host provides this package at runtime.
    pub fn is_provided(&self, name: &str) -> bool {
        self.provided.contains(name)
    }
}

/// The classifier's output for one target.
///
/// Every external name in the closure appears in exactly one of
/// `bundled_dependencies` / `external_dependencies`; the `_resolutions` maps
/// carry the effective versions after reconciliation against the installed
/// snapshot. Workspace dependencies that are not pulled in as source stay in
/// `workspace_dependencies`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    /// External deps embedded into the artifact: name -> nominal specifier
    pub bundled_dependencies: BTreeMap<String, String>,

    /// External deps left to the host: name -> nominal specifier
    pub external_dependencies: BTreeMap<String, String>,

    /// Effective versions for the bundled side
    pub bundled_resolutions: BTreeMap<String, String>,

    /// Effective versions for the external side
    pub external_resolutions: BTreeMap<String, String>,

    /// Workspace deps kept as installed packages: name -> version
    pub workspace_dependencies: BTreeMap<String, String>,

    /// Non-fatal reconciliation findings
    #[serde(skip)]
    pub conflicts: Vec<VersionConflict>,
}

/// Error classifying a target.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("unknown package `{name}`")]
    UnknownPackage { name: String },
}

/// Classify the full dependency closure of `target`.
///
/// The walk is breadth-first from the target over internal edges, and only
/// descends into workspace packages that are source dependencies (libraries
/// and views); other internal deps are kept as installed packages. For
/// external names the first assignment wins, so a specifier declared by the
/// target itself always beats one found deeper in the closure.
pub fn classify(
    graph: &WorkspaceGraph,
    target: &str,
    policy: &ExternalPolicy,
    resolver: &dyn PackageResolver,
) -> Result<ResolutionRecord, ClassifyError> {
    let target_pkg = graph
        .package(target)
        .ok_or_else(|| ClassifyError::UnknownPackage {
            name: target.to_string(),
        })?;

    let mut record = ResolutionRecord::default();

    // name -> nominal specifier, first assignment wins
    let mut nominal: BTreeMap<String, String> = BTreeMap::new();
    // name -> every (consumer, specifier) pair, for reconciliation
    let mut consumers: BTreeMap<String, Vec<(PackageName, String)>> = BTreeMap::new();

    let mut visited: BTreeSet<PackageName> = BTreeSet::new();
    let mut queue: VecDeque<PackageName> = VecDeque::new();
    visited.insert(target_pkg.name());
    queue.push_back(target_pkg.name());

    while let Some(current) = queue.pop_front() {
        let Some(pkg) = graph.package(&current) else {
            continue;
        };

        for (dep_name, specifier) in pkg.dependencies() {
            if dep_name == current.as_str() {
                continue;
            }

            if let Some(dep) = graph.package(dep_name) {
                if dep.build_kind().is_source_dependency() {
                    // Source dep: its code lands in the target's bundle, so
                    // its own dependencies join the closure.
                    if visited.insert(dep.name()) {
                        queue.push_back(dep.name());
                    }
                } else {
                    record
                        .workspace_dependencies
                        .entry(dep_name.clone())
                        .or_insert_with(|| dep.version().to_string());
                }
                continue;
            }

            // External dependency.
            nominal
                .entry(dep_name.clone())
                .or_insert_with(|| specifier.clone());
            consumers
                .entry(dep_name.clone())
                .or_default()
                .push((current, specifier.clone()));
        }
    }

    for (name, specifier) in nominal {
        let declared = consumers.remove(&name).unwrap_or_default();
        let resolved = resolver.resolved_version(&name);

        let effective = match &resolved {
            Some(version) => version.to_string(),
            None => {
                tracing::debug!(
                    "`{}` is not present in the installed tree; using `{}` as declared",
                    name,
                    specifier
                );
                specifier.clone()
            }
        };

        if let Some(version) = &resolved {
            // Opaque specifiers (URLs, tags) are not range-checkable and are
            // accepted as-is.
            let unsatisfied: Vec<(String, String)> = declared
                .iter()
                .filter(|(_, spec)| {
                    VersionReq::parse(spec)
                        .map(|req| !req.matches(version))
                        .unwrap_or(false)
                })
                .map(|(consumer, spec)| (consumer.to_string(), spec.clone()))
                .collect();

            if !unsatisfied.is_empty() {
                record.conflicts.push(VersionConflict {
                    package: name.clone(),
                    resolved: Some(version.to_string()),
                    requirements: unsatisfied,
                });
            }
        }

        if policy.is_provided(&name) {
            record.external_dependencies.insert(name.clone(), specifier);
            record.external_resolutions.insert(name, effective);
        } else {
            record.bundled_dependencies.insert(name.clone(), specifier);
            record.bundled_resolutions.insert(name, effective);
        }
    }

    tracing::debug!(
        "classified `{}`: {} bundled, {} external, {} workspace",
        target,
        record.bundled_dependencies.len(),
        record.external_dependencies.len(),
        record.workspace_dependencies.len()
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Workspace;
    use crate::resolve::Snapshot;
    use semver::Version;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_member(root: &Path, dir: &str, content: &str) {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), content).unwrap();
    }

    fn graph_from(members: &[(&str, &str)]) -> (TempDir, WorkspaceGraph) {
        let tmp = TempDir::new().unwrap();
        write_member(
            tmp.path(),
            ".",
            r#"{ "name": "root", "version": "0.0.0", "private": true, "workspaces": ["packages/*"] }"#,
        );
        for (dir, content) in members {
            write_member(tmp.path(), &format!("packages/{}", dir), content);
        }
        let ws = Workspace::load(tmp.path()).unwrap();
        let graph = WorkspaceGraph::build(&ws).unwrap();
        (tmp, graph)
    }

    fn keys(map: &BTreeMap<String, String>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_partition_respects_policy() {
        let (_tmp, graph) = graph_from(&[(
            "widget",
            r#"{ "name": "widget", "version": "1.0.0",
                 "dependencies": { "x": "1.0.0", "y": "2.0.0" },
                 "armada": { "type": "esm-view" } }"#,
        )]);

        let policy = ExternalPolicy::new(["x"]);
        let mut snapshot = Snapshot::new();
        snapshot.insert("x", Version::new(1, 0, 0));
        snapshot.insert("y", Version::new(2, 0, 0));

        let record = classify(&graph, "widget", &policy, &snapshot).unwrap();

        assert_eq!(keys(&record.external_dependencies), vec!["x"]);
        assert_eq!(record.external_dependencies["x"], "1.0.0");
        assert_eq!(keys(&record.bundled_dependencies), vec!["y"]);
        assert_eq!(record.bundled_dependencies["y"], "2.0.0");
        assert!(record.conflicts.is_empty());

        // Partition covers the whole external closure with no overlap.
        let bundled: BTreeSet<_> = record.bundled_dependencies.keys().collect();
        let external: BTreeSet<_> = record.external_dependencies.keys().collect();
        assert!(bundled.is_disjoint(&external));
        assert_eq!(bundled.len() + external.len(), 2);
    }

    #[test]
    fn test_closure_descends_into_source_deps_only() {
        let (_tmp, graph) = graph_from(&[
            (
                "app",
                r#"{ "name": "app", "version": "1.0.0",
                     "dependencies": { "ui": "*", "tool": "*" },
                     "armada": { "type": "app" } }"#,
            ),
            (
                "ui",
                r#"{ "name": "ui", "version": "3.0.0",
                     "dependencies": { "react": "^18.0.0" },
                     "armada": { "type": "library" } }"#,
            ),
            (
                "tool",
                r#"{ "name": "tool", "version": "0.9.0",
                     "dependencies": { "chalk": "^5.0.0" },
                     "scripts": { "build": "true" } }"#,
            ),
        ]);

        let mut snapshot = Snapshot::new();
        snapshot.insert("react", Version::new(18, 2, 0));

        let record = classify(&graph, "app", &ExternalPolicy::default(), &snapshot).unwrap();

        // ui is a source dep: walked, and its react dep joins the closure.
        assert_eq!(keys(&record.bundled_dependencies), vec!["react"]);
        assert_eq!(record.bundled_resolutions["react"], "18.2.0");

        // tool is unmanaged: kept as an installed workspace dep, its own
        // dependencies (chalk) never enter the closure.
        assert_eq!(keys(&record.workspace_dependencies), vec!["tool"]);
        assert_eq!(record.workspace_dependencies["tool"], "0.9.0");
        assert!(!record.bundled_dependencies.contains_key("chalk"));
    }

    #[test]
    fn test_direct_specifier_beats_transitive() {
        let (_tmp, graph) = graph_from(&[
            (
                "app",
                r#"{ "name": "app", "version": "1.0.0",
                     "dependencies": { "lodash": "^4.17.0", "ui": "*" },
                     "armada": { "type": "app" } }"#,
            ),
            (
                "ui",
                r#"{ "name": "ui", "version": "1.0.0",
                     "dependencies": { "lodash": "^4.0.0" },
                     "armada": { "type": "library" } }"#,
            ),
        ]);

        let mut snapshot = Snapshot::new();
        snapshot.insert("lodash", Version::new(4, 17, 21));

        let record = classify(&graph, "app", &ExternalPolicy::default(), &snapshot).unwrap();
        assert_eq!(record.bundled_dependencies["lodash"], "^4.17.0");
        assert_eq!(record.bundled_resolutions["lodash"], "4.17.21");
        assert!(record.conflicts.is_empty());
    }

    #[test]
    fn test_conflicting_ranges_are_recorded_not_fatal() {
        let (_tmp, graph) = graph_from(&[
            (
                "app",
                r#"{ "name": "app", "version": "1.0.0",
                     "dependencies": { "react": "^17.0.0", "ui": "*" },
                     "armada": { "type": "app" } }"#,
            ),
            (
                "ui",
                r#"{ "name": "ui", "version": "1.0.0",
                     "dependencies": { "react": "^18.0.0" },
                     "armada": { "type": "library" } }"#,
            ),
        ]);

        let mut snapshot = Snapshot::new();
        snapshot.insert("react", Version::new(18, 2, 0));

        let record = classify(&graph, "app", &ExternalPolicy::default(), &snapshot).unwrap();

        // The installed version wins; the ^17 consumer is recorded.
        assert_eq!(record.bundled_resolutions["react"], "18.2.0");
        assert_eq!(record.conflicts.len(), 1);
        let conflict = &record.conflicts[0];
        assert_eq!(conflict.package, "react");
        assert_eq!(conflict.requirements.len(), 1);
        assert_eq!(conflict.requirements[0].1, "^17.0.0");
    }

    #[test]
    fn test_unresolved_dependency_falls_back_to_specifier() {
        let (_tmp, graph) = graph_from(&[(
            "app",
            r#"{ "name": "app", "version": "1.0.0",
                 "dependencies": { "ghost": "^1.0.0" },
                 "armada": { "type": "app" } }"#,
        )]);

        let record =
            classify(&graph, "app", &ExternalPolicy::default(), &Snapshot::new()).unwrap();
        assert_eq!(record.bundled_resolutions["ghost"], "^1.0.0");
        assert!(record.conflicts.is_empty());
    }

    #[test]
    fn test_zero_dependencies_yields_empty_record() {
        let (_tmp, graph) = graph_from(&[(
            "empty",
            r#"{ "name": "empty", "version": "1.0.0", "armada": { "type": "library" } }"#,
        )]);

        let record =
            classify(&graph, "empty", &ExternalPolicy::default(), &Snapshot::new()).unwrap();
        assert!(record.bundled_dependencies.is_empty());
        assert!(record.external_dependencies.is_empty());
        assert!(record.workspace_dependencies.is_empty());
    }

    #[test]
    fn test_unknown_target_fails() {
        let (_tmp, graph) = graph_from(&[(
            "app",
            r#"{ "name": "app", "version": "1.0.0", "armada": { "type": "app" } }"#,
        )]);

        let err =
            classify(&graph, "ghost", &ExternalPolicy::default(), &Snapshot::new()).unwrap_err();
        assert!(matches!(err, ClassifyError::UnknownPackage { .. }));
    }

    #[test]
    fn test_policy_for_target_unions_sources() {
        let (_tmp, graph) = graph_from(&[(
            "widget",
            r#"{ "name": "widget", "version": "1.0.0",
                 "armada": { "type": "esm-view", "externals": ["react-dom"] } }"#,
        )]);

        let pkg = graph.package("widget").unwrap();
        let policy = ExternalPolicy::for_target(&["react".to_string()], pkg);
        assert!(policy.is_provided("react"));
        assert!(policy.is_provided("react-dom"));
        assert!(!policy.is_provided("lodash"));
    }
}
