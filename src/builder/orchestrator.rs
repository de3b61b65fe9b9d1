//! The build orchestrator.
//!
//! Packages are built strictly one at a time, in selection order: a
//! standalone build may read the freshly written outputs of an internal
//! library, and the topological order is the only thing that makes that
//! safe. The first failure aborts the queue; outputs of already-built
//! packages are left in place.

use std::time::Instant;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::output::write_output_manifest;
use crate::builder::script::ScriptRunner;
use crate::builder::shim::{
    ArtifactCompiler, CommandCompiler, CompileRequest, DEFAULT_COMPILER, DEFAULT_TRANSPILER,
};
use crate::builder::{BuildError, BuildReport};
use crate::classify::{classify, ExternalPolicy, ResolutionRecord};
use crate::core::manifest::BuildKind;
use crate::core::package::Package;
use crate::graph::WorkspaceGraph;
use crate::resolve::PackageResolver;
use crate::select::Selection;
use crate::util::config::WorkspaceConfig;
use crate::util::context::WorkspaceContext;
use crate::util::diagnostic;

/// Drives a selection through per-package builds.
pub struct Orchestrator<'a> {
    graph: &'a WorkspaceGraph,
    config: &'a WorkspaceConfig,
    resolver: &'a dyn PackageResolver,
    compiler: Box<dyn ArtifactCompiler>,
    transpiler: Box<dyn ArtifactCompiler>,
    scripts: ScriptRunner,
    progress: bool,
    color: bool,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator wired to the configured shims.
    pub fn new(
        ctx: &WorkspaceContext,
        graph: &'a WorkspaceGraph,
        config: &'a WorkspaceConfig,
        resolver: &'a dyn PackageResolver,
    ) -> Self {
        let compiler = CommandCompiler::new(
            config
                .commands
                .compiler
                .clone()
                .unwrap_or_else(|| DEFAULT_COMPILER.to_string()),
        );
        let transpiler = CommandCompiler::new(
            config
                .commands
                .transpiler
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSPILER.to_string()),
        );

        Orchestrator {
            graph,
            config,
            resolver,
            compiler: Box::new(compiler),
            transpiler: Box::new(transpiler),
            scripts: ScriptRunner::new(config.commands.package_manager.clone()),
            progress: !ctx.is_verbose(),
            color: ctx.color(),
        }
    }

    /// Replace the artifact compiler shim.
    pub fn with_compiler(mut self, compiler: Box<dyn ArtifactCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Replace the transpiler shim.
    pub fn with_transpiler(mut self, transpiler: Box<dyn ArtifactCompiler>) -> Self {
        self.transpiler = transpiler;
        self
    }

    /// Enable or disable the progress bar.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Build every package in the selection, in order, failing fast.
    pub fn run(&self, selection: &Selection) -> Result<BuildReport, BuildError> {
        let start = Instant::now();

        let bar = if self.progress && selection.len() > 1 {
            let bar = ProgressBar::new(selection.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(bar)
        } else {
            None
        };

        let mut report = BuildReport::default();
        for name in &selection.order {
            // Selection order is derived from this graph, so the lookup only
            // misses if callers mix graphs; skipping is the safe answer.
            let Some(pkg) = self.graph.package(name) else {
                continue;
            };

            if let Some(bar) = &bar {
                bar.set_message(name.to_string());
            }
            tracing::info!("building {} ({})", pkg, pkg.build_kind());

            if let Err(source) = self.build_package(pkg) {
                if let Some(bar) = &bar {
                    bar.abandon_with_message(format!("failed at {}", name));
                }
                return Err(BuildError::StepFailed {
                    package: name.to_string(),
                    source,
                });
            }

            report.built.push(*name);
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }
        tracing::info!(
            "finished {} package(s) in {:.2}s",
            report.built.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    fn build_package(&self, pkg: &Package) -> Result<()> {
        match pkg.build_kind() {
            BuildKind::App | BuildKind::EsmView => self.build_managed(pkg, self.compiler.as_ref()),
            BuildKind::View | BuildKind::Library => {
                self.build_managed(pkg, self.transpiler.as_ref())
            }
            BuildKind::Unmanaged => self.scripts.run(pkg, "build"),
        }
    }

    /// Classify, compile through the given shim, and emit the output
    /// manifest. Shared by the standalone and library paths; only the shim
    /// differs.
    fn build_managed(&self, pkg: &Package, shim: &dyn ArtifactCompiler) -> Result<()> {
        let record = self.classify_target(pkg)?;

        let out_dir = pkg.output_dir();
        let request = CompileRequest {
            name: pkg.name().as_str(),
            kind: pkg.build_kind(),
            package_dir: pkg.root(),
            output_dir: &out_dir,
            bundled: &record.bundled_resolutions,
            external: &record.external_resolutions,
        };

        let entry = shim.compile(&request)?;
        write_output_manifest(pkg, &record, &entry)?;

        Ok(())
    }

    fn classify_target(&self, pkg: &Package) -> Result<ResolutionRecord> {
        let policy = ExternalPolicy::for_target(&self.config.build.externals, pkg);
        let record = classify(self.graph, pkg.name().as_str(), &policy, self.resolver)?;

        for conflict in &record.conflicts {
            diagnostic::emit(&conflict.to_diagnostic(), self.color);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::shim::CompileOutput;
    use crate::core::workspace::Workspace;
    use crate::resolve::Snapshot;
    use crate::scm::NoChanges;
    use crate::select::{buildable, select, SelectionRequest};
    use anyhow::bail;
    use semver::Version;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Shim that writes a marker into the output directory, or fails on a
    /// chosen package.
    struct MarkerShim {
        fail_on: Option<&'static str>,
    }

    impl ArtifactCompiler for MarkerShim {
        fn compile(&self, request: &CompileRequest<'_>) -> anyhow::Result<CompileOutput> {
            if self.fail_on == Some(request.name) {
                bail!("shim exploded");
            }
            std::fs::create_dir_all(request.output_dir)?;
            std::fs::write(request.output_dir.join("main.js"), "// built\n")?;
            Ok(CompileOutput {
                js_entry_point: Some("main.js".to_string()),
                css_entry_point: None,
            })
        }
    }

    fn write_member(root: &Path, dir: &str, content: &str) {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), content).unwrap();
    }

    fn scaffold(root: &Path) -> WorkspaceGraph {
        write_member(
            root,
            ".",
            r#"{ "name": "root", "version": "0.0.0", "private": true, "workspaces": ["packages/*"] }"#,
        );
        write_member(
            root,
            "packages/ui",
            r#"{ "name": "ui", "version": "1.0.0",
                 "dependencies": { "react": "^18.0.0" },
                 "armada": { "type": "library" } }"#,
        );
        write_member(
            root,
            "packages/app",
            r#"{ "name": "app", "version": "1.0.0",
                 "dependencies": { "ui": "*" },
                 "armada": { "type": "app" } }"#,
        );
        let ws = Workspace::load(root).unwrap();
        WorkspaceGraph::build(&ws).unwrap()
    }

    fn selection_for(graph: &WorkspaceGraph) -> crate::select::Selection {
        let request = SelectionRequest {
            targets: graph.names().iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        };
        select(graph, &request, &NoChanges, &buildable).unwrap()
    }

    fn orchestrator<'a>(
        root: &Path,
        graph: &'a WorkspaceGraph,
        config: &'a WorkspaceConfig,
        resolver: &'a Snapshot,
        fail_on: Option<&'static str>,
    ) -> Orchestrator<'a> {
        let ctx = WorkspaceContext::at_root(root.to_path_buf());
        Orchestrator::new(&ctx, graph, config, resolver)
            .with_compiler(Box::new(MarkerShim { fail_on }))
            .with_transpiler(Box::new(MarkerShim { fail_on }))
            .with_progress(false)
    }

    #[test]
    fn test_builds_in_order_and_writes_manifests() {
        let tmp = TempDir::new().unwrap();
        let graph = scaffold(tmp.path());
        let config = WorkspaceConfig::default();
        let mut resolver = Snapshot::new();
        resolver.insert("react", Version::new(18, 2, 0));

        let orch = orchestrator(tmp.path(), &graph, &config, &resolver, None);
        let report = orch.run(&selection_for(&graph)).unwrap();

        let built: Vec<_> = report.built.iter().map(|n| n.as_str()).collect();
        assert_eq!(built, vec!["ui", "app"]);

        assert!(tmp.path().join("packages/ui/dist/main.js").exists());
        let app_manifest: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(tmp.path().join("packages/app/dist/package.json")).unwrap(),
        )
        .unwrap();
        // ui is a source dep of app; react arrives through its closure.
        assert_eq!(app_manifest["bundledDependencies"], serde_json::json!(["react"]));
        assert_eq!(app_manifest["module"], "main.js");
    }

    #[test]
    fn test_failure_aborts_queue_and_keeps_prior_outputs() {
        let tmp = TempDir::new().unwrap();
        write_member(
            tmp.path(),
            ".",
            r#"{ "name": "root", "version": "0.0.0", "private": true, "workspaces": ["packages/*"] }"#,
        );
        for name in ["a", "b", "c"] {
            write_member(
                tmp.path(),
                &format!("packages/{}", name),
                &format!(
                    r#"{{ "name": "{}", "version": "1.0.0", "armada": {{ "type": "library" }} }}"#,
                    name
                ),
            );
        }
        let ws = Workspace::load(tmp.path()).unwrap();
        let graph = WorkspaceGraph::build(&ws).unwrap();
        let config = WorkspaceConfig::default();
        let resolver = Snapshot::new();

        let orch = orchestrator(tmp.path(), &graph, &config, &resolver, Some("b"));
        let err = orch.run(&selection_for(&graph)).unwrap_err();

        match &err {
            BuildError::StepFailed { package, .. } => assert_eq!(package, "b"),
        }

        let marker = |name: &str| {
            tmp.path()
                .join(format!("packages/{}/dist/main.js", name))
                .exists()
        };
        assert!(marker("a"));
        assert!(!marker("b"));
        assert!(!marker("c"));
    }

    #[test]
    fn test_unmanaged_package_uses_its_own_script() {
        let tmp = TempDir::new().unwrap();
        write_member(
            tmp.path(),
            ".",
            r#"{ "name": "root", "version": "0.0.0", "private": true, "workspaces": ["packages/*"] }"#,
        );
        write_member(
            tmp.path(),
            "packages/tool",
            r#"{ "name": "tool", "version": "1.0.0", "scripts": { "build": "exit 0" } }"#,
        );
        let ws = Workspace::load(tmp.path()).unwrap();
        let graph = WorkspaceGraph::build(&ws).unwrap();

        let mut config = WorkspaceConfig::default();
        config.commands.package_manager = Some("true".to_string());
        let resolver = Snapshot::new();

        let orch = orchestrator(tmp.path(), &graph, &config, &resolver, None);
        let report = orch.run(&selection_for(&graph)).unwrap();
        assert_eq!(report.built.len(), 1);

        // Pass-through builds write no output manifest of their own.
        assert!(!tmp.path().join("packages/tool/dist/package.json").exists());
    }

    #[test]
    fn test_marker_shim_paths_are_under_dist() {
        let tmp = TempDir::new().unwrap();
        let graph = scaffold(tmp.path());
        let pkg = graph.package("ui").unwrap();
        assert_eq!(
            pkg.output_dir(),
            PathBuf::from(tmp.path().join("packages/ui/dist"))
        );
    }
}
