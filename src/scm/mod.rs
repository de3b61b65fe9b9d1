//! Source-control change detection.
//!
//! `--changed` selection seeds come from here: a diff between the working
//! tree and the merge base with a comparison ref, mapped file-by-file onto
//! the owning workspace package.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{DiffOptions, ObjectType, Repository};

use crate::core::name::PackageName;
use crate::graph::WorkspaceGraph;

/// Produces the set of packages considered changed.
pub trait ChangeDetector {
    fn changed_packages(&self, graph: &WorkspaceGraph) -> Result<BTreeSet<PackageName>>;
}

/// Detector used when no `--changed` selection is active.
#[derive(Debug, Default)]
pub struct NoChanges;

impl ChangeDetector for NoChanges {
    fn changed_packages(&self, _graph: &WorkspaceGraph) -> Result<BTreeSet<PackageName>> {
        Ok(BTreeSet::new())
    }
}

/// Git-backed change detection.
///
/// Changed files are the union of the committed diff against the merge base
/// with `compare_ref` and any uncommitted working-tree changes (untracked
/// files included).
#[derive(Debug)]
pub struct GitChangeDetector {
    workspace_root: PathBuf,
    compare_ref: String,
}

impl GitChangeDetector {
    /// Create a detector for a workspace inside (or at) a git repository.
    pub fn new(workspace_root: &Path, compare_ref: impl Into<String>) -> Self {
        GitChangeDetector {
            workspace_root: workspace_root.to_path_buf(),
            compare_ref: compare_ref.into(),
        }
    }

    fn changed_files(&self, repo: &Repository) -> Result<BTreeSet<PathBuf>> {
        let head = repo
            .head()
            .context("failed to resolve HEAD")?
            .peel_to_commit()
            .context("HEAD does not point to a commit")?;

        let compare = repo
            .revparse_single(&self.compare_ref)
            .with_context(|| format!("unknown comparison ref `{}`", self.compare_ref))?
            .peel(ObjectType::Commit)
            .with_context(|| format!("`{}` does not point to a commit", self.compare_ref))?;
        let compare = compare
            .into_commit()
            .map_err(|_| anyhow::anyhow!("`{}` does not point to a commit", self.compare_ref))?;

        let base_oid = repo
            .merge_base(head.id(), compare.id())
            .with_context(|| format!("no merge base with `{}`", self.compare_ref))?;
        let base_tree = repo.find_commit(base_oid)?.tree()?;
        let head_tree = head.tree()?;

        let mut files = BTreeSet::new();

        let committed = repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)?;
        collect_paths(&committed, &mut files);

        let mut opts = DiffOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let uncommitted = repo.diff_tree_to_workdir_with_index(Some(&head_tree), Some(&mut opts))?;
        collect_paths(&uncommitted, &mut files);

        Ok(files)
    }
}

fn collect_paths(diff: &git2::Diff<'_>, out: &mut BTreeSet<PathBuf>) {
    for delta in diff.deltas() {
        if let Some(path) = delta.new_file().path() {
            out.insert(path.to_path_buf());
        }
        if let Some(path) = delta.old_file().path() {
            out.insert(path.to_path_buf());
        }
    }
}

/// Find the package owning a workspace-relative file path: the member with
/// the deepest location that is a prefix of the path.
fn owner_of(graph: &WorkspaceGraph, rel: &Path) -> Option<PackageName> {
    let mut best: Option<(usize, PackageName)> = None;
    for pkg in graph.packages() {
        let location = pkg.location();
        if rel.starts_with(location) {
            let depth = location.components().count();
            if best.map_or(true, |(d, _)| depth > d) {
                best = Some((depth, pkg.name()));
            }
        }
    }
    best.map(|(_, name)| name)
}

impl ChangeDetector for GitChangeDetector {
    fn changed_packages(&self, graph: &WorkspaceGraph) -> Result<BTreeSet<PackageName>> {
        let repo = Repository::discover(&self.workspace_root).with_context(|| {
            format!(
                "no git repository found at or above {}",
                self.workspace_root.display()
            )
        })?;

        let workdir = repo
            .workdir()
            .context("cannot diff a bare repository")?
            .to_path_buf();

        // The workspace may live below the repository root; diff paths are
        // repo-relative and must be rebased before package matching.
        let prefix =
            pathdiff::diff_paths(&self.workspace_root, &workdir).unwrap_or_default();

        let mut changed = BTreeSet::new();
        for file in self.changed_files(&repo)? {
            let Ok(rel) = file.strip_prefix(&prefix) else {
                continue;
            };
            if let Some(owner) = owner_of(graph, rel) {
                changed.insert(owner);
            }
        }

        tracing::debug!(
            "changed since `{}`: {:?}",
            self.compare_ref,
            changed.iter().map(|n| n.as_str()).collect::<Vec<_>>()
        );

        Ok(changed)
    }
}
