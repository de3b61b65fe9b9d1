//! Armada - a monorepo build orchestrator for package workspaces
//!
//! This crate provides the core library functionality for Armada: the
//! workspace dependency graph, per-target dependency classification,
//! selection of ordered build sets, and sequential build orchestration.

pub mod builder;
pub mod classify;
pub mod core;
pub mod graph;
pub mod ops;
pub mod resolve;
pub mod scm;
pub mod select;
pub mod util;

pub use crate::core::{BuildKind, Manifest, Package, PackageName, Workspace};

pub use crate::classify::{ExternalPolicy, ResolutionRecord};
pub use crate::graph::WorkspaceGraph;
pub use crate::select::{Selection, SelectionRequest};
pub use crate::util::context::WorkspaceContext;
