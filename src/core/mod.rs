//! Core data structures for Armada.
//!
//! This module contains the foundational types used throughout Armada:
//! - Interned package names
//! - Manifest parsing and the build-kind marker
//! - Packages and workspace discovery

pub mod manifest;
pub mod name;
pub mod package;
pub mod workspace;

pub use manifest::{BuildKind, Manifest, MANIFEST_FILE};
pub use name::PackageName;
pub use package::Package;
pub use workspace::{InvalidMember, Workspace, WorkspaceError};
