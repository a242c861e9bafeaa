//! Error types for mdmesh-factories.

use mdmesh_core::{ThresholdError, WorkspaceKind};
use thiserror::Error;

/// Result type alias for mesh building.
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors raised while dispatching or building a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The chain was asked to build from no workspace.
    #[error("workspace is null")]
    NullWorkspace,

    /// No builder in the chain handles the workspace.
    #[error("no successor factory set for a {kind} with {dims} non-integrated dimensions")]
    NoSuccessor { kind: WorkspaceKind, dims: usize },

    /// A cell referenced points that do not exist or had the wrong arity.
    #[error("invalid cell: {0}")]
    InvalidCell(String),

    /// Invalid builder configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Threshold range error.
    #[error("threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] mdmesh_core::Error),
}
