//! Error types for mdmesh-presenter.

use mdmesh_core::{ThresholdError, WorkspaceKind};
use mdmesh_factories::MeshError;
use thiserror::Error;

/// Result type alias for presenter operations.
pub type Result<T> = std::result::Result<T, PresenterError>;

/// Errors raised by the presenters.
#[derive(Error, Debug)]
pub enum PresenterError {
    /// A geometry accessor was called before metadata was loaded.
    #[error("metadata has not been loaded; call execute_load_metadata first")]
    NotSetUp,

    /// No rebinning presenter has been configured yet.
    #[error("no rebinning presenter is configured")]
    NotConfigured,

    /// The provider does not hold the named workspace.
    #[error("workspace '{0}' not found")]
    WorkspaceNotFound(String),

    /// The provider returned a workspace of the wrong flavour.
    #[error("workspace '{name}' is a {found}, expected a {expected}")]
    WrongWorkspaceType {
        name: String,
        expected: WorkspaceKind,
        found: WorkspaceKind,
    },

    /// Invalid presenter configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Threshold range error.
    #[error("threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    /// Mesh building error.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] mdmesh_core::Error),
}
