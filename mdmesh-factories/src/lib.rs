//! mdmesh-factories: Mesh builders for multi-dimensional workspaces.
//!
//! This crate turns workspaces into unstructured meshes:
//! - **Histogram grids** - line, quad, hexahedron and time-sliced 4D cells
//! - **Event boxes** - one cell per box of the event box structure
//! - **Splatter** - bounded vertex clouds of the brightest boxes
//! - **Zero-dimensional** - a single vertex fallback
//!
//! Builders are tried in order by a [`FactoryChain`].
//!
#![warn(missing_docs)]

mod builders;
mod chain;
mod config;
mod error;
mod mesh;
mod progress;
mod transform;

pub use builders::{
    BuiltMesh, EventBoxBuilder, GridKind, HistoGridBuilder, MeshBuilder, SplatterBuilder,
    ZeroDimensionalBuilder,
};
pub use chain::{FactoryChain, MeshProduct, MeshWarning};
pub use config::BuildConfig;
pub use error::{MeshError, Result};
pub use mesh::{
    Cell, CellKind, ClipBox, FieldData, UnstructuredGrid, GEOMETRY_XML_FIELD,
    METADATA_JSON_FIELD, SIGNAL_ARRAY,
};
pub use progress::{IgnoreProgress, ProgressAction, ProgressPhase};
pub use transform::SkewTransform;
