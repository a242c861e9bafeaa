//! mdmesh-core: Core types for multi-dimensional workspace visualization.
//!
//! This crate provides the workspace contract consumed by the mesh builders,
//! dimension and geometry descriptors, signal normalization, threshold range
//! policies, time-slice mapping and rebinning.
//!

pub mod dimension;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod normalization;
pub mod rebin;
pub mod threshold;
pub mod time;
pub mod workspace;

pub use dimension::Dimension;
pub use error::{Error, Result, ThresholdError};
pub use geometry::GeometryXml;
pub use metadata::MetadataJson;
pub use normalization::Normalization;
pub use rebin::rebin;
pub use threshold::{
    GaussianThresholdRange, IgnoreZerosThresholdRange, MedianAndBelowThresholdRange,
    NoThresholdRange, ThresholdConfig, ThresholdRange, ThresholdResult, UserDefinedThresholdRange,
};
pub use time::{TimeMapper, TimeStepToTimeStep, TimeToTimeStep};
pub use workspace::{
    BoxController, BoxSummary, MDEvent, MDEventWorkspace, MDHistoWorkspace, MDWorkspace,
    SpecialCoordinateSystem, WorkspaceHandle, WorkspaceInfo, WorkspaceKind, WorkspaceProvider,
    WorkspaceRegistry,
};
