//! Ordered dispatch over mesh builders.
//!
//! A [`FactoryChain`] offers the workspace to each builder in turn; the first
//! one that accepts it builds the mesh. Running off the end of the chain is an
//! error, so well-formed chains finish with [`ZeroDimensionalBuilder`].

use crate::builders::{
    EventBoxBuilder, HistoGridBuilder, MeshBuilder, SplatterBuilder, ZeroDimensionalBuilder,
};
use crate::{BuildConfig, MeshError, ProgressAction, Result, UnstructuredGrid};
use log::{debug, warn};
use mdmesh_core::{MDWorkspace, ThresholdRange, TimeToTimeStep, WorkspaceHandle};
use std::fmt;

/// Data-quality conditions noticed while building. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshWarning {
    /// No cell passed the threshold.
    EmptyMesh,
    /// Every visible value is the same, so colour maps have no range.
    UniformSignal,
}

impl fmt::Display for MeshWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMesh => write!(f, "mesh has no cells"),
            Self::UniformSignal => write!(f, "signal range is degenerate"),
        }
    }
}

/// Result of [`FactoryChain::create`].
#[derive(Debug, Clone)]
pub struct MeshProduct {
    /// The mesh.
    pub grid: UnstructuredGrid,
    /// Name of the builder that produced it.
    pub builder: &'static str,
    /// Threshold range once the build finished.
    pub signal_range: (f64, f64),
    /// Data-quality warnings.
    pub warnings: Vec<MeshWarning>,
}

/// Ordered list of builders tried until one handles the workspace.
#[derive(Debug, Clone, Default)]
pub struct FactoryChain {
    builders: Vec<Box<dyn MeshBuilder>>,
}

impl FactoryChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Histogram chain: 4D, 3D, 2D and 1D grids, then the 0D fallback.
    #[must_use]
    pub fn standard(threshold: &dyn ThresholdRange, config: &BuildConfig) -> Self {
        Self::new()
            .with(HistoGridBuilder::hexahedron_4d(
                Box::new(TimeToTimeStep),
                threshold,
                config.clone(),
            ))
            .with(HistoGridBuilder::hexahedron(threshold, config.clone()))
            .with(HistoGridBuilder::quad(threshold, config.clone()))
            .with(HistoGridBuilder::line(threshold, config.clone()))
            .with(ZeroDimensionalBuilder::new(threshold, config.clone()))
    }

    /// Event chain: box meshes, then the 0D fallback.
    #[must_use]
    pub fn event(threshold: &dyn ThresholdRange, config: &BuildConfig) -> Self {
        Self::new()
            .with(EventBoxBuilder::new(threshold, config.clone()))
            .with(ZeroDimensionalBuilder::new(threshold, config.clone()))
    }

    /// Point-cloud chain: splatter, then box meshes for low-dimensional
    /// event data, then the 0D fallback.
    #[must_use]
    pub fn splatter(threshold: &dyn ThresholdRange, config: &BuildConfig) -> Self {
        Self::new()
            .with(SplatterBuilder::new(threshold, config.clone()))
            .with(EventBoxBuilder::new(threshold, config.clone()))
            .with(ZeroDimensionalBuilder::new(threshold, config.clone()))
    }

    /// Appends a successor.
    pub fn push(&mut self, builder: impl MeshBuilder + 'static) {
        self.builders.push(Box::new(builder));
    }

    /// Appends a successor, builder style.
    #[must_use]
    pub fn with(mut self, builder: impl MeshBuilder + 'static) -> Self {
        self.push(builder);
        self
    }

    /// Number of builders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Returns true if the chain has no builders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Builder names in dispatch order.
    #[must_use]
    pub fn builder_names(&self) -> Vec<&'static str> {
        self.builders.iter().map(|b| b.name()).collect()
    }

    /// Builds a mesh with the first builder that accepts `workspace`.
    ///
    /// # Errors
    /// Returns [`MeshError::NullWorkspace`] when `workspace` is `None`,
    /// [`MeshError::NoSuccessor`] when no builder accepts it, or the error
    /// of the builder that accepted it.
    pub fn create(
        &self,
        workspace: Option<&WorkspaceHandle>,
        progress: &mut dyn ProgressAction,
    ) -> Result<MeshProduct> {
        let workspace = workspace.ok_or(MeshError::NullWorkspace)?;
        for builder in &self.builders {
            let Some(built) = builder.try_build(workspace, progress)? else {
                debug!("{} declined '{}'", builder.name(), workspace.name());
                continue;
            };
            let warnings = Self::inspect(&built.grid, workspace.name());
            return Ok(MeshProduct {
                grid: built.grid,
                builder: builder.name(),
                signal_range: built.signal_range,
                warnings,
            });
        }
        Err(MeshError::NoSuccessor {
            kind: workspace.kind(),
            dims: workspace.non_integrated_dimensions().len(),
        })
    }

    fn inspect(grid: &UnstructuredGrid, name: &str) -> Vec<MeshWarning> {
        let mut warnings = Vec::new();
        match grid.scalar_range() {
            None => warnings.push(MeshWarning::EmptyMesh),
            Some((lo, hi)) if lo == hi => warnings.push(MeshWarning::UniformSignal),
            Some(_) => {}
        }
        for warning in &warnings {
            warn!("'{name}': {warning}");
        }
        warnings
    }
}
