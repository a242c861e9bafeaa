//! Mesh builders.
//!
//! Every builder handles a subset of workspaces (by storage flavour and
//! number of non-integrated dimensions). [`MeshBuilder::try_build`] returns
//! `Ok(None)` for workspaces outside that subset so a
//! [`FactoryChain`](crate::FactoryChain) can move on to the next builder.

mod event_box;
mod histo_grid;
mod splatter;
mod zero;

pub use event_box::EventBoxBuilder;
pub use histo_grid::{GridKind, HistoGridBuilder};
pub use splatter::SplatterBuilder;
pub use zero::ZeroDimensionalBuilder;

use crate::{BuildConfig, CellKind, ProgressAction, Result, SkewTransform, UnstructuredGrid};
use mdmesh_core::{MDWorkspace, Normalization, ThresholdRange, WorkspaceHandle};
use std::fmt;

/// Output of a successful build.
#[derive(Debug, Clone)]
pub struct BuiltMesh {
    /// The mesh.
    pub grid: UnstructuredGrid,
    /// Threshold range in effect once every value was classified.
    pub signal_range: (f64, f64),
}

/// A strategy turning one family of workspaces into a mesh.
pub trait MeshBuilder: Send + Sync + fmt::Debug {
    /// Builder name, for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Builds the mesh, or returns `Ok(None)` if the workspace is not handled.
    ///
    /// # Errors
    /// Returns an error if the threshold range cannot be calculated or the
    /// mesh cannot be assembled.
    fn try_build(
        &self,
        workspace: &WorkspaceHandle,
        progress: &mut dyn ProgressAction,
    ) -> Result<Option<BuiltMesh>>;

    /// Virtual copy.
    fn clone_box(&self) -> Box<dyn MeshBuilder>;
}

impl Clone for Box<dyn MeshBuilder> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Per-build state shared by the builders: a fresh copy of the threshold
/// range, the resolved normalization and the display transform.
struct BuildContext {
    threshold: Box<dyn ThresholdRange>,
    normalization: Normalization,
    transform: SkewTransform,
    seen: Option<(f64, f64)>,
}

impl BuildContext {
    fn prepare(
        template: &dyn ThresholdRange,
        workspace: &WorkspaceHandle,
        config: &BuildConfig,
    ) -> Result<Self> {
        let normalization = config
            .normalization
            .resolve(workspace.display_normalization());
        let mut threshold = template.clone_box();
        if !threshold.has_calculated() {
            threshold.set_workspace(workspace.clone(), normalization);
            threshold.calculate()?;
        }
        Ok(Self {
            threshold,
            normalization,
            transform: SkewTransform::for_workspace(workspace.as_ref(), config.apply_skew),
            seen: None,
        })
    }

    /// NaN is never visible; everything else goes through the threshold.
    fn visible(&mut self, signal: f64) -> bool {
        if signal.is_nan() {
            return false;
        }
        self.seen = Some(match self.seen {
            None => (signal, signal),
            Some((lo, hi)) => (lo.min(signal), hi.max(signal)),
        });
        self.threshold.classify(signal)
    }

    fn finish(self, builder: &str, grid: UnstructuredGrid) -> Result<BuiltMesh> {
        let signal_range = (self.threshold.minimum()?, self.threshold.maximum()?);
        if let Some((lo, hi)) = self.seen {
            log::debug!(
                "{builder}: {} cells, {} points, scanned signal [{lo}, {hi}], threshold [{}, {}]",
                grid.n_cells(),
                grid.n_points(),
                signal_range.0,
                signal_range.1
            );
        }
        Ok(BuiltMesh { grid, signal_range })
    }
}

const VERTEX_CORNERS: [[usize; 3]; 1] = [[0, 0, 0]];
const LINE_CORNERS: [[usize; 3]; 2] = [[0, 0, 0], [1, 0, 0]];
const QUAD_CORNERS: [[usize; 3]; 4] = [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]];
const HEX_CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Corner offsets of a unit cell in VTK point order.
fn corner_offsets(kind: CellKind) -> &'static [[usize; 3]] {
    match kind {
        CellKind::Vertex => &VERTEX_CORNERS,
        CellKind::Line => &LINE_CORNERS,
        CellKind::Quad => &QUAD_CORNERS,
        CellKind::Hexahedron => &HEX_CORNERS,
    }
}

/// Workspace indices of the non-integrated dimensions, in order.
fn display_axes(workspace: &WorkspaceHandle) -> Vec<usize> {
    workspace
        .dimensions()
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.is_integrated())
        .map(|(i, _)| i)
        .collect()
}

/// First three coordinates of `values`, padded with zeros.
fn to_point(values: impl IntoIterator<Item = f64>) -> [f64; 3] {
    let mut point = [0.0; 3];
    for (slot, v) in point.iter_mut().zip(values) {
        *slot = v;
    }
    point
}
