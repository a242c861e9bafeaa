//! Regular-grid mesh of a histogram workspace.
//!
//! One builder covers lines, quads and hexahedra. A grid of `n_k` bins per
//! display axis has `n_k + 1` candidate corner points per axis. A cell is
//! visible when its normalized signal is not NaN and passes the threshold;
//! only the corner points of visible cells are emitted (the rest are
//! sparse), and only visible cells get topology. With every cell visible the
//! mesh therefore has `Π n_k` cells and `Π (n_k + 1)` points.
//!
//! The four-dimensional kind renders the 3D hexahedra of a single time slice,
//! picked by mapping [`BuildConfig::time`] through a [`TimeMapper`].

use super::{corner_offsets, display_axes, to_point, BuildContext, BuiltMesh, MeshBuilder};
use crate::{BuildConfig, CellKind, ProgressAction, ProgressPhase, Result, UnstructuredGrid};
use mdmesh_core::{MDHistoWorkspace, MDWorkspace, ThresholdRange, TimeMapper, WorkspaceHandle};

/// Topology produced by a [`HistoGridBuilder`].
#[derive(Debug, Clone)]
pub enum GridKind {
    /// One display axis: line segments.
    Line,
    /// Two display axes: quadrilaterals.
    Quad,
    /// Three display axes: hexahedra.
    Hexahedron,
    /// Four display axes: hexahedra of one time slice.
    Hexahedron4D(Box<dyn TimeMapper>),
}

impl GridKind {
    /// Number of non-integrated dimensions handled.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        match self {
            Self::Line => 1,
            Self::Quad => 2,
            Self::Hexahedron => 3,
            Self::Hexahedron4D(_) => 4,
        }
    }

    fn cell_kind(&self) -> CellKind {
        match self {
            Self::Line => CellKind::Line,
            Self::Quad => CellKind::Quad,
            Self::Hexahedron | Self::Hexahedron4D(_) => CellKind::Hexahedron,
        }
    }

}

/// Builds line, quad or hexahedron meshes from histogram workspaces.
#[derive(Debug, Clone)]
pub struct HistoGridBuilder {
    kind: GridKind,
    threshold: Box<dyn ThresholdRange>,
    config: BuildConfig,
}

impl HistoGridBuilder {
    /// Creates a builder of the given kind.
    #[must_use]
    pub fn new(kind: GridKind, threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self {
            kind,
            threshold: threshold.clone_box(),
            config,
        }
    }

    /// Builder for one-dimensional workspaces.
    #[must_use]
    pub fn line(threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self::new(GridKind::Line, threshold, config)
    }

    /// Builder for two-dimensional workspaces.
    #[must_use]
    pub fn quad(threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self::new(GridKind::Quad, threshold, config)
    }

    /// Builder for three-dimensional workspaces.
    #[must_use]
    pub fn hexahedron(threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self::new(GridKind::Hexahedron, threshold, config)
    }

    /// Builder for four-dimensional workspaces.
    #[must_use]
    pub fn hexahedron_4d(
        mapper: Box<dyn TimeMapper>,
        threshold: &dyn ThresholdRange,
        config: BuildConfig,
    ) -> Self {
        Self::new(GridKind::Hexahedron4D(mapper), threshold, config)
    }

    /// Kind of mesh produced.
    #[must_use]
    pub fn kind(&self) -> &GridKind {
        &self.kind
    }

    /// Time-slice index along `time_axis` for the configured time.
    fn time_slice(&self, histo: &MDHistoWorkspace, time_axis: usize) -> Option<usize> {
        let GridKind::Hexahedron4D(mapper) = &self.kind else {
            return None;
        };
        let dim = histo.dimension(time_axis)?;
        let time = self.config.time.unwrap_or_else(|| {
            log::debug!("no time set for 4D workspace '{}'; using the first slice", histo.name());
            dim.minimum()
        });
        Some(mapper.time_step(time, dim.minimum(), dim.maximum(), dim.n_bins()))
    }
}

impl MeshBuilder for HistoGridBuilder {
    fn name(&self) -> &'static str {
        match self.kind {
            GridKind::Line => "HistoLine",
            GridKind::Quad => "HistoQuad",
            GridKind::Hexahedron => "HistoHexahedron",
            GridKind::Hexahedron4D(_) => "HistoHexahedron4D",
        }
    }

    fn try_build(
        &self,
        workspace: &WorkspaceHandle,
        progress: &mut dyn ProgressAction,
    ) -> Result<Option<BuiltMesh>> {
        let Some(histo) = workspace.as_histo() else {
            return Ok(None);
        };
        let axes = display_axes(workspace);
        if axes.len() != self.kind.n_dims() {
            return Ok(None);
        }
        let mut context = BuildContext::prepare(self.threshold.as_ref(), workspace, &self.config)?;

        let spatial = &axes[..axes.len().min(3)];
        let mut index = vec![0; histo.num_dims()];
        if let Some(&time_axis) = axes.get(3) {
            index[time_axis] = self.time_slice(histo, time_axis).unwrap_or(0);
        }

        let mut bins = [1usize; 3];
        for (k, &axis) in spatial.iter().enumerate() {
            bins[k] = histo.dimensions()[axis].n_bins();
        }
        let n_cells: usize = bins.iter().product();
        let point_dims = [bins[0] + 1, bins[1] + 1, bins[2] + 1];
        let point_stride = [1, point_dims[0], point_dims[0] * point_dims[1]];
        let n_candidate_points: usize = point_dims[..spatial.len()].iter().product();
        let cell_kind = self.kind.cell_kind();
        let corners = corner_offsets(cell_kind);

        // Points phase: classify cells, mark the corners they need, emit those points.
        let mut signals = vec![f64::NAN; n_cells];
        let mut needed = vec![false; n_candidate_points];
        {
            let mut phase = ProgressPhase::new(progress, 0.0, 0.5);
            for cell in 0..n_cells {
                let ijk = unravel(cell, &bins);
                for (k, &axis) in spatial.iter().enumerate() {
                    index[axis] = ijk[k];
                }
                let signal = histo
                    .normalized_signal_at(&index, context.normalization)
                    .unwrap_or(f64::NAN);
                if context.visible(signal) {
                    signals[cell] = signal;
                    for offset in corners {
                        needed[point_index(&ijk, offset, &point_stride)] = true;
                    }
                }
                phase.step(cell + 1, n_cells);
            }
        }

        let mut grid = UnstructuredGrid::new();
        let mut point_ids = vec![usize::MAX; n_candidate_points];
        for p in (0..n_candidate_points).filter(|&p| needed[p]) {
            let pijk = unravel(p, &point_dims);
            let coords = spatial
                .iter()
                .enumerate()
                .map(|(k, &axis)| histo.dimensions()[axis].bin_boundary(pijk[k]));
            point_ids[p] = grid.push_point(context.transform.apply(to_point(coords)));
        }

        // Topology phase.
        let n_visible = signals.iter().filter(|s| !s.is_nan()).count();
        grid.reserve(0, n_visible);
        let mut phase = ProgressPhase::new(progress, 0.5, 1.0);
        for (cell, &signal) in signals.iter().enumerate() {
            if !signal.is_nan() {
                let ijk = unravel(cell, &bins);
                let ids = corners
                    .iter()
                    .map(|offset| point_ids[point_index(&ijk, offset, &point_stride)])
                    .collect();
                grid.push_cell(cell_kind, ids, signal)?;
            }
            phase.step(cell + 1, n_cells);
        }

        context.finish(self.name(), grid).map(Some)
    }

    fn clone_box(&self) -> Box<dyn MeshBuilder> {
        Box::new(self.clone())
    }
}

/// Splits a linear index (first axis fastest) into three axis indices.
fn unravel(mut linear: usize, dims: &[usize; 3]) -> [usize; 3] {
    let mut out = [0; 3];
    for (slot, &n) in out.iter_mut().zip(dims) {
        *slot = linear % n;
        linear /= n;
    }
    out
}

fn point_index(cell: &[usize; 3], offset: &[usize; 3], stride: &[usize; 3]) -> usize {
    (0..3).map(|k| (cell[k] + offset[k]) * stride[k]).sum()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::IgnoreProgress;
    use mdmesh_core::{
        Dimension, IgnoreZerosThresholdRange, Normalization, TimeToTimeStep,
        UserDefinedThresholdRange,
    };
    use std::sync::Arc;

    fn dims(bins: &[usize]) -> Vec<Dimension> {
        bins.iter()
            .enumerate()
            .map(|(i, &n)| {
                let id = format!("d{i}");
                Dimension::new(id.clone(), id, "A^-1", 0.0, 3.0, n).unwrap()
            })
            .collect()
    }

    fn raw() -> BuildConfig {
        BuildConfig::default().with_normalization(Normalization::NoNormalization)
    }

    fn build(builder: &HistoGridBuilder, ws: MDHistoWorkspace) -> Option<BuiltMesh> {
        let handle: WorkspaceHandle = Arc::new(ws);
        builder.try_build(&handle, &mut IgnoreProgress).unwrap()
    }

    #[test]
    fn test_quad_counts() {
        let ws = MDHistoWorkspace::new("ws", dims(&[4, 3])).filled(2.0);
        let builder = HistoGridBuilder::quad(&IgnoreZerosThresholdRange::new(), raw());
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.n_cells(), 12);
        assert_eq!(built.grid.n_points(), 20);
        assert!(built
            .grid
            .cells()
            .iter()
            .all(|c| c.kind == CellKind::Quad));
    }

    #[test]
    fn test_line_points_follow_bin_boundaries() {
        let ws = MDHistoWorkspace::new("ws", dims(&[3]))
            .with_signal(vec![1.0, 2.0, 3.0])
            .unwrap();
        let builder = HistoGridBuilder::line(&IgnoreZerosThresholdRange::new(), raw());
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.n_cells(), 3);
        let xs: Vec<f64> = built.grid.points().iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(built.grid.scalars(), &[1.0, 2.0, 3.0]);
        assert_eq!(built.signal_range, (1.0, 3.0));
    }

    #[test]
    fn test_sparse_cell_drops_unshared_points() {
        // Middle cell of three is masked: all four points are still needed.
        // An end cell masked: its outer point disappears.
        let ws = MDHistoWorkspace::new("ws", dims(&[3]))
            .with_signal(vec![1.0, 1.0, 0.0])
            .unwrap();
        let builder = HistoGridBuilder::line(&IgnoreZerosThresholdRange::new(), raw());
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.n_cells(), 2);
        assert_eq!(built.grid.n_points(), 3);

        let ws = MDHistoWorkspace::new("ws", dims(&[3]))
            .with_signal(vec![1.0, f64::NAN, 1.0])
            .unwrap();
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.n_cells(), 2);
        assert_eq!(built.grid.n_points(), 4);
    }

    #[test]
    fn test_user_threshold_masks_cells() {
        let ws = MDHistoWorkspace::new("ws", dims(&[5]))
            .with_signal(vec![0.5, 1.0, 1.5, 2.0, 2.5])
            .unwrap();
        let threshold = UserDefinedThresholdRange::new(1.0, 2.0).unwrap();
        let builder = HistoGridBuilder::line(&threshold, raw());
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.scalars(), &[1.0, 1.5, 2.0]);
        assert_eq!(built.grid.n_points(), 4);
    }

    #[test]
    fn test_declines_other_dimensionality() {
        let ws = MDHistoWorkspace::new("ws", dims(&[2, 2])).filled(1.0);
        let builder = HistoGridBuilder::hexahedron(&IgnoreZerosThresholdRange::new(), raw());
        assert!(build(&builder, ws).is_none());
    }

    #[test]
    fn test_integrated_dimensions_are_skipped() {
        let ws = MDHistoWorkspace::new("ws", dims(&[2, 1, 3])).filled(1.0);
        let builder = HistoGridBuilder::quad(&IgnoreZerosThresholdRange::new(), raw());
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.n_cells(), 6);
        assert_eq!(built.grid.n_points(), 12);
        // second display axis is the third workspace dimension
        let max_y = built
            .grid
            .points()
            .iter()
            .map(|p| p[1])
            .fold(f64::MIN, f64::max);
        assert_eq!(max_y, 3.0);
    }

    #[test]
    fn test_4d_selects_time_slice() {
        let n = 2 * 2 * 2 * 3;
        let signal: Vec<f64> = (0..n).map(|i| f64::from(i / 8 + 1)).collect();
        let ws = MDHistoWorkspace::new("ws", dims(&[2, 2, 2, 3]))
            .with_signal(signal)
            .unwrap();
        let builder = HistoGridBuilder::hexahedron_4d(
            Box::new(TimeToTimeStep),
            &IgnoreZerosThresholdRange::new(),
            raw().with_time(Some(2.5)),
        );
        let built = build(&builder, ws).unwrap();
        assert_eq!(built.grid.n_cells(), 8);
        assert_eq!(built.grid.n_points(), 27);
        assert!(built.grid.scalars().iter().all(|&s| s == 3.0));
    }

    #[test]
    fn test_unravel_first_axis_fastest() {
        assert_eq!(unravel(0, &[2, 3, 4]), [0, 0, 0]);
        assert_eq!(unravel(1, &[2, 3, 4]), [1, 0, 0]);
        assert_eq!(unravel(2, &[2, 3, 4]), [0, 1, 0]);
        assert_eq!(unravel(6, &[2, 3, 4]), [0, 0, 1]);
    }
}
