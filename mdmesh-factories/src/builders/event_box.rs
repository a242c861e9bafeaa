//! Mesh of the box structure of an event workspace.
//!
//! Each box at the configured recursion depth (or each leaf that stops above
//! it) becomes one line, quad or hexahedron with its own corner points, so
//! memory is bounded by the depth rather than by the number of events.

use super::{corner_offsets, display_axes, to_point, BuildContext, BuiltMesh, MeshBuilder};
use crate::{BuildConfig, CellKind, ProgressAction, ProgressPhase, Result, UnstructuredGrid};
use mdmesh_core::{MDWorkspace, ThresholdRange, WorkspaceHandle};

/// Builds one cell per box of an event workspace.
///
/// Handles 1 to 3 non-integrated dimensions, and 4 where the fourth is time:
/// only boxes containing [`BuildConfig::time`] (default: the axis minimum)
/// are drawn.
#[derive(Debug, Clone)]
pub struct EventBoxBuilder {
    threshold: Box<dyn ThresholdRange>,
    config: BuildConfig,
}

impl EventBoxBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self {
            threshold: threshold.clone_box(),
            config,
        }
    }
}

impl MeshBuilder for EventBoxBuilder {
    fn name(&self) -> &'static str {
        "EventBox"
    }

    fn try_build(
        &self,
        workspace: &WorkspaceHandle,
        progress: &mut dyn ProgressAction,
    ) -> Result<Option<BuiltMesh>> {
        let Some(events) = workspace.as_event() else {
            return Ok(None);
        };
        let axes = display_axes(workspace);
        if !(1..=4).contains(&axes.len()) {
            return Ok(None);
        }
        let mut context = BuildContext::prepare(self.threshold.as_ref(), workspace, &self.config)?;

        let spatial = &axes[..axes.len().min(3)];
        let time_filter = axes.get(3).and_then(|&axis| {
            let dim = events.dimension(axis)?;
            Some((axis, self.config.time.unwrap_or_else(|| dim.minimum())))
        });
        let Some(cell_kind) = CellKind::for_dimensionality(spatial.len()) else {
            return Ok(None);
        };
        let corners = corner_offsets(cell_kind);

        let boxes = events.boxes(self.config.recursion_depth);
        let total = boxes.len();

        // Points phase: select the boxes to draw.
        let mut selected = Vec::new();
        {
            let mut phase = ProgressPhase::new(progress, 0.0, 0.5);
            for (i, summary) in boxes.iter().enumerate() {
                phase.step(i + 1, total);
                if let Some((axis, time)) = time_filter {
                    if !summary.contains(axis, time) {
                        continue;
                    }
                }
                let signal = summary.normalized_signal(context.normalization);
                if summary.n_events > 0 && context.visible(signal) {
                    selected.push((i, signal));
                }
            }
        }

        // Topology phase: every selected box gets its own corners.
        let mut grid = UnstructuredGrid::new();
        grid.reserve(selected.len() * corners.len(), selected.len());
        let mut phase = ProgressPhase::new(progress, 0.5, 1.0);
        for (done, &(i, signal)) in selected.iter().enumerate() {
            let extents = &boxes[i].extents;
            let ids = corners
                .iter()
                .map(|offset| {
                    let coords = spatial.iter().enumerate().map(|(k, &axis)| {
                        let (lo, hi) = extents[axis];
                        if offset[k] == 0 {
                            lo
                        } else {
                            hi
                        }
                    });
                    grid.push_point(context.transform.apply(to_point(coords)))
                })
                .collect();
            grid.push_cell(cell_kind, ids, signal)?;
            phase.step(done + 1, selected.len());
        }

        context.finish(self.name(), grid).map(Some)
    }

    fn clone_box(&self) -> Box<dyn MeshBuilder> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::IgnoreProgress;
    use mdmesh_core::{
        BoxController, Dimension, IgnoreZerosThresholdRange, MDEvent, MDEventWorkspace,
        Normalization,
    };
    use std::sync::Arc;

    fn workspace(n_dims: usize) -> WorkspaceHandle {
        let dims: Vec<Dimension> = (0..n_dims)
            .map(|i| Dimension::new(format!("d{i}"), format!("d{i}"), "m", 0.0, 2.0, 4).unwrap())
            .collect();
        let mut events = Vec::new();
        for corner in 0..(1usize << n_dims) {
            let center = (0..n_dims)
                .map(|d| if (corner >> d) & 1 == 1 { 1.5 } else { 0.5 })
                .collect();
            events.push(MDEvent::new(2.0, 1.0, center));
        }
        let controller = BoxController::default()
            .with_split_threshold(0)
            .with_max_depth(1);
        Arc::new(MDEventWorkspace::new("ev", dims, events, controller).unwrap())
    }

    fn builder(config: BuildConfig) -> EventBoxBuilder {
        EventBoxBuilder::new(
            &IgnoreZerosThresholdRange::new(),
            config.with_normalization(Normalization::NumEventsNormalization),
        )
    }

    #[test]
    fn test_one_hexahedron_per_box() {
        let ws = workspace(3);
        let built = builder(BuildConfig::default())
            .try_build(&ws, &mut IgnoreProgress)
            .unwrap()
            .unwrap();
        assert_eq!(built.grid.n_cells(), 8);
        assert_eq!(built.grid.n_points(), 64);
        assert!(built.grid.scalars().iter().all(|&s| s == 2.0));
    }

    #[test]
    fn test_recursion_depth_limits_boxes() {
        let ws = workspace(2);
        let built = builder(BuildConfig::default().with_recursion_depth(0))
            .try_build(&ws, &mut IgnoreProgress)
            .unwrap()
            .unwrap();
        assert_eq!(built.grid.n_cells(), 1);
        assert_eq!(built.grid.cell(0).unwrap().kind, CellKind::Quad);
        let corners: Vec<[f64; 3]> = built.grid.points().to_vec();
        assert_eq!(corners[2], [2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_time_filter_in_4d() {
        let ws = workspace(4);
        let built = builder(BuildConfig::default().with_time(Some(1.2)))
            .try_build(&ws, &mut IgnoreProgress)
            .unwrap()
            .unwrap();
        // half of the 16 boxes contain t = 1.2
        assert_eq!(built.grid.n_cells(), 8);
    }

    #[test]
    fn test_declines_histo_workspaces() {
        let dims = vec![Dimension::new("x", "x", "m", 0.0, 1.0, 2).unwrap()];
        let ws: WorkspaceHandle = Arc::new(mdmesh_core::MDHistoWorkspace::new("h", dims));
        assert!(builder(BuildConfig::default())
            .try_build(&ws, &mut IgnoreProgress)
            .unwrap()
            .is_none());
    }
}
