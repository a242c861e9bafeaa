//! Terminal builder for workspaces nothing else handles.

use super::{BuildContext, BuiltMesh, MeshBuilder};
use crate::{BuildConfig, CellKind, ProgressAction, Result, UnstructuredGrid};
use mdmesh_core::{MDWorkspace, ThresholdRange, WorkspaceHandle};

/// Emits a single vertex at the origin carrying the summed signal.
///
/// Accepts every workspace, so it belongs at the end of a chain.
#[derive(Debug, Clone)]
pub struct ZeroDimensionalBuilder {
    threshold: Box<dyn ThresholdRange>,
    config: BuildConfig,
}

impl ZeroDimensionalBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self {
            threshold: threshold.clone_box(),
            config,
        }
    }
}

impl MeshBuilder for ZeroDimensionalBuilder {
    fn name(&self) -> &'static str {
        "ZeroDimensional"
    }

    fn try_build(
        &self,
        workspace: &WorkspaceHandle,
        progress: &mut dyn ProgressAction,
    ) -> Result<Option<BuiltMesh>> {
        let mut context = BuildContext::prepare(self.threshold.as_ref(), workspace, &self.config)?;
        let total: f64 = workspace
            .normalized_signals(context.normalization)
            .into_iter()
            .filter(|s| !s.is_nan())
            .sum();
        progress.event_raised(0.5);

        let mut grid = UnstructuredGrid::new();
        let origin = grid.push_point(context.transform.apply([0.0; 3]));
        context.visible(total);
        grid.push_cell(CellKind::Vertex, vec![origin], total)?;
        progress.event_raised(1.0);

        context.finish(self.name(), grid).map(Some)
    }

    fn clone_box(&self) -> Box<dyn MeshBuilder> {
        Box::new(self.clone())
    }
}
