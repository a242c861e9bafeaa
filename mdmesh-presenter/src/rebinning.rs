//! Presenter that rebins a workspace onto user-chosen axes before meshing.
//!
//! Changing the binning or the output-histogram flag rebins the source again.
//! Changing thresholds, clip or time only rebuilds the mesh from the cached
//! rebinned workspace.

use crate::metadata::Geometry;
use crate::{
    ChainBuilder, ExecuteOutcome, MDRebinningView, PresenterConfig, PresenterError,
    RebinningAction, RebinningActionManager, Result,
};
use log::info;
use mdmesh_core::{
    rebin, GeometryXml, MDWorkspace, ThresholdRange, UserDefinedThresholdRange, WorkspaceHandle,
    WorkspaceProvider,
};
use mdmesh_factories::{ClipBox, ProgressAction};
use std::sync::Arc;

/// View values the last build was made with.
#[derive(Debug, Clone, PartialEq)]
struct ViewSnapshot {
    geometry_xml: String,
    output_histogram: bool,
    min_threshold: Option<f64>,
    max_threshold: Option<f64>,
    apply_clip: bool,
    clip_box: ClipBox,
    time: f64,
}

impl ViewSnapshot {
    fn of(view: &impl MDRebinningView) -> Self {
        Self {
            geometry_xml: view.applied_geometry_xml(),
            output_histogram: view.output_histogram_workspace(),
            min_threshold: view.min_threshold(),
            max_threshold: view.max_threshold(),
            apply_clip: view.apply_clip(),
            clip_box: view.clip_box(),
            time: view.time(),
        }
    }

    fn rebin_changed(&self, other: &Self) -> bool {
        self.geometry_xml != other.geometry_xml || self.output_histogram != other.output_histogram
    }

    fn visuals_changed(&self, other: &Self) -> bool {
        self.min_threshold != other.min_threshold
            || self.max_threshold != other.max_threshold
            || self.apply_clip != other.apply_clip
            || (self.apply_clip && self.clip_box != other.clip_box)
            || self.time.to_bits() != other.time.to_bits()
    }
}

/// Rebins a named workspace and meshes the result.
pub struct RebinningPresenter<V: MDRebinningView> {
    view: V,
    workspace_name: String,
    source: WorkspaceHandle,
    config: PresenterConfig,
    actions: RebinningActionManager,
    requested: Option<(String, GeometryXml)>,
    rebinned: Option<Geometry>,
    applied: Option<ViewSnapshot>,
    signal_range: Option<(f64, f64)>,
}

impl<V: MDRebinningView> RebinningPresenter<V> {
    /// Creates a presenter for the workspace called `workspace_name`.
    ///
    /// # Errors
    /// Returns [`PresenterError::WorkspaceNotFound`] if the provider does not
    /// hold it, or the validation error of `config`.
    pub fn new(
        view: V,
        provider: &dyn WorkspaceProvider,
        workspace_name: impl Into<String>,
        config: PresenterConfig,
    ) -> Result<Self> {
        let workspace_name = workspace_name.into();
        config.validate()?;
        let source = provider
            .fetch(&workspace_name)
            .ok_or_else(|| PresenterError::WorkspaceNotFound(workspace_name.clone()))?;
        Ok(Self {
            view,
            workspace_name,
            source,
            config,
            actions: RebinningActionManager::new(),
            requested: None,
            rebinned: None,
            applied: None,
            signal_range: None,
        })
    }

    /// The view.
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The view, for changing settings between executions.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Name of the source workspace.
    #[must_use]
    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    /// Compares the view with the last build and records what must be redone.
    ///
    /// # Errors
    /// Returns [`PresenterError::Core`] if the requested geometry XML is malformed.
    pub fn update_model(&mut self) -> Result<RebinningAction> {
        let current = ViewSnapshot::of(&self.view);
        match &self.applied {
            None => self.actions.ask(RebinningAction::RecalculateAll),
            Some(applied) => {
                if applied.rebin_changed(&current) {
                    self.actions.ask(RebinningAction::RecalculateAll);
                }
                if applied.visuals_changed(&current) {
                    self.actions.ask(RebinningAction::RecalculateVisualDataSetOnly);
                }
            }
        }
        let stale = self
            .requested
            .as_ref()
            .map_or(true, |(xml, _)| *xml != current.geometry_xml);
        if stale {
            let geometry = self.parse_geometry(&current.geometry_xml)?;
            self.requested = Some((current.geometry_xml, geometry));
        }
        Ok(self.actions.action())
    }

    /// An empty document requests the source's own binning.
    fn parse_geometry(&self, xml: &str) -> Result<GeometryXml> {
        if xml.trim().is_empty() {
            Ok(GeometryXml::from_dimensions(self.source.dimensions())?)
        } else {
            Ok(GeometryXml::parse(xml)?)
        }
    }

    fn requested(&self) -> Result<&GeometryXml> {
        self.requested
            .as_ref()
            .map(|(_, geometry)| geometry)
            .ok_or(PresenterError::NotSetUp)
    }

    /// Geometry XML of the last rebin; unchanged by visual-only builds.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before the first build.
    pub fn applied_geometry_xml(&self) -> Result<&str> {
        self.rebinned
            .as_ref()
            .map(|g| g.xml.as_str())
            .ok_or(PresenterError::NotSetUp)
    }

    /// Returns true if the requested binning has a time axis.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before the first
    /// `update_model` or `execute`.
    pub fn has_t_dimension_available(&self) -> Result<bool> {
        Ok(self.requested()?.has_t_dimension())
    }

    /// Lower bin edges of the requested time axis.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before the first
    /// `update_model` or `execute`.
    pub fn time_step_values(&self) -> Result<Vec<f64>> {
        Ok(self
            .requested()?
            .t
            .as_ref()
            .map(|t| (0..t.n_bins()).map(|i| t.bin_boundary(i)).collect())
            .unwrap_or_default())
    }

    /// Label of the requested time axis, empty without one.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before the first
    /// `update_model` or `execute`.
    pub fn time_step_label(&self) -> Result<String> {
        Ok(self
            .requested()?
            .t
            .as_ref()
            .map(mdmesh_core::Dimension::label)
            .unwrap_or_default())
    }

    /// The rebinned histogram, when the view asks for it as an output.
    #[must_use]
    pub fn output_workspace(&self) -> Option<WorkspaceHandle> {
        let wanted = self
            .applied
            .as_ref()
            .is_some_and(|a| a.output_histogram)
            || self.config.output_histogram;
        self.rebinned
            .as_ref()
            .filter(|_| wanted)
            .map(|g| Arc::clone(&g.workspace))
    }

    /// Lowest signal of the last build.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before the first build.
    pub fn min_value(&self) -> Result<f64> {
        self.signal_range.map(|r| r.0).ok_or(PresenterError::NotSetUp)
    }

    /// Highest signal of the last build.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before the first build.
    pub fn max_value(&self) -> Result<f64> {
        self.signal_range.map(|r| r.1).ok_or(PresenterError::NotSetUp)
    }

    /// Pending recalculation.
    #[must_use]
    pub fn pending_action(&self) -> RebinningAction {
        self.actions.action()
    }

    fn threshold(&self, snapshot: &ViewSnapshot) -> Result<Box<dyn ThresholdRange>> {
        match (snapshot.min_threshold, snapshot.max_threshold) {
            (Some(min), Some(max)) => Ok(Box::new(UserDefinedThresholdRange::new(min, max)?)),
            _ => Ok(self.config.threshold.build()?),
        }
    }

    /// Rebins if needed and builds a mesh.
    ///
    /// # Errors
    /// Returns geometry, rebinning, threshold or mesh building errors.
    pub fn execute(
        &mut self,
        make_chain: ChainBuilder<'_>,
        rebinning: &mut dyn ProgressAction,
        drawing: &mut dyn ProgressAction,
    ) -> Result<ExecuteOutcome> {
        let action = self.update_model()?;
        if action == RebinningAction::NoRecalculation && self.signal_range.is_some() {
            info!("'{}' unchanged; keeping the previous mesh", self.workspace_name);
            return Ok(ExecuteOutcome::Unchanged);
        }
        let snapshot = ViewSnapshot::of(&self.view);

        if action == RebinningAction::RecalculateAll || self.rebinned.is_none() {
            let target = self.requested()?.dimensions();
            info!(
                "rebinning '{}' onto {} dimensions",
                self.workspace_name,
                target.len()
            );
            let histogram = rebin(self.source.as_ref(), &target)?;
            self.rebinned = Some(Geometry::of(Arc::new(histogram))?);
        }
        rebinning.event_raised(1.0);

        let threshold = self.threshold(&snapshot)?;
        let build = self.config.build.clone().with_time(Some(snapshot.time));
        let chain = make_chain(threshold.as_ref(), &build);
        let geometry = self.rebinned.as_ref().ok_or(PresenterError::NotSetUp)?;
        let mut product = chain.create(Some(&geometry.workspace), drawing)?;
        geometry.attach(&mut product.grid, product.signal_range)?;
        if snapshot.apply_clip {
            product.grid = product.grid.clip(&snapshot.clip_box);
        }
        if let Some(clip) = &self.config.clip {
            product.grid = product.grid.clip(clip);
        }

        self.signal_range = Some(product.signal_range);
        self.applied = Some(snapshot);
        self.actions.reset();
        Ok(ExecuteOutcome::Built(Box::new(product)))
    }
}
