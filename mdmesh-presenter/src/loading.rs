//! Presenter for workspaces already held in memory.

use crate::metadata::Geometry;
use crate::{
    MDLoadingView, PresenterConfig, PresenterError, RebinningAction, RebinningActionManager,
    Result,
};
use log::info;
use mdmesh_core::{
    MDWorkspace, SpecialCoordinateSystem, ThresholdRange, WorkspaceKind, WorkspaceProvider,
};
use mdmesh_factories::{BuildConfig, FactoryChain, MeshProduct, ProgressAction, UnstructuredGrid};
use std::sync::Arc;

/// Builds the chain a presenter dispatches through.
pub type ChainBuilder<'a> = &'a dyn Fn(&dyn ThresholdRange, &BuildConfig) -> FactoryChain;

/// Result of a presenter `execute`.
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// A new mesh was built.
    Built(Box<MeshProduct>),
    /// Nothing changed since the last build; keep the previous mesh.
    Unchanged,
}

impl ExecuteOutcome {
    /// The new mesh, if one was built.
    #[must_use]
    pub fn product(&self) -> Option<&MeshProduct> {
        match self {
            Self::Built(product) => Some(&**product),
            Self::Unchanged => None,
        }
    }

    /// Consumes the outcome, returning the new mesh if one was built.
    #[must_use]
    pub fn into_product(self) -> Option<MeshProduct> {
        match self {
            Self::Built(product) => Some(*product),
            Self::Unchanged => None,
        }
    }
}

/// View settings a build was made with.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Applied {
    time: f64,
    recursion_depth: usize,
    load_in_memory: bool,
}

/// Loads metadata and meshes for a named in-memory workspace.
///
/// [`InMemoryLoadingPresenter::execute_load_metadata`] moves the presenter
/// from pending to set up; geometry accessors fail with
/// [`PresenterError::NotSetUp`] before that.
pub struct InMemoryLoadingPresenter<V: MDLoadingView> {
    view: V,
    provider: Arc<dyn WorkspaceProvider>,
    workspace_name: String,
    expected: WorkspaceKind,
    config: PresenterConfig,
    geometry: Option<Geometry>,
    actions: RebinningActionManager,
    applied: Option<Applied>,
    signal_range: Option<(f64, f64)>,
}

impl<V: MDLoadingView> InMemoryLoadingPresenter<V> {
    /// Creates a pending presenter for `workspace_name`.
    pub fn new(
        view: V,
        provider: Arc<dyn WorkspaceProvider>,
        workspace_name: impl Into<String>,
        expected: WorkspaceKind,
    ) -> Self {
        Self {
            view,
            provider,
            workspace_name: workspace_name.into(),
            expected,
            config: PresenterConfig::default(),
            geometry: None,
            actions: RebinningActionManager::new(),
            applied: None,
            signal_range: None,
        }
    }

    /// Replaces the presenter configuration.
    #[must_use]
    pub fn with_config(mut self, config: PresenterConfig) -> Self {
        self.config = config;
        self
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

    /// Returns true if the provider holds a workspace of the expected kind
    /// under the configured name.
    #[must_use]
    pub fn can_read_file(&self) -> bool {
        self.provider.can_provide(&self.workspace_name)
            && self
                .provider
                .fetch(&self.workspace_name)
                .is_some_and(|ws| ws.kind() == self.expected)
    }

    /// Fetches the workspace and records its geometry.
    ///
    /// # Errors
    /// Returns [`PresenterError::WorkspaceNotFound`] or
    /// [`PresenterError::WrongWorkspaceType`] when the provider cannot
    /// supply the expected workspace.
    pub fn execute_load_metadata(&mut self) -> Result<()> {
        let workspace = self
            .provider
            .fetch(&self.workspace_name)
            .ok_or_else(|| PresenterError::WorkspaceNotFound(self.workspace_name.clone()))?;
        if workspace.kind() != self.expected {
            return Err(PresenterError::WrongWorkspaceType {
                name: self.workspace_name.clone(),
                expected: self.expected,
                found: workspace.kind(),
            });
        }
        self.geometry = Some(Geometry::of(workspace)?);
        self.applied = None;
        Ok(())
    }

    fn geometry(&self) -> Result<&Geometry> {
        self.geometry.as_ref().ok_or(PresenterError::NotSetUp)
    }

    /// Geometry XML of the loaded workspace.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn geometry_xml(&self) -> Result<&str> {
        Ok(&self.geometry()?.xml)
    }

    /// Returns true if the workspace has a fourth (time) display axis.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn has_t_dimension_available(&self) -> Result<bool> {
        Ok(self.geometry()?.time_dimension().is_some())
    }

    /// Time values the user can step through.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn time_step_values(&self) -> Result<Vec<f64>> {
        Ok(self.geometry()?.time_step_values())
    }

    /// Label of the time axis, empty without one.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn time_step_label(&self) -> Result<String> {
        Ok(self
            .geometry()?
            .time_dimension()
            .map(mdmesh_core::Dimension::label)
            .unwrap_or_default())
    }

    /// Writes the axis titles into `grid`'s field data.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn set_axis_labels(&self, grid: &mut UnstructuredGrid) -> Result<()> {
        self.geometry()?.set_axis_labels(grid);
        Ok(())
    }

    /// Instrument of the loaded workspace, empty when unknown.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn instrument(&self) -> Result<String> {
        Ok(self.geometry()?.instrument())
    }

    /// Coordinate frame of the loaded workspace.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotSetUp`] before metadata is loaded.
    pub fn special_coordinates(&self) -> Result<SpecialCoordinateSystem> {
        Ok(self.geometry()?.special_coordinates())
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

    fn current_settings(&self) -> Applied {
        Applied {
            time: self.view.time(),
            recursion_depth: self.view.recursion_depth(),
            load_in_memory: self.view.load_in_memory(),
        }
    }

    /// Builds a mesh if the view changed since the last build.
    ///
    /// Metadata is loaded on first use. A changed recursion depth or
    /// in-memory flag rebuilds from a fresh fetch; a changed time rebuilds
    /// from the cached workspace.
    ///
    /// # Errors
    /// Returns provider, threshold or mesh building errors.
    pub fn execute(
        &mut self,
        make_chain: ChainBuilder<'_>,
        loading: &mut dyn ProgressAction,
        drawing: &mut dyn ProgressAction,
    ) -> Result<ExecuteOutcome> {
        let current = self.current_settings();
        match self.applied {
            None => self.actions.ask(RebinningAction::RecalculateAll),
            Some(applied) => {
                if applied.recursion_depth != current.recursion_depth
                    || applied.load_in_memory != current.load_in_memory
                {
                    self.actions.ask(RebinningAction::RecalculateAll);
                }
                if applied.time.to_bits() != current.time.to_bits() {
                    self.actions.ask(RebinningAction::RecalculateVisualDataSetOnly);
                }
            }
        }

        let action = self.actions.action();
        if action == RebinningAction::NoRecalculation && self.signal_range.is_some() {
            info!("'{}' unchanged; keeping the previous mesh", self.workspace_name);
            return Ok(ExecuteOutcome::Unchanged);
        }
        if action == RebinningAction::RecalculateAll || self.geometry.is_none() {
            self.execute_load_metadata()?;
        }
        loading.event_raised(1.0);

        info!("{action} for '{}'", self.workspace_name);
        let threshold = self.config.threshold.build()?;
        let build = self
            .config
            .build
            .clone()
            .with_time(Some(current.time))
            .with_recursion_depth(current.recursion_depth);
        let chain = make_chain(threshold.as_ref(), &build);

        let geometry = self.geometry()?;
        let mut product = chain.create(Some(&geometry.workspace), drawing)?;
        geometry.attach(&mut product.grid, product.signal_range)?;
        if let Some(clip) = &self.config.clip {
            product.grid = product.grid.clip(clip);
        }

        self.signal_range = Some(product.signal_range);
        self.applied = Some(current);
        self.actions.reset();
        Ok(ExecuteOutcome::Built(Box::new(product)))
    }
}
