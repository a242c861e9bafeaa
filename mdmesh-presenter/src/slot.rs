//! Holder for a rebinning presenter that may not exist yet.

use crate::{
    ChainBuilder, ExecuteOutcome, MDRebinningView, PresenterError, RebinningAction,
    RebinningPresenter, Result,
};
use mdmesh_factories::ProgressAction;

/// A rebinning presenter, or the state before one could be constructed.
///
/// Every delegated call on [`RebinningSlot::Uninitialized`] fails with
/// [`PresenterError::NotConfigured`].
pub enum RebinningSlot<V: MDRebinningView> {
    /// No presenter yet.
    Uninitialized,
    /// A configured presenter.
    Ready(Box<RebinningPresenter<V>>),
}

impl<V: MDRebinningView> Default for RebinningSlot<V> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl<V: MDRebinningView> RebinningSlot<V> {
    /// Installs `presenter`, returning the previous one if any.
    pub fn install(&mut self, presenter: RebinningPresenter<V>) -> Option<RebinningPresenter<V>> {
        match std::mem::replace(self, Self::Ready(Box::new(presenter))) {
            Self::Ready(previous) => Some(*previous),
            Self::Uninitialized => None,
        }
    }

    /// Returns true once a presenter is installed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The presenter.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn presenter(&self) -> Result<&RebinningPresenter<V>> {
        match self {
            Self::Ready(presenter) => Ok(&**presenter),
            Self::Uninitialized => Err(PresenterError::NotConfigured),
        }
    }

    /// The presenter, mutably.
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn presenter_mut(&mut self) -> Result<&mut RebinningPresenter<V>> {
        match self {
            Self::Ready(presenter) => Ok(&mut **presenter),
            Self::Uninitialized => Err(PresenterError::NotConfigured),
        }
    }

    /// See [`RebinningPresenter::update_model`].
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn update_model(&mut self) -> Result<RebinningAction> {
        self.presenter_mut()?.update_model()
    }

    /// See [`RebinningPresenter::execute`].
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn execute(
        &mut self,
        make_chain: ChainBuilder<'_>,
        rebinning: &mut dyn ProgressAction,
        drawing: &mut dyn ProgressAction,
    ) -> Result<ExecuteOutcome> {
        self.presenter_mut()?.execute(make_chain, rebinning, drawing)
    }

    /// See [`RebinningPresenter::applied_geometry_xml`].
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn applied_geometry_xml(&self) -> Result<&str> {
        self.presenter()?.applied_geometry_xml()
    }

    /// See [`RebinningPresenter::has_t_dimension_available`].
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn has_t_dimension_available(&self) -> Result<bool> {
        self.presenter()?.has_t_dimension_available()
    }

    /// See [`RebinningPresenter::time_step_values`].
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn time_step_values(&self) -> Result<Vec<f64>> {
        self.presenter()?.time_step_values()
    }

    /// See [`RebinningPresenter::time_step_label`].
    ///
    /// # Errors
    /// Returns [`PresenterError::NotConfigured`] when uninitialized.
    pub fn time_step_label(&self) -> Result<String> {
        self.presenter()?.time_step_label()
    }
}
