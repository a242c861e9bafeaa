//! Threshold range policies: which signal values are visible.
//!
//! Classification is split in two phases. [`ThresholdRange::observe`]
//! accumulates statistics (the dynamic variants widen their reported range
//! with every value they see), while [`ThresholdRange::in_range`] is a pure
//! classifier. [`ThresholdRange::classify`] runs both, which is what mesh
//! builders call per cell so that the final reported range reflects the data
//! actually scanned.

mod dynamic;
mod statistical;
mod user;

pub use dynamic::{IgnoreZerosThresholdRange, NoThresholdRange};
pub use statistical::{GaussianThresholdRange, MedianAndBelowThresholdRange};
pub use user::UserDefinedThresholdRange;

use crate::error::ThresholdError;
use crate::{Normalization, WorkspaceHandle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for threshold operations.
pub type ThresholdResult<T> = std::result::Result<T, ThresholdError>;

/// Policy deciding which signal values are in range.
pub trait ThresholdRange: Send + Sync + fmt::Debug {
    /// Policy name.
    fn name(&self) -> &'static str;

    /// Binds the workspace that [`ThresholdRange::calculate`] scans.
    ///
    /// Variants that do not need a workspace ignore it.
    fn set_workspace(&mut self, _workspace: WorkspaceHandle, _normalization: Normalization) {}

    /// Establishes the bounds; may scan the whole workspace.
    ///
    /// # Errors
    /// Returns [`ThresholdError::NoWorkspace`] for variants that need a workspace
    /// when none was set.
    fn calculate(&mut self) -> ThresholdResult<()>;

    /// Returns true once the bounds are established.
    fn has_calculated(&self) -> bool;

    /// Lower bound.
    ///
    /// # Errors
    /// Returns [`ThresholdError::NotCalculated`] before `calculate()` for
    /// variants that need it.
    fn minimum(&self) -> ThresholdResult<f64>;

    /// Upper bound.
    ///
    /// # Errors
    /// Returns [`ThresholdError::NotCalculated`] before `calculate()` for
    /// variants that need it.
    fn maximum(&self) -> ThresholdResult<f64>;

    /// Pure classification of one value. NaN is never in range.
    fn in_range(&self, signal: f64) -> bool;

    /// Feeds one value to the statistics; no-op for static variants.
    fn observe(&mut self, _signal: f64) {}

    /// Observes then classifies.
    fn classify(&mut self, signal: f64) -> bool {
        self.observe(signal);
        self.in_range(signal)
    }

    /// Virtual copy.
    fn clone_box(&self) -> Box<dyn ThresholdRange>;
}

impl Clone for Box<dyn ThresholdRange> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Serializable choice of threshold policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdConfig {
    /// [`IgnoreZerosThresholdRange`].
    #[default]
    IgnoreZeros,
    /// [`NoThresholdRange`].
    NoThreshold,
    /// [`UserDefinedThresholdRange`].
    UserDefined {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// [`MedianAndBelowThresholdRange`].
    MedianAndBelow {
        /// Maximum number of sampled values (0 = all).
        sample_size: usize,
    },
    /// [`GaussianThresholdRange`].
    Gaussian {
        /// Half-width of the range in standard deviations.
        n_std: f64,
        /// Maximum number of sampled values (0 = all).
        sample_size: usize,
    },
}

impl ThresholdConfig {
    /// Builds the configured policy.
    ///
    /// # Errors
    /// Returns [`ThresholdError::InvalidRange`] for a user range with `max < min`.
    pub fn build(&self) -> ThresholdResult<Box<dyn ThresholdRange>> {
        let range: Box<dyn ThresholdRange> = match *self {
            Self::IgnoreZeros => Box::new(IgnoreZerosThresholdRange::new()),
            Self::NoThreshold => Box::new(NoThresholdRange::new()),
            Self::UserDefined { min, max } => Box::new(UserDefinedThresholdRange::new(min, max)?),
            Self::MedianAndBelow { sample_size } => {
                Box::new(MedianAndBelowThresholdRange::new(sample_size))
            }
            Self::Gaussian { n_std, sample_size } => {
                Box::new(GaussianThresholdRange::new(n_std, sample_size))
            }
        };
        Ok(range)
    }

    /// Returns true if the policy needs a workspace scan before use.
    #[must_use]
    pub fn needs_workspace(&self) -> bool {
        matches!(self, Self::MedianAndBelow { .. } | Self::Gaussian { .. })
    }
}

/// Running extremes of observed values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ObservedBounds {
    min: Option<f64>,
    max: Option<f64>,
}

impl ObservedBounds {
    fn widen_min(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
    }

    fn widen_max(&mut self, value: f64) {
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn lower(&self) -> f64 {
        self.min.or(self.max).unwrap_or(0.0)
    }

    fn upper(&self) -> f64 {
        self.max.or(self.min).unwrap_or(0.0)
    }
}
