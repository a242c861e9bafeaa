//! Mesh build configuration.

use crate::{MeshError, Result};
use mdmesh_core::Normalization;
use serde::{Deserialize, Serialize};

/// Parameters shared by every builder in a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Signal normalization applied before thresholding.
    pub normalization: Normalization,
    /// Time value selecting the slice of a fourth dimension.
    pub time: Option<f64>,
    /// Depth of the box structure rendered by the event box builder.
    pub recursion_depth: usize,
    /// Maximum number of points emitted by the splatter builder.
    pub number_of_points: usize,
    /// Share of the brightest boxes (percent) the splatter builder samples from.
    pub percent_to_use: f64,
    /// Seed of the splatter sampler.
    pub seed: u64,
    /// Whether the workspace's skew basis is applied to mesh points.
    pub apply_skew: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            normalization: Normalization::AutoSelect,
            time: None,
            recursion_depth: 5,
            number_of_points: 150_000,
            percent_to_use: 5.0,
            seed: 0x5eed,
            apply_skew: true,
        }
    }
}

impl BuildConfig {
    /// Sets the normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Sets the time value.
    #[must_use]
    pub fn with_time(mut self, time: Option<f64>) -> Self {
        self.time = time;
        self
    }

    /// Sets the rendered box depth.
    #[must_use]
    pub fn with_recursion_depth(mut self, depth: usize) -> Self {
        self.recursion_depth = depth;
        self
    }

    /// Sets the splatter sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables the skew transform.
    #[must_use]
    pub fn with_apply_skew(mut self, apply: bool) -> Self {
        self.apply_skew = apply;
        self
    }

    /// Sets the splatter point budget.
    ///
    /// # Errors
    /// Returns [`MeshError::Config`] if `points` is zero.
    pub fn try_with_number_of_points(mut self, points: usize) -> Result<Self> {
        if points == 0 {
            return Err(MeshError::Config(
                "number_of_points must be at least 1".to_string(),
            ));
        }
        self.number_of_points = points;
        Ok(self)
    }

    /// Sets the share of boxes the splatter builder samples from.
    ///
    /// # Errors
    /// Returns [`MeshError::Config`] unless `0 < percent <= 100`.
    pub fn try_with_percent_to_use(mut self, percent: f64) -> Result<Self> {
        if !(percent > 0.0 && percent <= 100.0) {
            return Err(MeshError::Config(format!(
                "percent_to_use must be in (0, 100], got {percent}"
            )));
        }
        self.percent_to_use = percent;
        Ok(self)
    }

    /// Checks values that may have come from deserialization.
    ///
    /// # Errors
    /// Returns [`MeshError::Config`] for a zero point budget, an out-of-range
    /// percentage or a non-finite time.
    pub fn validate(&self) -> Result<()> {
        Self::default()
            .try_with_number_of_points(self.number_of_points)?
            .try_with_percent_to_use(self.percent_to_use)?;
        if self.time.is_some_and(|t| !t.is_finite()) {
            return Err(MeshError::Config("time must be finite".to_string()));
        }
        Ok(())
    }
}
