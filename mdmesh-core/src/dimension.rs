//! Axis descriptors for multi-dimensional workspaces.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single workspace axis.
///
/// Dimensions are immutable once constructed. A dimension with exactly one
/// bin is *integrated*: it is collapsed away rather than rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    id: String,
    name: String,
    units: String,
    minimum: f64,
    maximum: f64,
    n_bins: usize,
}

impl Dimension {
    /// Creates a new dimension.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a bound is not finite, if `maximum < minimum`,
    /// or if `n_bins` is zero.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        units: impl Into<String>,
        minimum: f64,
        maximum: f64,
        n_bins: usize,
    ) -> Result<Self> {
        let id = id.into();
        if !minimum.is_finite() || !maximum.is_finite() {
            return Err(Error::Config(format!(
                "dimension '{id}' has non-finite limits [{minimum}, {maximum}]"
            )));
        }
        if maximum < minimum {
            return Err(Error::Config(format!(
                "dimension '{id}' maximum {maximum} is less than minimum {minimum}"
            )));
        }
        if n_bins == 0 {
            return Err(Error::Config(format!("dimension '{id}' has zero bins")));
        }
        Ok(Self {
            id,
            name: name.into(),
            units: units.into(),
            minimum,
            maximum,
            n_bins,
        })
    }

    /// Identifier used to match dimensions across workspaces.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit label.
    #[must_use]
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Lower limit.
    #[must_use]
    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    /// Upper limit.
    #[must_use]
    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    /// Number of bins along this axis.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Returns true if the axis is collapsed to a single bin.
    #[must_use]
    pub fn is_integrated(&self) -> bool {
        self.n_bins == 1
    }

    /// Width of one bin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_width(&self) -> f64 {
        (self.maximum - self.minimum) / self.n_bins as f64
    }

    /// Lower edge of bin `index`; `bin_boundary(n_bins)` is the upper limit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_boundary(&self, index: usize) -> f64 {
        if index >= self.n_bins {
            return self.maximum;
        }
        self.minimum + index as f64 * self.bin_width()
    }

    /// Centre of bin `index`.
    #[must_use]
    pub fn bin_center(&self, index: usize) -> f64 {
        self.bin_boundary(index) + 0.5 * self.bin_width()
    }

    /// Bin containing `x`, or `None` if `x` lies outside the limits.
    ///
    /// Bins are half-open except the last one, which includes the maximum.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if x.is_nan() || x < self.minimum || x > self.maximum {
            return None;
        }
        let width = self.bin_width();
        if width <= 0.0 {
            return Some(0);
        }
        let index = ((x - self.minimum) / width).floor() as usize;
        Some(index.min(self.n_bins - 1))
    }

    /// Copy of this dimension with a different bin count.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `n_bins` is zero.
    pub fn with_bins(&self, n_bins: usize) -> Result<Self> {
        Self::new(
            self.id.clone(),
            self.name.clone(),
            self.units.clone(),
            self.minimum,
            self.maximum,
            n_bins,
        )
    }

    /// Copy of this dimension with different limits.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the limits are invalid.
    pub fn with_limits(&self, minimum: f64, maximum: f64) -> Result<Self> {
        Self::new(
            self.id.clone(),
            self.name.clone(),
            self.units.clone(),
            minimum,
            maximum,
            self.n_bins,
        )
    }

    /// Axis label in the form `name (units)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.units)
    }
}
