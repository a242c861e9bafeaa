//! Fixed, user-supplied threshold window.

use super::{ThresholdRange, ThresholdResult};
use crate::error::ThresholdError;

/// Inclusive `[min, max]` window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserDefinedThresholdRange {
    min: f64,
    max: f64,
}

impl UserDefinedThresholdRange {
    /// Creates the window.
    ///
    /// # Errors
    /// Returns [`ThresholdError::InvalidRange`] if `max < min` or either bound is NaN.
    pub fn new(min: f64, max: f64) -> ThresholdResult<Self> {
        if min.is_nan() || max.is_nan() || max < min {
            return Err(ThresholdError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }
}

impl ThresholdRange for UserDefinedThresholdRange {
    fn name(&self) -> &'static str {
        "UserDefined"
    }

    fn calculate(&mut self) -> ThresholdResult<()> {
        Ok(())
    }

    fn has_calculated(&self) -> bool {
        true
    }

    fn minimum(&self) -> ThresholdResult<f64> {
        Ok(self.min)
    }

    fn maximum(&self) -> ThresholdResult<f64> {
        Ok(self.max)
    }

    fn in_range(&self, signal: f64) -> bool {
        signal >= self.min && signal <= self.max
    }

    fn clone_box(&self) -> Box<dyn ThresholdRange> {
        Box::new(*self)
    }
}
