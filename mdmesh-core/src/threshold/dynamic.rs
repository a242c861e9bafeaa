//! Threshold ranges whose reported bounds track the data scanned.

use super::{ObservedBounds, ThresholdRange, ThresholdResult};

/// Everything except zero (and NaN) is in range.
///
/// The tracked minimum skips zeros; the maximum does not. Until a signal is
/// observed both bounds read 0.0 unless seeded with [`Self::with_initial`].
#[derive(Debug, Clone, Default)]
pub struct IgnoreZerosThresholdRange {
    bounds: ObservedBounds,
}

impl IgnoreZerosThresholdRange {
    /// Creates an unseeded range; bounds read 0.0 until a signal is observed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a range whose bounds start at `[min, max]` and only widen.
    #[must_use]
    pub fn with_initial(min: f64, max: f64) -> Self {
        Self {
            bounds: ObservedBounds {
                min: Some(min.min(max)),
                max: Some(max.max(min)),
            },
        }
    }
}

impl ThresholdRange for IgnoreZerosThresholdRange {
    fn name(&self) -> &'static str {
        "IgnoreZeros"
    }

    fn calculate(&mut self) -> ThresholdResult<()> {
        Ok(())
    }

    fn has_calculated(&self) -> bool {
        true
    }

    fn minimum(&self) -> ThresholdResult<f64> {
        Ok(self.bounds.lower().min(self.bounds.upper()))
    }

    fn maximum(&self) -> ThresholdResult<f64> {
        Ok(self.bounds.upper())
    }

    fn in_range(&self, signal: f64) -> bool {
        signal != 0.0 && !signal.is_nan()
    }

    fn observe(&mut self, signal: f64) {
        if signal.is_nan() {
            return;
        }
        if signal != 0.0 {
            self.bounds.widen_min(signal);
        }
        self.bounds.widen_max(signal);
    }

    fn clone_box(&self) -> Box<dyn ThresholdRange> {
        Box::new(self.clone())
    }
}

/// Every finite value is in range; bounds follow the observed extremes.
#[derive(Debug, Clone, Default)]
pub struct NoThresholdRange {
    bounds: ObservedBounds,
}

impl NoThresholdRange {
    /// Creates a range with no observations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThresholdRange for NoThresholdRange {
    fn name(&self) -> &'static str {
        "NoThreshold"
    }

    fn calculate(&mut self) -> ThresholdResult<()> {
        Ok(())
    }

    fn has_calculated(&self) -> bool {
        true
    }

    fn minimum(&self) -> ThresholdResult<f64> {
        Ok(self.bounds.lower())
    }

    fn maximum(&self) -> ThresholdResult<f64> {
        Ok(self.bounds.upper())
    }

    fn in_range(&self, signal: f64) -> bool {
        !signal.is_nan()
    }

    fn observe(&mut self, signal: f64) {
        if signal.is_nan() {
            return;
        }
        self.bounds.widen_min(signal);
        self.bounds.widen_max(signal);
    }

    fn clone_box(&self) -> Box<dyn ThresholdRange> {
        Box::new(self.clone())
    }
}
