//! Threshold ranges derived from a sampled pass over the workspace.

use super::{ThresholdRange, ThresholdResult};
use crate::error::ThresholdError;
use crate::{Normalization, WorkspaceHandle};
use rayon::prelude::*;

/// Finite, non-zero normalized signals, thinned by stride to at most
/// `sample_size` values (`0` keeps everything).
fn sample_signals(
    workspace: &WorkspaceHandle,
    normalization: Normalization,
    sample_size: usize,
) -> Vec<f64> {
    let signals: Vec<f64> = workspace
        .normalized_signals(normalization)
        .into_par_iter()
        .filter(|s| s.is_finite() && *s != 0.0)
        .collect();
    if sample_size == 0 || signals.len() <= sample_size {
        return signals;
    }
    let stride = signals.len().div_ceil(sample_size);
    signals.into_iter().step_by(stride).collect()
}

#[derive(Debug, Clone)]
struct Source {
    workspace: WorkspaceHandle,
    normalization: Normalization,
}

/// Values up to the median of the sampled signal are in range.
#[derive(Debug, Clone)]
pub struct MedianAndBelowThresholdRange {
    sample_size: usize,
    source: Option<Source>,
    bounds: Option<(f64, f64)>,
}

impl MedianAndBelowThresholdRange {
    /// Creates an uncalculated range sampling at most `sample_size` values.
    #[must_use]
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            source: None,
            bounds: None,
        }
    }
}

impl ThresholdRange for MedianAndBelowThresholdRange {
    fn name(&self) -> &'static str {
        "MedianAndBelow"
    }

    fn set_workspace(&mut self, workspace: WorkspaceHandle, normalization: Normalization) {
        self.source = Some(Source {
            workspace,
            normalization,
        });
        self.bounds = None;
    }

    fn calculate(&mut self) -> ThresholdResult<()> {
        let source = self
            .source
            .as_ref()
            .ok_or(ThresholdError::NoWorkspace(self.name()))?;
        let mut sample = sample_signals(&source.workspace, source.normalization, self.sample_size);
        if sample.is_empty() {
            log::warn!(
                "no finite non-zero signal in '{}'; median threshold collapses to zero",
                source.workspace.name()
            );
            self.bounds = Some((0.0, 0.0));
            return Ok(());
        }
        sample.par_sort_unstable_by(f64::total_cmp);
        let mid = sample.len() / 2;
        let median = if sample.len() % 2 == 0 {
            0.5 * (sample[mid - 1] + sample[mid])
        } else {
            sample[mid]
        };
        self.bounds = Some((sample[0], median));
        log::debug!("median threshold [{}, {median}] from {} samples", sample[0], sample.len());
        Ok(())
    }

    fn has_calculated(&self) -> bool {
        self.bounds.is_some()
    }

    fn minimum(&self) -> ThresholdResult<f64> {
        self.bounds
            .map(|(min, _)| min)
            .ok_or(ThresholdError::NotCalculated(self.name()))
    }

    fn maximum(&self) -> ThresholdResult<f64> {
        self.bounds
            .map(|(_, max)| max)
            .ok_or(ThresholdError::NotCalculated(self.name()))
    }

    fn in_range(&self, signal: f64) -> bool {
        self.bounds.is_some_and(|(_, median)| signal <= median)
    }

    fn clone_box(&self) -> Box<dyn ThresholdRange> {
        Box::new(self.clone())
    }
}

/// `mean ± n_std·σ` of the sampled signal, clipped to the observed extremes.
#[derive(Debug, Clone)]
pub struct GaussianThresholdRange {
    n_std: f64,
    sample_size: usize,
    source: Option<Source>,
    bounds: Option<(f64, f64)>,
}

impl GaussianThresholdRange {
    /// Creates an uncalculated range of half-width `n_std` standard deviations.
    #[must_use]
    pub fn new(n_std: f64, sample_size: usize) -> Self {
        Self {
            n_std: n_std.abs(),
            sample_size,
            source: None,
            bounds: None,
        }
    }

    /// Creates a range already bound to `workspace`.
    #[must_use]
    pub fn for_workspace(
        workspace: WorkspaceHandle,
        normalization: Normalization,
        n_std: f64,
        sample_size: usize,
    ) -> Self {
        let mut range = Self::new(n_std, sample_size);
        range.set_workspace(workspace, normalization);
        range
    }
}

impl ThresholdRange for GaussianThresholdRange {
    fn name(&self) -> &'static str {
        "Gaussian"
    }

    fn set_workspace(&mut self, workspace: WorkspaceHandle, normalization: Normalization) {
        self.source = Some(Source {
            workspace,
            normalization,
        });
        self.bounds = None;
    }

    #[allow(clippy::cast_precision_loss)]
    fn calculate(&mut self) -> ThresholdResult<()> {
        let source = self
            .source
            .as_ref()
            .ok_or(ThresholdError::NoWorkspace(self.name()))?;
        let sample = sample_signals(&source.workspace, source.normalization, self.sample_size);
        if sample.is_empty() {
            log::warn!(
                "no finite non-zero signal in '{}'; gaussian threshold collapses to zero",
                source.workspace.name()
            );
            self.bounds = Some((0.0, 0.0));
            return Ok(());
        }

        let n = sample.len() as f64;
        let (sum, min, max) = sample
            .par_iter()
            .fold(
                || (0.0, f64::INFINITY, f64::NEG_INFINITY),
                |(sum, lo, hi), &s| (sum + s, lo.min(s), hi.max(s)),
            )
            .reduce(
                || (0.0, f64::INFINITY, f64::NEG_INFINITY),
                |a, b| (a.0 + b.0, a.1.min(b.1), a.2.max(b.2)),
            );
        let mean = sum / n;
        let variance = sample.par_iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let sigma = variance.sqrt();

        let lower = (mean - self.n_std * sigma).max(min);
        let upper = (mean + self.n_std * sigma).min(max);
        self.bounds = Some((lower, upper.max(lower)));
        log::debug!("gaussian threshold mean={mean} sigma={sigma} -> [{lower}, {upper}]");
        Ok(())
    }

    fn has_calculated(&self) -> bool {
        self.bounds.is_some()
    }

    fn minimum(&self) -> ThresholdResult<f64> {
        self.bounds
            .map(|(min, _)| min)
            .ok_or(ThresholdError::NotCalculated(self.name()))
    }

    fn maximum(&self) -> ThresholdResult<f64> {
        self.bounds
            .map(|(_, max)| max)
            .ok_or(ThresholdError::NotCalculated(self.name()))
    }

    fn in_range(&self, signal: f64) -> bool {
        self.bounds
            .is_some_and(|(min, max)| signal >= min && signal <= max)
    }

    fn clone_box(&self) -> Box<dyn ThresholdRange> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{Dimension, MDHistoWorkspace};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn workspace(values: Vec<f64>) -> WorkspaceHandle {
        let n = values.len();
        let dims = vec![Dimension::new("x", "x", "m", 0.0, 1.0, n).unwrap()];
        Arc::new(MDHistoWorkspace::new("ws", dims).with_signal(values).unwrap())
    }

    #[test]
    fn test_gaussian_requires_calculate() {
        let range = GaussianThresholdRange::new(1.0, 0);
        assert_eq!(
            range.minimum().unwrap_err(),
            ThresholdError::NotCalculated("Gaussian")
        );
        assert!(range.maximum().is_err());
        assert!(!range.in_range(1.0));
    }

    #[test]
    fn test_gaussian_requires_workspace() {
        let mut range = GaussianThresholdRange::new(1.0, 0);
        assert_eq!(
            range.calculate().unwrap_err(),
            ThresholdError::NoWorkspace("Gaussian")
        );
    }

    #[test]
    fn test_gaussian_bounds() {
        let ws = workspace(vec![1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        let mut range =
            GaussianThresholdRange::for_workspace(ws, Normalization::NoNormalization, 1.0, 0);
        range.calculate().unwrap();
        // zeros are excluded: mean 3, sigma sqrt(2)
        let sigma = 2.0_f64.sqrt();
        assert_relative_eq!(range.minimum().unwrap(), 3.0 - sigma);
        assert_relative_eq!(range.maximum().unwrap(), 3.0 + sigma);
        assert!(range.in_range(3.0));
        assert!(!range.in_range(1.0));
    }

    #[test]
    fn test_gaussian_clipped_to_observed() {
        let ws = workspace(vec![1.0, 2.0, 3.0]);
        let mut range =
            GaussianThresholdRange::for_workspace(ws, Normalization::NoNormalization, 10.0, 0);
        range.calculate().unwrap();
        assert_eq!(range.minimum().unwrap(), 1.0);
        assert_eq!(range.maximum().unwrap(), 3.0);
    }

    #[test]
    fn test_gaussian_uniform_data_has_ordered_bounds() {
        let ws = workspace(vec![5.0; 8]);
        let mut range =
            GaussianThresholdRange::for_workspace(ws, Normalization::NoNormalization, 2.0, 0);
        range.calculate().unwrap();
        assert!(range.minimum().unwrap() <= range.maximum().unwrap());
        assert!(range.in_range(5.0));
    }

    #[test]
    fn test_median_and_below() {
        let ws = workspace(vec![4.0, 1.0, 3.0, 2.0, 5.0, 0.0, f64::NAN]);
        let mut range = MedianAndBelowThresholdRange::new(0);
        assert!(range.minimum().is_err());
        range.set_workspace(ws, Normalization::NoNormalization);
        range.calculate().unwrap();
        assert_eq!(range.minimum().unwrap(), 1.0);
        assert_eq!(range.maximum().unwrap(), 3.0);
        assert!(range.in_range(3.0));
        assert!(range.in_range(0.5));
        assert!(!range.in_range(3.5));
        assert!(!range.in_range(f64::NAN));
    }

    #[test]
    fn test_sampling_limits_sample() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let ws = workspace(values);
        let sample = sample_signals(&ws, Normalization::NoNormalization, 10);
        assert_eq!(sample.len(), 10);
        assert_eq!(sample[0], 1.0);
        assert_eq!(sample[1], 11.0);
    }

    #[test]
    fn test_empty_sample_collapses() {
        let ws = workspace(vec![0.0; 4]);
        let mut range = MedianAndBelowThresholdRange::new(0);
        range.set_workspace(ws, Normalization::NoNormalization);
        range.calculate().unwrap();
        assert_eq!(range.minimum().unwrap(), 0.0);
        assert_eq!(range.maximum().unwrap(), 0.0);
    }
}
