//! Dense histogram workspace.

use super::{MDWorkspace, WorkspaceInfo, WorkspaceKind};
use crate::{Dimension, Error, Normalization, Result};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

/// Dense N-dimensional histogram.
///
/// Arrays are stored in Fortran order so the first dimension varies fastest;
/// a linear index is `i0 + n0 * (i1 + n1 * (i2 + ...))`.
#[derive(Debug, Clone)]
pub struct MDHistoWorkspace {
    info: WorkspaceInfo,
    dimensions: Vec<Dimension>,
    signal: ArrayD<f64>,
    error_sq: ArrayD<f64>,
    num_events: ArrayD<f64>,
}

impl MDHistoWorkspace {
    /// Creates a zero-filled workspace over `dimensions`.
    pub fn new(name: impl Into<String>, dimensions: Vec<Dimension>) -> Self {
        let shape: Vec<usize> = dimensions.iter().map(Dimension::n_bins).collect();
        let zeros = || ArrayD::<f64>::zeros(IxDyn(&shape).f());
        Self {
            info: WorkspaceInfo::named(name),
            signal: zeros(),
            error_sq: zeros(),
            num_events: zeros(),
            dimensions,
        }
    }

    /// Replaces the signal array (Fortran order).
    ///
    /// # Errors
    /// Returns [`Error::LengthMismatch`] if `values` does not match the shape.
    pub fn with_signal(mut self, values: Vec<f64>) -> Result<Self> {
        self.signal = self.array_from(values)?;
        Ok(self)
    }

    /// Replaces the squared-error array (Fortran order).
    ///
    /// # Errors
    /// Returns [`Error::LengthMismatch`] if `values` does not match the shape.
    pub fn with_errors_squared(mut self, values: Vec<f64>) -> Result<Self> {
        self.error_sq = self.array_from(values)?;
        Ok(self)
    }

    /// Replaces the per-cell contributing event counts (Fortran order).
    ///
    /// # Errors
    /// Returns [`Error::LengthMismatch`] if `values` does not match the shape.
    pub fn with_num_events(mut self, values: Vec<f64>) -> Result<Self> {
        self.num_events = self.array_from(values)?;
        Ok(self)
    }

    /// Sets every cell to `value`, with one contributing event per cell.
    #[must_use]
    pub fn filled(mut self, value: f64) -> Self {
        self.signal.fill(value);
        self.num_events.fill(1.0);
        self
    }

    /// Replaces the descriptive metadata, keeping the name.
    #[must_use]
    pub fn with_info(mut self, info: WorkspaceInfo) -> Self {
        let name = std::mem::take(&mut self.info.name);
        self.info = WorkspaceInfo { name, ..info };
        self
    }

    /// Sets the instrument name.
    #[must_use]
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.info.instrument = Some(instrument.into());
        self
    }

    /// Sets the preferred display normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.info.normalization = normalization;
        self
    }

    /// Sets the basis of a non-orthogonal display frame.
    #[must_use]
    pub fn with_skew_basis(mut self, basis: [[f64; 3]; 3]) -> Self {
        self.info.skew_basis = Some(basis);
        self
    }

    /// Bin counts per dimension.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::n_bins).collect()
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    /// Returns true if the workspace has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Raw signal at a full-rank index.
    #[must_use]
    pub fn signal_at(&self, index: &[usize]) -> Option<f64> {
        self.signal.get(index).copied()
    }

    /// Squared error at a full-rank index.
    #[must_use]
    pub fn error_sq_at(&self, index: &[usize]) -> Option<f64> {
        self.error_sq.get(index).copied()
    }

    /// Contributing event count at a full-rank index.
    #[must_use]
    pub fn num_events_at(&self, index: &[usize]) -> Option<f64> {
        self.num_events.get(index).copied()
    }

    /// Signal at `index` scaled by `normalization`.
    ///
    /// `AutoSelect` resolves to the workspace's display normalization.
    #[must_use]
    pub fn normalized_signal_at(&self, index: &[usize], normalization: Normalization) -> Option<f64> {
        let signal = self.signal_at(index)?;
        let n_events = self.num_events_at(index)?;
        Some(
            normalization
                .resolve(self.display_normalization())
                .apply(signal, self.inverse_volume(), n_events),
        )
    }

    /// Overwrites the signal at `index`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfBounds`] if `index` is outside the shape.
    pub fn set_signal_at(&mut self, index: &[usize], value: f64) -> Result<()> {
        let shape = self.shape();
        let cell = self
            .signal
            .get_mut(index)
            .ok_or_else(|| Error::IndexOutOfBounds {
                index: index.to_vec(),
                shape,
            })?;
        *cell = value;
        Ok(())
    }

    /// Accumulates a contribution into the cell at `index`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfBounds`] if `index` is outside the shape.
    pub fn accumulate(
        &mut self,
        index: &[usize],
        signal: f64,
        error_sq: f64,
        n_events: f64,
    ) -> Result<()> {
        let out_of_bounds = || Error::IndexOutOfBounds {
            index: index.to_vec(),
            shape: self.shape(),
        };
        if self.signal.get(index).is_none() {
            return Err(out_of_bounds());
        }
        self.signal[index] += signal;
        self.error_sq[index] += error_sq;
        self.num_events[index] += n_events;
        Ok(())
    }

    /// Volume of one cell, integrated dimensions included.
    #[must_use]
    pub fn cell_volume(&self) -> f64 {
        self.dimensions.iter().map(Dimension::bin_width).product()
    }

    /// Reciprocal of the cell volume, or 1 for degenerate (zero-width) cells.
    #[must_use]
    pub fn inverse_volume(&self) -> f64 {
        let volume = self.cell_volume();
        if volume > 0.0 {
            1.0 / volume
        } else {
            1.0
        }
    }

    /// Sum of every cell's raw signal.
    #[must_use]
    pub fn total_signal(&self) -> f64 {
        self.signal.iter().filter(|s| !s.is_nan()).sum()
    }

    fn array_from(&self, values: Vec<f64>) -> Result<ArrayD<f64>> {
        let shape = self.shape();
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        ArrayD::from_shape_vec(IxDyn(&shape).f(), values).map_err(|e| Error::Config(e.to_string()))
    }
}

impl MDWorkspace for MDHistoWorkspace {
    fn info(&self) -> &WorkspaceInfo {
        &self.info
    }

    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Histo
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn normalized_signals(&self, normalization: Normalization) -> Vec<f64> {
        let normalization = normalization.resolve(self.display_normalization());
        let inverse_volume = self.inverse_volume();
        self.signal
            .iter()
            .zip(self.num_events.iter())
            .map(|(&signal, &n_events)| normalization.apply(signal, inverse_volume, n_events))
            .collect()
    }

    fn as_histo(&self) -> Option<&MDHistoWorkspace> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn workspace() -> MDHistoWorkspace {
        let dims = vec![
            Dimension::new("x", "x", "m", 0.0, 3.0, 3).unwrap(),
            Dimension::new("y", "y", "m", 0.0, 4.0, 2).unwrap(),
        ];
        MDHistoWorkspace::new("ws", dims)
            .with_signal((0..6).map(f64::from).collect())
            .unwrap()
    }

    #[test]
    fn test_fortran_order_indexing() {
        let ws = workspace();
        assert_eq!(ws.shape(), vec![3, 2]);
        assert_eq!(ws.signal_at(&[0, 0]), Some(0.0));
        assert_eq!(ws.signal_at(&[1, 0]), Some(1.0));
        assert_eq!(ws.signal_at(&[0, 1]), Some(3.0));
        assert_eq!(ws.signal_at(&[2, 1]), Some(5.0));
        assert_eq!(ws.signal_at(&[3, 0]), None);
    }

    #[test]
    fn test_length_mismatch() {
        let err = workspace().with_signal(vec![1.0; 5]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 6, actual: 5 }));
    }

    #[test]
    fn test_volume_normalization() {
        let ws = workspace().with_num_events(vec![2.0; 6]).unwrap();
        // cell volume = 1.0 * 2.0
        assert_relative_eq!(ws.cell_volume(), 2.0);
        let volume = ws
            .normalized_signal_at(&[2, 1], Normalization::VolumeNormalization)
            .unwrap();
        assert_relative_eq!(volume, 2.5);
        let events = ws
            .normalized_signal_at(&[2, 1], Normalization::NumEventsNormalization)
            .unwrap();
        assert_relative_eq!(events, 2.5);
        let raw = ws
            .normalized_signal_at(&[2, 1], Normalization::NoNormalization)
            .unwrap();
        assert_relative_eq!(raw, 5.0);
    }

    #[test]
    fn test_accumulate_and_set() {
        let mut ws = workspace();
        ws.accumulate(&[0, 0], 2.0, 4.0, 1.0).unwrap();
        assert_eq!(ws.signal_at(&[0, 0]), Some(2.0));
        assert_eq!(ws.error_sq_at(&[0, 0]), Some(4.0));
        ws.set_signal_at(&[1, 1], f64::NAN).unwrap();
        assert!(ws.signal_at(&[1, 1]).unwrap().is_nan());
        assert!(ws.accumulate(&[5, 5], 1.0, 1.0, 1.0).is_err());
        assert_relative_eq!(ws.total_signal(), 2.0 + 1.0 + 2.0 + 3.0 + 5.0);
    }
}
