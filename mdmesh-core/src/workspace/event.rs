//! Event workspace with a recursive box structure.
//!
//! Events are stored once, reordered so that every box owns a contiguous
//! range of the event list. Boxes split into `split_into^N` children when they
//! hold more than `split_threshold` events, down to `max_depth`.

use super::{MDWorkspace, WorkspaceInfo, WorkspaceKind};
use crate::{Dimension, Error, Normalization, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single N-dimensional event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MDEvent {
    /// Signal weight.
    pub signal: f64,
    /// Squared error of the weight.
    pub error_sq: f64,
    /// Position, one coordinate per dimension.
    pub center: Vec<f64>,
}

impl MDEvent {
    /// Creates an event.
    pub fn new(signal: f64, error_sq: f64, center: Vec<f64>) -> Self {
        Self {
            signal,
            error_sq,
            center,
        }
    }
}

/// Splitting policy of the box structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxController {
    /// Children per dimension when a box splits.
    pub split_into: usize,
    /// A box splits once it holds more events than this.
    pub split_threshold: usize,
    /// Maximum recursion depth (the root is depth 0).
    pub max_depth: usize,
}

impl Default for BoxController {
    fn default() -> Self {
        Self {
            split_into: 2,
            split_threshold: 64,
            max_depth: 6,
        }
    }
}

impl BoxController {
    /// Sets the number of children per dimension.
    #[must_use]
    pub fn with_split_into(mut self, split_into: usize) -> Self {
        self.split_into = split_into;
        self
    }

    /// Sets the split threshold.
    #[must_use]
    pub fn with_split_threshold(mut self, threshold: usize) -> Self {
        self.split_threshold = threshold;
        self
    }

    /// Sets the maximum depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Flattened description of one box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    /// `(min, max)` per dimension.
    pub extents: Vec<(f64, f64)>,
    /// Summed event signal.
    pub signal: f64,
    /// Summed squared error.
    pub error_sq: f64,
    /// Number of events in the box.
    pub n_events: usize,
    /// Depth of the box (root is 0).
    pub depth: usize,
    events: Range<usize>,
}

impl BoxSummary {
    /// Product of the box widths.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.extents.iter().map(|(lo, hi)| hi - lo).product()
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec<f64> {
        self.extents.iter().map(|(lo, hi)| 0.5 * (lo + hi)).collect()
    }

    /// Returns true if `value` lies inside the box along `dim`.
    #[must_use]
    pub fn contains(&self, dim: usize, value: f64) -> bool {
        self.extents
            .get(dim)
            .is_some_and(|&(lo, hi)| value >= lo && value <= hi)
    }

    /// Box signal scaled by `normalization` (already resolved).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalized_signal(&self, normalization: Normalization) -> f64 {
        let volume = self.volume();
        let inverse_volume = if volume > 0.0 { 1.0 / volume } else { 1.0 };
        normalization.apply(self.signal, inverse_volume, self.n_events as f64)
    }
}

#[derive(Debug, Clone)]
struct MDBox {
    extents: Vec<(f64, f64)>,
    depth: usize,
    signal: f64,
    error_sq: f64,
    events: Range<usize>,
    children: Vec<MDBox>,
}

impl MDBox {
    fn summary(&self) -> BoxSummary {
        BoxSummary {
            extents: self.extents.clone(),
            signal: self.signal,
            error_sq: self.error_sq,
            n_events: self.events.len(),
            depth: self.depth,
            events: self.events.clone(),
        }
    }

    fn collect(&self, max_depth: usize, out: &mut Vec<BoxSummary>) {
        if self.children.is_empty() || self.depth >= max_depth {
            out.push(self.summary());
            return;
        }
        for child in &self.children {
            child.collect(max_depth, out);
        }
    }

    fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(MDBox::max_depth)
            .max()
            .unwrap_or(self.depth)
    }
}

/// Event workspace.
#[derive(Debug, Clone)]
pub struct MDEventWorkspace {
    info: WorkspaceInfo,
    dimensions: Vec<Dimension>,
    events: Vec<MDEvent>,
    controller: BoxController,
    root: MDBox,
}

impl MDEventWorkspace {
    /// Builds the workspace and its box structure.
    ///
    /// Events outside the dimension limits are dropped with a warning.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if an event has the wrong number of
    /// coordinates or the controller cannot split.
    pub fn new(
        name: impl Into<String>,
        dimensions: Vec<Dimension>,
        events: Vec<MDEvent>,
        controller: BoxController,
    ) -> Result<Self> {
        if controller.split_into < 2 {
            return Err(Error::Config(format!(
                "box controller split_into must be at least 2, got {}",
                controller.split_into
            )));
        }
        let n_dims = dimensions.len();
        if let Some(bad) = events.iter().find(|e| e.center.len() != n_dims) {
            return Err(Error::Config(format!(
                "event has {} coordinates, workspace has {n_dims} dimensions",
                bad.center.len()
            )));
        }

        let extents: Vec<(f64, f64)> = dimensions
            .iter()
            .map(|d| (d.minimum(), d.maximum()))
            .collect();
        let total = events.len();
        let mut events: Vec<MDEvent> = events
            .into_iter()
            .filter(|e| {
                e.center
                    .iter()
                    .zip(&extents)
                    .all(|(&x, &(lo, hi))| x >= lo && x <= hi)
            })
            .collect();
        if events.len() < total {
            log::warn!(
                "dropped {} of {total} events outside the workspace limits",
                total - events.len()
            );
        }

        let root = build_box(&mut events, 0, extents, 0, &controller);
        Ok(Self {
            info: WorkspaceInfo::named(name),
            dimensions,
            events,
            controller,
            root,
        })
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

    /// Replaces the descriptive metadata, keeping the name.
    #[must_use]
    pub fn with_info(mut self, info: WorkspaceInfo) -> Self {
        let name = std::mem::take(&mut self.info.name);
        self.info = WorkspaceInfo { name, ..info };
        self
    }

    /// All events, grouped by box.
    #[must_use]
    pub fn events(&self) -> &[MDEvent] {
        &self.events
    }

    /// Number of events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.events.len()
    }

    /// Box splitting policy.
    #[must_use]
    pub fn controller(&self) -> &BoxController {
        &self.controller
    }

    /// Deepest level present in the box structure.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.max_depth()
    }

    /// Boxes at `depth`, plus leaves that stop above it.
    ///
    /// Together these tile the workspace exactly once.
    #[must_use]
    pub fn boxes(&self, depth: usize) -> Vec<BoxSummary> {
        let mut out = Vec::new();
        self.root.collect(depth, &mut out);
        out
    }

    /// Leaf boxes of the full structure.
    #[must_use]
    pub fn leaf_boxes(&self) -> Vec<BoxSummary> {
        self.boxes(usize::MAX)
    }

    /// Events owned by a box.
    #[must_use]
    pub fn events_in(&self, summary: &BoxSummary) -> &[MDEvent] {
        self.events.get(summary.events.clone()).unwrap_or(&[])
    }

    /// Sum of every event's signal.
    #[must_use]
    pub fn total_signal(&self) -> f64 {
        self.root.signal
    }
}

impl MDWorkspace for MDEventWorkspace {
    fn info(&self) -> &WorkspaceInfo {
        &self.info
    }

    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Event
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn normalized_signals(&self, normalization: Normalization) -> Vec<f64> {
        let normalization = normalization.resolve(self.display_normalization());
        self.leaf_boxes()
            .iter()
            .map(|b| b.normalized_signal(normalization))
            .collect()
    }

    fn as_event(&self) -> Option<&MDEventWorkspace> {
        Some(self)
    }
}

fn build_box(
    events: &mut [MDEvent],
    offset: usize,
    extents: Vec<(f64, f64)>,
    depth: usize,
    controller: &BoxController,
) -> MDBox {
    let signal = events.iter().map(|e| e.signal).sum();
    let error_sq = events.iter().map(|e| e.error_sq).sum();
    let range = offset..offset + events.len();

    let n_dims = extents.len();
    if n_dims == 0 || events.len() <= controller.split_threshold || depth >= controller.max_depth {
        return MDBox {
            extents,
            depth,
            signal,
            error_sq,
            events: range,
            children: Vec::new(),
        };
    }

    let split = controller.split_into;
    events.sort_by_key(|e| child_index(&e.center, &extents, split));

    let n_children = split.pow(u32::try_from(n_dims).unwrap_or(u32::MAX));
    let mut children = Vec::with_capacity(n_children);
    let mut start = 0;
    for child in 0..n_children {
        let end = start
            + events[start..]
                .iter()
                .take_while(|e| child_index(&e.center, &extents, split) == child)
                .count();
        let child_extents = child_extents(child, &extents, split);
        children.push(build_box(
            &mut events[start..end],
            offset + start,
            child_extents,
            depth + 1,
            controller,
        ));
        start = end;
    }

    MDBox {
        extents,
        depth,
        signal,
        error_sq,
        events: range,
        children,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn child_index(center: &[f64], extents: &[(f64, f64)], split: usize) -> usize {
    let mut index = 0;
    let mut stride = 1;
    for (&x, &(lo, hi)) in center.iter().zip(extents) {
        let width = hi - lo;
        let k = if width > 0.0 {
            (((x - lo) / width) * split as f64).floor() as usize
        } else {
            0
        };
        index += k.min(split - 1) * stride;
        stride *= split;
    }
    index
}

#[allow(clippy::cast_precision_loss)]
fn child_extents(child: usize, extents: &[(f64, f64)], split: usize) -> Vec<(f64, f64)> {
    let mut remainder = child;
    extents
        .iter()
        .map(|&(lo, hi)| {
            let k = remainder % split;
            remainder /= split;
            let width = (hi - lo) / split as f64;
            let child_lo = lo + k as f64 * width;
            let child_hi = if k + 1 == split { hi } else { child_lo + width };
            (child_lo, child_hi)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube_dims() -> Vec<Dimension> {
        vec![
            Dimension::new("x", "x", "m", 0.0, 4.0, 4).unwrap(),
            Dimension::new("y", "y", "m", 0.0, 4.0, 4).unwrap(),
            Dimension::new("z", "z", "m", 0.0, 4.0, 4).unwrap(),
        ]
    }

    fn grid_events() -> Vec<MDEvent> {
        let mut events = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    let c = |v: i32| f64::from(v) + 0.5;
                    events.push(MDEvent::new(1.0, 1.0, vec![c(i), c(j), c(k)]));
                }
            }
        }
        events
    }

    #[test]
    fn test_box_structure_splits() {
        let controller = BoxController::default()
            .with_split_threshold(8)
            .with_max_depth(3);
        let ws = MDEventWorkspace::new("ev", cube_dims(), grid_events(), controller).unwrap();
        assert_eq!(ws.n_events(), 64);
        // 64 events > 8 splits into 8 children of 8 events, which stay leaves.
        assert_eq!(ws.depth(), 1);
        let leaves = ws.leaf_boxes();
        assert_eq!(leaves.len(), 8);
        for leaf in &leaves {
            assert_eq!(leaf.n_events, 8);
            assert_relative_eq!(leaf.volume(), 8.0);
            assert_eq!(ws.events_in(leaf).len(), 8);
            for event in ws.events_in(leaf) {
                for (d, &x) in event.center.iter().enumerate() {
                    assert!(leaf.contains(d, x));
                }
            }
        }
        assert_relative_eq!(ws.total_signal(), 64.0);
    }

    #[test]
    fn test_boxes_limited_by_depth() {
        let controller = BoxController::default()
            .with_split_threshold(1)
            .with_max_depth(4);
        let ws = MDEventWorkspace::new("ev", cube_dims(), grid_events(), controller).unwrap();
        assert_eq!(ws.boxes(0).len(), 1);
        assert_eq!(ws.boxes(1).len(), 8);
        assert_eq!(ws.boxes(2).len(), 64);
        let total: usize = ws.boxes(2).iter().map(|b| b.n_events).sum();
        assert_eq!(total, 64);
    }

    #[test]
    fn test_drops_events_outside_limits() {
        let mut events = grid_events();
        events.push(MDEvent::new(5.0, 1.0, vec![10.0, 0.0, 0.0]));
        let ws = MDEventWorkspace::new("ev", cube_dims(), events, BoxController::default()).unwrap();
        assert_eq!(ws.n_events(), 64);
    }

    #[test]
    fn test_rejects_bad_events() {
        let events = vec![MDEvent::new(1.0, 1.0, vec![0.5])];
        assert!(MDEventWorkspace::new("ev", cube_dims(), events, BoxController::default()).is_err());
        let controller = BoxController::default().with_split_into(1);
        assert!(MDEventWorkspace::new("ev", cube_dims(), Vec::new(), controller).is_err());
    }

    #[test]
    fn test_normalized_box_signal() {
        let ws = MDEventWorkspace::new(
            "ev",
            cube_dims(),
            grid_events(),
            BoxController::default().with_split_threshold(8),
        )
        .unwrap();
        let signals = ws.normalized_signals(Normalization::NumEventsNormalization);
        assert_eq!(signals.len(), 8);
        for s in signals {
            assert_relative_eq!(s, 1.0);
        }
        let by_volume = ws.normalized_signals(Normalization::VolumeNormalization);
        assert_relative_eq!(by_volume[0], 1.0);
    }
}
