//! What the presenters read from (and report back to) the user interface.

use mdmesh_factories::{ClipBox, ProgressAction};

/// Settings of a loading filter.
pub trait MDLoadingView {
    /// Time value selected for 4D data.
    fn time(&self) -> f64;

    /// Box recursion depth for event data.
    fn recursion_depth(&self) -> usize;

    /// Whether the workspace is held in memory.
    fn load_in_memory(&self) -> bool;

    /// Receives progress of the running step.
    fn update_algorithm_progress(&mut self, fraction: f64, text: &str);
}

/// Settings of a rebinning filter.
pub trait MDRebinningView {
    /// Lower signal threshold, if the user set one.
    fn min_threshold(&self) -> Option<f64>;

    /// Upper signal threshold, if the user set one.
    fn max_threshold(&self) -> Option<f64>;

    /// Whether the clip box applies.
    fn apply_clip(&self) -> bool;

    /// Region the mesh is clipped to when [`MDRebinningView::apply_clip`] is set.
    fn clip_box(&self) -> ClipBox;

    /// Geometry XML describing the requested binning.
    fn applied_geometry_xml(&self) -> String;

    /// Whether the rebinned histogram is published as an output.
    fn output_histogram_workspace(&self) -> bool;

    /// Time value selected for 4D data.
    fn time(&self) -> f64;

    /// Receives progress of the running step.
    fn update_algorithm_progress(&mut self, fraction: f64, text: &str);
}

/// Plain-value [`MDLoadingView`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingViewState {
    /// Time value.
    pub time: f64,
    /// Box recursion depth.
    pub recursion_depth: usize,
    /// In-memory flag.
    pub load_in_memory: bool,
    /// Last reported progress.
    pub progress: f64,
    /// Last reported progress text.
    pub progress_text: String,
}

impl Default for LoadingViewState {
    fn default() -> Self {
        Self {
            time: 0.0,
            recursion_depth: 5,
            load_in_memory: true,
            progress: 0.0,
            progress_text: String::new(),
        }
    }
}

impl MDLoadingView for LoadingViewState {
    fn time(&self) -> f64 {
        self.time
    }

    fn recursion_depth(&self) -> usize {
        self.recursion_depth
    }

    fn load_in_memory(&self) -> bool {
        self.load_in_memory
    }

    fn update_algorithm_progress(&mut self, fraction: f64, text: &str) {
        self.progress = fraction;
        text.clone_into(&mut self.progress_text);
    }
}

/// Plain-value [`MDRebinningView`].
#[derive(Debug, Clone, PartialEq)]
pub struct RebinningViewState {
    /// Lower threshold.
    pub min_threshold: Option<f64>,
    /// Upper threshold.
    pub max_threshold: Option<f64>,
    /// Clip flag.
    pub apply_clip: bool,
    /// Clip region.
    pub clip_box: ClipBox,
    /// Requested geometry.
    pub applied_geometry_xml: String,
    /// Output-histogram flag.
    pub output_histogram_workspace: bool,
    /// Time value.
    pub time: f64,
    /// Last reported progress.
    pub progress: f64,
    /// Last reported progress text.
    pub progress_text: String,
}

impl RebinningViewState {
    /// A view requesting `geometry_xml` with no threshold or clip.
    #[must_use]
    pub fn new(geometry_xml: impl Into<String>) -> Self {
        Self {
            min_threshold: None,
            max_threshold: None,
            apply_clip: false,
            clip_box: ClipBox::new([f64::NEG_INFINITY; 3], [f64::INFINITY; 3]),
            applied_geometry_xml: geometry_xml.into(),
            output_histogram_workspace: false,
            time: 0.0,
            progress: 0.0,
            progress_text: String::new(),
        }
    }
}

impl MDRebinningView for RebinningViewState {
    fn min_threshold(&self) -> Option<f64> {
        self.min_threshold
    }

    fn max_threshold(&self) -> Option<f64> {
        self.max_threshold
    }

    fn apply_clip(&self) -> bool {
        self.apply_clip
    }

    fn clip_box(&self) -> ClipBox {
        self.clip_box
    }

    fn applied_geometry_xml(&self) -> String {
        self.applied_geometry_xml.clone()
    }

    fn output_histogram_workspace(&self) -> bool {
        self.output_histogram_workspace
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn update_algorithm_progress(&mut self, fraction: f64, text: &str) {
        self.progress = fraction;
        text.clone_into(&mut self.progress_text);
    }
}

/// Forwards build progress to a view's progress callback.
pub struct ViewProgress<'a, F: FnMut(f64, &str)> {
    report: F,
    text: &'a str,
}

impl<'a, F: FnMut(f64, &str)> ViewProgress<'a, F> {
    /// Reports every fraction through `report`, labelled `text`.
    pub fn new(text: &'a str, report: F) -> Self {
        Self { report, text }
    }
}

impl<F: FnMut(f64, &str)> ProgressAction for ViewProgress<'_, F> {
    fn event_raised(&mut self, fraction: f64) {
        (self.report)(fraction, self.text);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_view_progress_updates_view() {
        let mut view = LoadingViewState::default();
        {
            let mut progress =
                ViewProgress::new("Drawing", |f, t| view.update_algorithm_progress(f, t));
            progress.event_raised(0.25);
        }
        assert_eq!(view.progress, 0.25);
        assert_eq!(view.progress_text, "Drawing");
    }
}
