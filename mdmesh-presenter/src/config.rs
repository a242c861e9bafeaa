//! Presenter configuration.

use crate::{PresenterError, Result};
use mdmesh_core::ThresholdConfig;
use mdmesh_factories::{BuildConfig, ClipBox};
use serde::{Deserialize, Serialize};

/// Settings a presenter applies to every build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Threshold policy used when the view sets no explicit range.
    pub threshold: ThresholdConfig,
    /// Builder parameters. Time and recursion depth are taken from the view.
    pub build: BuildConfig,
    /// Clip region applied to every mesh, in addition to the view's.
    pub clip: Option<ClipBox>,
    /// Whether the rebinning presenter keeps the rebinned histogram for output.
    pub output_histogram: bool,
}

impl PresenterConfig {
    /// Sets the threshold policy.
    #[must_use]
    pub fn with_threshold(mut self, threshold: ThresholdConfig) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the builder parameters.
    #[must_use]
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    /// Sets a fixed clip region.
    #[must_use]
    pub fn with_clip(mut self, clip: Option<ClipBox>) -> Self {
        self.clip = clip;
        self
    }

    /// Sets the output-histogram flag.
    #[must_use]
    pub fn with_output_histogram(mut self, output: bool) -> Self {
        self.output_histogram = output;
        self
    }

    /// Checks the threshold policy and builder parameters.
    ///
    /// # Errors
    /// Returns [`PresenterError::Threshold`] for an invalid user range or
    /// [`PresenterError::Mesh`] for invalid builder parameters.
    pub fn validate(&self) -> Result<()> {
        self.threshold.build()?;
        self.build.validate()?;
        Ok(())
    }

    /// Parses a JSON configuration and validates it.
    ///
    /// # Errors
    /// Returns [`PresenterError::Config`] on malformed JSON, or the
    /// validation error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PresenterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
