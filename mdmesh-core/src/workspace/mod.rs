//! The workspace contract consumed by mesh builders and presenters.
//!
//! Workspaces are owned by the data-processing framework. The core only ever
//! reads them through [`MDWorkspace`], holding a shared [`WorkspaceHandle`]
//! for the duration of a conversion.

mod event;
mod histo;
mod provider;

pub use event::{BoxController, BoxSummary, MDEvent, MDEventWorkspace};
pub use histo::MDHistoWorkspace;
pub use provider::{WorkspaceProvider, WorkspaceRegistry};

use crate::{Dimension, Normalization};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared, read-only handle to a workspace.
pub type WorkspaceHandle = Arc<dyn MDWorkspace>;

/// Storage flavour of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkspaceKind {
    /// Dense histogram of per-cell signal.
    Histo,
    /// Event list organised in a recursive box structure.
    Event,
}

impl fmt::Display for WorkspaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Histo => f.write_str("MDHistoWorkspace"),
            Self::Event => f.write_str("MDEventWorkspace"),
        }
    }
}

/// Coordinate frame the workspace axes are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum SpecialCoordinateSystem {
    /// No special frame.
    #[default]
    None,
    /// Momentum transfer in the lab frame.
    QLab,
    /// Momentum transfer in the sample frame.
    QSample,
    /// Reciprocal lattice units.
    Hkl,
}

impl From<SpecialCoordinateSystem> for i32 {
    fn from(value: SpecialCoordinateSystem) -> Self {
        match value {
            SpecialCoordinateSystem::None => 0,
            SpecialCoordinateSystem::QLab => 1,
            SpecialCoordinateSystem::QSample => 2,
            SpecialCoordinateSystem::Hkl => 3,
        }
    }
}

impl TryFrom<i32> for SpecialCoordinateSystem {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::QLab),
            2 => Ok(Self::QSample),
            3 => Ok(Self::Hkl),
            other => Err(format!("unknown special coordinate system {other}")),
        }
    }
}

/// Descriptive metadata shared by every workspace flavour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    /// Workspace name.
    pub name: String,
    /// Instrument the data was measured on.
    pub instrument: Option<String>,
    /// Normalization preferred for display.
    pub normalization: Normalization,
    /// Coordinate frame.
    pub special_coordinates: SpecialCoordinateSystem,
    /// Basis vectors (rows) of a non-orthogonal display frame.
    pub skew_basis: Option<[[f64; 3]; 3]>,
}

impl WorkspaceInfo {
    /// Creates metadata with the given name and default settings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            normalization: Normalization::VolumeNormalization,
            ..Self::default()
        }
    }
}

/// Read-only view of a multi-dimensional workspace.
pub trait MDWorkspace: Send + Sync + fmt::Debug {
    /// Descriptive metadata.
    fn info(&self) -> &WorkspaceInfo;

    /// Storage flavour.
    fn kind(&self) -> WorkspaceKind;

    /// All dimensions, integrated ones included.
    fn dimensions(&self) -> &[Dimension];

    /// Normalized signal of every cell (histo) or leaf box (event).
    ///
    /// This is the full O(N) scan statistical threshold ranges sample from.
    fn normalized_signals(&self, normalization: Normalization) -> Vec<f64>;

    /// Workspace name.
    fn name(&self) -> &str {
        &self.info().name
    }

    /// Number of dimensions.
    fn num_dims(&self) -> usize {
        self.dimensions().len()
    }

    /// Dimension at `index`.
    fn dimension(&self, index: usize) -> Option<&Dimension> {
        self.dimensions().get(index)
    }

    /// Dimensions actually rendered (more than one bin).
    fn non_integrated_dimensions(&self) -> Vec<&Dimension> {
        self.dimensions()
            .iter()
            .filter(|d| !d.is_integrated())
            .collect()
    }

    /// Normalization the workspace asks for when `AutoSelect` is chosen.
    fn display_normalization(&self) -> Normalization {
        self.info().normalization
    }

    /// Instrument name, if known.
    fn instrument(&self) -> Option<&str> {
        self.info().instrument.as_deref()
    }

    /// Coordinate frame of the axes.
    fn special_coordinates(&self) -> SpecialCoordinateSystem {
        self.info().special_coordinates
    }

    /// Basis of a non-orthogonal display frame, if any.
    fn skew_basis(&self) -> Option<[[f64; 3]; 3]> {
        self.info().skew_basis
    }

    /// Downcast to a histogram workspace.
    fn as_histo(&self) -> Option<&MDHistoWorkspace> {
        None
    }

    /// Downcast to an event workspace.
    fn as_event(&self) -> Option<&MDEventWorkspace> {
        None
    }
}
