//! JSON descriptions of in-memory workspaces.
//!
//! ```json
//! {
//!   "type": "MDHistoWorkspace",
//!   "name": "ws",
//!   "dimensions": [
//!     {"id": "x", "name": "X", "units": "A", "minimum": 0.0, "maximum": 1.0, "n_bins": 2}
//!   ],
//!   "signal": [1.0, 2.0],
//!   "info": {"instrument": "CNCS"}
//! }
//! ```
//! Event workspaces use `"type": "MDEventWorkspace"` with an `events` list
//! and an optional box `controller` instead of the arrays.

use crate::Result;
use log::info;
use mdmesh_core::{
    BoxController, Dimension, MDEvent, MDEventWorkspace, MDHistoWorkspace, MDWorkspace,
    Normalization, SpecialCoordinateSystem, WorkspaceHandle, WorkspaceInfo,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Optional descriptive metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoDescription {
    /// Instrument name.
    pub instrument: Option<String>,
    /// Preferred display normalization; volume normalization when absent.
    pub normalization: Option<Normalization>,
    /// Coordinate frame code.
    pub special_coordinates: SpecialCoordinateSystem,
    /// Rows are the basis vectors of a non-orthogonal frame.
    pub skew_basis: Option<[[f64; 3]; 3]>,
}

impl InfoDescription {
    fn into_info(self, name: &str) -> WorkspaceInfo {
        let defaults = WorkspaceInfo::named(name);
        WorkspaceInfo {
            instrument: self.instrument,
            normalization: self.normalization.unwrap_or(defaults.normalization),
            special_coordinates: self.special_coordinates,
            skew_basis: self.skew_basis,
            ..defaults
        }
    }
}

/// Dense histogram description; arrays are in Fortran order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoDescription {
    /// Workspace name.
    pub name: String,
    /// Axes, integrated ones included.
    pub dimensions: Vec<Dimension>,
    /// Signal per cell.
    pub signal: Vec<f64>,
    /// Squared error per cell.
    #[serde(default)]
    pub errors_squared: Option<Vec<f64>>,
    /// Contributing events per cell.
    #[serde(default)]
    pub num_events: Option<Vec<f64>>,
    /// Descriptive metadata.
    #[serde(default)]
    pub info: InfoDescription,
}

/// Event list description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescription {
    /// Workspace name.
    pub name: String,
    /// Axes, integrated ones included.
    pub dimensions: Vec<Dimension>,
    /// Events, one coordinate per dimension.
    pub events: Vec<MDEvent>,
    /// Box splitting policy.
    #[serde(default)]
    pub controller: BoxController,
    /// Descriptive metadata.
    #[serde(default)]
    pub info: InfoDescription,
}

/// A workspace as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkspaceDescription {
    /// Dense histogram.
    #[serde(rename = "MDHistoWorkspace")]
    Histo(HistoDescription),
    /// Event list.
    #[serde(rename = "MDEventWorkspace")]
    Event(EventDescription),
}

impl WorkspaceDescription {
    /// Parses a description.
    ///
    /// # Errors
    /// Returns [`crate::Error::Json`] if the text is not a valid description.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Workspace name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Histo(d) => &d.name,
            Self::Event(d) => &d.name,
        }
    }

    /// Builds the described workspace.
    ///
    /// # Errors
    /// Returns [`crate::Error::Core`] if a dimension is invalid, an array
    /// does not match the shape or an event has the wrong number of
    /// coordinates.
    pub fn into_workspace(self) -> Result<WorkspaceHandle> {
        match self {
            Self::Histo(d) => {
                let info = d.info.into_info(&d.name);
                let mut ws =
                    MDHistoWorkspace::new(d.name, validated(&d.dimensions)?).with_signal(d.signal)?;
                if let Some(errors) = d.errors_squared {
                    ws = ws.with_errors_squared(errors)?;
                }
                if let Some(counts) = d.num_events {
                    ws = ws.with_num_events(counts)?;
                }
                Ok(Arc::new(ws.with_info(info)))
            }
            Self::Event(d) => {
                let info = d.info.into_info(&d.name);
                let ws =
                    MDEventWorkspace::new(d.name, validated(&d.dimensions)?, d.events, d.controller)?;
                Ok(Arc::new(ws.with_info(info)))
            }
        }
    }
}

/// Deserialized dimensions skip the constructor checks.
fn validated(dimensions: &[Dimension]) -> Result<Vec<Dimension>> {
    dimensions
        .iter()
        .map(|d| {
            Ok(Dimension::new(
                d.id(),
                d.name(),
                d.units(),
                d.minimum(),
                d.maximum(),
                d.n_bins(),
            )?)
        })
        .collect()
}

/// Loads a workspace description file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not a valid description
/// or describes an invalid workspace.
pub fn load_workspace_json<P: AsRef<Path>>(path: P) -> Result<WorkspaceHandle> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let description: WorkspaceDescription = serde_json::from_reader(BufReader::new(file))?;
    let workspace = description.into_workspace()?;
    info!(
        "loaded {} '{}' with {} dimensions from {}",
        workspace.kind(),
        workspace.name(),
        workspace.num_dims(),
        path.display()
    );
    Ok(workspace)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::Error;
    use mdmesh_core::WorkspaceKind;

    const HISTO: &str = r#"{
        "type": "MDHistoWorkspace",
        "name": "plane",
        "dimensions": [
            {"id": "x", "name": "X", "units": "A", "minimum": 0.0, "maximum": 2.0, "n_bins": 2},
            {"id": "y", "name": "Y", "units": "A", "minimum": 0.0, "maximum": 1.0, "n_bins": 1}
        ],
        "signal": [1.0, 3.0],
        "info": {"instrument": "CNCS", "special_coordinates": 3}
    }"#;

    #[test]
    fn test_histo_description() {
        let ws = WorkspaceDescription::from_json_str(HISTO)
            .unwrap()
            .into_workspace()
            .unwrap();
        assert_eq!(ws.kind(), WorkspaceKind::Histo);
        assert_eq!(ws.name(), "plane");
        assert_eq!(ws.instrument(), Some("CNCS"));
        assert_eq!(ws.special_coordinates(), SpecialCoordinateSystem::Hkl);
        assert_eq!(ws.display_normalization(), Normalization::VolumeNormalization);
        assert_eq!(ws.non_integrated_dimensions().len(), 1);
        assert_eq!(ws.as_histo().unwrap().signal_at(&[1, 0]), Some(3.0));
    }

    #[test]
    fn test_event_description() {
        let json = r#"{
            "type": "MDEventWorkspace",
            "name": "events",
            "dimensions": [
                {"id": "x", "name": "X", "units": "m", "minimum": 0.0, "maximum": 1.0, "n_bins": 4}
            ],
            "events": [
                {"signal": 1.0, "error_sq": 1.0, "center": [0.25]},
                {"signal": 2.0, "error_sq": 4.0, "center": [0.75]}
            ],
            "info": {"normalization": "NoNormalization"}
        }"#;
        let description = WorkspaceDescription::from_json_str(json).unwrap();
        assert_eq!(description.name(), "events");
        let ws = description.into_workspace().unwrap();
        assert_eq!(ws.kind(), WorkspaceKind::Event);
        assert_eq!(ws.display_normalization(), Normalization::NoNormalization);
        assert_eq!(ws.as_event().unwrap().n_events(), 2);
    }

    #[test]
    fn test_invalid_descriptions() {
        assert!(matches!(
            WorkspaceDescription::from_json_str(r#"{"name": "x"}"#),
            Err(Error::Json(_))
        ));
        let short_signal = HISTO.replace("[1.0, 3.0]", "[1.0]");
        let description = WorkspaceDescription::from_json_str(&short_signal).unwrap();
        assert!(matches!(description.into_workspace(), Err(Error::Core(_))));
        let inverted = HISTO.replace("\"maximum\": 2.0", "\"maximum\": -2.0");
        let description = WorkspaceDescription::from_json_str(&inverted).unwrap();
        assert!(matches!(description.into_workspace(), Err(Error::Core(_))));
    }
}
