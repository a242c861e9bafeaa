//! JSON side-channel attached to every mesh next to the geometry XML.

use crate::workspace::{MDWorkspace, SpecialCoordinateSystem};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Metadata a reader needs to resume without the original workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataJson {
    /// Instrument name, empty when unknown.
    #[serde(rename = "Instrument", default)]
    pub instrument: String,
    /// Lowest signal shown.
    #[serde(rename = "MinValue", default)]
    pub min_value: f64,
    /// Highest signal shown.
    #[serde(rename = "MaxValue", default)]
    pub max_value: f64,
    /// Coordinate frame of the axes.
    #[serde(rename = "SpecialCoordinates", default)]
    pub special_coordinates: SpecialCoordinateSystem,
}

impl MetadataJson {
    /// Collects the metadata of `workspace` for a mesh spanning `[min, max]`.
    ///
    /// Non-finite bounds are stored as zero.
    pub fn for_workspace(workspace: &dyn MDWorkspace, min_value: f64, max_value: f64) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            instrument: workspace.instrument().unwrap_or_default().to_string(),
            min_value: finite(min_value),
            max_value: finite(max_value),
            special_coordinates: workspace.special_coordinates(),
        }
    }

    /// Serializes to a compact JSON string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Metadata`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a JSON string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Metadata`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{Dimension, MDHistoWorkspace};

    #[test]
    fn test_json_keys() {
        let metadata = MetadataJson {
            instrument: "SEQUOIA".into(),
            min_value: 0.5,
            max_value: 12.0,
            special_coordinates: SpecialCoordinateSystem::Hkl,
        };
        let json = metadata.to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Instrument"], "SEQUOIA");
        assert_eq!(value["MinValue"], 0.5);
        assert_eq!(value["MaxValue"], 12.0);
        assert_eq!(value["SpecialCoordinates"], 3);
        assert_eq!(MetadataJson::from_json_str(&json).unwrap(), metadata);
    }

    #[test]
    fn test_missing_keys_default() {
        let metadata = MetadataJson::from_json_str(r#"{"Instrument":"CNCS"}"#).unwrap();
        assert_eq!(metadata.instrument, "CNCS");
        assert_eq!(metadata.special_coordinates, SpecialCoordinateSystem::None);
        assert!(MetadataJson::from_json_str(r#"{"SpecialCoordinates":9}"#).is_err());
    }

    #[test]
    fn test_for_workspace_sanitizes_bounds() {
        let dims = vec![Dimension::new("x", "x", "m", 0.0, 1.0, 2).unwrap()];
        let ws = MDHistoWorkspace::new("ws", dims).with_instrument("TOPAZ");
        let metadata = MetadataJson::for_workspace(&ws, f64::NAN, 4.0);
        assert_eq!(metadata.instrument, "TOPAZ");
        assert_eq!(metadata.min_value, 0.0);
        assert_eq!(metadata.max_value, 4.0);
    }
}
