//! Visual normalization of raw signal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How raw signal is scaled before thresholding and display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Normalization {
    /// Use the workspace's preferred normalization.
    #[default]
    AutoSelect,
    /// Raw signal.
    NoNormalization,
    /// Signal divided by the number of contributing events.
    NumEventsNormalization,
    /// Signal divided by the cell volume.
    VolumeNormalization,
}

impl Normalization {
    /// All variants, in serialization order.
    pub const ALL: [Normalization; 4] = [
        Self::AutoSelect,
        Self::NoNormalization,
        Self::NumEventsNormalization,
        Self::VolumeNormalization,
    ];

    /// Resolves `AutoSelect` against the workspace's preference.
    ///
    /// A preference that is itself `AutoSelect` resolves to volume normalization.
    #[must_use]
    pub fn resolve(self, preferred: Normalization) -> Normalization {
        match (self, preferred) {
            (Self::AutoSelect, Self::AutoSelect) => Self::VolumeNormalization,
            (Self::AutoSelect, preferred) => preferred,
            (explicit, _) => explicit,
        }
    }

    /// Scales `signal`.
    ///
    /// Dividing by zero events yields NaN, which excludes the cell.
    /// `AutoSelect` must be resolved first; unresolved it behaves as volume
    /// normalization.
    #[must_use]
    pub fn apply(self, signal: f64, inverse_volume: f64, n_events: f64) -> f64 {
        match self {
            Self::NoNormalization => signal,
            Self::NumEventsNormalization => {
                if n_events == 0.0 {
                    f64::NAN
                } else {
                    signal / n_events
                }
            }
            Self::VolumeNormalization | Self::AutoSelect => signal * inverse_volume,
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoSelect => "AutoSelect",
            Self::NoNormalization => "NoNormalization",
            Self::NumEventsNormalization => "NumEventsNormalization",
            Self::VolumeNormalization => "VolumeNormalization",
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoselect" | "auto" => Ok(Self::AutoSelect),
            "nonormalization" | "none" => Ok(Self::NoNormalization),
            "numeventsnormalization" | "num-events" | "numevents" => {
                Ok(Self::NumEventsNormalization)
            }
            "volumenormalization" | "volume" => Ok(Self::VolumeNormalization),
            other => Err(Error::Config(format!("unknown normalization '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_names_round_trip() {
        for norm in Normalization::ALL {
            assert_eq!(norm.to_string().parse::<Normalization>().unwrap(), norm);
        }
        assert_eq!(
            "num-events".parse::<Normalization>().unwrap(),
            Normalization::NumEventsNormalization
        );
        assert!("bogus".parse::<Normalization>().is_err());
    }

    #[test]
    fn test_resolve() {
        let auto = Normalization::AutoSelect;
        assert_eq!(
            auto.resolve(Normalization::NumEventsNormalization),
            Normalization::NumEventsNormalization
        );
        assert_eq!(auto.resolve(auto), Normalization::VolumeNormalization);
        assert_eq!(
            Normalization::NoNormalization.resolve(Normalization::VolumeNormalization),
            Normalization::NoNormalization
        );
    }

    #[test]
    fn test_apply() {
        assert_relative_eq!(Normalization::NoNormalization.apply(6.0, 0.5, 3.0), 6.0);
        assert_relative_eq!(Normalization::VolumeNormalization.apply(6.0, 0.5, 3.0), 3.0);
        assert_relative_eq!(Normalization::NumEventsNormalization.apply(6.0, 0.5, 3.0), 2.0);
        assert!(Normalization::NumEventsNormalization
            .apply(6.0, 0.5, 0.0)
            .is_nan());
    }
}
