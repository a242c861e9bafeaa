//! Escalating recalculation requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much work the next build needs, cheapest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RebinningAction {
    /// The last product is still valid.
    #[default]
    NoRecalculation,
    /// Rebuild the mesh from cached geometry (threshold, clip or time changed).
    RecalculateVisualDataSetOnly,
    /// Re-derive geometry and rebuild everything.
    RecalculateAll,
}

impl fmt::Display for RebinningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoRecalculation => "NoRecalculation",
            Self::RecalculateVisualDataSetOnly => "RecalculateVisualDataSetOnly",
            Self::RecalculateAll => "RecalculateAll",
        };
        f.write_str(name)
    }
}

/// Remembers the most expensive action requested since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebinningActionManager {
    current: RebinningAction,
}

impl RebinningActionManager {
    /// Creates a manager with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalates to `requested` if it is more expensive than what is pending.
    pub fn ask(&mut self, requested: RebinningAction) {
        self.current = self.current.max(requested);
    }

    /// Pending action.
    #[must_use]
    pub fn action(&self) -> RebinningAction {
        self.current
    }

    /// Clears the pending action after a successful build.
    pub fn reset(&mut self) {
        self.current = RebinningAction::NoRecalculation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RebinningAction::{NoRecalculation, RecalculateAll, RecalculateVisualDataSetOnly};

    #[test]
    fn test_starts_clean() {
        assert_eq!(RebinningActionManager::new().action(), NoRecalculation);
    }

    #[test]
    fn test_escalation_is_maximum_of_window() {
        let sequences = [
            vec![RecalculateVisualDataSetOnly, RecalculateAll],
            vec![RecalculateAll, RecalculateVisualDataSetOnly],
            vec![NoRecalculation, RecalculateVisualDataSetOnly, NoRecalculation],
            vec![NoRecalculation],
            vec![],
        ];
        for sequence in sequences {
            let mut manager = RebinningActionManager::new();
            for &action in &sequence {
                manager.ask(action);
            }
            let expected = sequence.iter().copied().max().unwrap_or(NoRecalculation);
            assert_eq!(manager.action(), expected, "{sequence:?}");
            manager.reset();
            assert_eq!(manager.action(), NoRecalculation);
        }
    }

    #[test]
    fn test_clip_then_rebin_forces_full_recalculation() {
        let mut manager = RebinningActionManager::new();
        manager.ask(RecalculateVisualDataSetOnly);
        manager.ask(RecalculateAll);
        manager.ask(RecalculateVisualDataSetOnly);
        assert_eq!(manager.action(), RecalculateAll);
    }

    #[test]
    fn test_ordering() {
        assert!(NoRecalculation < RecalculateVisualDataSetOnly);
        assert!(RecalculateVisualDataSetOnly < RecalculateAll);
        assert_eq!(RecalculateAll.to_string(), "RecalculateAll");
    }
}
