//! Fault classification and the consecutive-fault retry budget.
//!
//! Faults are recoverable by default: the phase that detects one corrects
//! the offending value locally and reports it here. The tracker only decides
//! whether a component has been failing for too long to keep going.

use std::collections::BTreeMap;
use std::fmt;

use hl_core::FloaterId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Non-finite or out-of-range force, velocity or acceleration.
    InvalidState,
    /// Position outside the tank or pressure outside `[0, P_max_safety]`.
    OutOfBounds,
    StallCondition,
    OverspeedCondition,
    /// A floater's mass disagrees with its declared state.
    SensorInconsistency,
}

impl FaultKind {
    /// Stall and overspeed are handled by the generator overrides and never
    /// count against the retry budget.
    pub fn counts_toward_budget(self) -> bool {
        !matches!(self, Self::StallCondition | Self::OverspeedCondition)
    }

    /// Whether recovery from this fault shortens the next step.
    pub fn requires_cutback(self) -> bool {
        matches!(self, Self::InvalidState | Self::OutOfBounds)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidState => "InvalidState",
            Self::OutOfBounds => "OutOfBounds",
            Self::StallCondition => "StallCondition",
            Self::OverspeedCondition => "OverspeedCondition",
            Self::SensorInconsistency => "SensorInconsistency",
        };
        f.write_str(name)
    }
}

/// Part of the plant that raised a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Component {
    Physics,
    Tank,
    Floater(FloaterId),
    Generator,
    Clutch,
    Compressor,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physics => f.write_str("physics"),
            Self::Tank => f.write_str("tank"),
            Self::Floater(id) => write!(f, "floater {id}"),
            Self::Generator => f.write_str("generator"),
            Self::Clutch => f.write_str("clutch"),
            Self::Compressor => f.write_str("compressor"),
        }
    }
}

/// One detected-and-corrected fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub component: Component,
    /// What was corrected, for logs.
    pub detail: String,
}

impl Fault {
    pub fn new(kind: FaultKind, component: Component, detail: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            detail: detail.into(),
        }
    }
}

/// Budget exhaustion reported by [`FaultTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded {
    pub component: Component,
    pub kind: FaultKind,
    pub count: u32,
}

/// Counts consecutive faulty ticks per component.
#[derive(Debug, Clone, Default)]
pub struct FaultTracker {
    max_consecutive: u32,
    streaks: BTreeMap<Component, (u32, FaultKind)>,
}

impl FaultTracker {
    pub fn new(max_consecutive: u32) -> Self {
        Self {
            max_consecutive,
            streaks: BTreeMap::new(),
        }
    }

    /// Record one tick's faults.
    ///
    /// Components without a counted fault this tick have their streak reset.
    /// Returns the first component whose streak exceeds the budget.
    pub fn observe(&mut self, faults: &[Fault]) -> Option<BudgetExceeded> {
        let mut tripped: BTreeMap<Component, FaultKind> = BTreeMap::new();
        for fault in faults.iter().filter(|f| f.kind.counts_toward_budget()) {
            tripped.entry(fault.component).or_insert(fault.kind);
        }

        self.streaks
            .retain(|component, _| tripped.contains_key(component));

        let mut exceeded = None;
        for (component, kind) in tripped {
            let entry = self.streaks.entry(component).or_insert((0, kind));
            entry.0 += 1;
            entry.1 = kind;
            if entry.0 > self.max_consecutive && exceeded.is_none() {
                exceeded = Some(BudgetExceeded {
                    component,
                    kind,
                    count: entry.0,
                });
            }
        }
        exceeded
    }

    /// Current streak for a component.
    pub fn streak(&self, component: Component) -> u32 {
        self.streaks.get(&component).map_or(0, |(n, _)| *n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(component: Component) -> Fault {
        Fault::new(FaultKind::InvalidState, component, "test")
    }

    #[test]
    fn budget_trips_after_n_consecutive() {
        let mut tracker = FaultTracker::new(3);
        for _ in 0..3 {
            assert!(tracker.observe(&[invalid(Component::Physics)]).is_none());
        }
        let exceeded = tracker.observe(&[invalid(Component::Physics)]).unwrap();
        assert_eq!(exceeded.component, Component::Physics);
        assert_eq!(exceeded.count, 4);
    }

    #[test]
    fn clean_tick_resets_streak() {
        let mut tracker = FaultTracker::new(2);
        tracker.observe(&[invalid(Component::Tank)]);
        tracker.observe(&[invalid(Component::Tank)]);
        tracker.observe(&[]);
        assert_eq!(tracker.streak(Component::Tank), 0);
        assert!(tracker.observe(&[invalid(Component::Tank)]).is_none());
    }

    #[test]
    fn stall_never_counts() {
        let mut tracker = FaultTracker::new(1);
        let stall = Fault::new(FaultKind::StallCondition, Component::Generator, "slow");
        for _ in 0..10 {
            assert!(tracker.observe(std::slice::from_ref(&stall)).is_none());
        }
        assert_eq!(tracker.streak(Component::Generator), 0);
    }

    #[test]
    fn components_tracked_independently() {
        let mut tracker = FaultTracker::new(5);
        let a = Component::Floater(FloaterId::from_index(0));
        let b = Component::Floater(FloaterId::from_index(1));
        tracker.observe(&[invalid(a), invalid(b)]);
        tracker.observe(&[invalid(a)]);
        assert_eq!(tracker.streak(a), 2);
        assert_eq!(tracker.streak(b), 0);
    }
}
