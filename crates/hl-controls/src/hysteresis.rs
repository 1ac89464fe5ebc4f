//! Two-threshold on/off control.
//!
//! The switch turns on when the measured value falls below `low` and off when
//! it reaches `high`. Inside the band the previous decision is held. A minimum
//! dwell time blocks any reversal that would come sooner than `min_dwell_s`
//! after the previous switch.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisSwitch {
    /// Turn-on threshold (exclusive).
    pub low: f64,
    /// Turn-off threshold (inclusive).
    pub high: f64,
    /// Minimum time between reversals (seconds).
    pub min_dwell_s: f64,
}

/// Memory of a hysteresis switch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchState {
    pub on: bool,
    /// Time of the most recent reversal; `None` if never switched.
    pub last_switch_s: Option<f64>,
}

impl SwitchState {
    pub fn with_on(on: bool) -> Self {
        Self {
            on,
            last_switch_s: None,
        }
    }

    fn switched(on: bool, now_s: f64) -> Self {
        Self {
            on,
            last_switch_s: Some(now_s),
        }
    }
}

impl HysteresisSwitch {
    /// # Errors
    ///
    /// Returns error if `low >= high` or the dwell is negative.
    pub fn new(low: f64, high: f64, min_dwell_s: f64) -> ControlResult<Self> {
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(ControlError::InvalidArg {
                what: "hysteresis band requires low < high",
            });
        }
        if !(min_dwell_s.is_finite() && min_dwell_s >= 0.0) {
            return Err(ControlError::InvalidArg {
                what: "min_dwell_s must be non-negative",
            });
        }
        Ok(Self {
            low,
            high,
            min_dwell_s,
        })
    }

    /// Whether the dwell time since the last reversal has elapsed.
    pub fn dwell_elapsed(&self, state: &SwitchState, now_s: f64) -> bool {
        match state.last_switch_s {
            Some(t) => now_s - t >= self.min_dwell_s,
            None => true,
        }
    }

    /// Evaluate the switch for one sample.
    pub fn update(&self, state: &SwitchState, value: f64, now_s: f64) -> SwitchState {
        if !value.is_finite() || !self.dwell_elapsed(state, now_s) {
            return state.clone();
        }
        if !state.on && value < self.low {
            SwitchState::switched(true, now_s)
        } else if state.on && value >= self.high {
            SwitchState::switched(false, now_s)
        } else {
            state.clone()
        }
    }

    /// Force the switch on regardless of band and dwell.
    pub fn force_on(&self, state: &SwitchState, now_s: f64) -> SwitchState {
        if state.on {
            state.clone()
        } else {
            SwitchState::switched(true, now_s)
        }
    }

    /// Force the switch off regardless of band and dwell.
    pub fn force_off(&self, state: &SwitchState, now_s: f64) -> SwitchState {
        if state.on {
            SwitchState::switched(false, now_s)
        } else {
            state.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_chatter_inside_band() {
        let sw = HysteresisSwitch::new(8.0e5, 10.0e5, 0.0).unwrap();
        let mut state = SwitchState::with_on(false);
        for (i, p) in [9.5e5, 9.0e5, 8.5e5, 8.0e5].into_iter().enumerate() {
            state = sw.update(&state, p, i as f64);
            assert!(!state.on, "must stay off at {p}");
        }
        state = sw.update(&state, 7.99e5, 5.0);
        assert!(state.on);
        for (i, p) in [8.5e5, 9.0e5, 9.99e5].into_iter().enumerate() {
            state = sw.update(&state, p, 6.0 + i as f64);
            assert!(state.on, "must stay on at {p}");
        }
        state = sw.update(&state, 10.0e5, 10.0);
        assert!(!state.on);
    }

    #[test]
    fn dwell_blocks_early_reversal() {
        let sw = HysteresisSwitch::new(1.0, 2.0, 5.0).unwrap();
        let state = sw.update(&SwitchState::with_on(false), 0.5, 0.0);
        assert!(state.on);
        let held = sw.update(&state, 3.0, 4.0);
        assert!(held.on, "dwell not yet elapsed");
        let off = sw.update(&held, 3.0, 5.0);
        assert!(!off.on);
    }

    #[test]
    fn force_on_ignores_dwell() {
        let sw = HysteresisSwitch::new(1.0, 2.0, 100.0).unwrap();
        let state = SwitchState::switched(false, 0.0);
        let forced = sw.force_on(&state, 0.1);
        assert!(forced.on);
        assert_eq!(forced.last_switch_s, Some(0.1));
    }

    #[test]
    fn force_off_records_switch_time() {
        let sw = HysteresisSwitch::new(1.0, 2.0, 100.0).unwrap();
        let state = SwitchState::switched(true, 0.0);
        let off = sw.force_off(&state, 0.2);
        assert!(!off.on);
        assert_eq!(off.last_switch_s, Some(0.2));
        assert_eq!(sw.force_off(&off, 0.3), off);
    }

    #[test]
    fn invalid_band() {
        assert!(HysteresisSwitch::new(2.0, 1.0, 0.0).is_err());
        assert!(HysteresisSwitch::new(1.0, 2.0, -1.0).is_err());
    }
}
