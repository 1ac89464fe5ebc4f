//! Fixed on/off timing for periodic actuation.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Repeating cycle: `on_s` seconds on, then `off_s` seconds off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DutyCycle {
    pub on_s: f64,
    pub off_s: f64,
}

impl DutyCycle {
    /// # Errors
    ///
    /// Returns error if either interval is negative or both are zero.
    pub fn new(on_s: f64, off_s: f64) -> ControlResult<Self> {
        if !(on_s.is_finite() && off_s.is_finite()) || on_s < 0.0 || off_s < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "duty cycle intervals must be non-negative",
            });
        }
        if on_s + off_s <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "duty cycle period must be positive",
            });
        }
        Ok(Self { on_s, off_s })
    }

    pub fn period(&self) -> f64 {
        self.on_s + self.off_s
    }

    /// Whether the cycle is in its on interval at `phase_s` seconds.
    pub fn is_on(&self, phase_s: f64) -> bool {
        phase_s.rem_euclid(self.period()) < self.on_s
    }
}
