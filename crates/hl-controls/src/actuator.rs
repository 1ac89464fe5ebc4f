//! Rate-limited actuator dynamics.
//!
//! Models a mechanical element (clutch plates, valve stem) that cannot jump
//! to its commanded position. Each step moves the position toward the
//! command by at most `dt / response_time`, so a full 0 → 1 stroke takes
//! `response_time` seconds.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// State of a rate-limited actuator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Current position [0, 1]
    pub position: f64,
}

/// Actuator with a fixed full-stroke time.
///
/// # Example
///
/// ```
/// use hl_controls::{ActuatorState, SlewActuator};
///
/// let actuator = SlewActuator::new(0.5).unwrap();
/// let mut state = ActuatorState { position: 0.0 };
///
/// for _ in 0..5 {
///     state = actuator.step(&state, 0.1, 1.0);
/// }
///
/// assert!((state.position - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlewActuator {
    /// Full-stroke time (seconds), must be positive
    pub response_time: f64,
}

impl SlewActuator {
    /// Create a new slew-limited actuator.
    ///
    /// # Errors
    ///
    /// Returns error if `response_time` is not positive.
    pub fn new(response_time: f64) -> ControlResult<Self> {
        if !(response_time.is_finite() && response_time > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "response_time must be positive",
            });
        }
        Ok(Self { response_time })
    }

    /// Largest position change allowed in one step of length `dt`.
    pub fn max_step(&self, dt: f64) -> f64 {
        (dt / self.response_time).max(0.0)
    }

    /// Advance actuator state by timestep `dt` given command input.
    ///
    /// The command is clamped to [0, 1]; the result never overshoots it.
    pub fn step(&self, state: &ActuatorState, dt: f64, command: f64) -> ActuatorState {
        let target = command.clamp(0.0, 1.0);
        let max_step = self.max_step(dt);
        let delta = (target - state.position).clamp(-max_step, max_step);
        ActuatorState {
            position: (state.position + delta).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_at_fixed_rate() {
        let act = SlewActuator::new(0.5).unwrap();
        let state = act.step(&ActuatorState::default(), 0.1, 1.0);
        assert!((state.position - 0.2).abs() < 1e-12);
    }

    #[test]
    fn does_not_overshoot() {
        let act = SlewActuator::new(0.1).unwrap();
        let state = act.step(&ActuatorState { position: 0.95 }, 0.1, 1.0);
        assert_eq!(state.position, 1.0);
        let state = act.step(&ActuatorState { position: 0.05 }, 0.1, 0.0);
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn command_is_clamped() {
        let act = SlewActuator::new(0.01).unwrap();
        let state = act.step(&ActuatorState { position: 0.5 }, 0.1, 2.0);
        assert_eq!(state.position, 1.0);
        let state = act.step(&ActuatorState { position: 0.5 }, 0.1, -1.0);
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn invalid_parameters() {
        assert!(SlewActuator::new(-0.1).is_err());
        assert!(SlewActuator::new(0.0).is_err());
        assert!(SlewActuator::new(f64::NAN).is_err());
    }
}
