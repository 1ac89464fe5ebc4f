//! Discrete PID controller.
//!
//! The controller is a pure function of its configuration, its state and the
//! current sample:
//!
//! ```text
//! error      = sp - pv            (direct action)
//! error      = pv - sp            (reverse action)
//! integral  += error * dt         (unless held)
//! derivative = (error - prev_error) / dt
//! output     = kp*error + ki*integral + kd*derivative
//! ```
//!
//! The output is always clamped to `[out_min, out_max]`, including for
//! non-finite intermediate values.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Which sign of error increases the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    /// Output rises when the process variable is below setpoint.
    #[default]
    Direct,
    /// Output rises when the process variable is above setpoint.
    Reverse,
}

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (1/s).
    pub ki: f64,
    /// Derivative gain (s).
    pub kd: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
    /// Controller action.
    pub action: ControlAction,
    /// Integral windup limit (optional), applied symmetrically.
    pub integral_limit: Option<f64>,
}

impl PidController {
    /// Create a new PID controller.
    ///
    /// # Errors
    ///
    /// Returns error if a gain is non-finite or `out_min >= out_max`.
    pub fn new(kp: f64, ki: f64, kd: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        if !(kp.is_finite() && ki.is_finite() && kd.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "PID gains must be finite",
            });
        }
        if !(out_min.is_finite() && out_max.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "output limits must be finite",
            });
        }
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            ki,
            kd,
            out_min,
            out_max,
            action: ControlAction::Direct,
            integral_limit: None,
        })
    }

    pub fn with_action(mut self, action: ControlAction) -> Self {
        self.action = action;
        self
    }

    /// Set integral windup limit.
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit.abs());
        self
    }

    /// Clamp a value into the output range, mapping non-finite values to a bound.
    pub fn clamp_output(&self, value: f64, fallback: f64) -> f64 {
        if value.is_nan() {
            return fallback.clamp(self.out_min, self.out_max);
        }
        value.clamp(self.out_min, self.out_max)
    }

    /// Compute controller output given process variable and setpoint.
    ///
    /// When `hold_integral` is true the integral accumulator is carried over
    /// unchanged; the proportional and derivative paths still run.
    ///
    /// # Returns
    ///
    /// Updated state and clamped output value.
    pub fn update(
        &self,
        state: &PidState,
        pv: f64,
        sp: f64,
        dt: f64,
        hold_integral: bool,
    ) -> (PidState, f64) {
        let error = match self.action {
            ControlAction::Direct => sp - pv,
            ControlAction::Reverse => pv - sp,
        };

        let integral = if hold_integral || dt.is_nan() || dt <= 0.0 || !error.is_finite() {
            state.integral
        } else {
            let raw = state.integral + error * dt;
            let limited = match self.integral_limit {
                Some(limit) => raw.clamp(-limit, limit),
                None => raw,
            };
            if limited.is_finite() {
                limited
            } else {
                state.integral
            }
        };

        let derivative = match state.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };

        let output_raw = self.kp * error + self.ki * integral + self.kd * derivative;
        let output = self.clamp_output(output_raw, state.output);

        // Conditional integration: a saturated output must not keep winding up
        let integral = if !hold_integral && output != output_raw {
            let pushing_further = (output >= self.out_max && error * self.ki > 0.0)
                || (output <= self.out_min && error * self.ki < 0.0);
            if pushing_further {
                state.integral
            } else {
                integral
            }
        } else {
            integral
        };

        let new_state = PidState {
            integral,
            prev_error: if error.is_finite() {
                Some(error)
            } else {
                state.prev_error
            },
            output,
        };

        (new_state, output)
    }
}

/// PID controller state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PidState {
    /// Integral accumulator.
    pub integral: f64,
    /// Error at the previous sample; `None` before the first sample.
    pub prev_error: Option<f64>,
    /// Last clamped output.
    pub output: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_controller_creation() {
        let pid = PidController::new(1.0, 2.0, 0.5, 0.0, 1.0).unwrap();
        assert_eq!(pid.kp, 1.0);
        assert_eq!(pid.ki, 2.0);
        assert_eq!(pid.action, ControlAction::Direct);
    }

    #[test]
    fn proportional_only() {
        let pid = PidController::new(2.0, 0.0, 0.0, -10.0, 10.0).unwrap();
        let (_, output) = pid.update(&PidState::default(), 0.5, 1.0, 0.1, false);
        assert!((output - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reverse_action_flips_error() {
        let pid = PidController::new(2.0, 0.0, 0.0, -10.0, 10.0)
            .unwrap()
            .with_action(ControlAction::Reverse);
        let (_, output) = pid.update(&PidState::default(), 1.5, 1.0, 0.1, false);
        assert!((output - 1.0).abs() < 1e-12);
    }

    #[test]
    fn integral_accumulates() {
        let pid = PidController::new(0.0, 1.0, 0.0, -10.0, 10.0).unwrap();
        let mut state = PidState::default();
        for _ in 0..10 {
            let (next, _) = pid.update(&state, 0.0, 1.0, 0.1, false);
            state = next;
        }
        assert!((state.integral - 1.0).abs() < 1e-9);
    }

    #[test]
    fn held_integral_is_unchanged() {
        let pid = PidController::new(1.0, 1.0, 0.0, -10.0, 10.0).unwrap();
        let state = PidState {
            integral: 0.7,
            prev_error: Some(0.2),
            output: 0.0,
        };
        let (next, _) = pid.update(&state, 0.0, 5.0, 0.1, true);
        assert_eq!(next.integral, 0.7);
        assert_eq!(next.prev_error, Some(5.0));
    }

    #[test]
    fn derivative_uses_previous_error() {
        let pid = PidController::new(0.0, 0.0, 1.0, -100.0, 100.0).unwrap();
        let (s1, out1) = pid.update(&PidState::default(), 0.0, 1.0, 0.1, false);
        assert_eq!(out1, 0.0, "no derivative kick on first sample");
        let (_, out2) = pid.update(&s1, 0.0, 2.0, 0.1, false);
        assert!((out2 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn output_clamping() {
        let pid = PidController::new(10.0, 1.0, 0.0, 0.0, 1.0).unwrap();
        let (_, output) = pid.update(&PidState::default(), 0.0, 10.0, 0.1, false);
        assert_eq!(output, 1.0);
    }

    #[test]
    fn saturated_output_stops_windup() {
        let pid = PidController::new(1.0, 1.0, 0.0, 0.0, 1.0).unwrap();
        let mut state = PidState::default();
        for _ in 0..100 {
            let (next, _) = pid.update(&state, 0.0, 100.0, 0.1, false);
            state = next;
        }
        assert_eq!(state.integral, 0.0);
    }

    #[test]
    fn nan_input_holds_previous_output() {
        let pid = PidController::new(1.0, 1.0, 1.0, -1.0, 1.0).unwrap();
        let state = PidState {
            integral: 0.0,
            prev_error: Some(0.0),
            output: 0.25,
        };
        let (next, output) = pid.update(&state, f64::NAN, 0.0, 0.1, false);
        assert_eq!(output, 0.25);
        assert_eq!(next.integral, 0.0);
    }

    #[test]
    fn invalid_controller_params() {
        assert!(PidController::new(1.0, 1.0, 0.0, 1.0, 0.0).is_err());
        assert!(PidController::new(f64::NAN, 1.0, 0.0, 0.0, 1.0).is_err());
        assert!(PidController::new(1.0, 1.0, 0.0, 0.0, f64::INFINITY).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn adversarial() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1e300_f64..1e300_f64,
            Just(f64::MAX),
            Just(f64::MIN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(f64::NAN),
            -10.0_f64..10.0_f64,
        ]
    }

    proptest! {
        #[test]
        fn output_always_within_limits(
            kp in -1e6_f64..1e6,
            ki in -1e6_f64..1e6,
            kd in -1e6_f64..1e6,
            errors in prop::collection::vec(adversarial(), 1..64),
            dt in prop_oneof![1e-9_f64..1.0, Just(0.0)],
            hold in any::<bool>(),
        ) {
            let pid = PidController::new(kp, ki, kd, -500.0, 2_000.0).unwrap();
            let mut state = PidState::default();
            for pv in errors {
                let (next, output) = pid.update(&state, pv, 0.0, dt, hold);
                prop_assert!((-500.0..=2_000.0).contains(&output), "output {output} out of range");
                prop_assert!(next.output == output);
                state = next;
            }
        }
    }
}
