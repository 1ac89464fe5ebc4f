//! Clutch pulse-and-coast control.
//!
//! The clutch decides a binary engagement target and slews the physical
//! engagement toward it. While the target is disengaged the chain and
//! flywheel run free and store kinetic energy; re-engaging lets the generator
//! draw it back out.

use hl_controls::{ActuatorState, DutyCycle, SlewActuator};
use tracing::debug;

use crate::config::{ClutchMode, ClutchParams};
use crate::error::SimResult;

#[derive(Debug, Clone, PartialEq)]
enum Policy {
    AlwaysEngaged,
    Duty(DutyCycle),
    Threshold { torque_nm: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClutchController {
    policy: Policy,
    pub actuator: SlewActuator,
    pub min_dwell_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClutchState {
    /// Physical engagement in `[0, 1]`.
    pub engagement: ActuatorState,
    pub target_engaged: bool,
    pub last_switch_s: Option<f64>,
    /// Start of the current duty cycle.
    pub cycle_start_s: f64,
}

impl Default for ClutchState {
    fn default() -> Self {
        Self {
            engagement: ActuatorState { position: 1.0 },
            target_engaged: true,
            last_switch_s: None,
            cycle_start_s: 0.0,
        }
    }
}

impl ClutchState {
    pub fn is_disengaged(&self) -> bool {
        !self.target_engaged
    }

    pub fn engagement(&self) -> f64 {
        self.engagement.position
    }

    /// Restart the duty-cycle timer at `now_s`.
    pub fn restart_cycle(&mut self, now_s: f64) {
        self.cycle_start_s = now_s;
    }
}

impl ClutchController {
    pub fn new(params: &ClutchParams) -> SimResult<Self> {
        let policy = match params.mode {
            ClutchMode::AlwaysEngaged => Policy::AlwaysEngaged,
            ClutchMode::DutyCycle { engaged_s, free_s } => {
                Policy::Duty(DutyCycle::new(engaged_s, free_s)?)
            }
            ClutchMode::Threshold { torque_nm } => Policy::Threshold { torque_nm },
        };
        Ok(Self {
            policy,
            actuator: SlewActuator::new(params.response_time_s)?,
            min_dwell_s: params.min_dwell_s,
        })
    }

    fn dwell_elapsed(&self, state: &ClutchState, now_s: f64) -> bool {
        state
            .last_switch_s
            .is_none_or(|t| now_s - t >= self.min_dwell_s)
    }

    /// Decide the engagement target and slew toward it.
    pub fn update(
        &self,
        state: &ClutchState,
        net_drive_torque_nm: f64,
        now_s: f64,
        dt: f64,
    ) -> ClutchState {
        let target = match &self.policy {
            Policy::AlwaysEngaged => true,
            Policy::Duty(duty) => duty.is_on(now_s - state.cycle_start_s),
            Policy::Threshold { torque_nm } => {
                let wanted = net_drive_torque_nm.abs() > *torque_nm;
                if wanted != state.target_engaged && self.dwell_elapsed(state, now_s) {
                    wanted
                } else {
                    state.target_engaged
                }
            }
        };

        let last_switch_s = if target != state.target_engaged {
            debug!(engaged = target, time_s = now_s, "clutch target switched");
            Some(now_s)
        } else {
            state.last_switch_s
        };

        let command = if target { 1.0 } else { 0.0 };
        ClutchState {
            engagement: self.actuator.step(&state.engagement, dt, command),
            target_engaged: target,
            last_switch_s,
            cycle_start_s: state.cycle_start_s,
        }
    }
}
