//! Generator load-torque control.
//!
//! Speed mode regulates sprocket speed with reverse PID action (more load
//! torque when running fast); power mode tracks electrical power with direct
//! action. After clamping, two overrides apply:
//!
//! - `|ω| < stall`: command forced to zero (clamped into range)
//! - `|ω| > overspeed`: command forced to `T_max`
//!
//! Both are reported as faults and neither is fatal.

use hl_controls::{ControlAction, PidController, PidState};
use tracing::{info, warn};

use crate::config::{GeneratorParams, GeneratorSetpoint};
use crate::error::SimResult;
use crate::faults::{Component, Fault, FaultKind};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorController {
    pub pid: PidController,
    pub setpoint: GeneratorSetpoint,
    pub stall_speed_rad_s: f64,
    pub overspeed_rad_s: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorState {
    pub pid: PidState,
    /// Last commanded torque (N·m).
    pub command_nm: f64,
    pub stalled: bool,
    pub overspeeding: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOutput {
    pub command_nm: f64,
    pub faults: Vec<Fault>,
}

impl GeneratorController {
    pub fn new(params: &GeneratorParams) -> SimResult<Self> {
        let action = match params.setpoint {
            GeneratorSetpoint::Speed { .. } => ControlAction::Reverse,
            GeneratorSetpoint::Power { .. } => ControlAction::Direct,
        };
        let mut pid = PidController::new(
            params.kp,
            params.ki,
            params.kd,
            params.torque_min_nm,
            params.torque_max_nm,
        )?
        .with_action(action);
        if let Some(limit) = params.integral_limit {
            pid = pid.with_integral_limit(limit);
        }
        Ok(Self {
            pid,
            setpoint: params.setpoint,
            stall_speed_rad_s: params.stall_speed_rad_s,
            overspeed_rad_s: params.overspeed_rad_s,
            efficiency: params.efficiency,
        })
    }

    /// Electrical output for a mechanical input power.
    pub fn electrical_power(&self, mechanical_w: f64) -> f64 {
        self.efficiency * mechanical_w
    }

    /// Compute the next torque command.
    ///
    /// `hold_integral` freezes the PID integral; the engine sets it while the
    /// clutch target is disengaged.
    pub fn update(
        &self,
        state: &GeneratorState,
        omega_rad_s: f64,
        electrical_power_w: f64,
        hold_integral: bool,
        dt: f64,
    ) -> (GeneratorState, GeneratorOutput) {
        let pv = match self.setpoint {
            GeneratorSetpoint::Speed { .. } => omega_rad_s,
            GeneratorSetpoint::Power { .. } => electrical_power_w,
        };
        let (pid, mut command) =
            self.pid
                .update(&state.pid, pv, self.setpoint.target(), dt, hold_integral);

        let speed = omega_rad_s.abs();
        let stalled = speed < self.stall_speed_rad_s;
        let overspeeding = speed > self.overspeed_rad_s;
        let mut faults = Vec::new();

        if stalled {
            command = self.pid.clamp_output(0.0, 0.0);
            faults.push(Fault::new(
                FaultKind::StallCondition,
                Component::Generator,
                format!("speed {speed:.3} rad/s below stall threshold"),
            ));
            if !state.stalled {
                info!(speed_rad_s = speed, "generator stalled; load torque released");
            }
        } else if overspeeding {
            command = self.pid.out_max;
            faults.push(Fault::new(
                FaultKind::OverspeedCondition,
                Component::Generator,
                format!("speed {speed:.3} rad/s above overspeed threshold"),
            ));
            if !state.overspeeding {
                warn!(speed_rad_s = speed, "generator overspeed; full load torque applied");
            }
        }

        let next = GeneratorState {
            pid,
            command_nm: command,
            stalled,
            overspeeding,
        };
        (
            next,
            GeneratorOutput {
                command_nm: command,
                faults,
            },
        )
    }
}
