//! Runtime parameter changes, applied at tick boundaries.

use serde::{Deserialize, Serialize};

use crate::config::{ClutchMode, ConfigResult, EngineConfig, GeneratorSetpoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterUpdate {
    GeneratorSetpoint { setpoint: GeneratorSetpoint },
    GeneratorGains { kp: f64, ki: f64, kd: f64 },
    TorqueLimits { min_nm: f64, max_nm: f64 },
    PressureBand { p_min_pa: f64, p_max_pa: f64 },
    ClutchMode { mode: ClutchMode },
    Timestep { dt_s: f64 },
}

impl ParameterUpdate {
    pub fn label(&self) -> &'static str {
        match self {
            Self::GeneratorSetpoint { .. } => "generator setpoint",
            Self::GeneratorGains { .. } => "generator gains",
            Self::TorqueLimits { .. } => "torque limits",
            Self::PressureBand { .. } => "pressure band",
            Self::ClutchMode { .. } => "clutch mode",
            Self::Timestep { .. } => "timestep",
        }
    }

    /// Apply to a copy of `config` and validate the result.
    ///
    /// `config` is untouched on error.
    pub fn applied_to(&self, config: &EngineConfig) -> ConfigResult<EngineConfig> {
        let mut next = config.clone();
        match *self {
            Self::GeneratorSetpoint { setpoint } => next.generator.setpoint = setpoint,
            Self::GeneratorGains { kp, ki, kd } => {
                next.generator.kp = kp;
                next.generator.ki = ki;
                next.generator.kd = kd;
            }
            Self::TorqueLimits { min_nm, max_nm } => {
                next.generator.torque_min_nm = min_nm;
                next.generator.torque_max_nm = max_nm;
            }
            Self::PressureBand { p_min_pa, p_max_pa } => {
                next.compressor.p_min_pa = p_min_pa;
                next.compressor.p_max_pa = p_max_pa;
            }
            Self::ClutchMode { mode } => next.clutch.mode = mode,
            Self::Timestep { dt_s } => next.timestep.dt_s = dt_s,
        }
        next.validate()?;
        Ok(next)
    }
}
