//! Engine configuration.
//!
//! One `EngineConfig` describes a whole plant. It is validated once when the
//! engine is built (and again for every queued parameter update); nothing
//! downstream re-checks ranges.

use hl_core::constants::{G0_MPS2, P_ATM_PA, RHO_WATER_KG_M3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Inconsistent parameters: {what}")]
    Inconsistent { what: &'static str },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub environment: EnvironmentParams,
    pub floaters: FloaterParams,
    pub drivetrain: DrivetrainParams,
    pub enhancements: Enhancements,
    pub generator: GeneratorParams,
    pub clutch: ClutchParams,
    pub compressor: CompressorParams,
    pub stability: StabilityLimits,
    pub timestep: TimestepParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentParams {
    pub rho_water_kg_m3: f64,
    pub gravity_m_s2: f64,
    /// Pressure at the water surface.
    pub ambient_pressure_pa: f64,
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            rho_water_kg_m3: RHO_WATER_KG_M3,
            gravity_m_s2: G0_MPS2,
            ambient_pressure_pa: P_ATM_PA,
        }
    }
}

impl EnvironmentParams {
    /// Absolute pressure at `depth_m` below the surface.
    pub fn hydrostatic_pressure(&self, depth_m: f64) -> f64 {
        self.ambient_pressure_pa + self.rho_water_kg_m3 * self.gravity_m_s2 * depth_m.max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloaterParams {
    pub count: u32,
    pub volume_m3: f64,
    pub container_mass_kg: f64,
    pub drag_coefficient: f64,
    pub frontal_area_m2: f64,
    pub fill_duration_s: f64,
    /// Fraction of the volume that completes a fill.
    pub fill_target_fraction: f64,
    /// Internal pressure that completes a fill.
    pub fill_target_pressure_pa: f64,
    pub vent_duration_s: f64,
    /// Time constant of the internal pressure decay while venting.
    pub vent_time_constant_s: f64,
    /// Internal-minus-ambient pressure below which venting is complete.
    pub vent_pressure_tolerance_pa: f64,
    /// Half-width of the injection and vent zones on the loop.
    pub zone_tolerance_rad: f64,
}

impl Default for FloaterParams {
    fn default() -> Self {
        Self {
            count: 8,
            volume_m3: 0.4,
            container_mass_kg: 8.0,
            drag_coefficient: 0.8,
            frontal_area_m2: 0.5,
            fill_duration_s: 2.0,
            fill_target_fraction: 1.0,
            fill_target_pressure_pa: 2.0e6,
            vent_duration_s: 1.5,
            vent_time_constant_s: 0.5,
            vent_pressure_tolerance_pa: 100.0,
            zone_tolerance_rad: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainParams {
    pub tank_height_m: f64,
    pub sprocket_radius_m: f64,
    pub chain_mass_kg: f64,
    /// Sprocket, shaft and generator rotor inertia.
    pub base_inertia_kg_m2: f64,
    pub flywheel_inertia_kg_m2: f64,
    pub flywheel_enabled: bool,
    /// Viscous bearing and chain friction (N per m/s).
    pub bearing_friction_n_s_m: f64,
}

impl Default for DrivetrainParams {
    fn default() -> Self {
        Self {
            tank_height_m: 10.0,
            sprocket_radius_m: 1.0,
            chain_mass_kg: 200.0,
            base_inertia_kg_m2: 50.0,
            flywheel_inertia_kg_m2: 500.0,
            flywheel_enabled: true,
            bearing_friction_n_s_m: 50.0,
        }
    }
}

/// Multiplicative corrections applied inside the force equations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enhancements {
    /// Fractional drag reduction in `[0, 1)`.
    pub drag_reduction: f64,
    /// Buoyancy multiplier, `>= 1`.
    pub thermal_boost: f64,
}

impl Default for Enhancements {
    fn default() -> Self {
        Self {
            drag_reduction: 0.0,
            thermal_boost: 1.0,
        }
    }
}

/// What the generator controller regulates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorSetpoint {
    Speed { target_rad_s: f64 },
    Power { target_w: f64 },
}

impl GeneratorSetpoint {
    pub fn target(&self) -> f64 {
        match *self {
            Self::Speed { target_rad_s } => target_rad_s,
            Self::Power { target_w } => target_w,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorParams {
    pub setpoint: GeneratorSetpoint,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_limit: Option<f64>,
    pub torque_min_nm: f64,
    pub torque_max_nm: f64,
    pub stall_speed_rad_s: f64,
    pub overspeed_rad_s: f64,
    pub efficiency: f64,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            setpoint: GeneratorSetpoint::Speed { target_rad_s: 2.0 },
            kp: 15_000.0,
            ki: 4_000.0,
            kd: 0.0,
            integral_limit: None,
            torque_min_nm: 0.0,
            torque_max_nm: 40_000.0,
            stall_speed_rad_s: 0.2,
            overspeed_rad_s: 5.0,
            efficiency: 0.92,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClutchMode {
    AlwaysEngaged,
    /// Engaged for `engaged_s`, then free for `free_s`, repeating.
    DutyCycle { engaged_s: f64, free_s: f64 },
    /// Engaged while the net drive torque magnitude exceeds `torque_nm`.
    Threshold { torque_nm: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClutchParams {
    pub mode: ClutchMode,
    /// Full-stroke engagement time.
    pub response_time_s: f64,
    pub min_dwell_s: f64,
}

impl Default for ClutchParams {
    fn default() -> Self {
        Self {
            mode: ClutchMode::DutyCycle {
                engaged_s: 4.0,
                free_s: 1.0,
            },
            response_time_s: 0.3,
            min_dwell_s: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    pub p_min_pa: f64,
    pub p_max_pa: f64,
    pub p_max_safety_pa: f64,
    pub initial_pressure_pa: f64,
    pub initially_active: bool,
    /// Pressure rise while the compressor runs.
    pub compressor_rate_pa_s: f64,
    /// Pressure drop while any injection valve is open.
    pub injection_rate_pa_s: f64,
    pub compressor_power_w: f64,
    pub min_dwell_s: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            p_min_pa: 8.0e5,
            p_max_pa: 10.0e5,
            p_max_safety_pa: 12.0e5,
            initial_pressure_pa: 9.0e5,
            initially_active: false,
            compressor_rate_pa_s: 3.0e4,
            injection_rate_pa_s: 2.0e4,
            compressor_power_w: 15_000.0,
            min_dwell_s: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityLimits {
    pub v_max_m_s: f64,
    /// Velocities above this are zeroed rather than clamped.
    pub v_hard_limit_m_s: f64,
    pub a_max_m_s2: f64,
    pub f_max_n: f64,
    /// Consecutive faulty ticks a component may accumulate before halting.
    pub max_consecutive_faults: u32,
}

impl Default for StabilityLimits {
    fn default() -> Self {
        Self {
            v_max_m_s: 10.0,
            v_hard_limit_m_s: 20.0,
            a_max_m_s2: 50.0,
            f_max_n: 1.0e6,
            max_consecutive_faults: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestepParams {
    /// Nominal tick length (simulated seconds).
    pub dt_s: f64,
    pub dt_min_s: f64,
    pub dt_max_s: f64,
    pub adaptive: bool,
    /// Wall-clock budget per tick when adaptive.
    pub target_frame_time_s: f64,
}

impl Default for TimestepParams {
    fn default() -> Self {
        Self {
            dt_s: 0.1,
            dt_min_s: 0.005,
            dt_max_s: 0.2,
            adaptive: false,
            target_frame_time_s: 0.01,
        }
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be positive",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be non-negative",
        })
    }
}

fn finite(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be finite",
        })
    }
}

fn in_range(field: &'static str, value: f64, lo: f64, hi: f64) -> ConfigResult<()> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "out of allowed range",
        })
    }
}

impl EngineConfig {
    /// Check every field; the first violation is returned.
    pub fn validate(&self) -> ConfigResult<()> {
        let env = &self.environment;
        positive("environment.rho_water_kg_m3", env.rho_water_kg_m3)?;
        positive("environment.gravity_m_s2", env.gravity_m_s2)?;
        non_negative("environment.ambient_pressure_pa", env.ambient_pressure_pa)?;

        let fl = &self.floaters;
        if fl.count == 0 {
            return Err(ConfigError::Inconsistent {
                what: "at least one floater is required",
            });
        }
        positive("floaters.volume_m3", fl.volume_m3)?;
        positive("floaters.container_mass_kg", fl.container_mass_kg)?;
        non_negative("floaters.drag_coefficient", fl.drag_coefficient)?;
        non_negative("floaters.frontal_area_m2", fl.frontal_area_m2)?;
        positive("floaters.fill_duration_s", fl.fill_duration_s)?;
        in_range("floaters.fill_target_fraction", fl.fill_target_fraction, 1e-6, 1.0)?;
        positive("floaters.fill_target_pressure_pa", fl.fill_target_pressure_pa)?;
        positive("floaters.vent_duration_s", fl.vent_duration_s)?;
        positive("floaters.vent_time_constant_s", fl.vent_time_constant_s)?;
        non_negative(
            "floaters.vent_pressure_tolerance_pa",
            fl.vent_pressure_tolerance_pa,
        )?;
        in_range(
            "floaters.zone_tolerance_rad",
            fl.zone_tolerance_rad,
            1e-6,
            std::f64::consts::FRAC_PI_2,
        )?;

        let dr = &self.drivetrain;
        positive("drivetrain.tank_height_m", dr.tank_height_m)?;
        positive("drivetrain.sprocket_radius_m", dr.sprocket_radius_m)?;
        non_negative("drivetrain.chain_mass_kg", dr.chain_mass_kg)?;
        non_negative("drivetrain.base_inertia_kg_m2", dr.base_inertia_kg_m2)?;
        non_negative("drivetrain.flywheel_inertia_kg_m2", dr.flywheel_inertia_kg_m2)?;
        non_negative("drivetrain.bearing_friction_n_s_m", dr.bearing_friction_n_s_m)?;

        let enh = &self.enhancements;
        if !(enh.drag_reduction.is_finite() && (0.0..1.0).contains(&enh.drag_reduction)) {
            return Err(ConfigError::InvalidValue {
                field: "enhancements.drag_reduction",
                value: enh.drag_reduction,
                reason: "must lie in [0, 1)",
            });
        }
        in_range("enhancements.thermal_boost", enh.thermal_boost, 1.0, 2.0)?;

        self.validate_generator()?;
        self.validate_clutch()?;
        self.validate_compressor()?;

        let st = &self.stability;
        positive("stability.v_max_m_s", st.v_max_m_s)?;
        positive("stability.a_max_m_s2", st.a_max_m_s2)?;
        positive("stability.f_max_n", st.f_max_n)?;
        if !(st.v_hard_limit_m_s.is_finite() && st.v_hard_limit_m_s >= st.v_max_m_s) {
            return Err(ConfigError::Inconsistent {
                what: "v_hard_limit_m_s must be at least v_max_m_s",
            });
        }
        if st.max_consecutive_faults == 0 {
            return Err(ConfigError::Inconsistent {
                what: "max_consecutive_faults must be at least 1",
            });
        }

        let ts = &self.timestep;
        positive("timestep.dt_min_s", ts.dt_min_s)?;
        positive("timestep.dt_max_s", ts.dt_max_s)?;
        positive("timestep.target_frame_time_s", ts.target_frame_time_s)?;
        if ts.dt_min_s > ts.dt_max_s {
            return Err(ConfigError::Inconsistent {
                what: "dt_min_s must not exceed dt_max_s",
            });
        }
        if !(ts.dt_s.is_finite() && ts.dt_s >= ts.dt_min_s && ts.dt_s <= ts.dt_max_s) {
            return Err(ConfigError::InvalidValue {
                field: "timestep.dt_s",
                value: ts.dt_s,
                reason: "must lie in [dt_min_s, dt_max_s]",
            });
        }

        Ok(())
    }

    pub(crate) fn validate_generator(&self) -> ConfigResult<()> {
        let g = &self.generator;
        match g.setpoint {
            GeneratorSetpoint::Speed { target_rad_s } => {
                positive("generator.setpoint.target_rad_s", target_rad_s)?
            }
            GeneratorSetpoint::Power { target_w } => {
                non_negative("generator.setpoint.target_w", target_w)?
            }
        }
        finite("generator.kp", g.kp)?;
        finite("generator.ki", g.ki)?;
        finite("generator.kd", g.kd)?;
        if let Some(limit) = g.integral_limit {
            positive("generator.integral_limit", limit)?;
        }
        non_negative("generator.torque_min_nm", g.torque_min_nm)?;
        positive("generator.torque_max_nm", g.torque_max_nm)?;
        if g.torque_min_nm >= g.torque_max_nm {
            return Err(ConfigError::Inconsistent {
                what: "torque_min_nm must be less than torque_max_nm",
            });
        }
        non_negative("generator.stall_speed_rad_s", g.stall_speed_rad_s)?;
        positive("generator.overspeed_rad_s", g.overspeed_rad_s)?;
        if g.stall_speed_rad_s >= g.overspeed_rad_s {
            return Err(ConfigError::Inconsistent {
                what: "stall_speed_rad_s must be below overspeed_rad_s",
            });
        }
        in_range("generator.efficiency", g.efficiency, 1e-6, 1.0)?;
        Ok(())
    }

    pub(crate) fn validate_clutch(&self) -> ConfigResult<()> {
        let c = &self.clutch;
        positive("clutch.response_time_s", c.response_time_s)?;
        non_negative("clutch.min_dwell_s", c.min_dwell_s)?;
        match c.mode {
            ClutchMode::AlwaysEngaged => {}
            ClutchMode::DutyCycle { engaged_s, free_s } => {
                non_negative("clutch.mode.engaged_s", engaged_s)?;
                non_negative("clutch.mode.free_s", free_s)?;
                if engaged_s + free_s <= 0.0 {
                    return Err(ConfigError::Inconsistent {
                        what: "clutch duty cycle period must be positive",
                    });
                }
            }
            ClutchMode::Threshold { torque_nm } => {
                non_negative("clutch.mode.torque_nm", torque_nm)?
            }
        }
        Ok(())
    }

    pub(crate) fn validate_compressor(&self) -> ConfigResult<()> {
        let c = &self.compressor;
        positive("compressor.p_min_pa", c.p_min_pa)?;
        positive("compressor.p_max_pa", c.p_max_pa)?;
        positive("compressor.p_max_safety_pa", c.p_max_safety_pa)?;
        if !(c.p_min_pa < c.p_max_pa && c.p_max_pa <= c.p_max_safety_pa) {
            return Err(ConfigError::Inconsistent {
                what: "pressures must satisfy p_min < p_max <= p_max_safety",
            });
        }
        in_range(
            "compressor.initial_pressure_pa",
            c.initial_pressure_pa,
            0.0,
            c.p_max_safety_pa,
        )?;
        non_negative("compressor.compressor_rate_pa_s", c.compressor_rate_pa_s)?;
        non_negative("compressor.injection_rate_pa_s", c.injection_rate_pa_s)?;
        non_negative("compressor.compressor_power_w", c.compressor_power_w)?;
        non_negative("compressor.min_dwell_s", c.min_dwell_s)?;
        Ok(())
    }

    /// Non-fatal configuration findings.
    ///
    /// These describe settings the engine will honour but that defeat a
    /// protection (for example a duty-cycle interval shorter than the minimum
    /// dwell).
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let c = &self.clutch;
        if let ClutchMode::DutyCycle { engaged_s, free_s } = c.mode {
            if engaged_s < c.min_dwell_s {
                out.push(format!(
                    "clutch engaged interval {engaged_s} s is shorter than min dwell {} s",
                    c.min_dwell_s
                ));
            }
            if free_s < c.min_dwell_s {
                out.push(format!(
                    "clutch free interval {free_s} s is shorter than min dwell {} s",
                    c.min_dwell_s
                ));
            }
            if engaged_s + free_s < 2.0 * c.response_time_s {
                out.push(format!(
                    "clutch period {} s cannot complete a full stroke each way ({} s response)",
                    engaged_s + free_s,
                    c.response_time_s
                ));
            }
        }
        let comp = &self.compressor;
        if comp.min_dwell_s > 0.0 && comp.compressor_rate_pa_s > 0.0 {
            let band_fill_s = (comp.p_max_pa - comp.p_min_pa) / comp.compressor_rate_pa_s;
            if band_fill_s < comp.min_dwell_s {
                out.push(format!(
                    "compressor crosses its pressure band in {band_fill_s:.2} s, below min dwell {} s",
                    comp.min_dwell_s
                ));
            }
        }
        if self.timestep.dt_s > self.floaters.fill_duration_s {
            out.push("tick length exceeds fill duration; fills complete in one tick".to_string());
        }
        out
    }

    /// Number of floaters, as a length.
    pub fn floater_count(&self) -> usize {
        self.floaters.count as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert!(cfg.warnings().is_empty(), "{:?}", cfg.warnings());
    }

    #[test]
    fn rejects_inverted_pressure_band() {
        let mut cfg = EngineConfig::default();
        cfg.compressor.p_min_pa = 11.0e5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Inconsistent { .. })
        ));
    }

    #[test]
    fn rejects_dt_outside_bounds() {
        let mut cfg = EngineConfig::default();
        cfg.timestep.dt_s = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_floaters() {
        let mut cfg = EngineConfig::default();
        cfg.floaters.count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_nan_gain() {
        let mut cfg = EngineConfig::default();
        cfg.generator.kp = f64::NAN;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("generator.kp"));
    }

    #[test]
    fn short_duty_interval_is_a_warning_not_an_error() {
        let mut cfg = EngineConfig::default();
        cfg.clutch.mode = ClutchMode::DutyCycle {
            engaged_s: 2.0,
            free_s: 0.1,
        };
        cfg.validate().unwrap();
        let warnings = cfg.warnings();
        assert!(warnings.iter().any(|w| w.contains("free interval")));
    }

    #[test]
    fn hydrostatic_pressure_grows_with_depth() {
        let env = EnvironmentParams::default();
        assert_eq!(env.hydrostatic_pressure(0.0), P_ATM_PA);
        assert!((env.hydrostatic_pressure(10.0) - (P_ATM_PA + 98_100.0)).abs() < 1e-6);
    }
}
