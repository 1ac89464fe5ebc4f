//! Floater data and the mass/state invariant.

use hl_core::FloaterId;
use serde::{Deserialize, Serialize};

use crate::config::{EnvironmentParams, FloaterParams};

/// Fill-cycle state of a floater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloaterState {
    /// Water-filled (heavy).
    Empty,
    /// Injection valve open, air displacing water.
    Filling,
    /// Air-filled (buoyant).
    Full,
    /// Vent valve open, water displacing air.
    Venting,
}

impl FloaterState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Filling => "filling",
            Self::Full => "full",
            Self::Venting => "venting",
        }
    }
}

/// One chamber on the chain loop.
///
/// Positional fields are written by the physics phase; `state`, fill and
/// `mass_kg` only by the floater cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Floater {
    pub id: FloaterId,
    /// Height above the tank floor (m), `0..tank_height`.
    pub position_m: f64,
    /// Vertical velocity (m/s), positive upward.
    pub velocity_m_s: f64,
    /// Angle on the loop (rad): 0 at the bottom, π at the top.
    pub phase_rad: f64,
    /// Loop angle before the most recent physics step.
    pub prev_phase_rad: f64,
    pub state: FloaterState,
    /// Fraction of the volume occupied by air, `[0, 1]`.
    pub air_fill_level: f64,
    pub mass_kg: f64,
    pub internal_pressure_pa: f64,
    pub fill_started_s: Option<f64>,
    pub vent_started_s: Option<f64>,
    /// Internal pressure when venting began.
    pub vent_start_pressure_pa: f64,
    pub injected_volume_m3: f64,
    pub vented_volume_m3: f64,
}

impl Floater {
    /// Create a floater in `state` with the fill level that state implies.
    pub fn new(
        id: FloaterId,
        state: FloaterState,
        params: &FloaterParams,
        env: &EnvironmentParams,
    ) -> Self {
        let air_fill_level = match state {
            FloaterState::Full => 1.0,
            _ => 0.0,
        };
        Self {
            id,
            position_m: 0.0,
            velocity_m_s: 0.0,
            phase_rad: 0.0,
            prev_phase_rad: 0.0,
            state,
            air_fill_level,
            mass_kg: mass_for_fill(air_fill_level, params, env),
            internal_pressure_pa: env.ambient_pressure_pa,
            fill_started_s: None,
            vent_started_s: None,
            vent_start_pressure_pa: env.ambient_pressure_pa,
            injected_volume_m3: 0.0,
            vented_volume_m3: 0.0,
        }
    }

    /// Mass implied by the declared state and fill level.
    pub fn expected_mass(&self, params: &FloaterParams, env: &EnvironmentParams) -> f64 {
        let fill = match self.state {
            FloaterState::Full => 1.0,
            FloaterState::Empty => 0.0,
            FloaterState::Filling | FloaterState::Venting => self.air_fill_level,
        };
        mass_for_fill(fill, params, env)
    }

    /// Whether fill level and mass agree with the declared state.
    pub fn is_consistent(&self, params: &FloaterParams, env: &EnvironmentParams) -> bool {
        let fill_ok = match self.state {
            FloaterState::Full => self.air_fill_level == 1.0,
            FloaterState::Empty => self.air_fill_level == 0.0,
            FloaterState::Filling | FloaterState::Venting => {
                (0.0..=1.0).contains(&self.air_fill_level)
            }
        };
        let expected = self.expected_mass(params, env);
        fill_ok && (self.mass_kg - expected).abs() <= 1e-9 * expected.max(1.0)
    }

    /// Force fill level and mass back onto the declared state.
    ///
    /// Returns the previous mass.
    pub fn resync(&mut self, params: &FloaterParams, env: &EnvironmentParams) -> f64 {
        let previous = self.mass_kg;
        self.air_fill_level = match self.state {
            FloaterState::Full => 1.0,
            FloaterState::Empty => 0.0,
            _ => {
                if self.air_fill_level.is_finite() {
                    self.air_fill_level.clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
        };
        self.mass_kg = mass_for_fill(self.air_fill_level, params, env);
        previous
    }

    /// Volume of air currently carried (m³).
    pub fn air_volume(&self, params: &FloaterParams) -> f64 {
        params.volume_m3 * self.air_fill_level
    }
}

/// `container_mass + ρ·V·(1 − fill)`.
pub fn mass_for_fill(fill: f64, params: &FloaterParams, env: &EnvironmentParams) -> f64 {
    params.container_mass_kg + env.rho_water_kg_m3 * params.volume_m3 * (1.0 - fill)
}
