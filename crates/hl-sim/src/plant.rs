//! Mutable physical state of the machine.

use core::f64::consts::PI;

use hl_core::FloaterId;

use crate::config::EngineConfig;
use crate::drivetrain::{DrivetrainState, LoopGeometry};
use crate::floater::{Floater, FloaterState};
use crate::tank::AirTank;

/// Everything the physics phase integrates.
///
/// Owned by the engine and lent to one phase at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantState {
    pub floaters: Vec<Floater>,
    pub chain: DrivetrainState,
    pub tank: AirTank,
}

impl PlantState {
    /// Plant at rest with zero chain travel.
    ///
    /// Floaters on the ascending side start Full, the rest Empty.
    pub fn new(config: &EngineConfig) -> Self {
        let geometry = LoopGeometry::new(config.drivetrain.tank_height_m, config.floater_count());
        let floaters = (0..config.floater_count())
            .map(|i| {
                let phase = geometry.phase_at(i, 0.0);
                let state = if phase < PI {
                    FloaterState::Full
                } else {
                    FloaterState::Empty
                };
                let mut floater = Floater::new(
                    FloaterId::from_index(i as u32),
                    state,
                    &config.floaters,
                    &config.environment,
                );
                floater.phase_rad = phase;
                floater.prev_phase_rad = phase;
                floater.position_m = geometry.height_at(phase);
                let depth = config.drivetrain.tank_height_m - floater.position_m;
                let local = config.environment.hydrostatic_pressure(depth);
                floater.internal_pressure_pa = local;
                floater.vent_start_pressure_pa = local;
                floater
            })
            .collect();

        Self {
            floaters,
            chain: DrivetrainState::default(),
            tank: AirTank::new(&config.compressor),
        }
    }

    pub fn floater_mass(&self) -> f64 {
        self.floaters.iter().map(|f| f.mass_kg).sum()
    }

    pub fn any_in_state(&self, state: FloaterState) -> bool {
        self.floaters.iter().any(|f| f.state == state)
    }
}
