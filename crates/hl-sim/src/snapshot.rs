//! Per-tick telemetry and the cumulative energy ledger.

use hl_core::FloaterId;
use serde::{Deserialize, Serialize};

use crate::faults::{Component, Fault, FaultKind};
use crate::floater::FloaterState;
use crate::physics::StepWork;

/// Cumulative energy terms (J).
///
/// The mechanical terms close on the chain's kinetic energy:
///
/// ```text
/// KE = KE₀ + input − output − losses
/// input  = hydrostatic + mass_exchange + correction
/// output = generator_output
/// losses = generator_loss + drag + friction
/// ```
///
/// Compressor input, injection work and vent loss describe the pneumatic
/// side and are reported alongside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyLedger {
    /// Net work of buoyancy and gravity on the chain.
    pub hydrostatic_work_j: f64,
    /// Kinetic energy change from floater mass changes at constant speed.
    pub mass_exchange_j: f64,
    /// Kinetic energy added or removed by stability clamps.
    pub correction_j: f64,
    pub generator_output_j: f64,
    pub generator_loss_j: f64,
    pub drag_loss_j: f64,
    pub friction_loss_j: f64,
    pub compressor_input_j: f64,
    pub injection_work_j: f64,
    pub vent_loss_j: f64,
    pub initial_kinetic_j: f64,
}

impl EnergyLedger {
    pub fn new(initial_kinetic_j: f64) -> Self {
        Self {
            initial_kinetic_j,
            ..Self::default()
        }
    }

    /// Book one physics step; `efficiency` splits generator work.
    pub fn record_step(&mut self, work: &StepWork, efficiency: f64) {
        self.hydrostatic_work_j += work.hydrostatic_j;
        self.correction_j += work.correction_j;
        self.generator_output_j += efficiency * work.generator_j;
        self.generator_loss_j += (1.0 - efficiency) * work.generator_j;
        self.drag_loss_j += work.drag_j;
        self.friction_loss_j += work.friction_j;
    }

    pub fn input(&self) -> f64 {
        self.hydrostatic_work_j + self.mass_exchange_j + self.correction_j
    }

    pub fn output(&self) -> f64 {
        self.generator_output_j
    }

    pub fn losses(&self) -> f64 {
        self.generator_loss_j + self.drag_loss_j + self.friction_loss_j
    }

    /// Kinetic energy the ledger predicts.
    pub fn expected_kinetic_j(&self) -> f64 {
        self.initial_kinetic_j + self.input() - self.output() - self.losses()
    }

    /// Energy moved through the ledger, used to normalise closure.
    pub fn throughput_j(&self) -> f64 {
        self.initial_kinetic_j
            + self.hydrostatic_work_j.abs()
            + self.mass_exchange_j.abs()
            + self.correction_j.abs()
    }

    /// `|KE − expected| / throughput`; zero for an idle plant.
    pub fn closure_error(&self, kinetic_j: f64) -> f64 {
        let scale = self.throughput_j();
        if scale <= f64::EPSILON {
            return 0.0;
        }
        (kinetic_j - self.expected_kinetic_j()).abs() / scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    Running,
    Halted {
        tick: u64,
        component: Component,
        kind: FaultKind,
    },
}

impl EngineStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloaterSnapshot {
    pub id: FloaterId,
    pub state: FloaterState,
    pub air_fill_level: f64,
    pub position_m: f64,
    pub phase_rad: f64,
    pub mass_kg: f64,
}

/// Immutable record of one completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub time_s: f64,
    pub dt_s: f64,
    pub status: EngineStatus,
    pub chain_velocity_m_s: f64,
    pub omega_rad_s: f64,
    pub acceleration_m_s2: f64,
    /// Torque that acted on the chain during this tick.
    pub generator_torque_nm: f64,
    /// Torque staged for the next tick.
    pub generator_command_nm: f64,
    pub generator_power_w: f64,
    pub clutch_engagement: f64,
    pub clutch_target_engaged: bool,
    pub flywheel_energy_j: f64,
    pub kinetic_energy_j: f64,
    pub tank_pressure_pa: f64,
    pub compressor_active: bool,
    pub floaters: Vec<FloaterSnapshot>,
    pub energy: EnergyLedger,
    pub faults: Vec<Fault>,
}

impl TickSnapshot {
    pub fn count_in_state(&self, state: FloaterState) -> usize {
        self.floaters.iter().filter(|f| f.state == state).count()
    }

    pub fn closure_error(&self) -> f64 {
        self.energy.closure_error(self.kinetic_energy_j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_closes_on_booked_work() {
        let mut ledger = EnergyLedger::new(100.0);
        ledger.record_step(
            &StepWork {
                hydrostatic_j: 1_000.0,
                generator_j: 400.0,
                drag_j: 100.0,
                friction_j: 50.0,
                correction_j: -10.0,
            },
            0.9,
        );
        assert!((ledger.generator_output_j - 360.0).abs() < 1e-9);
        assert!((ledger.generator_loss_j - 40.0).abs() < 1e-9);
        let ke = 100.0 + 1_000.0 - 400.0 - 100.0 - 50.0 - 10.0;
        assert!(ledger.closure_error(ke) < 1e-12);
        assert!(ledger.closure_error(ke + 111.0) > 0.09);
    }

    #[test]
    fn idle_ledger_has_zero_error() {
        assert_eq!(EnergyLedger::default().closure_error(0.0), 0.0);
    }

    #[test]
    fn halted_status_serializes_with_tag() {
        let status = EngineStatus::Halted {
            tick: 3,
            component: Component::Physics,
            kind: FaultKind::InvalidState,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"halted\""));
        assert!(status.is_halted());
    }
}
