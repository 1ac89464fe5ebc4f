//! Force balance and chain integration.
//!
//! Floater forces are projected onto the chain: `+1` on the ascending side,
//! `−1` on the descending side. The chain then integrates with semi-implicit
//! Euler:
//!
//! ```text
//! a      = ΣF / M_total
//! v(t+dt) = v(t) + a·dt
//! θ(t+dt) = θ(t) + v(t+dt)/R·dt
//! ```
//!
//! Work is booked with the unclamped midpoint velocity, so the sum of all
//! work terms equals the kinetic-energy change exactly. Whatever a stability
//! clamp adds or removes is booked as a correction.

use hl_core::sign;

use crate::commands::StagedCommands;
use crate::config::{
    CompressorParams, EngineConfig, Enhancements, EnvironmentParams, FloaterParams,
    StabilityLimits,
};
use crate::drivetrain::{Drivetrain, LoopGeometry};
use crate::error::SimResult;
use crate::faults::{Component, Fault, FaultKind};
use crate::floater::Floater;
use crate::plant::PlantState;

/// Below this chain speed the generator acts as a holding brake.
const STANDSTILL_M_S: f64 = 1e-6;

/// Forces acting on one floater, already projected onto the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloaterForces {
    /// Vertical buoyant force (N).
    pub buoyancy_n: f64,
    /// Vertical weight (N).
    pub weight_n: f64,
    /// Drag along the chain (N).
    pub drag_n: f64,
    /// `+1` ascending, `−1` descending.
    pub side: f64,
}

impl FloaterForces {
    /// Vertical net force at rest, `F_b − W`.
    pub fn vertical_net(&self) -> f64 {
        self.buoyancy_n - self.weight_n
    }

    /// Gravity and buoyancy along the chain.
    pub fn drive(&self) -> f64 {
        self.side * self.vertical_net()
    }
}

/// Work done on the chain during one step (J).
///
/// Loss terms are positive when energy leaves the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepWork {
    pub hydrostatic_j: f64,
    pub generator_j: f64,
    pub drag_j: f64,
    pub friction_j: f64,
    pub correction_j: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsReport {
    pub acceleration_m_s2: f64,
    pub work: StepWork,
    pub compressor_energy_j: f64,
    pub faults: Vec<Fault>,
}

/// Immutable physics configuration for the current parameter set.
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    pub environment: EnvironmentParams,
    pub floater_params: FloaterParams,
    pub enhancements: Enhancements,
    pub stability: StabilityLimits,
    pub compressor: CompressorParams,
    pub drivetrain: Drivetrain,
    pub geometry: LoopGeometry,
}

impl PhysicsEngine {
    pub fn new(config: &EngineConfig) -> SimResult<Self> {
        Ok(Self {
            environment: config.environment.clone(),
            floater_params: config.floaters.clone(),
            enhancements: config.enhancements.clone(),
            stability: config.stability.clone(),
            compressor: config.compressor.clone(),
            drivetrain: Drivetrain::new(&config.drivetrain)?,
            geometry: LoopGeometry::new(config.drivetrain.tank_height_m, config.floater_count()),
        })
    }

    pub fn floater_forces(&self, floater: &Floater, chain_velocity_m_s: f64) -> FloaterForces {
        let env = &self.environment;
        let p = &self.floater_params;
        let buoyancy_n = env.rho_water_kg_m3
            * env.gravity_m_s2
            * p.volume_m3
            * floater.air_fill_level
            * self.enhancements.thermal_boost;
        let weight_n = floater.mass_kg * env.gravity_m_s2;
        let v = chain_velocity_m_s;
        let drag_n = -0.5
            * env.rho_water_kg_m3
            * p.drag_coefficient
            * p.frontal_area_m2
            * v
            * v.abs()
            * (1.0 - self.enhancements.drag_reduction);
        FloaterForces {
            buoyancy_n,
            weight_n,
            drag_n,
            side: LoopGeometry::side(floater.phase_rad),
        }
    }

    /// Net gravity and buoyancy force along the chain.
    pub fn drive_force(&self, floaters: &[Floater]) -> f64 {
        floaters.iter().map(|f| self.floater_forces(f, 0.0).drive()).sum()
    }

    pub fn drag_force(&self, floaters: &[Floater], chain_velocity_m_s: f64) -> f64 {
        floaters
            .iter()
            .map(|f| self.floater_forces(f, chain_velocity_m_s).drag_n)
            .sum()
    }

    /// Generator reaction on the chain.
    ///
    /// Opposes motion; it may at most stop the chain within one step. At
    /// standstill it holds against, but never exceeds, the other forces.
    pub fn generator_force(
        &self,
        torque_nm: f64,
        velocity_m_s: f64,
        other_force_n: f64,
        mass_kg: f64,
        dt: f64,
    ) -> f64 {
        let magnitude = (torque_nm / self.drivetrain.sprocket_radius_m).abs();
        if velocity_m_s.abs() > STANDSTILL_M_S {
            let dir = sign(velocity_m_s);
            let stop = (mass_kg * velocity_m_s.abs() / dt + dir * other_force_n).max(0.0);
            -dir * magnitude.min(stop)
        } else {
            -sign(other_force_n) * magnitude.min(other_force_n.abs())
        }
    }

    /// Equivalent translational mass for the current floater masses.
    pub fn equivalent_mass(&self, plant: &PlantState) -> f64 {
        self.drivetrain.equivalent_mass(plant.floater_mass())
    }

    pub fn kinetic_energy(&self, plant: &PlantState) -> f64 {
        self.drivetrain
            .kinetic_energy(plant.floater_mass(), plant.chain.velocity_m_s)
    }

    /// Advance the chain and tank by `dt` under `staged` commands.
    pub fn advance(
        &self,
        plant: &mut PlantState,
        staged: &StagedCommands,
        dt: f64,
    ) -> PhysicsReport {
        let mut faults = Vec::new();
        let v0 = plant.chain.velocity_m_s;
        let mass = self.equivalent_mass(plant);

        let drive = self.drive_force(&plant.floaters);
        let drag = self.drag_force(&plant.floaters, v0);
        let friction = self.drivetrain.friction_force(v0);
        let generator = self.generator_force(
            staged.effective_torque_nm(),
            v0,
            drive + drag + friction,
            mass,
            dt,
        );
        let mut terms = [drive, drag, friction, generator];
        let mut net: f64 = terms.iter().sum();

        if !net.is_finite() || !(mass.is_finite() && mass > 0.0) {
            faults.push(Fault::new(
                FaultKind::InvalidState,
                Component::Physics,
                format!("non-finite force balance (net {net}, mass {mass}); forces zeroed"),
            ));
            terms = [0.0; 4];
            net = 0.0;
        }
        let [drive, drag, friction, generator] = terms;

        let v1_ideal = v0 + net / mass * dt;
        let v_mid = 0.5 * (v0 + v1_ideal);
        let mut work = StepWork {
            hydrostatic_j: drive * v_mid * dt,
            generator_j: -generator * v_mid * dt,
            drag_j: -drag * v_mid * dt,
            friction_j: -friction * v_mid * dt,
            correction_j: 0.0,
        };

        let limits = &self.stability;
        let mut applied = net;
        if applied.abs() > limits.f_max_n {
            faults.push(Fault::new(
                FaultKind::InvalidState,
                Component::Physics,
                format!("net force {applied:.1} N clamped to ±{} N", limits.f_max_n),
            ));
            applied = sign(applied) * limits.f_max_n;
        }
        let mut accel = applied / mass;
        if accel.abs() > limits.a_max_m_s2 {
            faults.push(Fault::new(
                FaultKind::InvalidState,
                Component::Physics,
                format!("acceleration {accel:.2} m/s² clamped to ±{}", limits.a_max_m_s2),
            ));
            accel = sign(accel) * limits.a_max_m_s2;
        }

        let mut v1 = v0 + accel * dt;
        if !v1.is_finite() || v1.abs() > limits.v_hard_limit_m_s {
            faults.push(Fault::new(
                FaultKind::InvalidState,
                Component::Physics,
                format!("chain speed {v1} m/s beyond hard limit; zeroed"),
            ));
            v1 = 0.0;
        } else if v1.abs() > limits.v_max_m_s {
            faults.push(Fault::new(
                FaultKind::InvalidState,
                Component::Physics,
                format!("chain speed {v1:.3} m/s clamped to ±{}", limits.v_max_m_s),
            ));
            v1 = sign(v1) * limits.v_max_m_s;
        }
        work.correction_j = 0.5 * mass * (v1 * v1 - v1_ideal * v1_ideal);

        self.drivetrain.rotate(&mut plant.chain, v1, dt);
        self.place_floaters(plant, &mut faults);

        let tank = plant.tank.integrate(
            &self.compressor,
            staged.compressor_on,
            staged.open_injection_count(),
            dt,
        );
        faults.extend(tank.fault);

        PhysicsReport {
            acceleration_m_s2: (v1 - v0) / dt,
            work,
            compressor_energy_j: tank.compressor_energy_j,
            faults,
        }
    }

    /// Recompute every floater's phase, height and velocity from the chain.
    fn place_floaters(&self, plant: &mut PlantState, faults: &mut Vec<Fault>) {
        let travel = plant.chain.travel_m(self.drivetrain.sprocket_radius_m);
        let v = plant.chain.velocity_m_s;
        let height = self.geometry.tank_height_m;
        for (i, floater) in plant.floaters.iter_mut().enumerate() {
            floater.prev_phase_rad = floater.phase_rad;
            floater.phase_rad = self.geometry.phase_at(i, travel);
            let z = self.geometry.height_at(floater.phase_rad);
            floater.position_m = if (0.0..=height).contains(&z) {
                z
            } else {
                let clamped = if z.is_finite() { z.clamp(0.0, height) } else { 0.0 };
                faults.push(Fault::new(
                    FaultKind::OutOfBounds,
                    Component::Floater(floater.id),
                    format!("position {z} m clamped to {clamped} m"),
                ));
                clamped
            };
            floater.velocity_m_s = LoopGeometry::side(floater.phase_rad) * v;
        }
    }
}
