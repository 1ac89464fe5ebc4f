//! Chain, sprocket and flywheel dynamics.
//!
//! The chain is modelled as a single translational degree of freedom. All
//! rotating inertia is lumped onto the sprocket and reflected to the chain as
//! an equivalent mass:
//!
//! ```text
//! M_total = Σ m_floater + m_chain + I_total / R²
//! M_total · dv/dt = Σ F
//! ```
//!
//! The sprocket angle `θ` and chain travel `s = θ·R` locate every floater on
//! the loop through [`LoopGeometry`].

use core::f64::consts::{PI, TAU};

use hl_core::wrap_angle;

use crate::config::DrivetrainParams;
use crate::error::{SimError, SimResult};

/// Kinematic state of the chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrivetrainState {
    /// Chain speed (m/s); positive moves the ascending side upward.
    pub velocity_m_s: f64,
    /// Sprocket angle (rad), wrapped to one loop revolution.
    pub theta_rad: f64,
}

impl DrivetrainState {
    pub fn omega_rad_s(&self, radius_m: f64) -> f64 {
        self.velocity_m_s / radius_m
    }

    pub fn travel_m(&self, radius_m: f64) -> f64 {
        self.theta_rad * radius_m
    }
}

/// Lumped drivetrain parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Drivetrain {
    pub sprocket_radius_m: f64,
    pub chain_mass_kg: f64,
    /// Sprocket, shaft, rotor and (when fitted) flywheel inertia.
    pub inertia_kg_m2: f64,
    /// Viscous friction coefficient (N·s/m).
    pub friction_n_s_m: f64,
    /// Sprocket angle covering one full loop.
    loop_angle_rad: f64,
}

impl Drivetrain {
    /// # Errors
    ///
    /// Returns error if the reflected mass would be zero or the radius is not
    /// positive.
    pub fn new(params: &DrivetrainParams) -> SimResult<Self> {
        if !(params.sprocket_radius_m.is_finite() && params.sprocket_radius_m > 0.0) {
            return Err(SimError::InvalidArg {
                what: "sprocket radius must be positive",
            });
        }
        if params.bearing_friction_n_s_m < 0.0 {
            return Err(SimError::InvalidArg {
                what: "friction coefficient cannot be negative",
            });
        }
        let inertia = params.base_inertia_kg_m2
            + if params.flywheel_enabled {
                params.flywheel_inertia_kg_m2
            } else {
                0.0
            };
        if params.chain_mass_kg + inertia <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "drivetrain needs chain mass or rotating inertia",
            });
        }
        Ok(Self {
            sprocket_radius_m: params.sprocket_radius_m,
            chain_mass_kg: params.chain_mass_kg,
            inertia_kg_m2: inertia,
            friction_n_s_m: params.bearing_friction_n_s_m,
            loop_angle_rad: 2.0 * params.tank_height_m / params.sprocket_radius_m,
        })
    }

    /// Translational mass of everything except the floaters.
    pub fn reflected_mass(&self) -> f64 {
        self.chain_mass_kg + self.inertia_kg_m2 / (self.sprocket_radius_m * self.sprocket_radius_m)
    }

    pub fn equivalent_mass(&self, floater_mass_kg: f64) -> f64 {
        floater_mass_kg + self.reflected_mass()
    }

    /// Friction force on the chain (opposes motion).
    pub fn friction_force(&self, velocity_m_s: f64) -> f64 {
        -self.friction_n_s_m * velocity_m_s
    }

    pub fn kinetic_energy(&self, floater_mass_kg: f64, velocity_m_s: f64) -> f64 {
        0.5 * self.equivalent_mass(floater_mass_kg) * velocity_m_s * velocity_m_s
    }

    /// Energy held by the rotating inertia alone, `0.5·I·ω²`.
    pub fn rotational_energy(&self, velocity_m_s: f64) -> f64 {
        let omega = velocity_m_s / self.sprocket_radius_m;
        0.5 * self.inertia_kg_m2 * omega * omega
    }

    /// Advance the sprocket angle by one step at the end-of-step velocity.
    pub fn rotate(&self, state: &mut DrivetrainState, velocity_m_s: f64, dt: f64) {
        state.velocity_m_s = velocity_m_s;
        let theta = state.theta_rad + velocity_m_s / self.sprocket_radius_m * dt;
        state.theta_rad = theta.rem_euclid(self.loop_angle_rad);
    }
}

/// Placement of evenly spaced floaters on a loop of length `2·H`.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopGeometry {
    pub tank_height_m: f64,
    pub loop_length_m: f64,
    pub floater_count: usize,
}

impl LoopGeometry {
    pub fn new(tank_height_m: f64, floater_count: usize) -> Self {
        Self {
            tank_height_m,
            loop_length_m: 2.0 * tank_height_m,
            floater_count,
        }
    }

    /// Loop phase of floater `index` after `travel_m` of chain travel.
    pub fn phase_at(&self, index: usize, travel_m: f64) -> f64 {
        let spacing = self.loop_length_m / self.floater_count.max(1) as f64;
        let s = (travel_m + index as f64 * spacing).rem_euclid(self.loop_length_m);
        wrap_angle(TAU * s / self.loop_length_m)
    }

    /// Height above the tank floor for a loop phase.
    pub fn height_at(&self, phase_rad: f64) -> f64 {
        let phi = wrap_angle(phase_rad);
        if phi < PI {
            self.tank_height_m * phi / PI
        } else {
            self.tank_height_m * (TAU - phi) / PI
        }
    }

    /// Projection of the chain direction onto the vertical: `+1` ascending,
    /// `−1` descending.
    pub fn side(phase_rad: f64) -> f64 {
        if wrap_angle(phase_rad) < PI { 1.0 } else { -1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flywheel_adds_reflected_mass() {
        let params = DrivetrainParams::default();
        let with = Drivetrain::new(&params).unwrap();
        assert_eq!(with.reflected_mass(), 200.0 + 550.0);

        let without = Drivetrain::new(&DrivetrainParams {
            flywheel_enabled: false,
            ..params
        })
        .unwrap();
        assert_eq!(without.reflected_mass(), 250.0);
    }

    #[test]
    fn friction_opposes_motion() {
        let d = Drivetrain::new(&DrivetrainParams::default()).unwrap();
        assert!(d.friction_force(2.0) < 0.0);
        assert!(d.friction_force(-2.0) > 0.0);
        assert_eq!(d.friction_force(0.0), 0.0);
    }

    #[test]
    fn rotation_wraps_at_one_loop() {
        let d = Drivetrain::new(&DrivetrainParams::default()).unwrap();
        let mut state = DrivetrainState::default();
        d.rotate(&mut state, 5.0, 4.0);
        // 20 m of travel on a 20 m loop
        assert!(state.theta_rad.abs() < 1e-9 || (state.theta_rad - 20.0).abs() < 1e-9);
        d.rotate(&mut state, -1.0, 1.0);
        assert!(state.theta_rad >= 0.0 && state.theta_rad < 20.0);
    }

    #[test]
    fn rejects_massless_drivetrain() {
        let params = DrivetrainParams {
            chain_mass_kg: 0.0,
            base_inertia_kg_m2: 0.0,
            flywheel_enabled: false,
            ..DrivetrainParams::default()
        };
        assert!(Drivetrain::new(&params).is_err());
    }

    #[test]
    fn geometry_spacing_and_height() {
        let geo = LoopGeometry::new(10.0, 8);
        assert_eq!(geo.phase_at(0, 0.0), 0.0);
        assert!((geo.phase_at(2, 0.0) - PI / 2.0).abs() < 1e-12);
        assert!((geo.phase_at(4, 0.0) - PI).abs() < 1e-12);
        assert!((geo.height_at(PI / 2.0) - 5.0).abs() < 1e-12);
        assert!((geo.height_at(PI) - 10.0).abs() < 1e-12);
        assert!((geo.height_at(1.5 * PI) - 5.0).abs() < 1e-12);
        assert_eq!(LoopGeometry::side(0.5), 1.0);
        assert_eq!(LoopGeometry::side(PI + 0.5), -1.0);
    }

    #[test]
    fn travel_advances_phase() {
        let geo = LoopGeometry::new(10.0, 8);
        let phi = geo.phase_at(0, 5.0);
        assert!((phi - PI / 2.0).abs() < 1e-12);
        assert!((geo.height_at(phi) - 5.0).abs() < 1e-12);
    }
}
