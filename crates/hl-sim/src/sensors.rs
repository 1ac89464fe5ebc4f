//! Read-only sensor frame sampled once per tick.

use core::f64::consts::PI;

use hl_core::{FloaterId, angular_distance, forward_arc_contains, wrap_angle};

use crate::physics::PhysicsEngine;
use crate::plant::PlantState;

/// Per-floater readings.
#[derive(Debug, Clone, PartialEq)]
pub struct FloaterReading {
    pub id: FloaterId,
    pub position_m: f64,
    pub velocity_m_s: f64,
    pub phase_rad: f64,
    /// Within the injection zone, or crossed its center during the last step.
    pub in_bottom_zone: bool,
    /// Within the vent zone, or crossed its center during the last step.
    pub in_top_zone: bool,
    /// Water pressure at the floater's depth.
    pub hydrostatic_pressure_pa: f64,
}

/// Snapshot of every sensor after the physics step.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    pub time_s: f64,
    pub dt_s: f64,
    pub chain_velocity_m_s: f64,
    pub omega_rad_s: f64,
    pub tank_pressure_pa: f64,
    /// Gravity and buoyancy torque at the sprocket.
    pub net_drive_torque_nm: f64,
    pub floaters: Vec<FloaterReading>,
}

impl SensorFrame {
    pub fn sample(plant: &PlantState, physics: &PhysicsEngine, time_s: f64, dt_s: f64) -> Self {
        let radius = physics.drivetrain.sprocket_radius_m;
        let tol = physics.floater_params.zone_tolerance_rad;
        let height = physics.geometry.tank_height_m;

        let floaters = plant
            .floaters
            .iter()
            .map(|f| FloaterReading {
                id: f.id,
                position_m: f.position_m,
                velocity_m_s: f.velocity_m_s,
                phase_rad: f.phase_rad,
                in_bottom_zone: in_zone(f.prev_phase_rad, f.phase_rad, 0.0, tol),
                in_top_zone: in_zone(f.prev_phase_rad, f.phase_rad, PI, tol),
                hydrostatic_pressure_pa: physics
                    .environment
                    .hydrostatic_pressure(height - f.position_m),
            })
            .collect();

        Self {
            time_s,
            dt_s,
            chain_velocity_m_s: plant.chain.velocity_m_s,
            omega_rad_s: plant.chain.omega_rad_s(radius),
            tank_pressure_pa: plant.tank.pressure_pa,
            net_drive_torque_nm: physics.drive_force(&plant.floaters) * radius,
            floaters,
        }
    }
}

/// Whether a floater that moved from `prev` to `now` is in, or passed
/// through, the zone around `center`.
///
/// The shorter arc between the two phases decides the direction of travel.
pub fn in_zone(prev: f64, now: f64, center: f64, tolerance: f64) -> bool {
    if angular_distance(now, center) <= tolerance {
        return true;
    }
    if wrap_angle(now - prev) <= PI {
        forward_arc_contains(prev, now, center)
    } else {
        forward_arc_contains(now, prev, center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use core::f64::consts::TAU;

    #[test]
    fn zone_by_proximity() {
        assert!(in_zone(0.05, 0.05, 0.0, 0.1));
        assert!(in_zone(TAU - 0.05, TAU - 0.05, 0.0, 0.1));
        assert!(!in_zone(0.5, 0.5, 0.0, 0.1));
        assert!(in_zone(PI - 0.05, PI - 0.05, PI, 0.1));
    }

    #[test]
    fn zone_by_crossing_forward_and_backward() {
        // large step jumps over the bottom zone
        assert!(in_zone(TAU - 0.3, 0.3, 0.0, 0.1));
        // moving backwards over the top
        assert!(in_zone(PI + 0.3, PI - 0.3, PI, 0.1));
        assert!(!in_zone(1.0, 1.5, PI, 0.1));
    }

    #[test]
    fn frame_reports_drive_torque_and_pressure() {
        let config = EngineConfig::default();
        let physics = PhysicsEngine::new(&config).unwrap();
        let plant = PlantState::new(&config);
        let frame = SensorFrame::sample(&plant, &physics, 0.0, 0.1);
        assert_eq!(frame.floaters.len(), 8);
        assert_eq!(frame.tank_pressure_pa, 9.0e5);
        assert!(frame.net_drive_torque_nm > 0.0);
        assert!(frame.floaters[0].in_bottom_zone);
        assert!(frame.floaters[4].in_top_zone);
        assert!(!frame.floaters[2].in_bottom_zone && !frame.floaters[2].in_top_zone);
    }
}
