//! Compressed-air reservoir.

use serde::{Deserialize, Serialize};

use crate::config::CompressorParams;
use crate::faults::{Component, Fault, FaultKind};

/// Reservoir feeding the injection valves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirTank {
    pub pressure_pa: f64,
    /// Whether the compressor ran during the last integration step.
    pub compressor_active: bool,
    /// Cumulative compressor energy (J).
    pub compressor_energy_j: f64,
}

/// Result of one pressure integration step.
#[derive(Debug, Clone, PartialEq)]
pub struct TankStep {
    pub compressor_energy_j: f64,
    pub fault: Option<Fault>,
}

impl AirTank {
    pub fn new(params: &CompressorParams) -> Self {
        Self {
            pressure_pa: params.initial_pressure_pa,
            compressor_active: params.initially_active,
            compressor_energy_j: 0.0,
        }
    }

    /// Integrate pressure over `dt`.
    ///
    /// The compressor raises pressure at its rate while on; every open
    /// injection valve drains at the injection rate. The result is clamped
    /// to `[0, p_max_safety]`.
    pub fn integrate(
        &mut self,
        params: &CompressorParams,
        compressor_on: bool,
        open_injection_valves: usize,
        dt: f64,
    ) -> TankStep {
        let mut pressure = self.pressure_pa;
        let mut energy = 0.0;
        if compressor_on {
            pressure += params.compressor_rate_pa_s * dt;
            energy = params.compressor_power_w * dt;
        }
        pressure -= params.injection_rate_pa_s * dt * open_injection_valves as f64;

        let fault = if !pressure.is_finite() {
            let detail = format!("non-finite tank pressure, held at {:.0} Pa", self.pressure_pa);
            pressure = self.pressure_pa;
            Some(Fault::new(FaultKind::InvalidState, Component::Tank, detail))
        } else if pressure < 0.0 || pressure > params.p_max_safety_pa {
            let clamped = pressure.clamp(0.0, params.p_max_safety_pa);
            let detail = format!("tank pressure {pressure:.0} Pa clamped to {clamped:.0} Pa");
            pressure = clamped;
            Some(Fault::new(FaultKind::OutOfBounds, Component::Tank, detail))
        } else {
            None
        };

        self.pressure_pa = pressure;
        self.compressor_active = compressor_on;
        self.compressor_energy_j += energy;
        TankStep {
            compressor_energy_j: energy,
            fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressor_raises_pressure_and_accrues_energy() {
        let params = CompressorParams::default();
        let mut tank = AirTank::new(&params);
        let step = tank.integrate(&params, true, 0, 1.0);
        assert_eq!(tank.pressure_pa, 9.0e5 + 3.0e4);
        assert_eq!(step.compressor_energy_j, 15_000.0);
        assert_eq!(tank.compressor_energy_j, 15_000.0);
        assert!(step.fault.is_none());
    }

    #[test]
    fn each_open_valve_drains() {
        let params = CompressorParams::default();
        let mut tank = AirTank::new(&params);
        tank.integrate(&params, false, 2, 1.0);
        assert_eq!(tank.pressure_pa, 9.0e5 - 4.0e4);
    }

    #[test]
    fn overpressure_is_clamped_and_reported() {
        let params = CompressorParams::default();
        let mut tank = AirTank::new(&params);
        tank.pressure_pa = params.p_max_safety_pa - 100.0;
        let step = tank.integrate(&params, true, 0, 1.0);
        assert_eq!(tank.pressure_pa, params.p_max_safety_pa);
        let fault = step.fault.unwrap();
        assert_eq!(fault.kind, FaultKind::OutOfBounds);
        assert_eq!(fault.component, Component::Tank);
    }

    #[test]
    fn pressure_never_negative() {
        let params = CompressorParams::default();
        let mut tank = AirTank::new(&params);
        tank.pressure_pa = 10.0;
        let step = tank.integrate(&params, false, 1, 1.0);
        assert_eq!(tank.pressure_pa, 0.0);
        assert!(step.fault.is_some());
    }
}
