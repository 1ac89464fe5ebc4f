//! Air-supply pressure control.
//!
//! Hysteresis on tank pressure, with an override that keeps the compressor
//! running while any floater is filling. Neither the override nor the dwell
//! may carry the tank past its safety limit: a compressor that would exceed
//! it within one step is switched off.

use hl_controls::{HysteresisSwitch, SwitchState};
use tracing::debug;

use crate::config::CompressorParams;
use crate::error::SimResult;

#[derive(Debug, Clone, PartialEq)]
pub struct CompressorController {
    pub switch: HysteresisSwitch,
    pub rate_pa_s: f64,
    pub safety_pa: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressorState {
    pub switch: SwitchState,
    /// Whether the last decision came from the filling override.
    pub overridden: bool,
}

impl CompressorState {
    pub fn new(on: bool) -> Self {
        Self {
            switch: SwitchState::with_on(on),
            overridden: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.switch.on
    }
}

impl CompressorController {
    pub fn new(params: &CompressorParams) -> SimResult<Self> {
        Ok(Self {
            switch: HysteresisSwitch::new(params.p_min_pa, params.p_max_pa, params.min_dwell_s)?,
            rate_pa_s: params.compressor_rate_pa_s,
            safety_pa: params.p_max_safety_pa,
        })
    }

    /// Decide the compressor state for the next step.
    pub fn update(
        &self,
        state: &CompressorState,
        pressure_pa: f64,
        any_filling: bool,
        now_s: f64,
        dt: f64,
    ) -> CompressorState {
        let mut switch = self.switch.update(&state.switch, pressure_pa, now_s);
        let headroom = pressure_pa + self.rate_pa_s * dt < self.safety_pa;
        let overridden = any_filling && headroom && !switch.on;
        if overridden {
            switch = self.switch.force_on(&switch, now_s);
        } else if switch.on && !headroom {
            switch = self.switch.force_off(&switch, now_s);
        }
        if switch.on != state.switch.on {
            debug!(on = switch.on, pressure_pa, overridden, "compressor switched");
        }
        CompressorState { switch, overridden }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> CompressorController {
        CompressorController::new(&CompressorParams::default()).unwrap()
    }

    #[test]
    fn band_has_no_chatter() {
        let c = CompressorController::new(&CompressorParams {
            min_dwell_s: 0.0,
            ..CompressorParams::default()
        })
        .unwrap();
        let mut state = CompressorState::new(false);
        let mut t = 0.0;
        for p in [9.5e5, 9.0e5, 8.5e5, 8.01e5, 8.0e5] {
            state = c.update(&state, p, false, t, 0.1);
            assert!(!state.is_on(), "turned on at {p}");
            t += 0.1;
        }
        state = c.update(&state, 7.99e5, false, t, 0.1);
        assert!(state.is_on());
        for p in [8.5e5, 9.0e5, 9.99e5] {
            t += 0.1;
            state = c.update(&state, p, false, t, 0.1);
            assert!(state.is_on(), "turned off at {p}");
        }
        state = c.update(&state, 10.0e5, false, t + 0.1, 0.1);
        assert!(!state.is_on());
    }

    #[test]
    fn filling_forces_compressor_on_above_p_min() {
        let c = controller();
        let state = CompressorState::new(false);
        let next = c.update(&state, 9.5e5, true, 0.0, 0.1);
        assert!(next.is_on());
        assert!(next.overridden);
    }

    #[test]
    fn override_beats_dwell() {
        let c = controller();
        let mut state = CompressorState::new(true);
        state = c.update(&state, 10.5e5, false, 5.0, 0.1);
        assert!(!state.is_on());
        let next = c.update(&state, 10.5e5, true, 5.1, 0.1);
        assert!(next.is_on());
    }

    #[test]
    fn override_respects_safety_limit() {
        let c = controller();
        let state = CompressorState::new(false);
        let next = c.update(&state, 11.99e5, true, 0.0, 0.1);
        assert!(!next.is_on());
    }

    #[test]
    fn safety_margin_trips_despite_dwell() {
        let c = controller();
        let mut state = CompressorState::new(false);
        state = c.update(&state, 11.0e5, true, 0.0, 0.1);
        assert!(state.is_on());
        let next = c.update(&state, 11.98e5, true, 0.1, 0.1);
        assert!(!next.is_on());
    }

    #[test]
    fn dwell_delays_switch_off() {
        let c = controller();
        let mut state = CompressorState::new(false);
        state = c.update(&state, 7.0e5, false, 0.0, 0.1);
        assert!(state.is_on());
        state = c.update(&state, 10.1e5, false, 0.5, 0.1);
        assert!(state.is_on(), "1 s dwell not elapsed");
        state = c.update(&state, 10.1e5, false, 1.0, 0.1);
        assert!(!state.is_on());
    }
}
