//! Grid-service extensions.
//!
//! A registered [`GridService`] runs after the fixed tick sequence, reads the
//! finished snapshot and returns a torque adjustment that the engine adds to
//! the staged generator command before clamping. Adjustments are ignored
//! while the generator's stall or overspeed override holds the command.

use crate::snapshot::TickSnapshot;

pub trait GridService: Send {
    fn name(&self) -> &str;

    /// Additive generator torque (N·m) for the next tick.
    fn torque_adjustment(&mut self, snapshot: &TickSnapshot) -> f64;

    /// Forget any history; called on engine reset.
    fn reset(&mut self) {}
}

/// Grid frequency as a function of simulated time (Hz).
pub type FrequencyProfile = Box<dyn Fn(f64) -> f64 + Send>;

/// Inertial response proportional to the rate of change of frequency.
///
/// A falling frequency (negative ROCOF) raises load torque so more power is
/// exported; a rising one sheds it.
pub struct SyntheticInertia {
    profile: FrequencyProfile,
    /// Torque per unit ROCOF (N·m per Hz/s).
    pub gain_nm_per_hz_s: f64,
    /// ROCOF magnitude below which no response is given (Hz/s).
    pub deadband_hz_s: f64,
    last: Option<(f64, f64)>,
}

impl std::fmt::Debug for SyntheticInertia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticInertia")
            .field("gain_nm_per_hz_s", &self.gain_nm_per_hz_s)
            .field("deadband_hz_s", &self.deadband_hz_s)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl SyntheticInertia {
    pub fn new(profile: FrequencyProfile, gain_nm_per_hz_s: f64, deadband_hz_s: f64) -> Self {
        Self {
            profile,
            gain_nm_per_hz_s,
            deadband_hz_s: deadband_hz_s.abs(),
            last: None,
        }
    }

    /// Step change from `nominal_hz` to `nominal_hz + delta_hz` at `at_s`,
    /// ramped over `ramp_s`.
    pub fn step_profile(nominal_hz: f64, delta_hz: f64, at_s: f64, ramp_s: f64) -> FrequencyProfile {
        Box::new(move |t: f64| {
            if t <= at_s {
                nominal_hz
            } else if ramp_s <= 0.0 || t >= at_s + ramp_s {
                nominal_hz + delta_hz
            } else {
                nominal_hz + delta_hz * (t - at_s) / ramp_s
            }
        })
    }

    pub fn frequency_at(&self, time_s: f64) -> f64 {
        (self.profile)(time_s)
    }
}

impl GridService for SyntheticInertia {
    fn name(&self) -> &str {
        "synthetic-inertia"
    }

    fn torque_adjustment(&mut self, snapshot: &TickSnapshot) -> f64 {
        let t = snapshot.time_s;
        let freq = self.frequency_at(t);
        let previous = self.last.replace((t, freq));
        let Some((t0, f0)) = previous else {
            return 0.0;
        };
        let elapsed = t - t0;
        if elapsed <= 0.0 || !freq.is_finite() {
            return 0.0;
        }
        let rocof = (freq - f0) / elapsed;
        if rocof.abs() <= self.deadband_hz_s {
            0.0
        } else {
            -self.gain_nm_per_hz_s * rocof
        }
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::config::EngineConfig;

    fn snapshot_at(time_s: f64) -> TickSnapshot {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let mut snap = engine.initial_snapshot();
        snap.time_s = time_s;
        snap
    }

    #[test]
    fn falling_frequency_adds_torque() {
        let profile = SyntheticInertia::step_profile(50.0, -0.5, 1.0, 1.0);
        let mut service = SyntheticInertia::new(profile, 1_000.0, 0.01);
        assert_eq!(service.torque_adjustment(&snapshot_at(1.0)), 0.0);
        let adj = service.torque_adjustment(&snapshot_at(1.5));
        // ROCOF −0.5 Hz/s
        assert!((adj - 500.0).abs() < 1e-9);
    }

    #[test]
    fn steady_frequency_is_inside_deadband() {
        let profile = SyntheticInertia::step_profile(50.0, 0.0, 0.0, 0.0);
        let mut service = SyntheticInertia::new(profile, 1_000.0, 0.01);
        service.torque_adjustment(&snapshot_at(0.0));
        assert_eq!(service.torque_adjustment(&snapshot_at(0.1)), 0.0);
    }

    #[test]
    fn reset_clears_history() {
        let profile = SyntheticInertia::step_profile(50.0, 1.0, 0.0, 10.0);
        let mut service = SyntheticInertia::new(profile, 1_000.0, 0.0);
        service.torque_adjustment(&snapshot_at(1.0));
        service.reset();
        assert_eq!(service.torque_adjustment(&snapshot_at(2.0)), 0.0);
    }
}
