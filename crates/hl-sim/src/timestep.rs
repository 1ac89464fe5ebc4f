//! Tick length selection.
//!
//! With adaptive stepping enabled the tick length follows the measured
//! compute time:
//!
//! ```text
//! compute > 0.8·target  →  dt · min(1.2, target/compute)
//! compute < 0.3·target  →  dt / 0.9
//! ```
//!
//! Otherwise the nominal length is used. A fault cutback halves the next
//! tick; afterwards the length recovers toward nominal by `1/0.9` per clean
//! tick. Every result is clamped to `[dt_min, dt_max]`.

use crate::config::TimestepParams;

const SLOW_FRACTION: f64 = 0.8;
const FAST_FRACTION: f64 = 0.3;
const MAX_GROWTH: f64 = 1.2;
const RECOVERY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct TimestepPolicy {
    pub nominal_s: f64,
    pub min_s: f64,
    pub max_s: f64,
    pub adaptive: bool,
    pub target_frame_time_s: f64,
}

impl TimestepPolicy {
    pub fn new(params: &TimestepParams) -> Self {
        Self {
            nominal_s: params.dt_s,
            min_s: params.dt_min_s,
            max_s: params.dt_max_s,
            adaptive: params.adaptive,
            target_frame_time_s: params.target_frame_time_s,
        }
    }

    pub fn clamp(&self, dt: f64) -> f64 {
        dt.clamp(self.min_s, self.max_s)
    }

    /// Adjust `dt` for a measured compute time.
    pub fn adapt(&self, dt: f64, compute_s: f64) -> f64 {
        let target = self.target_frame_time_s;
        let next = if compute_s > SLOW_FRACTION * target {
            dt * MAX_GROWTH.min(target / compute_s)
        } else if compute_s < FAST_FRACTION * target {
            dt / RECOVERY
        } else {
            dt
        };
        self.clamp(next)
    }

    /// Tick length for the next step.
    pub fn next(&self, dt: f64, compute_s: f64, cutback: bool) -> f64 {
        if cutback {
            return self.clamp(0.5 * dt);
        }
        if self.adaptive {
            return self.adapt(dt, compute_s);
        }
        if dt < self.nominal_s {
            self.clamp((dt / RECOVERY).min(self.nominal_s))
        } else {
            self.clamp(self.nominal_s)
        }
    }
}
