//! Lightweight wall-clock timing utilities.
//!
//! Used by the simulation loop to measure per-tick compute time for adaptive
//! step sizing and performance reporting.

use std::time::Instant;

/// A simple timer that measures elapsed wall-clock time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed time in seconds since the timer was started.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and return elapsed time in seconds.
    pub fn stop(self) -> f64 {
        self.elapsed_s()
    }
}

/// Accumulating timer for tracking total time across many calls.
#[derive(Clone, Debug, Default)]
pub struct AccumulatingTimer {
    total_s: f64,
    max_s: f64,
    count: u64,
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_s: 0.0,
            max_s: 0.0,
            count: 0,
        }
    }

    /// Record a timing measurement.
    pub fn record(&mut self, duration_s: f64) {
        self.total_s += duration_s;
        self.max_s = self.max_s.max(duration_s);
        self.count += 1;
    }

    /// Total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_s
    }

    /// Longest single measurement (in seconds).
    pub fn max_seconds(&self) -> f64 {
        self.max_s
    }

    /// Number of calls.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        if self.count > 0 {
            self.total_s / self.count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_is_monotonic() {
        let t = Timer::start("test");
        let a = t.elapsed_s();
        let b = t.elapsed_s();
        assert!(b >= a);
        assert_eq!(t.label(), "test");
        assert!(t.stop() >= 0.0);
    }

    #[test]
    fn accumulating_timer_average() {
        let mut acc = AccumulatingTimer::new();
        assert_eq!(acc.average_seconds(), 0.0);
        acc.record(0.2);
        acc.record(0.4);
        assert_eq!(acc.count(), 2);
        assert!((acc.average_seconds() - 0.3).abs() < 1e-12);
        assert!((acc.max_seconds() - 0.4).abs() < 1e-12);
        acc.reset();
        assert_eq!(acc.count(), 0);
    }
}
