use core::f64::consts::{PI, TAU};

/// Sign with zero mapped to zero (unlike `f64::signum`).
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TAU);
    // rem_euclid can return TAU itself for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Shortest angular distance between two angles, in `[0, π]`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = wrap_angle(a - b);
    if d > PI { TAU - d } else { d }
}

/// Whether travelling forward from `from` to `to` (both wrapped) passes `target`.
///
/// The forward arc is `[from, to]` measured counter-clockwise; an arc of zero
/// length contains nothing.
pub fn forward_arc_contains(from: f64, to: f64, target: f64) -> bool {
    let span = wrap_angle(to - from);
    if span == 0.0 {
        return false;
    }
    let offset = wrap_angle(target - from);
    offset > 0.0 && offset <= span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_angle_range() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert!((wrap_angle(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!(wrap_angle(-1e-18) < TAU);
    }

    #[test]
    fn angular_distance_wraps_through_zero() {
        assert!((angular_distance(0.05, TAU - 0.05) - 0.1).abs() < 1e-12);
        assert!((angular_distance(PI, 0.0) - PI).abs() < 1e-12);
    }

    #[test]
    fn forward_arc_across_zero() {
        assert!(forward_arc_contains(TAU - 0.2, 0.2, 0.0));
        assert!(!forward_arc_contains(0.2, 0.4, 0.0));
        assert!(forward_arc_contains(3.0, 3.3, PI));
        assert!(!forward_arc_contains(1.0, 1.0, 1.0));
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
        assert_eq!(sign(2.0), 1.0);
    }
}
