// hl-core/src/units.rs

use uom::si::f64::{
    AngularVelocity as UomAngularVelocity, Energy as UomEnergy, Power as UomPower,
    Pressure as UomPressure,
};

// Public canonical unit types (SI, f64)
pub type AngularVelocity = UomAngularVelocity;
pub type Energy = UomEnergy;
pub type Power = UomPower;
pub type Pressure = UomPressure;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn joules(v: f64) -> Energy {
    use uom::si::energy::joule;
    Energy::new::<joule>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn rad_per_s(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

/// Reporting conversions used by run summaries and the CLI.
pub mod report {
    use super::*;

    pub fn bar(p: Pressure) -> f64 {
        p.get::<uom::si::pressure::bar>()
    }

    pub fn kwh(e: Energy) -> f64 {
        e.get::<uom::si::energy::kilowatt_hour>()
    }

    pub fn kw(p: Power) -> f64 {
        p.get::<uom::si::power::kilowatt>()
    }

    pub fn rpm(w: AngularVelocity) -> f64 {
        w.get::<uom::si::angular_velocity::revolution_per_minute>()
    }
}

pub mod constants {
    pub const G0_MPS2: f64 = 9.81;
    pub const RHO_WATER_KG_M3: f64 = 1000.0;
    pub const P_ATM_PA: f64 = 101_325.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = pa(101_325.0);
        let _e = joules(1.0);
        let _w = watts(1.0);
    }

    #[test]
    fn report_conversions() {
        assert!((report::bar(pa(1.0e5)) - 1.0).abs() < 1e-12);
        assert!((report::kwh(joules(3.6e6)) - 1.0).abs() < 1e-12);
        assert!((report::kw(watts(2500.0)) - 2.5).abs() < 1e-12);
        let one_rev_per_s = rad_per_s(core::f64::consts::TAU);
        assert!((report::rpm(one_rev_per_s) - 60.0).abs() < 1e-9);
    }
}
