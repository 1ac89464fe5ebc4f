//! Series extraction from recorded snapshots.

use std::borrow::Borrow;

use hl_sim::TickSnapshot;

use crate::error::{AppError, AppResult};

/// Variables accepted by [`extract_series`].
pub const VARIABLES: &[&str] = &[
    "chain_velocity",
    "omega",
    "acceleration",
    "generator_torque",
    "generator_power",
    "clutch_engagement",
    "tank_pressure",
    "kinetic_energy",
    "flywheel_energy",
    "closure_error",
    "buoyant_floaters",
];

fn value_of(snapshot: &TickSnapshot, variable: &str) -> Option<f64> {
    let v = match variable {
        "chain_velocity" => snapshot.chain_velocity_m_s,
        "omega" => snapshot.omega_rad_s,
        "acceleration" => snapshot.acceleration_m_s2,
        "generator_torque" => snapshot.generator_torque_nm,
        "generator_power" => snapshot.generator_power_w,
        "clutch_engagement" => snapshot.clutch_engagement,
        "tank_pressure" => snapshot.tank_pressure_pa,
        "kinetic_energy" => snapshot.kinetic_energy_j,
        "flywheel_energy" => snapshot.flywheel_energy_j,
        "closure_error" => snapshot.closure_error(),
        "buoyant_floaters" => snapshot.count_in_state(hl_sim::FloaterState::Full) as f64,
        _ => return None,
    };
    Some(v)
}

/// `(time_s, value)` pairs for one variable.
pub fn extract_series<S: Borrow<TickSnapshot>>(
    records: &[S],
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    if !VARIABLES.contains(&variable) {
        return Err(AppError::InvalidInput(format!(
            "unknown variable '{variable}', expected one of: {}",
            VARIABLES.join(", ")
        )));
    }
    Ok(records
        .iter()
        .filter_map(|r| {
            let snapshot: &TickSnapshot = r.borrow();
            value_of(snapshot, variable).map(|v| (snapshot.time_s, v))
        })
        .collect())
}

/// Render a series as `time_s,value` CSV.
pub fn series_csv(series: &[(f64, f64)]) -> String {
    let mut csv = String::from("time_s,value\n");
    for (t, v) in series {
        csv.push_str(&format!("{t},{v}\n"));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_sim::Engine;
    use hl_sim::config::EngineConfig;

    #[test]
    fn every_listed_variable_extracts() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let records: Vec<_> = (0..3).map(|_| engine.step().unwrap()).collect();
        for variable in VARIABLES {
            let series = extract_series(&records, variable).unwrap();
            assert_eq!(series.len(), 3, "{variable}");
        }
        let pressure = extract_series(&records, "tank_pressure").unwrap();
        assert_eq!(pressure[2], (records[2].time_s, records[2].tank_pressure_pa));
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let records: Vec<TickSnapshot> = Vec::new();
        assert!(matches!(
            extract_series(&records, "temperature"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = series_csv(&[(0.1, 2.0), (0.2, 3.5)]);
        assert_eq!(csv, "time_s,value\n0.1,2\n0.2,3.5\n");
    }
}
