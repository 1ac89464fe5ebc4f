//! Run summaries in reporting units.

use std::borrow::Borrow;

use chrono::{DateTime, Utc};
use hl_core::report::{bar, kw, kwh, rpm};
use hl_core::{joules, pa, rad_per_s, watts};
use hl_sim::{EngineStatus, TickSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Identity of one executed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Content hash of parameters, end time and engine version.
    pub run_id: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub config_fingerprint: String,
}

impl RunIdentity {
    pub fn new(run_id: String, config_fingerprint: String) -> Self {
        Self {
            run_id,
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            config_fingerprint,
        }
    }
}

/// Energy totals, kWh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyReport {
    pub hydrostatic_kwh: f64,
    pub generator_output_kwh: f64,
    pub generator_loss_kwh: f64,
    pub drag_loss_kwh: f64,
    pub friction_loss_kwh: f64,
    pub compressor_input_kwh: f64,
    pub injection_work_kwh: f64,
    pub vent_loss_kwh: f64,
    /// Relative mismatch of the mechanical energy balance.
    pub closure_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub identity: RunIdentity,
    pub time_range: (f64, f64),
    pub ticks: u64,
    pub record_count: usize,
    pub halted: bool,
    /// Faults seen in the recorded snapshots.
    pub fault_count: usize,
    pub fills_completed: u64,
    pub mean_power_kw: f64,
    pub peak_speed_rpm: f64,
    pub final_tank_bar: f64,
    pub energy: EnergyReport,
}

/// Summarise a recorded series. Totals come from the last record's ledger.
pub fn summarize<S: Borrow<TickSnapshot>>(
    identity: RunIdentity,
    records: &[S],
    fills_completed: u64,
) -> AppResult<RunSummary> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    };
    let first = as_snapshot(first);
    let last = as_snapshot(last);

    let ledger = &last.energy;
    let energy = EnergyReport {
        hydrostatic_kwh: kwh(joules(ledger.hydrostatic_work_j)),
        generator_output_kwh: kwh(joules(ledger.generator_output_j)),
        generator_loss_kwh: kwh(joules(ledger.generator_loss_j)),
        drag_loss_kwh: kwh(joules(ledger.drag_loss_j)),
        friction_loss_kwh: kwh(joules(ledger.friction_loss_j)),
        compressor_input_kwh: kwh(joules(ledger.compressor_input_j)),
        injection_work_kwh: kwh(joules(ledger.injection_work_j)),
        vent_loss_kwh: kwh(joules(ledger.vent_loss_j)),
        closure_error: last.closure_error(),
    };

    let mean_power_w = if last.time_s > 0.0 {
        ledger.generator_output_j / last.time_s
    } else {
        0.0
    };
    let peak_omega = records
        .iter()
        .map(|r| as_snapshot(r).omega_rad_s.abs())
        .fold(0.0, f64::max);

    Ok(RunSummary {
        identity,
        time_range: (first.time_s, last.time_s),
        ticks: last.tick,
        record_count: records.len(),
        halted: matches!(last.status, EngineStatus::Halted { .. }),
        fault_count: records.iter().map(|r| as_snapshot(r).faults.len()).sum(),
        fills_completed,
        mean_power_kw: kw(watts(mean_power_w)),
        peak_speed_rpm: rpm(rad_per_s(peak_omega)),
        final_tank_bar: bar(pa(last.tank_pressure_pa)),
        energy,
    })
}

fn as_snapshot<S: Borrow<TickSnapshot>>(record: &S) -> &TickSnapshot {
    record.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_sim::Engine;
    use hl_sim::config::EngineConfig;

    fn identity() -> RunIdentity {
        RunIdentity::new("run".to_string(), "fp".to_string())
    }

    #[test]
    fn empty_series_is_rejected() {
        let records: Vec<TickSnapshot> = Vec::new();
        assert!(summarize(identity(), &records, 0).is_err());
    }

    #[test]
    fn converts_to_reporting_units() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let records: Vec<_> = (0..50).map(|_| engine.step().unwrap()).collect();
        let summary = summarize(identity(), &records, 0).unwrap();

        let last = records.last().unwrap();
        assert_eq!(summary.ticks, 50);
        assert_eq!(summary.record_count, 50);
        assert!((summary.final_tank_bar - last.tank_pressure_pa / 1e5).abs() < 1e-9);
        let expected_kwh = last.energy.hydrostatic_work_j / 3.6e6;
        assert!((summary.energy.hydrostatic_kwh - expected_kwh).abs() < 1e-12);
        let peak = records.iter().map(|r| r.omega_rad_s.abs()).fold(0.0, f64::max);
        assert!((summary.peak_speed_rpm - peak * 60.0 / std::f64::consts::TAU).abs() < 1e-9);
        assert!(!summary.halted);
    }

    #[test]
    fn summary_serialises() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let records = vec![engine.step().unwrap()];
        let summary = summarize(identity(), &records, 3).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fills_completed, 3);
        assert_eq!(back.identity.session_id, summary.identity.session_id);
    }
}
