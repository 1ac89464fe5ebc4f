//! Mechanical energy accounting closes over whole runs.

use hl_sim::config::EngineConfig;
use hl_sim::{ClutchMode, Engine, GeneratorSetpoint, ParameterUpdate};

const TOLERANCE: f64 = 0.01;

fn assert_closes(config: EngineConfig, seconds: f64) -> Engine {
    let mut engine = Engine::new(config).unwrap();
    while engine.clock().time_s < seconds {
        let snap = engine.step().unwrap();
        let err = snap.closure_error();
        assert!(
            err < TOLERANCE,
            "tick {}: closure error {err:.2e} (ke {:.1} J, expected {:.1} J)",
            snap.tick,
            snap.kinetic_energy_j,
            snap.energy.expected_kinetic_j()
        );
    }
    engine
}

#[test]
fn default_plant_closes() {
    let engine = assert_closes(EngineConfig::default(), 60.0);
    let ledger = engine.ledger();
    assert!(ledger.hydrostatic_work_j > 0.0);
    assert!(ledger.generator_output_j > 0.0);
    assert!(ledger.drag_loss_j > 0.0);
    assert!(ledger.injection_work_j > 0.0);
}

#[test]
fn always_engaged_closes() {
    let mut config = EngineConfig::default();
    config.clutch.mode = ClutchMode::AlwaysEngaged;
    assert_closes(config, 60.0);
}

#[test]
fn threshold_clutch_closes() {
    let mut config = EngineConfig::default();
    config.clutch.mode = ClutchMode::Threshold { torque_nm: 2_000.0 };
    assert_closes(config, 40.0);
}

#[test]
fn closes_without_flywheel() {
    let mut config = EngineConfig::default();
    config.drivetrain.flywheel_enabled = false;
    assert_closes(config, 30.0);
}

#[test]
fn closes_across_parameter_updates() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    engine.run_until(10.0).unwrap();
    engine.queue_update(ParameterUpdate::GeneratorSetpoint {
        setpoint: GeneratorSetpoint::Power { target_w: 5_000.0 },
    });
    engine.queue_update(ParameterUpdate::GeneratorGains {
        kp: 0.5,
        ki: 0.5,
        kd: 0.0,
    });
    engine.queue_update(ParameterUpdate::ClutchMode {
        mode: ClutchMode::AlwaysEngaged,
    });
    while engine.clock().time_s < 30.0 {
        let snap = engine.step().unwrap();
        assert!(snap.closure_error() < TOLERANCE, "tick {}", snap.tick);
    }
}

#[test]
fn generator_output_is_efficiency_share() {
    let engine = assert_closes(EngineConfig::default(), 20.0);
    let ledger = engine.ledger();
    let mechanical = ledger.generator_output_j + ledger.generator_loss_j;
    let eta = engine.config().generator.efficiency;
    assert!((ledger.generator_output_j - eta * mechanical).abs() <= 1e-6 * mechanical.max(1.0));
}
