use std::path::PathBuf;

use hl_app::{RunOptions, RunRequest, ensure_run, inspect_plant, list_runs, load_run, save_plant};
use hl_project::PlantFile;

fn plant_in(dir: &str) -> PathBuf {
    let root = std::env::temp_dir().join(dir);
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join("plant.yaml");
    let mut plant = PlantFile::new("smoke");
    plant.run.t_end_s = 5.0;
    plant.run.record_every = 5;
    save_plant(&path, &plant).unwrap();
    path
}

#[test]
fn run_then_load_from_cache() {
    let path = plant_in("hl_app_smoke_cache");
    let request = RunRequest {
        plant_path: &path,
        options: RunOptions::default(),
    };

    let first = ensure_run(&request).unwrap();
    assert!(!first.loaded_from_cache);
    assert!(first.summary.ticks >= 50);
    assert!(!first.summary.halted);
    assert!(first.summary.energy.closure_error < 0.01);

    let second = ensure_run(&request).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(
        second.summary.identity.session_id,
        first.summary.identity.session_id
    );
    assert_eq!(second.summary.record_count, first.summary.record_count);
    let (a, b) = (first.summary.energy, second.summary.energy);
    assert!((a.generator_output_kwh - b.generator_output_kwh).abs() <= 1e-9 * a.generator_output_kwh.abs());

    let runs = list_runs(&path).unwrap();
    assert_eq!(runs.len(), 1);
    let (manifest, records) = load_run(&path, &first.run_id).unwrap();
    assert_eq!(manifest.plant_name, "smoke");
    assert_eq!(records.len(), first.summary.record_count);
}

#[test]
fn overrides_produce_distinct_runs() {
    let path = plant_in("hl_app_smoke_overrides");
    let base = ensure_run(&RunRequest {
        plant_path: &path,
        options: RunOptions::default(),
    })
    .unwrap();
    let longer = ensure_run(&RunRequest {
        plant_path: &path,
        options: RunOptions {
            t_end_s: Some(6.0),
            ..RunOptions::default()
        },
    })
    .unwrap();
    assert_ne!(base.run_id, longer.run_id);
    assert!(longer.summary.time_range.1 > base.summary.time_range.1);
    assert_eq!(list_runs(&path).unwrap().len(), 2);
}

#[test]
fn missing_plant_is_an_error() {
    let path = std::env::temp_dir().join("hl_app_no_such_plant.yaml");
    let result = ensure_run(&RunRequest {
        plant_path: &path,
        options: RunOptions::default(),
    });
    assert!(result.is_err());
}

#[test]
fn inspect_reports_fingerprint() {
    let a = inspect_plant(&PlantFile::new("a")).unwrap();
    let mut other = PlantFile::new("b");
    other.engine.floaters.count = 10;
    let b = inspect_plant(&other).unwrap();
    assert_ne!(a.config_fingerprint, b.config_fingerprint);
}
