use std::sync::Arc;

use hl_project::{RunManifest, RunStore, compute_run_id, config_fingerprint};
use hl_sim::Engine;
use hl_sim::config::EngineConfig;

#[test]
fn save_and_load_run() {
    let root = std::env::temp_dir().join("hl_project_store_roundtrip");
    let _ = std::fs::remove_dir_all(&root);
    let store = RunStore::new(root.clone()).unwrap();

    let config = EngineConfig::default();
    let mut engine = Engine::new(config.clone()).unwrap();
    let snapshots: Vec<Arc<_>> = (0..5).map(|_| engine.step().unwrap()).collect();

    let manifest = RunManifest {
        run_id: compute_run_id(&config, 0.5, "test"),
        session_id: "00000000-0000-4000-8000-000000000000".to_string(),
        plant_name: "store".to_string(),
        config_fingerprint: config_fingerprint(&config),
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        t_end_s: 0.5,
        ticks: 5,
        fills_completed: 0,
        halted: false,
        engine_version: "test".to_string(),
    };

    store.save_run(&manifest, &snapshots).unwrap();
    assert!(store.has_run(&manifest.run_id));
    assert_eq!(store.load_manifest(&manifest.run_id).unwrap(), manifest);

    let loaded = store.load_snapshots(&manifest.run_id).unwrap();
    assert_eq!(loaded.len(), 5);
    assert_eq!(loaded[4].tick, snapshots[4].tick);
    assert_eq!(loaded[4].floaters.len(), snapshots[4].floaters.len());

    assert_eq!(store.list_runs().unwrap().len(), 1);
    store.delete_run(&manifest.run_id).unwrap();
    assert!(!store.has_run(&manifest.run_id));
    assert!(store.load_manifest(&manifest.run_id).is_err());
}
