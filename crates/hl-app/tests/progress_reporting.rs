//! Progress events for batch runs.

use hl_app::{RunOptions, RunProgressEvent, RunRequest, RunStage, ensure_run_with_progress};
use hl_project::PlantFile;

fn collect(request: &RunRequest<'_>) -> (hl_app::RunResponse, Vec<RunProgressEvent>) {
    let mut events = Vec::new();
    let response = ensure_run_with_progress(request, Some(&mut |event| events.push(event)))
        .expect("run with progress should succeed");
    (response, events)
}

#[test]
fn stages_are_reported_in_order() {
    let root = std::env::temp_dir().join("hl_app_progress");
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join("plant.json");
    let mut plant = PlantFile::new("progress");
    plant.run.t_end_s = 3.0;
    hl_app::save_plant(&path, &plant).unwrap();

    let request = RunRequest {
        plant_path: &path,
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    };
    let (response, events) = collect(&request);
    assert!(!response.loaded_from_cache);

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::LoadingPlant));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::SavingResults));

    let running: Vec<_> = events.iter().filter_map(|e| e.batch.as_ref()).collect();
    assert!(!running.is_empty());
    assert!(
        running
            .windows(2)
            .all(|w| w[0].sim_time_s < w[1].sim_time_s)
    );
    assert!(events.windows(2).all(|w| w[0].elapsed_wall_s <= w[1].elapsed_wall_s));

    let (_, cached_events) = collect(&RunRequest {
        plant_path: &path,
        options: RunOptions::default(),
    });
    assert!(
        cached_events
            .iter()
            .any(|e| e.stage == RunStage::LoadingCachedResult)
    );
}
