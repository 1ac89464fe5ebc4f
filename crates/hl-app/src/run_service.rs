//! Headless batch runs and the run cache.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hl_project::{RunManifest, RunStore, compute_run_id, config_fingerprint};
use hl_sim::config::EngineConfig;
use hl_sim::{Engine, EventCategory, FloaterState, SimError, SimEvent, TickSnapshot};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::plant_service;
use crate::progress::{BatchProgress, RunProgressEvent, RunStage};
use crate::summary::{RunIdentity, RunSummary, summarize};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for running a plant file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    /// Overrides the plant's `run.t_end_s`.
    pub t_end_s: Option<f64>,
    /// Overrides the plant's `run.record_every`.
    pub record_every: Option<u32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            t_end_s: None,
            record_every: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub plant_path: &'a Path,
    pub options: RunOptions,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub summary: RunSummary,
}

/// Result of [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Every `record_every`-th snapshot plus the final one.
    pub records: Vec<Arc<TickSnapshot>>,
    pub fills_completed: u64,
    /// Set when the fault budget stopped the run early.
    pub halt: Option<SimError>,
    pub wall_time_s: f64,
}

impl BatchOutcome {
    pub fn last(&self) -> Option<&Arc<TickSnapshot>> {
        self.records.last()
    }
}

/// Run an engine from its initial state to `t_end_s`.
///
/// A halt ends the run early and is reported in the outcome, with the halting
/// tick's snapshot recorded. Progress is reported at most once per percent.
pub fn run_batch(
    config: &EngineConfig,
    t_end_s: f64,
    record_every: u32,
    mut progress_cb: Option<&mut dyn FnMut(BatchProgress)>,
) -> AppResult<BatchOutcome> {
    if !(t_end_s.is_finite() && t_end_s > 0.0) {
        return Err(AppError::InvalidInput(format!(
            "t_end_s must be positive, got {t_end_s}"
        )));
    }
    let record_every = u64::from(record_every.max(1));
    let started = Instant::now();

    let mut engine = Engine::new(config.clone())?;
    let fills = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&fills);
    engine.register_handler(
        EventCategory::Transient,
        Box::new(move |event: &SimEvent| {
            if let SimEvent::FloaterTransition { transition, .. } = event
                && transition.to == FloaterState::Full
            {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }),
    );

    let mut records = Vec::new();
    let mut faulty_ticks = 0;
    let mut next_report = 0.0;
    let mut halt = None;

    while engine.clock().time_s + 1e-9 < t_end_s {
        let snapshot = match engine.step() {
            Ok(snapshot) => snapshot,
            Err(err @ SimError::Halted { .. }) => {
                warn!(%err, "batch run stopped early");
                if let Some(last) = engine.latest() {
                    records.push(last);
                }
                halt = Some(err);
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if !snapshot.faults.is_empty() {
            faulty_ticks += 1;
        }

        let fraction = (snapshot.time_s / t_end_s).min(1.0);
        if let Some(cb) = progress_cb.as_deref_mut()
            && fraction >= next_report
        {
            cb(BatchProgress {
                sim_time_s: snapshot.time_s,
                t_end_s,
                fraction_complete: fraction,
                tick: snapshot.tick,
                faulty_ticks,
                closure_error: snapshot.closure_error(),
            });
            next_report = fraction + 0.01;
        }

        let is_last = engine.clock().time_s + 1e-9 >= t_end_s;
        if snapshot.tick % record_every == 0 || is_last {
            records.push(snapshot);
        }
    }

    let outcome = BatchOutcome {
        records,
        fills_completed: fills.load(Ordering::Relaxed),
        halt,
        wall_time_s: started.elapsed().as_secs_f64(),
    };
    info!(
        ticks = engine.clock().tick,
        records = outcome.records.len(),
        fills = outcome.fills_completed,
        wall_s = outcome.wall_time_s,
        "batch run finished"
    );
    Ok(outcome)
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    batch: Option<BatchProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            batch,
        });
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingPlant,
        started,
        Some("Loading plant".to_string()),
        None,
    );
    let plant = plant_service::load_plant(request.plant_path)?;
    let t_end_s = request.options.t_end_s.unwrap_or(plant.run.t_end_s);
    let record_every = request.options.record_every.unwrap_or(plant.run.record_every);

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );
    // Stored series depend on the sampling stride as well.
    let version = format!("{ENGINE_VERSION}/every={record_every}");
    let run_id = compute_run_id(&plant.engine, t_end_s, &version);
    let fingerprint = config_fingerprint(&plant.engine);
    let store = RunStore::for_plant(request.plant_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            Some("Loading cached run".to_string()),
            None,
        );
        let manifest = store.load_manifest(&run_id)?;
        let records = store.load_snapshots(&run_id)?;
        let identity = identity_from_manifest(&manifest);
        let summary = summarize(identity, &records, manifest.fills_completed)?;

        emit_progress(
            &mut progress_cb,
            RunStage::Completed,
            started,
            Some("Loaded cached run".to_string()),
            None,
        );
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            summary,
        });
    }

    let identity = RunIdentity::new(run_id.clone(), fingerprint.clone());
    emit_progress(
        &mut progress_cb,
        RunStage::Running,
        started,
        Some(format!("Running '{}' to t={t_end_s} s", plant.name)),
        None,
    );
    let outcome = {
        let mut forward = |p: BatchProgress| {
            emit_progress(
                &mut progress_cb,
                RunStage::Running,
                started,
                Some(format!("Tick {} | t={:.2}/{:.2} s", p.tick, p.sim_time_s, p.t_end_s)),
                Some(p),
            );
        };
        run_batch(&plant.engine, t_end_s, record_every, Some(&mut forward))?
    };

    let manifest = RunManifest {
        run_id: run_id.clone(),
        session_id: identity.session_id.to_string(),
        plant_name: plant.name.clone(),
        config_fingerprint: fingerprint,
        timestamp: identity.started_at.to_rfc3339(),
        t_end_s,
        ticks: outcome.last().map_or(0, |s| s.tick),
        fills_completed: outcome.fills_completed,
        halted: outcome.halt.is_some(),
        engine_version: version,
    };

    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving run output".to_string()),
        None,
    );
    store.save_run(&manifest, &outcome.records)?;
    let summary = summarize(identity, &outcome.records, outcome.fills_completed)?;

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        summary,
    })
}

fn identity_from_manifest(manifest: &RunManifest) -> RunIdentity {
    let mut identity = RunIdentity::new(
        manifest.run_id.clone(),
        manifest.config_fingerprint.clone(),
    );
    if let Ok(id) = uuid::Uuid::parse_str(&manifest.session_id) {
        identity.session_id = id;
    }
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(&manifest.timestamp) {
        identity.started_at = at.with_timezone(&chrono::Utc);
    }
    identity
}

/// Stored runs for a plant, most recent first.
pub fn list_runs(plant_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_plant(plant_path)?;
    let mut runs = store.list_runs()?;
    runs.reverse();
    Ok(runs)
}

/// Load a stored run.
pub fn load_run(plant_path: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<TickSnapshot>)> {
    let store = RunStore::for_plant(plant_path)?;
    let manifest = store.load_manifest(run_id)?;
    let records = store.load_snapshots(run_id)?;
    Ok((manifest, records))
}
