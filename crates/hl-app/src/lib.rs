//! Shared application service layer for hydrolift.
//!
//! Front ends go through this crate for plant files, headless batch runs,
//! stored results and the threaded live runtime.

pub mod error;
pub mod plant_service;
pub mod progress;
pub mod query;
pub mod run_service;
pub mod runtime;
pub mod slot;
pub mod summary;

pub use error::{AppError, AppResult};
pub use plant_service::{PlantReport, inspect_plant, load_plant, save_plant};
pub use progress::{BatchProgress, RunProgressEvent, RunStage};
pub use query::{extract_series, series_csv};
pub use run_service::{
    BatchOutcome, ENGINE_VERSION, RunOptions, RunRequest, RunResponse, ensure_run,
    ensure_run_with_progress, list_runs, load_run, run_batch,
};
pub use runtime::{ServiceCommand, ServiceState, SimulationService};
pub use slot::LatestSlot;
pub use summary::{EnergyReport, RunIdentity, RunSummary, summarize};
