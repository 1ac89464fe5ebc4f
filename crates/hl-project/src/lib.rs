//! hl-project: plant file format, validation, fingerprints and run storage.

pub mod hash;
pub mod migrate;
pub mod schema;
pub mod store;
pub mod validate;

pub use hash::{compute_run_id, config_fingerprint};
pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use store::{RunManifest, RunStore};
pub use validate::{ValidationError, plant_warnings, validate_plant};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Unknown file format: {path}")]
    UnknownFormat { path: String },

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<PlantFile> {
    let content = std::fs::read_to_string(path)?;
    let mut plant: PlantFile = serde_yaml::from_str(&content)?;
    plant = migrate_to_latest(plant)?;
    validate_plant(&plant)?;
    Ok(plant)
}

pub fn save_yaml(path: &Path, plant: &PlantFile) -> ProjectResult<()> {
    validate_plant(plant)?;
    let content = serde_yaml::to_string(plant)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<PlantFile> {
    let content = std::fs::read_to_string(path)?;
    let mut plant: PlantFile = serde_json::from_str(&content)?;
    plant = migrate_to_latest(plant)?;
    validate_plant(&plant)?;
    Ok(plant)
}

pub fn save_json(path: &Path, plant: &PlantFile) -> ProjectResult<()> {
    validate_plant(plant)?;
    let content = serde_json::to_string_pretty(plant)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by file extension: `.yaml`/`.yml` or `.json`.
pub fn load(path: &Path) -> ProjectResult<PlantFile> {
    match FileFormat::from_path(path)? {
        FileFormat::Yaml => load_yaml(path),
        FileFormat::Json => load_json(path),
    }
}

/// Save by file extension: `.yaml`/`.yml` or `.json`.
pub fn save(path: &Path, plant: &PlantFile) -> ProjectResult<()> {
    match FileFormat::from_path(path)? {
        FileFormat::Yaml => save_yaml(path, plant),
        FileFormat::Json => save_json(path, plant),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> ProjectResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ProjectError::UnknownFormat {
                path: path.display().to_string(),
            }),
        }
    }
}
