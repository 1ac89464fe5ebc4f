//! Plant file loading, saving and inspection.

use std::path::Path;

use hl_project::PlantFile;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// What `validate` reports about a plant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantReport {
    pub name: String,
    pub version: u32,
    pub floaters: usize,
    pub loop_length_m: f64,
    pub config_fingerprint: String,
    pub warnings: Vec<String>,
}

/// Load a plant file by extension.
pub fn load_plant(path: &Path) -> AppResult<PlantFile> {
    if !path.exists() {
        return Err(AppError::PlantFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }
    Ok(hl_project::load(path)?)
}

pub fn save_plant(path: &Path, plant: &PlantFile) -> AppResult<()> {
    Ok(hl_project::save(path, plant)?)
}

/// Validate and describe a plant.
pub fn inspect_plant(plant: &PlantFile) -> AppResult<PlantReport> {
    hl_project::validate_plant(plant).map_err(hl_project::ProjectError::from)?;
    Ok(PlantReport {
        name: plant.name.clone(),
        version: plant.version,
        floaters: plant.engine.floater_count(),
        loop_length_m: 2.0 * plant.engine.drivetrain.tank_height_m,
        config_fingerprint: hl_project::config_fingerprint(&plant.engine),
        warnings: hl_project::plant_warnings(plant),
    })
}
