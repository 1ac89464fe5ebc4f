//! Plant file validation.

use hl_sim::ConfigError;

use crate::schema::PlantFile;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid engine parameters: {0}")]
    Engine(#[from] ConfigError),

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_plant(plant: &PlantFile) -> Result<(), ValidationError> {
    if plant.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: plant.version,
        });
    }

    if plant.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: format!("{:?}", plant.name),
            reason: "must not be empty".to_string(),
        });
    }

    let run = &plant.run;
    if !(run.t_end_s.is_finite() && run.t_end_s > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "run.t_end_s".to_string(),
            value: run.t_end_s.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if run.record_every == 0 {
        return Err(ValidationError::InvalidValue {
            field: "run.record_every".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if let Some(rtf) = run.real_time_factor
        && !(rtf.is_finite() && rtf > 0.0)
    {
        return Err(ValidationError::InvalidValue {
            field: "run.real_time_factor".to_string(),
            value: rtf.to_string(),
            reason: "must be positive".to_string(),
        });
    }

    plant.engine.validate()?;
    Ok(())
}

/// Non-fatal findings: engine warnings plus file-level notes.
pub fn plant_warnings(plant: &PlantFile) -> Vec<String> {
    let mut warnings = plant.engine.warnings();
    let dt = plant.engine.timestep.dt_s;
    if plant.run.t_end_s < dt {
        warnings.push(format!(
            "run.t_end_s {} is shorter than one tick ({dt} s)",
            plant.run.t_end_s
        ));
    }
    warnings
}
