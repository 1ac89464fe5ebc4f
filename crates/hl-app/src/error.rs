//! Error types for the hl-app service layer.

use std::path::PathBuf;

/// Unified error for CLI and service front ends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Plant file error: {0}")]
    Project(String),

    #[error("Failed to read plant file: {path}")]
    PlantFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Simulation halted: {0}")]
    Halted(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Simulation service is not running")]
    ServiceStopped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<hl_project::ProjectError> for AppError {
    fn from(err: hl_project::ProjectError) -> Self {
        match err {
            hl_project::ProjectError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<hl_sim::SimError> for AppError {
    fn from(err: hl_sim::SimError) -> Self {
        match err {
            hl_sim::SimError::Halted { .. } => AppError::Halted(err.to_string()),
            other => AppError::Simulation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_sim::{Component, FaultKind, SimError};

    #[test]
    fn halt_maps_to_its_own_variant() {
        let err: AppError = SimError::Halted {
            tick: 7,
            component: Component::Physics,
            kind: FaultKind::InvalidState,
            count: 11,
        }
        .into();
        assert!(matches!(err, AppError::Halted(ref m) if m.contains("tick 7")));
    }

    #[test]
    fn missing_run_keeps_its_id() {
        let err: AppError = hl_project::ProjectError::RunNotFound {
            run_id: "abc".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::RunNotFound(ref id) if id == "abc"));
    }
}
