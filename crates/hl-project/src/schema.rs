//! On-disk plant description.

use hl_sim::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// A plant file: engine parameters plus the default run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantFile {
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub run: RunDef,
}

impl PlantFile {
    /// A plant with default parameters at the latest file version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: name.into(),
            description: None,
            engine: EngineConfig::default(),
            run: RunDef::default(),
        }
    }
}

/// Default settings for running a plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDef {
    /// Simulated end time (s).
    pub t_end_s: f64,
    /// Keep every n-th snapshot when recording.
    pub record_every: u32,
    /// Wall-clock pacing for live runs; `None` runs as fast as possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_time_factor: Option<f64>,
}

impl Default for RunDef {
    fn default() -> Self {
        Self {
            t_end_s: 60.0,
            record_every: 10,
            real_time_factor: None,
        }
    }
}
