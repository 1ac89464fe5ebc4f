//! Content-based hashing for config fingerprints and run IDs.

use hl_sim::config::EngineConfig;
use sha2::{Digest, Sha256};

/// SHA-256 of the engine parameters' JSON form, hex encoded.
pub fn config_fingerprint(config: &EngineConfig) -> String {
    let mut hasher = Sha256::new();
    let json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identifier for a run: parameters, end time and engine version.
pub fn compute_run_id(config: &EngineConfig, t_end_s: f64, engine_version: &str) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());
    hasher.update(t_end_s.to_le_bytes());
    hasher.update(engine_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
