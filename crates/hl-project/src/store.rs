//! Run storage: one directory per run holding a manifest and a JSON-lines
//! snapshot series.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use hl_sim::TickSnapshot;
use serde::{Deserialize, Serialize};

use crate::{ProjectError, ProjectResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    /// Execution that produced the stored series.
    pub session_id: String,
    pub plant_name: String,
    pub config_fingerprint: String,
    /// RFC 3339 start time.
    pub timestamp: String,
    pub t_end_s: f64,
    pub ticks: u64,
    pub fills_completed: u64,
    pub halted: bool,
    pub engine_version: String,
}

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ProjectResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store beside a plant file, under `.hydrolift/runs`.
    pub fn for_plant(plant_path: &Path) -> ProjectResult<Self> {
        let dir = plant_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(dir.join(".hydrolift").join("runs"))
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(
        &self,
        manifest: &RunManifest,
        snapshots: &[std::sync::Arc<TickSnapshot>],
    ) -> ProjectResult<PathBuf> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        let file = fs::File::create(run_dir.join("snapshots.jsonl"))?;
        let mut out = BufWriter::new(file);
        write_jsonl(&mut out, snapshots.iter().map(|s| s.as_ref()))?;
        out.flush()?;

        Ok(run_dir)
    }

    pub fn load_manifest(&self, run_id: &str) -> ProjectResult<RunManifest> {
        let path = self.run_dir(run_id).join("manifest.json");
        if !path.exists() {
            return Err(ProjectError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_snapshots(&self, run_id: &str) -> ProjectResult<Vec<TickSnapshot>> {
        let path = self.run_dir(run_id).join("snapshots.jsonl");
        if !path.exists() {
            return Err(ProjectError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        read_jsonl(BufReader::new(fs::File::open(path)?))
    }

    pub fn list_runs(&self) -> ProjectResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id) {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ProjectResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

/// Write one JSON object per line.
pub fn write_jsonl<'a, W: Write>(
    out: &mut W,
    snapshots: impl IntoIterator<Item = &'a TickSnapshot>,
) -> ProjectResult<()> {
    for snapshot in snapshots {
        serde_json::to_writer(&mut *out, snapshot)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Read a JSON-lines series, skipping blank lines.
pub fn read_jsonl<R: BufRead>(input: R) -> ProjectResult<Vec<TickSnapshot>> {
    let mut snapshots = Vec::new();
    for line in input.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            snapshots.push(serde_json::from_str(&line)?);
        }
    }
    Ok(snapshots)
}
