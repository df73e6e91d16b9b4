//! Risk persistence
//!
//! Global invariants enforced:
//! - Identity is assigned by the store, monotonically increasing, never reused
//! - Listing is newest first by `created_at`, ties broken by id descending
//! - Writes are atomic (temp file + rename); a failed write leaves the
//!   previous state intact on disk and in memory
//! - Schema version is checked on every load

use crate::error::StoreError;
use crate::history::{self, MetricHistory};
use crate::risk::Risk;
use crate::trends::RiskMetric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STORE_SCHEMA_VERSION: u32 = 1;

/// Default store directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = ".riskwatch";

const RISKS_FILE: &str = "risks.json";

/// Storage boundary for risk records and their metric history
pub trait RiskStore {
    /// All risks, optionally restricted to one project, newest first
    fn list(&self, project: Option<i64>) -> Result<Vec<Risk>, StoreError>;

    fn get(&self, id: i64) -> Result<Risk, StoreError>;

    /// Persist a new risk, assigning its id; the incoming `id` is ignored
    fn insert(&mut self, risk: Risk) -> Result<Risk, StoreError>;

    /// Replace an existing risk
    fn save(&mut self, risk: &Risk) -> Result<(), StoreError>;

    /// Delete a risk and its metric history
    fn remove(&mut self, id: i64) -> Result<Risk, StoreError>;

    /// Metric history for one risk, in recording order
    fn metrics(&self, risk_id: i64) -> Result<Vec<RiskMetric>, StoreError>;

    fn record_metric(&mut self, metric: RiskMetric) -> Result<(), StoreError>;
}

/// Sort newest first; risks without `created_at` sort last
pub fn sort_newest_first(risks: &mut [Risk]) {
    risks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn select(risks: &[Risk], project: Option<i64>) -> Vec<Risk> {
    let mut selected: Vec<Risk> = risks
        .iter()
        .filter(|r| project.map_or(true, |p| r.project_id == p))
        .cloned()
        .collect();
    sort_newest_first(&mut selected);
    selected
}

/// Serialized contents of `risks.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFile {
    pub schema_version: u32,
    pub next_id: i64,
    pub risks: Vec<Risk>,
}

impl RiskFile {
    pub fn new() -> Self {
        RiskFile {
            schema_version: STORE_SCHEMA_VERSION,
            next_id: 1,
            risks: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut file: RiskFile =
            serde_json::from_str(json).context("failed to deserialize risk store from JSON")?;

        if file.schema_version != STORE_SCHEMA_VERSION {
            anyhow::bail!(
                "risk store schema version mismatch: expected {}, got {}",
                STORE_SCHEMA_VERSION,
                file.schema_version
            );
        }

        // A hand-edited file must not cause id reuse
        let max_id = file.risks.iter().map(|r| r.id).max().unwrap_or(0);
        if file.next_id <= max_id {
            file.next_id = max_id + 1;
        }

        Ok(file)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize risk store to JSON")
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.risks.iter().position(|r| r.id == id)
    }

    fn take_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for RiskFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `path` with `contents` via a hidden sibling and a rename
///
/// The sibling is removed again when any step fails.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create store directory {}", dir.display()))?;

    let name = path
        .file_name()
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let staging = dir.join(format!(".{}.partial", name.to_string_lossy()));

    let written = write_synced(&staging, contents).and_then(|()| {
        std::fs::rename(&staging, path)
            .with_context(|| format!("cannot move {} into place", path.display()))
    });
    if written.is_err() {
        let _ = std::fs::remove_file(&staging);
    }
    written
}

fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("cannot write {}", path.display()))
}

/// File-backed store rooted at a data directory
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    file: RiskFile,
}

impl JsonStore {
    /// Open the store at `dir`, starting empty when no file exists yet
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(RISKS_FILE);
        let file = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read risk store: {}", path.display()))?;
            RiskFile::from_json(&json)
                .with_context(|| format!("invalid risk store: {}", path.display()))?
        } else {
            RiskFile::new()
        };

        tracing::debug!(dir = %dir.display(), risks = file.risks.len(), "opened risk store");

        Ok(JsonStore {
            dir: dir.to_path_buf(),
            file,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn risks_path(&self) -> PathBuf {
        self.dir.join(RISKS_FILE)
    }

    /// Persist `next` and adopt it only once the write succeeded
    fn commit(&mut self, next: RiskFile) -> Result<(), StoreError> {
        let json = next.to_json()?;
        atomic_write(&self.risks_path(), json.as_bytes())?;
        self.file = next;
        Ok(())
    }

    fn forget_metrics(&self, id: i64) -> Result<()> {
        let mut history = history::load_history(&self.dir)?;
        if history.forget(id) > 0 {
            history::write_history(&self.dir, &history)?;
        }
        Ok(())
    }
}

impl RiskStore for JsonStore {
    fn list(&self, project: Option<i64>) -> Result<Vec<Risk>, StoreError> {
        Ok(select(&self.file.risks, project))
    }

    fn get(&self, id: i64) -> Result<Risk, StoreError> {
        self.file
            .risks
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn insert(&mut self, mut risk: Risk) -> Result<Risk, StoreError> {
        let mut next = self.file.clone();
        risk.id = next.take_id();
        next.risks.push(risk.clone());
        self.commit(next)?;
        tracing::info!(risk_id = risk.id, project_id = risk.project_id, "risk created");
        Ok(risk)
    }

    fn save(&mut self, risk: &Risk) -> Result<(), StoreError> {
        let mut next = self.file.clone();
        let idx = next.position(risk.id).ok_or(StoreError::NotFound(risk.id))?;
        next.risks[idx] = risk.clone();
        self.commit(next)?;
        tracing::info!(risk_id = risk.id, "risk saved");
        Ok(())
    }

    fn remove(&mut self, id: i64) -> Result<Risk, StoreError> {
        let mut next = self.file.clone();
        let idx = next.position(id).ok_or(StoreError::NotFound(id))?;
        let removed = next.risks.remove(idx);
        self.commit(next)?;
        tracing::info!(risk_id = id, "risk deleted");

        // The deletion is committed; history cleanup only logs on failure
        if let Err(e) = self.forget_metrics(id) {
            tracing::warn!(risk_id = id, error = %e, "metric history not cleaned up");
        }
        Ok(removed)
    }

    fn metrics(&self, risk_id: i64) -> Result<Vec<RiskMetric>, StoreError> {
        Ok(history::read_history_lossy(&self.dir).for_risk(risk_id))
    }

    fn record_metric(&mut self, metric: RiskMetric) -> Result<(), StoreError> {
        // Strict load: a corrupt history must not be silently replaced
        let mut history = history::load_history(&self.dir)?;
        history.metrics.push(metric);
        history::write_history(&self.dir, &history)?;
        Ok(())
    }
}

/// In-process store with the same semantics as `JsonStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    file: RiskFile,
    history: MetricHistory,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing risks, keeping their ids
    pub fn with_risks(risks: Vec<Risk>) -> Self {
        let next_id = risks.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        MemoryStore {
            file: RiskFile {
                schema_version: STORE_SCHEMA_VERSION,
                next_id,
                risks,
            },
            history: MetricHistory::default(),
        }
    }
}

impl RiskStore for MemoryStore {
    fn list(&self, project: Option<i64>) -> Result<Vec<Risk>, StoreError> {
        Ok(select(&self.file.risks, project))
    }

    fn get(&self, id: i64) -> Result<Risk, StoreError> {
        self.file
            .risks
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn insert(&mut self, mut risk: Risk) -> Result<Risk, StoreError> {
        risk.id = self.file.take_id();
        self.file.risks.push(risk.clone());
        Ok(risk)
    }

    fn save(&mut self, risk: &Risk) -> Result<(), StoreError> {
        let idx = self
            .file
            .position(risk.id)
            .ok_or(StoreError::NotFound(risk.id))?;
        self.file.risks[idx] = risk.clone();
        Ok(())
    }

    fn remove(&mut self, id: i64) -> Result<Risk, StoreError> {
        let idx = self.file.position(id).ok_or(StoreError::NotFound(id))?;
        self.history.forget(id);
        Ok(self.file.risks.remove(idx))
    }

    fn metrics(&self, risk_id: i64) -> Result<Vec<RiskMetric>, StoreError> {
        Ok(self.history.for_risk(risk_id))
    }

    fn record_metric(&mut self, metric: RiskMetric) -> Result<(), StoreError> {
        self.history.metrics.push(metric);
        Ok(())
    }
}
