//! On-disk metric history for trend analysis.
//!
//! Stored as zstd-compressed JSON (`history.json.zst`) next to `risks.json`.
//! Every create and every probability/impact change appends one
//! `RiskMetric`; entries for a deleted risk are dropped with it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::trends::RiskMetric;

pub const HISTORY_SCHEMA_VERSION: u32 = 1;

const HISTORY_FILE: &str = "history.json.zst";

/// zstd compression level
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricHistory {
    pub schema_version: u32,
    pub metrics: Vec<RiskMetric>,
}

impl Default for MetricHistory {
    fn default() -> Self {
        MetricHistory {
            schema_version: HISTORY_SCHEMA_VERSION,
            metrics: Vec::new(),
        }
    }
}

impl MetricHistory {
    /// Metrics for one risk, in recording order
    pub fn for_risk(&self, risk_id: i64) -> Vec<RiskMetric> {
        self.metrics
            .iter()
            .filter(|m| m.risk_id == risk_id)
            .cloned()
            .collect()
    }

    /// Drop every metric belonging to `risk_id`
    pub fn forget(&mut self, risk_id: i64) -> usize {
        let before = self.metrics.len();
        self.metrics.retain(|m| m.risk_id != risk_id);
        before - self.metrics.len()
    }
}

pub fn history_path(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_FILE)
}

/// Load history, treating an absent file as empty.
///
/// Errors (corrupt or unreadable file) are returned; callers that only read
/// may choose to degrade to an empty history.
pub fn load_history(data_dir: &Path) -> Result<MetricHistory> {
    let path = history_path(data_dir);
    if !path.exists() {
        return Ok(MetricHistory::default());
    }

    let compressed = std::fs::read(&path)
        .with_context(|| format!("failed to read metric history: {}", path.display()))?;
    let bytes = zstd::decode_all(compressed.as_slice())
        .with_context(|| format!("failed to decompress metric history: {}", path.display()))?;
    let json = std::str::from_utf8(&bytes).context("metric history is not valid UTF-8")?;
    let history: MetricHistory =
        serde_json::from_str(json).context("failed to parse metric history JSON")?;

    if history.schema_version != HISTORY_SCHEMA_VERSION {
        anyhow::bail!(
            "history schema version mismatch: expected {}, got {}",
            HISTORY_SCHEMA_VERSION,
            history.schema_version
        );
    }

    Ok(history)
}

/// Load history for read-only use; unreadable files degrade to empty.
pub fn read_history_lossy(data_dir: &Path) -> MetricHistory {
    match load_history(data_dir) {
        Ok(history) => history,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load metric history (treating as empty)");
            MetricHistory::default()
        }
    }
}

/// Write history to disk (zstd level 3, atomic replace)
pub fn write_history(data_dir: &Path, history: &MetricHistory) -> Result<()> {
    let path = history_path(data_dir);
    let json = serde_json::to_string(history).context("failed to serialize metric history")?;
    let compressed = zstd::encode_all(json.as_bytes(), COMPRESSION_LEVEL)
        .context("failed to compress metric history")?;
    crate::store::atomic_write(&path, &compressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::Severity;
    use chrono::{TimeZone, Utc};

    fn metric(risk_id: i64, score: f64) -> RiskMetric {
        RiskMetric {
            risk_id,
            probability: 2,
            impact: 3,
            risk_score: score,
            severity: Severity::Low,
            recorded_at: Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_absent_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = load_history(dir.path()).unwrap();
        assert!(history.metrics.is_empty());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let history = MetricHistory {
            schema_version: HISTORY_SCHEMA_VERSION,
            metrics: vec![metric(1, 6.0), metric(2, 9.0), metric(1, 12.0)],
        };
        write_history(dir.path(), &history).unwrap();

        let loaded = load_history(dir.path()).unwrap();
        assert_eq!(loaded, history);
        let scores: Vec<f64> = loaded.for_risk(1).iter().map(|m| m.risk_score).collect();
        assert_eq!(scores, vec![6.0, 12.0]);
    }

    #[test]
    fn test_forget_drops_only_that_risk() {
        let mut history = MetricHistory {
            schema_version: HISTORY_SCHEMA_VERSION,
            metrics: vec![metric(1, 6.0), metric(2, 9.0), metric(1, 12.0)],
        };
        assert_eq!(history.forget(1), 2);
        assert_eq!(history.metrics.len(), 1);
        assert_eq!(history.metrics[0].risk_id, 2);
    }

    #[test]
    fn test_corrupt_file_errors_but_lossy_read_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(history_path(dir.path()), b"not zstd").unwrap();
        assert!(load_history(dir.path()).is_err());
        assert!(read_history_lossy(dir.path()).metrics.is_empty());
    }
}
