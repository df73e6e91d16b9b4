//! Trend semantics - classify a risk's score movement from its metric history
//!
//! Global invariants enforced:
//! - Only metrics inside the window are considered
//! - Ordering is by `recorded_at`, ties kept in history order
//! - Fewer than two points is always `stable`

use crate::risk::{Risk, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a risk's score over the trend window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

/// Point-in-time record of a risk's rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RiskMetric {
    pub risk_id: i64,
    pub probability: u8,
    pub impact: u8,
    pub risk_score: f64,
    pub severity: Severity,
    pub recorded_at: DateTime<Utc>,
}

impl RiskMetric {
    /// Capture the current rating of a risk
    pub fn capture(risk: &Risk, recorded_at: DateTime<Utc>) -> Self {
        RiskMetric {
            risk_id: risk.id,
            probability: risk.probability,
            impact: risk.impact,
            risk_score: risk.score() as f64,
            severity: risk.severity,
            recorded_at,
        }
    }
}

/// Window and sensitivity for trend classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSettings {
    pub window_days: i64,
    /// Percent change (either direction) needed to leave `stable`
    pub change_percent: f64,
}

impl Default for TrendSettings {
    fn default() -> Self {
        TrendSettings {
            window_days: 30,
            change_percent: 10.0,
        }
    }
}

/// Classify the trend of one risk's metric history
///
/// Formula: `(last - first) / first * 100` over the window, `0` when the
/// first score is zero.
pub fn calculate_trend(
    metrics: &[RiskMetric],
    now: DateTime<Utc>,
    settings: &TrendSettings,
) -> Trend {
    // A window beyond chrono's range reaches back to the first metric
    let cutoff = Duration::try_days(settings.window_days).and_then(|w| now.checked_sub_signed(w));

    let mut window: Vec<&RiskMetric> = metrics
        .iter()
        .filter(|m| cutoff.map_or(true, |c| m.recorded_at >= c))
        .collect();
    if window.len() < 2 {
        return Trend::Stable;
    }

    // Stable sort keeps insertion order for equal timestamps
    window.sort_by_key(|m| m.recorded_at);

    let first = window[0].risk_score;
    let last = window[window.len() - 1].risk_score;

    let diff_percent = if first > 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };

    if diff_percent > settings.change_percent {
        Trend::Increasing
    } else if diff_percent < -settings.change_percent {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}
