//! Risk score and severity bucket calculation
//!
//! Global invariants enforced:
//! - Score is the raw product of probability and impact (1..=100)
//! - Score is monotonically non-decreasing in each input
//! - Out-of-range inputs are clamped, never rejected, so display code cannot fail

use crate::risk::Severity;
use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

/// Score cut-offs; a score strictly above a cut-off reaches that bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        SeverityThresholds {
            medium: 30,
            high: 70,
            critical: 85,
        }
    }
}

/// Clamp a stored rating into 1..=10
pub fn clamp_rating(value: i64) -> u8 {
    value.clamp(MIN_RATING as i64, MAX_RATING as i64) as u8
}

/// Risk score for a probability/impact pair
///
/// Formula: `clamp(probability) * clamp(impact)`, already on a 1..=100 scale.
pub fn score(probability: u8, impact: u8) -> u32 {
    let p = clamp_rating(probability as i64) as u32;
    let i = clamp_rating(impact as i64) as u32;
    p * i
}

/// Assign a severity bucket with default thresholds
pub fn assign_severity(score: u32) -> Severity {
    assign_severity_with_thresholds(score, &SeverityThresholds::default())
}

/// Assign a severity bucket with custom thresholds
pub fn assign_severity_with_thresholds(score: u32, thresholds: &SeverityThresholds) -> Severity {
    if score > thresholds.critical {
        Severity::Critical
    } else if score > thresholds.high {
        Severity::High
    } else if score > thresholds.medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Score and bucket in one pass
pub fn classify(probability: u8, impact: u8, thresholds: &SeverityThresholds) -> (u32, Severity) {
    let s = score(probability, impact);
    (s, assign_severity_with_thresholds(s, thresholds))
}

/// Score for display, preferring a precomputed value
///
/// Externally computed scores win so that a store can publish its own
/// scoring without this crate second-guessing it.
pub fn effective_score(stored: Option<f64>, probability: u8, impact: u8) -> f64 {
    match stored {
        Some(value) if value.is_finite() => value,
        _ => score(probability, impact) as f64,
    }
}
