//! riskwatch core library - project risk scoring, analytics and early warnings

// Global invariants enforced in this crate:
// - Score is always probability x impact; the stored severity never drives decisions
// - Analytics, warnings and the matrix are derived on every call, never cached
// - Derivations are pure; the current time is passed in, read once per pass
// - No global mutable state, no threads
// - Identical input yields byte-for-byte identical JSON output

pub mod analytics;
pub mod approval;
pub mod config;
pub mod error;
pub mod history;
pub mod intake;
pub mod matrix;
pub mod report;
pub mod risk;
pub mod scoring;
pub mod service;
pub mod store;
pub mod trends;
pub mod warnings;

pub use analytics::{EscalationPolicy, EscalationRule, RiskAnalytics};
pub use config::ResolvedConfig;
pub use error::{StoreError, TransitionError, ValidationError};
pub use matrix::RiskMatrix;
pub use report::{render_json, render_text, Dashboard};
pub use risk::{ApprovalStatus, Category, NewRisk, Risk, RiskUpdate, Severity, Status};
pub use scoring::SeverityThresholds;
pub use service::RiskService;
pub use store::{JsonStore, MemoryStore, RiskStore};
pub use trends::{RiskMetric, Trend};
pub use warnings::RiskWarning;

use chrono::{DateTime, Utc};

/// Derive the full dashboard for a risk set as of `now`
pub fn evaluate(risks: &[Risk], config: &ResolvedConfig, now: DateTime<Utc>) -> Dashboard {
    Dashboard {
        analytics: analytics::aggregate_with(risks, &config.thresholds, &config.escalation),
        warnings: warnings::detect_warnings(risks, now, &config.warning_settings()),
        matrix: matrix::place_risks(risks, &config.thresholds),
    }
}
