//! Early-warning detection
//!
//! Scans a risk set and emits warnings for risks that need attention.
//!
//! Global invariants enforced:
//! - Warnings follow input order; no cross-risk ranking
//! - At most one warning per risk (first matching rule wins)
//! - Current time is read at most once per pass
//! - Resolved risks never warn

use crate::risk::{ApprovalStatus, Risk, Severity, Status};
use crate::scoring::SeverityThresholds;
use crate::trends::Trend;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rule that produced a warning, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningRule {
    CriticalUnapproved,
    StaleHighSeverity,
    RisingTrend,
}

impl WarningRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningRule::CriticalUnapproved => "critical-unapproved",
            WarningRule::StaleHighSeverity => "stale-high-severity",
            WarningRule::RisingTrend => "rising-trend",
        }
    }

    /// Human-readable reason attached to the warning
    pub fn reason(&self) -> &'static str {
        match self {
            WarningRule::CriticalUnapproved => "Critical risk pending approval/mitigation.",
            WarningRule::StaleHighSeverity => {
                "High-severity risk has not progressed from open status."
            }
            WarningRule::RisingTrend => "Risk score trending upward.",
        }
    }

    pub fn level(&self) -> WarningLevel {
        match self {
            WarningRule::CriticalUnapproved => WarningLevel::Critical,
            WarningRule::StaleHighSeverity | WarningRule::RisingTrend => WarningLevel::Warning,
        }
    }
}

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Critical,
    Warning,
}

impl WarningLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningLevel::Critical => "critical",
            WarningLevel::Warning => "warning",
        }
    }
}

/// Derived early-warning signal, never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RiskWarning {
    pub risk_id: i64,
    pub title: String,
    pub reason: String,
    pub severity: WarningLevel,
    pub rule: WarningRule,
}

/// Detector settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarningSettings {
    pub thresholds: SeverityThresholds,
    /// Age after which an open high-severity risk is considered stale
    pub stale_after_days: i64,
    pub trend_warnings: bool,
}

impl Default for WarningSettings {
    fn default() -> Self {
        WarningSettings {
            thresholds: SeverityThresholds::default(),
            stale_after_days: 14,
            trend_warnings: true,
        }
    }
}

/// Detect warnings using the current wall-clock time
pub fn detect_warnings_now(risks: &[Risk], settings: &WarningSettings) -> Vec<RiskWarning> {
    detect_warnings(risks, Utc::now(), settings)
}

/// Detect warnings as of `now`
pub fn detect_warnings(
    risks: &[Risk],
    now: DateTime<Utc>,
    settings: &WarningSettings,
) -> Vec<RiskWarning> {
    // None past chrono's range: no risk can be that old
    let stale_after = Duration::try_days(settings.stale_after_days);

    let warnings: Vec<RiskWarning> = risks
        .iter()
        .filter_map(|risk| {
            first_matching_rule(risk, now, stale_after, settings).map(|rule| RiskWarning {
                risk_id: risk.id,
                title: risk.title.clone(),
                reason: rule.reason().to_string(),
                severity: rule.level(),
                rule,
            })
        })
        .collect();

    tracing::debug!(
        risks = risks.len(),
        warnings = warnings.len(),
        "early-warning pass complete"
    );

    warnings
}

/// Evaluate rules in order for one risk
fn first_matching_rule(
    risk: &Risk,
    now: DateTime<Utc>,
    stale_after: Option<Duration>,
    settings: &WarningSettings,
) -> Option<WarningRule> {
    // Resolved risks are out of the warning pass entirely, critical
    // pending ones included
    if risk.is_resolved() {
        return None;
    }

    let severity = risk.derived_severity(&settings.thresholds);

    if is_critical_unapproved(risk, severity) {
        return Some(WarningRule::CriticalUnapproved);
    }
    if is_stale_high_severity(risk, severity, now, stale_after) {
        return Some(WarningRule::StaleHighSeverity);
    }
    if settings.trend_warnings && risk.trend == Trend::Increasing {
        return Some(WarningRule::RisingTrend);
    }

    None
}

/// Critical and not yet approved (pending or rejected)
fn is_critical_unapproved(risk: &Risk, severity: Severity) -> bool {
    severity == Severity::Critical && risk.approval_status != ApprovalStatus::Approved
}

/// High, still open, and older than the staleness threshold
///
/// Risks without a creation time have no age and never trigger.
fn is_stale_high_severity(
    risk: &Risk,
    severity: Severity,
    now: DateTime<Utc>,
    stale_after: Option<Duration>,
) -> bool {
    if severity != Severity::High || risk.status != Status::Open {
        return false;
    }
    match (risk.age(now), stale_after) {
        (Some(age), Some(limit)) => age > limit,
        _ => false,
    }
}
