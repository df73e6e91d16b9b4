//! Analytics aggregation - reduce a risk set into dashboard figures
//!
//! Global invariants enforced:
//! - Analytics are strictly derived (never stored, always recomputed)
//! - Empty input yields zeroed output, never an error
//! - Grouping maps are sparse and deterministically ordered
//! - Severity figures use the derived bucket, not the stored field

use crate::matrix::Zone;
use crate::risk::{ApprovalStatus, Category, Risk, Severity, Status};
use crate::scoring::SeverityThresholds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decides whether a risk counts as escalated
///
/// Kept behind a trait so the rule can change without touching aggregation.
pub trait EscalationRule {
    fn is_escalated(&self, risk: &Risk) -> bool;
}

/// Built-in escalation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationPolicy {
    /// Escalated while `analyzing` or `mitigating`
    #[default]
    ActiveHandling,
    /// Escalated when the store flags it (`is_escalated`)
    StoreFlag,
}

impl EscalationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationPolicy::ActiveHandling => "active-handling",
            EscalationPolicy::StoreFlag => "store-flag",
        }
    }
}

impl EscalationRule for EscalationPolicy {
    fn is_escalated(&self, risk: &Risk) -> bool {
        if risk.is_resolved() {
            return false;
        }
        match self {
            EscalationPolicy::ActiveHandling => {
                matches!(risk.status, Status::Analyzing | Status::Mitigating)
            }
            EscalationPolicy::StoreFlag => risk.is_escalated,
        }
    }
}

impl<F> EscalationRule for F
where
    F: Fn(&Risk) -> bool,
{
    fn is_escalated(&self, risk: &Risk) -> bool {
        self(risk)
    }
}

/// Snapshot of aggregate figures for a risk set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RiskAnalytics {
    pub total_risks: usize,
    pub high_severity_count: usize,
    pub escalated_count: usize,
    pub approval_pending: usize,
    pub average_risk_score: f64,
    pub risks_by_category: BTreeMap<Category, usize>,
    pub risks_by_severity: BTreeMap<Severity, usize>,
    pub risks_by_status: BTreeMap<Status, usize>,
}

impl RiskAnalytics {
    /// Zeroed analytics for an empty set
    pub fn empty() -> Self {
        RiskAnalytics {
            total_risks: 0,
            high_severity_count: 0,
            escalated_count: 0,
            approval_pending: 0,
            average_risk_score: 0.0,
            risks_by_category: BTreeMap::new(),
            risks_by_severity: BTreeMap::new(),
            risks_by_status: BTreeMap::new(),
        }
    }

    /// Display band for the average score: > 60 high, > 30 medium
    pub fn average_zone(&self) -> Zone {
        if self.average_risk_score > 60.0 {
            Zone::High
        } else if self.average_risk_score > 30.0 {
            Zone::Medium
        } else {
            Zone::Low
        }
    }
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate with default thresholds and escalation rule
pub fn aggregate(risks: &[Risk]) -> RiskAnalytics {
    aggregate_with(
        risks,
        &SeverityThresholds::default(),
        &EscalationPolicy::default(),
    )
}

/// Aggregate with explicit thresholds and escalation rule
pub fn aggregate_with(
    risks: &[Risk],
    thresholds: &SeverityThresholds,
    escalation: &dyn EscalationRule,
) -> RiskAnalytics {
    if risks.is_empty() {
        return RiskAnalytics::empty();
    }

    let mut analytics = RiskAnalytics::empty();
    let mut score_sum: u64 = 0;

    for risk in risks {
        let score = risk.score();
        let severity = risk.derived_severity(thresholds);
        score_sum += score as u64;

        if severity.is_high_plus() {
            analytics.high_severity_count += 1;
        }
        if escalation.is_escalated(risk) {
            analytics.escalated_count += 1;
        }
        if risk.approval_status == ApprovalStatus::Pending {
            analytics.approval_pending += 1;
        }

        *analytics.risks_by_category.entry(risk.category).or_insert(0) += 1;
        *analytics.risks_by_severity.entry(severity).or_insert(0) += 1;
        *analytics.risks_by_status.entry(risk.status).or_insert(0) += 1;
    }

    analytics.total_risks = risks.len();
    analytics.average_risk_score = round2(score_sum as f64 / risks.len() as f64);

    tracing::debug!(
        total = analytics.total_risks,
        high_plus = analytics.high_severity_count,
        "aggregated risk analytics"
    );

    analytics
}
