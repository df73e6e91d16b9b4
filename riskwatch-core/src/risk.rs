//! Risk record model
//!
//! Canonical representation of a single risk, its closed enumerations and
//! the validated inputs used to create or modify one.
//!
//! Global invariants enforced:
//! - Enumerations are closed sets; unknown text is a `ValidationError`
//! - Probability and impact are validated to 1..=10 before they reach the store
//! - The stored `severity` is operator metadata; decisions use the derived bucket

use crate::error::ValidationError;
use crate::scoring::{self, SeverityThresholds};
use crate::trends::Trend;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schedule,
    Budget,
    Resource,
    Technical,
    External,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Schedule,
        Category::Budget,
        Category::Resource,
        Category::Technical,
        Category::External,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Schedule => "schedule",
            Category::Budget => "budget",
            Category::Resource => "resource",
            Category::Technical => "technical",
            Category::External => "external",
        }
    }
}

/// Severity bucket, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High or critical
    pub fn is_high_plus(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

/// Operational lifecycle status
///
/// The progression is linear but not enforced as forward-only; an operator
/// may move a risk back (e.g. `mitigating -> analyzing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Analyzing,
    Mitigating,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Open,
        Status::Analyzing,
        Status::Mitigating,
        Status::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Analyzing => "analyzing",
            Status::Mitigating => "mitigating",
            Status::Resolved => "resolved",
        }
    }
}

/// Approval sub-state, independent of the operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

macro_rules! text_enum {
    ($ty:ident, $field:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase();
                $(
                    if needle == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(ValidationError::UnknownValue {
                    field: $field,
                    value: s.to_string(),
                })
            }
        }
    };
}

text_enum!(Category, "category", [Schedule, Budget, Resource, Technical, External]);
text_enum!(Severity, "severity", [Low, Medium, High, Critical]);
text_enum!(Status, "status", [Open, Analyzing, Mitigating, Resolved]);
text_enum!(ApprovalStatus, "approval_status", [Pending, Approved, Rejected]);

/// A risk as held by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Risk {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub probability: u8,
    pub impact: u8,
    /// Operator-facing severity; may be stale relative to probability x impact
    pub severity: Severity,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation_plan: Option<String>,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Precomputed score, preferred over recomputation when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub trend: Trend,
    /// Escalation flag maintained by the store
    #[serde(default)]
    pub is_escalated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Risk {
    /// Authoritative score, always derived from probability x impact
    pub fn score(&self) -> u32 {
        scoring::score(self.probability, self.impact)
    }

    /// Authoritative severity bucket for system decisions
    pub fn derived_severity(&self, thresholds: &SeverityThresholds) -> Severity {
        scoring::assign_severity_with_thresholds(self.score(), thresholds)
    }

    /// Score for list views: stored value if present, else recomputed
    pub fn display_score(&self) -> f64 {
        scoring::effective_score(self.risk_score, self.probability, self.impact)
    }

    pub fn is_resolved(&self) -> bool {
        self.status == Status::Resolved
    }

    /// Time since creation, `None` when the store did not record it
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|created| now - created)
    }
}

/// Validated input for creating a risk
#[derive(Debug, Clone, PartialEq)]
pub struct NewRisk {
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub probability: i64,
    pub impact: i64,
    /// Operator override; derived from the score when absent
    pub severity: Option<Severity>,
    pub mitigation_plan: Option<String>,
}

impl NewRisk {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id <= 0 {
            return Err(ValidationError::InvalidProject(self.project_id));
        }
        validate_title(&self.title)?;
        validate_rating("probability", self.probability)?;
        validate_rating("impact", self.impact)?;
        Ok(())
    }
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub probability: Option<i64>,
    pub impact: Option<i64>,
    pub severity: Option<Severity>,
    pub mitigation_plan: Option<String>,
    pub status: Option<Status>,
}

impl RiskUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(p) = self.probability {
            validate_rating("probability", p)?;
        }
        if let Some(i) = self.impact {
            validate_rating("impact", i)?;
        }
        Ok(())
    }

    /// True when the update changes the inputs to the score
    pub fn touches_score(&self) -> bool {
        self.probability.is_some() || self.impact.is_some()
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

/// Check a probability/impact rating and narrow it to `u8`
pub fn validate_rating(field: &'static str, value: i64) -> Result<u8, ValidationError> {
    if (scoring::MIN_RATING as i64..=scoring::MAX_RATING as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

#[cfg(test)]
pub(crate) fn test_risk(id: i64, probability: u8, impact: u8) -> Risk {
    Risk {
        id,
        project_id: 1,
        title: format!("Risk {}", id),
        description: String::new(),
        category: Category::Technical,
        probability,
        impact,
        severity: Severity::Low,
        status: Status::Open,
        mitigation_plan: None,
        approval_status: ApprovalStatus::Pending,
        approved_by: None,
        risk_score: None,
        trend: Trend::Stable,
        is_escalated: false,
        created_at: None,
        updated_at: None,
    }
}
