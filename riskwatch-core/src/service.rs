//! Mutation orchestration over a `RiskStore`
//!
//! Global invariants enforced:
//! - Input is validated before the store is touched
//! - Every create and every probability/impact change records a metric
//! - `risks.json` is committed before the metric; a metric failure after
//!   the commit is logged, never returned
//! - The stored trend is recomputed whenever a metric is recorded
//! - Dashboards are derived from a fresh store read on every call, with
//!   trends recomputed as of now

use crate::approval;
use crate::config::ResolvedConfig;
use crate::error::{StoreError, ValidationError};
use crate::intake;
use crate::report::Dashboard;
use crate::risk::{ApprovalStatus, NewRisk, Risk, RiskUpdate, Status};
use crate::scoring;
use crate::store::RiskStore;
use crate::trends::{self, RiskMetric, Trend};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Source of the current time
pub type Clock = fn() -> DateTime<Utc>;

pub struct RiskService<S: RiskStore> {
    store: S,
    config: ResolvedConfig,
    clock: Clock,
}

impl<S: RiskStore> RiskService<S> {
    pub fn new(store: S, config: ResolvedConfig) -> Self {
        RiskService {
            store,
            config,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock (tests, replays)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn list(&self, project: Option<i64>) -> Result<Vec<Risk>, StoreError> {
        self.store.list(project)
    }

    pub fn get(&self, id: i64) -> Result<Risk, StoreError> {
        self.store.get(id)
    }

    pub fn metrics(&self, id: i64) -> Result<Vec<RiskMetric>, StoreError> {
        self.store.get(id)?;
        self.store.metrics(id)
    }

    /// Create a risk: open, pending approval, scored
    pub fn create(&mut self, draft: NewRisk) -> Result<Risk, StoreError> {
        draft.validate()?;
        let now = (self.clock)();

        let probability = crate::risk::validate_rating("probability", draft.probability)?;
        let impact = crate::risk::validate_rating("impact", draft.impact)?;
        let (score, derived) = scoring::classify(probability, impact, &self.config.thresholds);

        let risk = Risk {
            id: 0,
            project_id: draft.project_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            probability,
            impact,
            severity: draft.severity.unwrap_or(derived),
            status: Status::Open,
            mitigation_plan: draft.mitigation_plan,
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            risk_score: Some(score as f64),
            trend: Trend::Stable,
            is_escalated: false,
            created_at: Some(now),
            updated_at: None,
        };

        let risk = self.store.insert(risk)?;
        self.record_committed(RiskMetric::capture(&risk, now));
        Ok(risk)
    }

    /// Apply a partial update
    pub fn update(&mut self, id: i64, update: RiskUpdate) -> Result<Risk, StoreError> {
        update.validate()?;
        let mut risk = self.store.get(id)?;
        let now = (self.clock)();

        if let Some(title) = update.title.as_deref() {
            risk.title = title.trim().to_string();
        }
        if let Some(description) = update.description.clone() {
            risk.description = description;
        }
        if let Some(category) = update.category {
            risk.category = category;
        }
        if let Some(mitigation_plan) = update.mitigation_plan.clone() {
            risk.mitigation_plan = Some(mitigation_plan);
        }
        if let Some(status) = update.status {
            risk.status = status;
        }
        if let Some(p) = update.probability {
            risk.probability = crate::risk::validate_rating("probability", p)?;
        }
        if let Some(i) = update.impact {
            risk.impact = crate::risk::validate_rating("impact", i)?;
        }

        if update.touches_score() {
            let (score, derived) =
                scoring::classify(risk.probability, risk.impact, &self.config.thresholds);
            risk.risk_score = Some(score as f64);
            risk.severity = update.severity.unwrap_or(derived);
        } else if let Some(severity) = update.severity {
            risk.severity = severity;
        }
        risk.updated_at = Some(now);

        let metric = update.touches_score().then(|| RiskMetric::capture(&risk, now));
        if let Some(metric) = &metric {
            let mut history = self.store.metrics(id)?;
            history.push(metric.clone());
            risk.trend = trends::calculate_trend(&history, now, &self.config.trend);
        }

        self.store.save(&risk)?;
        if let Some(metric) = metric {
            self.record_committed(metric);
        }
        Ok(risk)
    }

    pub fn delete(&mut self, id: i64) -> Result<Risk, StoreError> {
        self.store.remove(id)
    }

    pub fn approve(&mut self, id: i64, approver: &str) -> Result<Risk, StoreError> {
        let approver = require_approver(approver)?;
        let mut risk = self.store.get(id)?;
        approval::approve(&mut risk, approver)?;
        self.store.save(&risk)?;
        Ok(risk)
    }

    pub fn reject(&mut self, id: i64, approver: &str) -> Result<Risk, StoreError> {
        let approver = require_approver(approver)?;
        let mut risk = self.store.get(id)?;
        approval::reject(&mut risk, approver)?;
        self.store.save(&risk)?;
        Ok(risk)
    }

    /// Create risks from a generated payload, normalising every entry
    pub fn import_generated(
        &mut self,
        project_id: i64,
        payload: &Value,
    ) -> Result<Vec<Risk>, StoreError> {
        if project_id <= 0 {
            return Err(ValidationError::InvalidProject(project_id).into());
        }

        let items = intake::entries(payload)?;
        let mut created = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match intake::normalize(project_id, item, &self.config.thresholds) {
                Some(draft) => created.push(self.create(draft)?),
                None => tracing::warn!(index = idx, "skipping generated entry that is not an object"),
            }
        }

        tracing::info!(project_id, imported = created.len(), "generated risks imported");
        Ok(created)
    }

    /// Recompute and store the trend from metric history
    pub fn refresh_trend(&mut self, id: i64) -> Result<Trend, StoreError> {
        let mut risk = self.store.get(id)?;
        let history = self.store.metrics(id)?;
        let trend = trends::calculate_trend(&history, (self.clock)(), &self.config.trend);

        if trend != risk.trend {
            risk.trend = trend;
            self.store.save(&risk)?;
        }
        Ok(trend)
    }

    /// Analytics, warnings and matrix for the current store contents
    ///
    /// Trends are recomputed from metric history as of now, so a stored
    /// trend whose metrics left the window no longer warns.
    pub fn dashboard(&self, project: Option<i64>) -> Result<Dashboard, StoreError> {
        let now = (self.clock)();
        let mut risks = self.store.list(project)?;
        for risk in &mut risks {
            let history = self.store.metrics(risk.id)?;
            risk.trend = trends::calculate_trend(&history, now, &self.config.trend);
        }
        Ok(crate::evaluate(&risks, &self.config, now))
    }

    /// Record a metric for a risk that is already persisted
    fn record_committed(&mut self, metric: RiskMetric) {
        let risk_id = metric.risk_id;
        if let Err(e) = self.store.record_metric(metric) {
            tracing::warn!(risk_id, error = %e, "risk saved but metric not recorded");
        }
    }
}

fn require_approver(approver: &str) -> Result<&str, ValidationError> {
    let approver = approver.trim();
    if approver.is_empty() {
        return Err(ValidationError::Blank("approver"));
    }
    Ok(approver)
}
