//! Store and service tests against an on-disk store

use chrono::{DateTime, TimeZone, Utc};
use riskwatch_core::config::load_and_resolve;
use riskwatch_core::error::TransitionError;
use riskwatch_core::warnings::WarningRule;
use riskwatch_core::{
    ApprovalStatus, Category, JsonStore, NewRisk, ResolvedConfig, RiskService, RiskStore,
    RiskUpdate, Severity, Status, StoreError, Trend,
};
use serde_json::json;
use tempfile::TempDir;

fn clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 9, 30, 0).unwrap()
}

fn open(dir: &TempDir) -> RiskService<JsonStore> {
    let store = JsonStore::open(dir.path()).expect("store should open");
    RiskService::new(store, ResolvedConfig::defaults()).with_clock(clock)
}

fn draft(project_id: i64, title: &str, probability: i64, impact: i64) -> NewRisk {
    NewRisk {
        project_id,
        title: title.to_string(),
        description: String::new(),
        category: Category::Budget,
        probability,
        impact,
        severity: None,
        mitigation_plan: None,
    }
}

#[test]
fn test_lifecycle_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut svc = open(&dir);
        svc.create(draft(1, "Cost overrun", 6, 6)).unwrap();
        svc.update(
            1,
            RiskUpdate {
                status: Some(Status::Mitigating),
                ..Default::default()
            },
        )
        .unwrap();
        svc.approve(1, "pmo-lead").unwrap();
    }

    let svc = open(&dir);
    let risk = svc.get(1).unwrap();
    assert_eq!(risk.status, Status::Mitigating);
    assert_eq!(risk.approval_status, ApprovalStatus::Approved);
    assert_eq!(risk.approved_by.as_deref(), Some("pmo-lead"));
    assert_eq!(risk.created_at, Some(clock()));
    assert_eq!(svc.metrics(1).unwrap().len(), 1);
}

#[test]
fn test_rejected_transition_leaves_disk_state_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut svc = open(&dir);
    svc.create(draft(1, "Contract dispute", 5, 5)).unwrap();
    svc.reject(1, "sponsor").unwrap();

    let before = std::fs::read_to_string(dir.path().join("risks.json")).unwrap();
    let err = svc.approve(1, "someone-else").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Transition(TransitionError::InvalidTransition {
            from: ApprovalStatus::Rejected,
            ..
        })
    ));
    let after = std::fs::read_to_string(dir.path().join("risks.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_rising_score_triggers_trend_warning() {
    let dir = TempDir::new().unwrap();
    let mut svc = open(&dir);
    svc.create(draft(1, "Resource attrition", 2, 2)).unwrap();
    svc.update(
        1,
        RiskUpdate {
            probability: Some(4),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(svc.get(1).unwrap().trend, Trend::Increasing);
    let dashboard = svc.dashboard(None).unwrap();
    assert_eq!(dashboard.warnings.len(), 1);
    assert_eq!(dashboard.warnings[0].rule, WarningRule::RisingTrend);
}

#[test]
fn test_critical_pending_warns_until_approved() {
    let dir = TempDir::new().unwrap();
    let mut svc = open(&dir);
    let risk = svc.create(draft(3, "Data centre outage", 9, 10)).unwrap();
    assert_eq!(risk.severity, Severity::Critical);

    let warnings = svc.dashboard(Some(3)).unwrap().warnings;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].reason, "Critical risk pending approval/mitigation.");

    svc.approve(risk.id, "cto").unwrap();
    assert!(svc.dashboard(Some(3)).unwrap().warnings.is_empty());
}

#[test]
fn test_project_filter_and_listing_order() {
    let dir = TempDir::new().unwrap();
    let mut svc = open(&dir);
    svc.create(draft(1, "A", 2, 2)).unwrap();
    svc.create(draft(2, "B", 3, 3)).unwrap();
    svc.create(draft(1, "C", 4, 4)).unwrap();

    // Same created_at: ties broken by id descending
    let ids: Vec<i64> = svc.list(Some(1)).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 1]);
    assert_eq!(svc.dashboard(Some(2)).unwrap().analytics.total_risks, 1);
    assert_eq!(svc.dashboard(None).unwrap().analytics.total_risks, 3);
}

#[test]
fn test_import_generated_payload() {
    let dir = TempDir::new().unwrap();
    let mut svc = open(&dir);
    let payload = json!([
        {"title": "Regulatory change", "category": "external", "probability": 4, "impact": 8,
         "mitigation_plan": "Track consultation"},
        {"probability": "12"}
    ]);
    let created = svc.import_generated(5, &payload).unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].mitigation_plan.as_deref(), Some("Track consultation"));
    assert_eq!(created[1].probability, 10);
    assert_eq!(created[1].impact, 3);

    let store = svc.into_store();
    assert_eq!(store.list(Some(5)).unwrap().len(), 2);
}

#[test]
fn test_delete_then_missing() {
    let dir = TempDir::new().unwrap();
    let mut svc = open(&dir);
    svc.create(draft(1, "Temporary", 1, 1)).unwrap();
    svc.delete(1).unwrap();
    assert!(matches!(svc.get(1), Err(StoreError::NotFound(1))));
    assert!(matches!(svc.delete(1), Err(StoreError::NotFound(1))));
}

#[test]
fn test_config_thresholds_flow_into_service() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".riskwatchrc.json"),
        r#"{"thresholds": {"medium": 10, "high": 20, "critical": 40}}"#,
    )
    .unwrap();
    let config = load_and_resolve(dir.path(), None).unwrap();

    let store = JsonStore::open(&dir.path().join("data")).unwrap();
    let mut svc = RiskService::new(store, config).with_clock(clock);
    let risk = svc.create(draft(1, "Scope creep", 5, 5)).unwrap();
    assert_eq!(risk.severity, Severity::High);
    assert_eq!(svc.dashboard(None).unwrap().analytics.high_severity_count, 1);
}

#[test]
fn test_corrupt_history_does_not_fail_committed_mutations() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("history.json.zst");
    let mut svc = open(&dir);
    std::fs::write(&history, b"not zstd").unwrap();

    // Create succeeds and persists exactly once
    let risk = svc.create(draft(1, "Vendor lock-in", 4, 4)).unwrap();
    assert_eq!(open(&dir).list(None).unwrap().len(), 1);

    let updated = svc
        .update(
            risk.id,
            RiskUpdate {
                probability: Some(6),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.risk_score, Some(24.0));
    assert_eq!(open(&dir).get(risk.id).unwrap().probability, 6);

    svc.delete(risk.id).unwrap();
    assert!(open(&dir).list(None).unwrap().is_empty());

    // The unreadable history is never overwritten
    assert_eq!(std::fs::read(&history).unwrap(), b"not zstd");
}

#[test]
fn test_oversized_day_settings_are_rejected_before_use() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".riskwatchrc.json"),
        r#"{"trend": {"window_days": 9000000000000000}}"#,
    )
    .unwrap();
    assert!(load_and_resolve(dir.path(), None).is_err());
    assert!(ResolvedConfig::defaults()
        .with_stale_after_days(Some(200_000_000_000_000))
        .is_err());
}
