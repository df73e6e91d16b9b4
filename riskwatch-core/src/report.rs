//! Dashboard assembly and rendering
//!
//! Global invariants enforced:
//! - Rendering never reorders the warning list or the matrix entries
//! - JSON output is deterministic (struct field order, BTreeMap keys)

use crate::analytics::RiskAnalytics;
use crate::matrix::{RiskMatrix, Zone, GRID_SIZE};
use crate::risk::Risk;
use crate::trends::RiskMetric;
use crate::warnings::RiskWarning;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Everything the dashboard view shows for one risk set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Dashboard {
    pub analytics: RiskAnalytics,
    pub warnings: Vec<RiskWarning>,
    pub matrix: RiskMatrix,
}

/// Label for the average score band
pub fn average_label(analytics: &RiskAnalytics) -> &'static str {
    match analytics.average_zone() {
        Zone::High => "High",
        Zone::Medium => "Medium",
        Zone::Low => "Low",
    }
}

/// Render any serializable output as pretty JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output to JSON")
}

pub fn render_json(dashboard: &Dashboard) -> Result<String> {
    to_json(dashboard)
}

/// Render the full dashboard as text
pub fn render_text(dashboard: &Dashboard) -> String {
    let mut output = String::new();
    output.push_str(&render_analytics_text(&dashboard.analytics));
    output.push('\n');
    output.push_str(&render_warnings_text(&dashboard.warnings));
    output.push('\n');
    output.push_str(&render_matrix_text(&dashboard.matrix));
    output
}

pub fn render_analytics_text(analytics: &RiskAnalytics) -> String {
    let mut output = String::new();

    output.push_str("Risk Analytics\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!("{:<24} {}\n", "Total risks", analytics.total_risks));
    output.push_str(&format!(
        "{:<24} {}\n",
        "High severity", analytics.high_severity_count
    ));
    output.push_str(&format!("{:<24} {}\n", "Escalated", analytics.escalated_count));
    output.push_str(&format!(
        "{:<24} {}\n",
        "Pending approval", analytics.approval_pending
    ));
    output.push_str(&format!(
        "{:<24} {:.2} ({})\n",
        "Average score",
        analytics.average_risk_score,
        average_label(analytics)
    ));

    let groups: [(&str, Vec<(&str, usize)>); 3] = [
        (
            "By category",
            analytics
                .risks_by_category
                .iter()
                .map(|(k, v)| (k.as_str(), *v))
                .collect(),
        ),
        (
            "By severity",
            analytics
                .risks_by_severity
                .iter()
                .map(|(k, v)| (k.as_str(), *v))
                .collect(),
        ),
        (
            "By status",
            analytics
                .risks_by_status
                .iter()
                .map(|(k, v)| (k.as_str(), *v))
                .collect(),
        ),
    ];

    for (heading, counts) in groups {
        if counts.is_empty() {
            continue;
        }
        output.push_str(&format!("\n{}\n", heading));
        for (name, count) in counts {
            output.push_str(&format!("  {:<22} {}\n", name, count));
        }
    }

    output
}

pub fn render_warnings_text(warnings: &[RiskWarning]) -> String {
    if warnings.is_empty() {
        return "No early warnings.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!("Early Warnings ({})\n", warnings.len()));
    output.push_str(&"=".repeat(60));
    output.push('\n');
    for w in warnings {
        output.push_str(&format!(
            "{:<9} #{:<5} {} - {}\n",
            w.severity.as_str().to_uppercase(),
            w.risk_id,
            truncate_or_pad(&w.title, 30).trim_end(),
            w.reason
        ));
    }
    output
}

fn zone_glyph(zone: Zone) -> &'static str {
    match zone {
        Zone::Low => ".",
        Zone::Medium => "~",
        Zone::High => "#",
    }
}

/// Render the 10x10 grid, impact 10 at the top, probability left to right
pub fn render_matrix_text(matrix: &RiskMatrix) -> String {
    const CELL: usize = 6;
    let mut output = String::new();

    output.push_str("Risk Matrix (rows: impact, columns: probability)\n");
    output.push_str(&"=".repeat(4 + CELL * GRID_SIZE));
    output.push('\n');

    for row in matrix.rows.iter().rev() {
        let impact = row.first().map(|c| c.impact).unwrap_or(0);
        output.push_str(&format!("{:>3} ", impact));
        for cell in row {
            let label = match &cell.occupant {
                Some(o) if cell.hidden > 0 => format!("{}+{}", o.risk_id, cell.hidden),
                Some(o) => o.risk_id.to_string(),
                None => zone_glyph(cell.zone).to_string(),
            };
            output.push_str(&format!("{:>width$}", label, width = CELL));
        }
        output.push('\n');
    }

    output.push_str("    ");
    for p in 1..=GRID_SIZE {
        output.push_str(&format!("{:>width$}", p, width = CELL));
    }
    output.push('\n');
    output.push_str("    . low   ~ medium   # high   N+k: risk N shown, k more in cell\n");

    if !matrix.entries.is_empty() {
        output.push_str(&format!(
            "\n{:<6} {:<32} {:>4} {:>4} {:>7}\n",
            "ID", "TITLE", "P", "I", "SCORE"
        ));
        for e in &matrix.entries {
            output.push_str(&format!(
                "{:<6} {:<32} {:>4} {:>4} {:>7.1}\n",
                e.risk_id,
                truncate_or_pad(&e.title, 32),
                e.probability,
                e.impact,
                e.score
            ));
        }
    }

    output
}

/// Tabular risk listing
pub fn render_risk_list(risks: &[Risk]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<6} {:<8} {:<30} {:<10} {:>3} {:>3} {:>6} {:<9} {:<11} {:<9}\n",
        "ID", "PROJECT", "TITLE", "CATEGORY", "P", "I", "SCORE", "SEVERITY", "STATUS", "APPROVAL"
    ));
    output.push_str(&"-".repeat(104));
    output.push('\n');
    for r in risks {
        output.push_str(&format!(
            "{:<6} {:<8} {:<30} {:<10} {:>3} {:>3} {:>6.1} {:<9} {:<11} {:<9}\n",
            r.id,
            r.project_id,
            truncate_or_pad(&r.title, 30),
            r.category.as_str(),
            r.probability,
            r.impact,
            r.display_score(),
            r.severity.as_str(),
            r.status.as_str(),
            r.approval_status.as_str()
        ));
    }
    output
}

/// Detail view of one risk and its metric history
pub fn render_risk_detail(risk: &Risk, history: &[RiskMetric]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Risk #{}: {}\n", risk.id, risk.title));
    output.push_str(&"=".repeat(60));
    output.push('\n');

    let mut field = |name: &str, value: String| {
        output.push_str(&format!("{:<18} {}\n", name, value));
    };
    field("Project", risk.project_id.to_string());
    field("Category", risk.category.to_string());
    field(
        "Probability/Impact",
        format!("{} x {} = {}", risk.probability, risk.impact, risk.score()),
    );
    field("Severity", risk.severity.to_string());
    field("Status", risk.status.to_string());
    field(
        "Approval",
        match &risk.approved_by {
            Some(by) => format!("{} by {}", risk.approval_status, by),
            None => risk.approval_status.to_string(),
        },
    );
    field("Trend", risk.trend.as_str().to_string());
    if let Some(created) = risk.created_at {
        field("Created", created.to_rfc3339());
    }
    if let Some(updated) = risk.updated_at {
        field("Updated", updated.to_rfc3339());
    }
    if !risk.description.is_empty() {
        field("Description", risk.description.clone());
    }
    if let Some(ref plan) = risk.mitigation_plan {
        field("Mitigation", plan.clone());
    }

    if !history.is_empty() {
        output.push_str("\nHistory\n");
        for m in history {
            output.push_str(&format!(
                "  {}  {:>2} x {:<2} {:>6.1}  {}\n",
                m.recorded_at.format("%Y-%m-%d %H:%M"),
                m.probability,
                m.impact,
                m.risk_score,
                m.severity
            ));
        }
    }

    output
}

/// Truncate or pad string to a fixed display width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::risk::test_risk;
    use chrono::{TimeZone, Utc};

    fn dashboard() -> Dashboard {
        let risks = vec![test_risk(1, 9, 9), test_risk(2, 2, 2), test_risk(3, 5, 7)];
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        crate::evaluate(&risks, &ResolvedConfig::defaults(), now)
    }

    #[test]
    fn test_average_label_bands() {
        let mut analytics = RiskAnalytics::empty();
        assert_eq!(average_label(&analytics), "Low");
        analytics.average_risk_score = 40.0;
        assert_eq!(average_label(&analytics), "Medium");
        analytics.average_risk_score = 60.01;
        assert_eq!(average_label(&analytics), "High");
    }

    #[test]
    fn test_render_text_sections() {
        let text = render_text(&dashboard());
        assert!(text.contains("Total risks              3"));
        assert!(text.contains("40.00 (Medium)"));
        assert!(text.contains("No early warnings."));
        assert!(text.contains("Risk Matrix"));
    }

    #[test]
    fn test_matrix_text_puts_high_impact_first() {
        let text = render_matrix_text(&dashboard().matrix);
        let rows: Vec<&str> = text.lines().skip(2).take(GRID_SIZE).collect();
        assert!(rows[0].trim_start().starts_with("10"));
        assert!(rows[9].trim_start().starts_with('1'));
        // risk 1 at impact 9 -> second grid row
        assert!(rows[1].split_whitespace().any(|t| t == "1"));
    }

    #[test]
    fn test_matrix_text_marks_hidden_risks() {
        let risks = vec![test_risk(4, 3, 3), test_risk(5, 3, 3)];
        let matrix = crate::matrix::place_risks(&risks, &Default::default());
        assert!(render_matrix_text(&matrix).contains("4+1"));
    }

    #[test]
    fn test_warning_text_preserves_order() {
        let warnings = vec![
            RiskWarning {
                risk_id: 8,
                title: "B".to_string(),
                reason: "Risk score trending upward.".to_string(),
                severity: crate::warnings::WarningLevel::Warning,
                rule: crate::warnings::WarningRule::RisingTrend,
            },
            RiskWarning {
                risk_id: 2,
                title: "A".to_string(),
                reason: "Critical risk pending approval/mitigation.".to_string(),
                severity: crate::warnings::WarningLevel::Critical,
                rule: crate::warnings::WarningRule::CriticalUnapproved,
            },
        ];
        let text = render_warnings_text(&warnings);
        let first = text.find("#8").unwrap();
        let second = text.find("#2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_json_is_deterministic() {
        let a = render_json(&dashboard()).unwrap();
        let b = render_json(&dashboard()).unwrap();
        assert_eq!(a, b);
        let parsed: Dashboard = serde_json::from_str(&a).unwrap();
        assert_eq!(parsed.analytics.total_risks, 3);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate_or_pad("ééééééé", 5), "éé...");
        assert_eq!(truncate_or_pad("ab", 4), "ab  ");
    }
}
