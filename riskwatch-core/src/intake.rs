//! Intake of risks produced by an automated analysis process
//!
//! Generated entries are loosely typed JSON. Normalisation never rejects an
//! entry for a bad field value; it substitutes a default instead:
//! - unknown or missing category becomes `external`
//! - missing probability/impact becomes 3, then clamped into 1..=10
//! - missing title becomes "Unnamed Risk"
//! - missing or unknown severity is derived from the score

use crate::risk::{Category, NewRisk, Severity};
use crate::scoring::{self, SeverityThresholds};
use anyhow::Result;
use serde_json::Value;

pub const DEFAULT_TITLE: &str = "Unnamed Risk";
pub const DEFAULT_RATING: i64 = 3;

/// Split a generated payload into entries
///
/// Accepts either a bare array or an object with a `risks` array.
pub fn entries(payload: &Value) -> Result<Vec<Value>> {
    match payload {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => match map.get("risks") {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => anyhow::bail!("generated payload: `risks` must be an array"),
            None => Ok(Vec::new()),
        },
        _ => anyhow::bail!("generated payload must be an array or an object with `risks`"),
    }
}

/// Normalise one generated entry into a creatable risk
///
/// Returns `None` for entries that are not JSON objects.
pub fn normalize(
    project_id: i64,
    item: &Value,
    thresholds: &SeverityThresholds,
) -> Option<NewRisk> {
    let obj = item.as_object()?;

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    let category = text("category")
        .and_then(|c| c.parse::<Category>().ok())
        .unwrap_or(Category::External);

    let probability = scoring::clamp_rating(rating(obj.get("probability")));
    let impact = scoring::clamp_rating(rating(obj.get("impact")));

    let severity = text("severity")
        .and_then(|s| s.parse::<Severity>().ok())
        .unwrap_or_else(|| {
            scoring::assign_severity_with_thresholds(
                scoring::score(probability, impact),
                thresholds,
            )
        });

    let title = text("title")
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    Some(NewRisk {
        project_id,
        title,
        description: text("description").unwrap_or_default(),
        category,
        probability: probability as i64,
        impact: impact as i64,
        severity: Some(severity),
        mitigation_plan: text("mitigation_plan"),
    })
}

/// Read a rating that may arrive as a number or numeric string
fn rating(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(DEFAULT_RATING),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_RATING),
        _ => DEFAULT_RATING,
    }
}
