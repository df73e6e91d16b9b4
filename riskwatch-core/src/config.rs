//! Configuration file support for riskwatch
//!
//! Loads workspace-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.riskwatchrc.json` in the working directory
//! 3. `riskwatch.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::analytics::EscalationPolicy;
use crate::scoring::SeverityThresholds;
use crate::trends::TrendSettings;
use crate::warnings::WarningSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const RC_FILE: &str = ".riskwatchrc.json";
const CONFIG_FILE: &str = "riskwatch.config.json";

/// Upper bound for every day-count setting (about a century)
pub const MAX_DAYS: i64 = 36_500;

/// riskwatch configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskwatchConfig {
    /// Severity score cut-offs
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Early-warning detector settings
    #[serde(default)]
    pub warnings: Option<WarningConfig>,

    /// Trend classification settings
    #[serde(default)]
    pub trend: Option<TrendConfig>,

    /// Which rule counts a risk as escalated (default: active-handling)
    #[serde(default)]
    pub escalation: Option<EscalationPolicy>,
}

/// Severity score cut-offs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Score above which a risk is medium (default: 30)
    pub medium: Option<u32>,
    /// Score above which a risk is high (default: 70)
    pub high: Option<u32>,
    /// Score above which a risk is critical (default: 85)
    pub critical: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarningConfig {
    /// Days an open high-severity risk may sit before warning (default: 14)
    pub stale_after_days: Option<i64>,
    /// Emit "trending upward" warnings (default: true)
    pub trend_warnings: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrendConfig {
    /// Look-back window in days (default: 30)
    pub window_days: Option<i64>,
    /// Percent change needed to leave stable (default: 10.0)
    pub change_percent: Option<f64>,
}

/// Resolved configuration with every default filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub thresholds: SeverityThresholds,
    pub stale_after_days: i64,
    pub trend_warnings: bool,
    pub trend: TrendSettings,
    pub escalation: EscalationPolicy,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl RiskwatchConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref t) = self.thresholds {
            let defaults = SeverityThresholds::default();
            let medium = t.medium.unwrap_or(defaults.medium);
            let high = t.high.unwrap_or(defaults.high);
            let critical = t.critical.unwrap_or(defaults.critical);

            for (name, value) in [("medium", medium), ("high", high), ("critical", critical)] {
                if !(1..=99).contains(&value) {
                    anyhow::bail!(
                        "thresholds.{} must be between 1 and 99 (got {})",
                        name,
                        value
                    );
                }
            }
            if medium >= high {
                anyhow::bail!(
                    "thresholds.medium ({}) must be less than thresholds.high ({})",
                    medium,
                    high
                );
            }
            if high >= critical {
                anyhow::bail!(
                    "thresholds.high ({}) must be less than thresholds.critical ({})",
                    high,
                    critical
                );
            }
        }

        if let Some(ref w) = self.warnings {
            if let Some(days) = w.stale_after_days {
                check_days("warnings.stale_after_days", days)?;
            }
        }

        if let Some(ref t) = self.trend {
            if let Some(days) = t.window_days {
                check_days("trend.window_days", days)?;
            }
            if let Some(pct) = t.change_percent {
                if !pct.is_finite() || pct <= 0.0 {
                    anyhow::bail!("trend.change_percent must be positive (got {})", pct);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into a form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let defaults = SeverityThresholds::default();
        let thresholds = match &self.thresholds {
            Some(t) => SeverityThresholds {
                medium: t.medium.unwrap_or(defaults.medium),
                high: t.high.unwrap_or(defaults.high),
                critical: t.critical.unwrap_or(defaults.critical),
            },
            None => defaults,
        };

        let warning_defaults = WarningSettings::default();
        let (stale_after_days, trend_warnings) = match &self.warnings {
            Some(w) => (
                w.stale_after_days
                    .unwrap_or(warning_defaults.stale_after_days),
                w.trend_warnings.unwrap_or(warning_defaults.trend_warnings),
            ),
            None => (
                warning_defaults.stale_after_days,
                warning_defaults.trend_warnings,
            ),
        };

        let trend_defaults = TrendSettings::default();
        let trend = match &self.trend {
            Some(t) => TrendSettings {
                window_days: t.window_days.unwrap_or(trend_defaults.window_days),
                change_percent: t.change_percent.unwrap_or(trend_defaults.change_percent),
            },
            None => trend_defaults,
        };

        Ok(ResolvedConfig {
            thresholds,
            stale_after_days,
            trend_warnings,
            trend,
            escalation: self.escalation.unwrap_or_default(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Self {
        ResolvedConfig {
            thresholds: SeverityThresholds::default(),
            stale_after_days: WarningSettings::default().stale_after_days,
            trend_warnings: true,
            trend: TrendSettings::default(),
            escalation: EscalationPolicy::default(),
            config_path: None,
        }
    }

    /// Settings handed to the early-warning detector
    pub fn warning_settings(&self) -> WarningSettings {
        WarningSettings {
            thresholds: self.thresholds,
            stale_after_days: self.stale_after_days,
            trend_warnings: self.trend_warnings,
        }
    }

    /// Override the staleness threshold (CLI flag wins over the file)
    pub fn with_stale_after_days(mut self, days: Option<i64>) -> Result<Self> {
        if let Some(days) = days {
            check_days("--stale-after-days", days)?;
            self.stale_after_days = days;
        }
        Ok(self)
    }
}

fn check_days(name: &str, days: i64) -> Result<()> {
    if !(1..=MAX_DAYS).contains(&days) {
        anyhow::bail!("{} must be between 1 and {} (got {})", name, MAX_DAYS, days);
    }
    Ok(())
}

/// First config file present in `root`: `.riskwatchrc.json`, then
/// `riskwatch.config.json`
pub fn discover_config(root: &Path) -> Option<PathBuf> {
    [RC_FILE, CONFIG_FILE]
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Parse and validate one config file
pub fn read_config(path: &Path) -> Result<RiskwatchConfig> {
    let raw = std::fs::read(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: RiskwatchConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("malformed config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

/// Resolve the effective configuration
///
/// An explicit path must exist; otherwise `root` is searched and defaults
/// apply when it holds no config file.
pub fn load_and_resolve(root: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let source = explicit
        .map(Path::to_path_buf)
        .or_else(|| discover_config(root));

    let mut resolved = match &source {
        Some(path) => read_config(path)?.resolve()?,
        None => ResolvedConfig::defaults(),
    };
    resolved.config_path = source;

    tracing::debug!(config = ?resolved.config_path, "configuration resolved");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_resolves_to_defaults() {
        let resolved = RiskwatchConfig::default().resolve().unwrap();
        assert_eq!(resolved, ResolvedConfig::defaults());
        assert_eq!(resolved.thresholds.medium, 30);
        assert_eq!(resolved.thresholds.high, 70);
        assert_eq!(resolved.thresholds.critical, 85);
        assert_eq!(resolved.stale_after_days, 14);
        assert!(resolved.trend_warnings);
        assert_eq!(resolved.trend.window_days, 30);
        assert_eq!(resolved.escalation, EscalationPolicy::ActiveHandling);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "thresholds": { "medium": 20, "high": 50, "critical": 80 },
            "warnings": { "stale_after_days": 7, "trend_warnings": false },
            "trend": { "window_days": 60, "change_percent": 25.0 },
            "escalation": "store-flag"
        }"#;
        let config: RiskwatchConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.thresholds.medium, 20);
        assert_eq!(resolved.thresholds.critical, 80);
        assert_eq!(resolved.stale_after_days, 7);
        assert!(!resolved.trend_warnings);
        assert_eq!(resolved.trend.window_days, 60);
        assert_eq!(resolved.trend.change_percent, 25.0);
        assert_eq!(resolved.escalation, EscalationPolicy::StoreFlag);

        let ws = resolved.warning_settings();
        assert_eq!(ws.stale_after_days, 7);
        assert_eq!(ws.thresholds.high, 50);
    }

    #[test]
    fn test_partial_thresholds_fill_defaults() {
        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"thresholds": {"critical": 90}}"#).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.thresholds.medium, 30);
        assert_eq!(resolved.thresholds.critical, 90);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<RiskwatchConfig, _> = serde_json::from_str(r#"{"colour": "red"}"#);
        assert!(result.is_err(), "unknown fields should be rejected");

        let result: Result<RiskwatchConfig, _> =
            serde_json::from_str(r#"{"thresholds": {"low": 1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_unknown_escalation_policy() {
        let result: Result<RiskwatchConfig, _> =
            serde_json::from_str(r#"{"escalation": "always"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_unordered_thresholds() {
        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"thresholds": {"medium": 70, "high": 30}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_threshold_out_of_range() {
        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"thresholds": {"critical": 100}}"#).unwrap();
        assert!(config.validate().is_err());
        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"thresholds": {"medium": 0}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_bad_warning_and_trend_values() {
        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"warnings": {"stale_after_days": 0}}"#).unwrap();
        assert!(config.validate().is_err());

        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"trend": {"window_days": -3}}"#).unwrap();
        assert!(config.validate().is_err());

        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"trend": {"change_percent": 0.0}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_day_settings_are_capped() {
        let at_cap: RiskwatchConfig = serde_json::from_str(
            r#"{"warnings": {"stale_after_days": 36500}, "trend": {"window_days": 36500}}"#,
        )
        .unwrap();
        assert!(at_cap.validate().is_ok());

        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"warnings": {"stale_after_days": 36501}}"#).unwrap();
        assert!(config.validate().is_err());

        let config: RiskwatchConfig =
            serde_json::from_str(r#"{"trend": {"window_days": 9000000000000000}}"#).unwrap();
        assert!(config.validate().is_err());

        assert!(ResolvedConfig::defaults()
            .with_stale_after_days(Some(200_000_000_000_000))
            .is_err());
        assert_eq!(
            ResolvedConfig::defaults()
                .with_stale_after_days(Some(MAX_DAYS))
                .unwrap()
                .stale_after_days,
            MAX_DAYS
        );
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_and_resolve(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_cli_override_of_stale_days() {
        let resolved = ResolvedConfig::defaults()
            .with_stale_after_days(Some(3))
            .unwrap();
        assert_eq!(resolved.stale_after_days, 3);
        assert!(ResolvedConfig::defaults()
            .with_stale_after_days(Some(0))
            .is_err());
        let unchanged = ResolvedConfig::defaults().with_stale_after_days(None).unwrap();
        assert_eq!(unchanged.stale_after_days, 14);
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".riskwatchrc.json");
        fs::write(&rc, r#"{"warnings": {"stale_after_days": 5}}"#).unwrap();

        assert_eq!(discover_config(dir.path()), Some(rc.clone()));
        let config = read_config(&rc).unwrap();
        assert_eq!(config.warnings.unwrap().stale_after_days, Some(5));
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".riskwatchrc.json"),
            r#"{"escalation": "store-flag"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("riskwatch.config.json"),
            r#"{"escalation": "active-handling"}"#,
        )
        .unwrap();

        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert_eq!(resolved.escalation, EscalationPolicy::StoreFlag);
        assert_eq!(
            resolved.config_path,
            Some(dir.path().join(".riskwatchrc.json"))
        );
    }

    #[test]
    fn test_explicit_path_wins_over_discovery() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".riskwatchrc.json"),
            r#"{"warnings": {"stale_after_days": 5}}"#,
        )
        .unwrap();
        let explicit = dir.path().join("custom.json");
        fs::write(&explicit, r#"{"warnings": {"stale_after_days": 21}}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(resolved.stale_after_days, 21);
        assert_eq!(resolved.config_path, Some(explicit));
    }

    #[test]
    fn test_no_config_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).is_none());
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("riskwatch.config.json");
        fs::write(&path, r#"{"thresholds": {"medium": 90}}"#).unwrap();

        let err = read_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid config in"));
    }
}
