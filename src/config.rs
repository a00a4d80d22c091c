use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::AlertRules;

/// How the engine decides that school was not in session on a date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffDayStrategy {
    /// Weekend or planned day off.
    #[default]
    Declarative,
    /// Weekend, or every rostered student holds an EXCUSED record that day.
    ExcusedRoster,
}

/// Treatment of EXCUSED records that land on an off-day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcusedOnOffDays {
    /// Count them as excused; only present/late/absent records are dropped.
    #[default]
    Retain,
    /// Drop every record dated on an off-day.
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub off_day_strategy: OffDayStrategy,
    pub excused_on_off_days: ExcusedOnOffDays,
    pub rules: AlertRules,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("invalid engine config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Applies per-rule overrides, leaving unset flags untouched.
    pub fn override_rules(&mut self, overrides: AlertRules) {
        if overrides.absences_30.is_some() {
            self.rules.absences_30 = overrides.absences_30;
        }
        if overrides.lates_30.is_some() {
            self.rules.lates_30 = overrides.lates_30;
        }
        if overrides.absences_total.is_some() {
            self.rules.absences_total = overrides.absences_total;
        }
        if overrides.lates_total.is_some() {
            self.rules.lates_total = overrides.lates_total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_declarative_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config.off_day_strategy, OffDayStrategy::Declarative);
        assert_eq!(config.excused_on_off_days, ExcusedOnOffDays::Retain);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parses_strategy_and_partial_rules() {
        let config = EngineConfig::from_json(
            r#"{"off_day_strategy": "excused_roster", "rules": {"absences_30": 8}}"#,
        )
        .unwrap();
        assert_eq!(config.off_day_strategy, OffDayStrategy::ExcusedRoster);
        assert_eq!(config.rules.absences_30, Some(8));
        assert_eq!(config.rules.lates_total, None);
    }

    #[test]
    fn overrides_only_replace_given_rules() {
        let mut config = EngineConfig::default();
        config.rules.lates_30 = Some(10);
        config.override_rules(AlertRules {
            absences_30: Some(5),
            ..AlertRules::default()
        });
        assert_eq!(config.rules.absences_30, Some(5));
        assert_eq!(config.rules.lates_30, Some(10));
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(EngineConfig::from_json(r#"{"off_day_strategy": "guess"}"#).is_err());
    }
}
