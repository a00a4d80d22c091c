//! Chronic-absence threshold evaluation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dates;
use crate::engine::AttendanceEngine;
use crate::error::Result;
use crate::models::{AlertNotification, AlertResult, AlertRules, Timeframe};
use crate::store::{DayOffStore, RecordStore};

pub const ROLLING_WINDOW_DAYS: i64 = 30;

/// Rule kinds in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "absences_30")]
    Absences30,
    #[serde(rename = "lates_30")]
    Lates30,
    #[serde(rename = "absences_total")]
    AbsencesTotal,
    #[serde(rename = "lates_total")]
    LatesTotal,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Absences30,
        AlertKind::Lates30,
        AlertKind::AbsencesTotal,
        AlertKind::LatesTotal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Absences30 => "absences_30",
            AlertKind::Lates30 => "lates_30",
            AlertKind::AbsencesTotal => "absences_total",
            AlertKind::LatesTotal => "lates_total",
        }
    }

    pub fn threshold(&self, rules: &AlertRules) -> Option<u32> {
        match self {
            AlertKind::Absences30 => rules.absences_30,
            AlertKind::Lates30 => rules.lates_30,
            AlertKind::AbsencesTotal => rules.absences_total,
            AlertKind::LatesTotal => rules.lates_total,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AlertKind::Absences30 => "absences in last 30 days",
            AlertKind::Lates30 => "lates in last 30 days",
            AlertKind::AbsencesTotal => "total absences",
            AlertKind::LatesTotal => "total lates",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertKind {
    type Err = crate::error::AttendanceError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        AlertKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                crate::error::AttendanceError::invalid_argument(
                    "kind",
                    format!("unknown alert kind {value:?}"),
                )
            })
    }
}

/// Observed values for every rule kind at one reference date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    pub absences_30: u32,
    pub lates_30: u32,
    pub absences_total: u32,
    pub lates_total: u32,
}

impl Measurements {
    pub fn value(&self, kind: AlertKind) -> u32 {
        match kind {
            AlertKind::Absences30 => self.absences_30,
            AlertKind::Lates30 => self.lates_30,
            AlertKind::AbsencesTotal => self.absences_total,
            AlertKind::LatesTotal => self.lates_total,
        }
    }
}

/// One rule whose actual value met or exceeded its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breach {
    pub kind: AlertKind,
    pub actual: u32,
    pub threshold: u32,
}

impl Breach {
    pub fn reason(&self) -> String {
        format!(
            "{} ({}) >= threshold ({})",
            self.kind.label(),
            self.actual,
            self.threshold
        )
    }
}

/// Compares measurements against configured rules. Breach is inclusive at
/// the threshold and results follow [`AlertKind::ALL`] order.
pub fn evaluate_rules(measurements: &Measurements, rules: &AlertRules) -> Vec<Breach> {
    AlertKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let threshold = kind.threshold(rules)?;
            let actual = measurements.value(kind);
            (actual >= threshold).then_some(Breach {
                kind,
                actual,
                threshold,
            })
        })
        .collect()
}

pub fn alert_result(breaches: &[Breach]) -> AlertResult {
    let reasons: Vec<String> = breaches.iter().map(Breach::reason).collect();
    AlertResult {
        should_alert: !reasons.is_empty(),
        reasons,
    }
}

/// Delivery channel for breach notifications.
pub trait Notifier {
    fn send(&self, notification: &AlertNotification) -> anyhow::Result<()>;
}

/// Notifier that only records the breach in the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: &AlertNotification) -> anyhow::Result<()> {
        info!(
            student_id = %notification.student_id,
            when = %notification.when,
            reasons = ?notification.reasons,
            "attendance alert raised"
        );
        Ok(())
    }
}

impl<'a, S> AttendanceEngine<'a, S>
where
    S: RecordStore + DayOffStore,
{
    pub fn measure(&self, student_id: &str, as_of: NaiveDate) -> Result<Measurements> {
        let (start, end) = dates::rolling_window("as_of", as_of, ROLLING_WINDOW_DAYS)?;
        let window = self.history_between(student_id, Timeframe::Daily, start, end)?;
        let totals = self.year_to_date_summary(student_id, None)?;

        Ok(Measurements {
            absences_30: window.iter().map(|bucket| bucket.absent()).sum(),
            lates_30: window.iter().map(|bucket| bucket.late()).sum(),
            absences_total: totals.absent,
            lates_total: totals.late,
        })
    }

    pub fn evaluate_breaches(
        &self,
        student_id: &str,
        as_of_iso: &str,
        rules: &AlertRules,
    ) -> Result<Vec<Breach>> {
        let as_of = dates::parse_iso_date("as_of", as_of_iso)?;
        let measurements = self.measure(student_id, as_of)?;
        Ok(evaluate_rules(&measurements, rules))
    }

    pub fn check_thresholds(
        &self,
        student_id: &str,
        as_of_iso: &str,
        rules: &AlertRules,
    ) -> Result<AlertResult> {
        let breaches = self.evaluate_breaches(student_id, as_of_iso, rules)?;
        Ok(alert_result(&breaches))
    }

    /// Checks thresholds and sends exactly one notification when any rule
    /// breaches.
    pub fn notify_if_breached(
        &self,
        student_id: &str,
        as_of_iso: &str,
        rules: &AlertRules,
        notifier: &dyn Notifier,
    ) -> Result<AlertResult> {
        let result = self.check_thresholds(student_id, as_of_iso, rules)?;
        if !result.should_alert {
            return Ok(result);
        }

        let notification = AlertNotification {
            student_id: student_id.to_string(),
            when: dates::parse_iso_date("as_of", as_of_iso)?,
            reasons: result.reasons.clone(),
        };
        if let Err(error) = notifier.send(&notification) {
            warn!(student_id, error = %error, "notifier failed");
            return Err(error.into());
        }
        info!(student_id, reasons = result.reasons.len(), "breach notification sent");
        Ok(result)
    }
}
