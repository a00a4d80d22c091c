//! Persisted chronic-absence alerts and their lifecycle.
//!
//! An alert opens as `ACTIVE`. Staff may dismiss it, or mark the parent as
//! notified; either an active or a parent-notified alert can later be
//! resolved. `DISMISSED` and `RESOLVED` are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AttendanceError, Result};
use crate::models::AlertRules;
use crate::thresholds::{AlertKind, Breach};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    Active,
    Dismissed,
    ParentNotified,
    Resolved,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Active => "ACTIVE",
            AlertState::Dismissed => "DISMISSED",
            AlertState::ParentNotified => "PARENT_NOTIFIED",
            AlertState::Resolved => "RESOLVED",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, AlertState::Active | AlertState::ParentNotified)
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = AttendanceError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "ACTIVE" => Ok(AlertState::Active),
            "DISMISSED" => Ok(AlertState::Dismissed),
            "PARENT_NOTIFIED" => Ok(AlertState::ParentNotified),
            "RESOLVED" => Ok(AlertState::Resolved),
            other => Err(AttendanceError::invalid_argument(
                "state",
                format!("unknown alert state {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub student_id: String,
    pub kind: AlertKind,
    pub threshold: u32,
    pub count: u32,
    pub state: AlertState,
    pub notification_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn open(student_id: impl Into<String>, breach: &Breach, now: DateTime<Utc>) -> Self {
        Alert {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            kind: breach.kind,
            threshold: breach.threshold,
            count: breach.actual,
            state: AlertState::Active,
            notification_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reason(&self) -> String {
        Breach {
            kind: self.kind,
            actual: self.count,
            threshold: self.threshold,
        }
        .reason()
    }

    pub fn dismiss(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(AlertState::Dismissed, "dismiss", &[AlertState::Active], now)
    }

    pub fn mark_parent_notified(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(
            AlertState::ParentNotified,
            "mark parent notified on",
            &[AlertState::Active],
            now,
        )?;
        self.notification_sent = true;
        Ok(())
    }

    pub fn resolve(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(
            AlertState::Resolved,
            "resolve",
            &[AlertState::Active, AlertState::ParentNotified],
            now,
        )
    }

    /// Refreshes the observed count and the threshold it was compared
    /// against, without touching the state.
    pub fn update_count(&mut self, breach: &Breach, now: DateTime<Utc>) {
        self.count = breach.actual;
        self.threshold = breach.threshold;
        self.updated_at = now;
    }

    fn transition(
        &mut self,
        to: AlertState,
        action: &'static str,
        allowed_from: &[AlertState],
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !allowed_from.contains(&self.state) {
            return Err(AttendanceError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        debug!(alert_id = %self.id, from = %self.state, to = %to, "alert transition");
        self.state = to;
        self.updated_at = now;
        Ok(())
    }
}

/// Brings a student's stored alerts in line with a fresh evaluation.
///
/// Open alerts of a breached kind get their count and threshold refreshed,
/// breached kinds without an open alert get a new `ACTIVE` one, and open
/// alerts whose kind is configured in `rules` but no longer breaches are
/// resolved. Alerts of a kind `rules` does not configure were not evaluated
/// and stay as they are. Dismissed alerts are left alone and do not
/// suppress a new alert. Returns every alert that changed or was created.
pub fn reconcile_alerts(
    existing: &mut [Alert],
    student_id: &str,
    rules: &AlertRules,
    breaches: &[Breach],
    now: DateTime<Utc>,
) -> Result<Vec<Alert>> {
    let mut touched = Vec::new();

    for alert in existing
        .iter_mut()
        .filter(|alert| alert.student_id == student_id && alert.state.is_open())
    {
        match breaches.iter().find(|breach| breach.kind == alert.kind) {
            Some(breach)
                if breach.actual != alert.count || breach.threshold != alert.threshold =>
            {
                alert.update_count(breach, now);
                touched.push(alert.clone());
            }
            Some(_) => {}
            None if alert.kind.threshold(rules).is_none() => {}
            None => {
                alert.resolve(now)?;
                touched.push(alert.clone());
            }
        }
    }

    for breach in breaches {
        let already_open = existing.iter().any(|alert| {
            alert.student_id == student_id && alert.kind == breach.kind && alert.state.is_open()
        });
        if !already_open {
            touched.push(Alert::open(student_id, breach, now));
        }
    }

    Ok(touched)
}
