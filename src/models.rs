use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AttendanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Excused => "EXCUSED",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            "LATE" => Ok(AttendanceStatus::Late),
            "EXCUSED" => Ok(AttendanceStatus::Excused),
            other => Err(AttendanceError::invalid_argument(
                "status",
                format!("expected one of PRESENT, ABSENT, LATE, EXCUSED; got {other:?}"),
            )),
        }
    }
}

/// One student's attendance on one school date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub early_dismissal: bool,
}

impl AttendanceRecord {
    pub fn new(student_id: impl Into<String>, date: NaiveDate, status: AttendanceStatus) -> Self {
        AttendanceRecord {
            student_id: student_id.into(),
            date,
            status,
            early_dismissal: false,
        }
    }

    pub fn with_early_dismissal(mut self) -> Self {
        self.early_dismissal = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOffReason {
    Holiday,
    StaffDevelopment,
    Weather,
    Other,
}

impl DayOffReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOffReason::Holiday => "holiday",
            DayOffReason::StaffDevelopment => "staff_development",
            DayOffReason::Weather => "weather",
            DayOffReason::Other => "other",
        }
    }
}

impl FromStr for DayOffReason {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "holiday" => Ok(DayOffReason::Holiday),
            "staff_development" => Ok(DayOffReason::StaffDevelopment),
            "weather" => Ok(DayOffReason::Weather),
            "other" => Ok(DayOffReason::Other),
            other => Err(AttendanceError::invalid_argument(
                "reason",
                format!("unknown day-off reason {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOffScope {
    #[default]
    AllStudents,
}

/// A date on which no student is expected in school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDayOff {
    pub date: NaiveDate,
    pub reason: DayOffReason,
    #[serde(default)]
    pub scope: DayOffScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "DAILY",
            Timeframe::Weekly => "WEEKLY",
            Timeframe::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Timeframe::Daily),
            "WEEKLY" => Ok(Timeframe::Weekly),
            "MONTHLY" => Ok(Timeframe::Monthly),
            _ => Err(AttendanceError::invalid_argument(
                "timeframe",
                format!("expected one of DAILY, WEEKLY, MONTHLY; got {value:?}"),
            )),
        }
    }
}

/// The five attendance counters shared by buckets and summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub excused: u32,
    pub early_dismissal: u32,
}

impl Counts {
    /// Folds one record into the counters. Excused never touches
    /// present/late/absent; early dismissal is tallied on its own.
    pub fn add(&mut self, record: &AttendanceRecord) {
        match record.status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
        if record.early_dismissal {
            self.early_dismissal += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.present == 0
            && self.late == 0
            && self.absent == 0
            && self.excused == 0
            && self.early_dismissal == 0
    }

    /// Number of records folded in, early dismissals aside.
    pub fn records(&self) -> u32 {
        self.present + self.late + self.absent + self.excused
    }
}

/// Aggregated counters for one day, week or month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket_start: NaiveDate,
    #[serde(flatten)]
    pub counts: Counts,
}

impl Bucket {
    pub fn present(&self) -> u32 {
        self.counts.present
    }

    pub fn late(&self) -> u32 {
        self.counts.late
    }

    pub fn absent(&self) -> u32 {
        self.counts.absent
    }

    pub fn excused(&self) -> u32 {
        self.counts.excused
    }

    pub fn early_dismissal(&self) -> u32 {
        self.counts.early_dismissal
    }
}

/// Year-to-date counters for a single student.
pub type Summary = Counts;

/// Optional thresholds; a missing field means the rule is not evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRules {
    pub absences_30: Option<u32>,
    pub lates_30: Option<u32>,
    pub absences_total: Option<u32>,
    pub lates_total: Option<u32>,
}

impl AlertRules {
    pub fn is_empty(&self) -> bool {
        self.absences_30.is_none()
            && self.lates_30.is_none()
            && self.absences_total.is_none()
            && self.lates_total.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResult {
    pub should_alert: bool,
    pub reasons: Vec<String>,
}

/// Payload handed to a notifier when a student breaches a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertNotification {
    pub student_id: String,
    pub when: NaiveDate,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[test]
    fn excused_only_increments_excused() {
        let mut counts = Counts::default();
        counts.add(&AttendanceRecord::new("s1", day(4), AttendanceStatus::Excused));
        assert_eq!(counts.excused, 1);
        assert_eq!(counts.present + counts.late + counts.absent, 0);
    }

    #[test]
    fn early_dismissal_counts_alongside_status() {
        let mut counts = Counts::default();
        counts.add(&AttendanceRecord::new("s1", day(5), AttendanceStatus::Present).with_early_dismissal());
        assert_eq!(counts.present, 1);
        assert_eq!(counts.early_dismissal, 1);
        assert_eq!(counts.records(), 1);
    }

    #[test]
    fn timeframe_parse_lists_allowed_values() {
        assert_eq!("weekly".parse::<Timeframe>().unwrap(), Timeframe::Weekly);
        let err = "yearly".parse::<Timeframe>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("timeframe"));
        assert!(msg.contains("DAILY, WEEKLY, MONTHLY"));
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!("late".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Late);
        assert!("tardy".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn bucket_serializes_flat_with_iso_key() {
        let bucket = Bucket {
            bucket_start: day(1),
            counts: Counts {
                present: 2,
                ..Counts::default()
            },
        };
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["bucket_start"], "2025-09-01");
        assert_eq!(json["present"], 2);
    }
}
