//! Read-only collaborator interfaces the engine consumes, plus the in-memory
//! snapshot that backs them.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::models::{AttendanceRecord, PlannedDayOff};

/// Point-in-time view of attendance records.
pub trait RecordStore {
    fn all_attendance(&self) -> &[AttendanceRecord];

    /// Records for one student dated within `[start, end]`.
    fn find_by_student_and_date_range(
        &self,
        student_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<&AttendanceRecord> {
        self.all_attendance()
            .iter()
            .filter(|record| record.student_id == student_id)
            .filter(|record| record.date >= start && record.date <= end)
            .collect()
    }

    /// Students enrolled at snapshot time.
    fn roster(&self) -> Vec<String>;
}

pub trait DayOffStore {
    fn has_day_off(&self, date: NaiveDate) -> bool;
}

/// Materialized records, planned days off and roster handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<AttendanceRecord>,
    days_off: BTreeSet<NaiveDate>,
    roster: BTreeSet<String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, records: impl IntoIterator<Item = AttendanceRecord>) -> Self {
        self.records.extend(records);
        self
    }

    pub fn with_days_off(mut self, days_off: impl IntoIterator<Item = PlannedDayOff>) -> Self {
        self.days_off.extend(days_off.into_iter().map(|day_off| day_off.date));
        self
    }

    pub fn with_roster<I, S>(mut self, students: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roster.extend(students.into_iter().map(Into::into));
        self
    }
}

impl RecordStore for Snapshot {
    fn all_attendance(&self) -> &[AttendanceRecord] {
        &self.records
    }

    fn roster(&self) -> Vec<String> {
        self.roster.iter().cloned().collect()
    }
}

impl DayOffStore for Snapshot {
    fn has_day_off(&self, date: NaiveDate) -> bool {
        self.days_off.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, DayOffReason, DayOffScope};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[test]
    fn range_lookup_is_inclusive_and_scoped_to_student() {
        let snapshot = Snapshot::new().with_records(vec![
            AttendanceRecord::new("s1", date(1), AttendanceStatus::Present),
            AttendanceRecord::new("s1", date(3), AttendanceStatus::Late),
            AttendanceRecord::new("s1", date(4), AttendanceStatus::Absent),
            AttendanceRecord::new("s2", date(2), AttendanceStatus::Absent),
        ]);

        let found = snapshot.find_by_student_and_date_range("s1", date(1), date(3));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.student_id == "s1"));
    }

    #[test]
    fn day_off_lookup_matches_exact_date() {
        let snapshot = Snapshot::new().with_days_off(vec![PlannedDayOff {
            date: date(15),
            reason: DayOffReason::StaffDevelopment,
            scope: DayOffScope::AllStudents,
        }]);
        assert!(snapshot.has_day_off(date(15)));
        assert!(!snapshot.has_day_off(date(16)));
    }
}
