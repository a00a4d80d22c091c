//! Engine facade over a single record snapshot.

use chrono::{NaiveDate, Utc};

use crate::calendar::OffDayOracle;
use crate::config::{EngineConfig, ExcusedOnOffDays};
use crate::dates;
use crate::error::Result;
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::store::{DayOffStore, RecordStore};

/// Borrows a snapshot for the duration of one or more pure computations.
/// Nothing is cached between calls.
pub struct AttendanceEngine<'a, S> {
    pub(crate) store: &'a S,
    pub(crate) config: EngineConfig,
    pub(crate) today: NaiveDate,
}

impl<'a, S> AttendanceEngine<'a, S>
where
    S: RecordStore + DayOffStore,
{
    pub fn new(store: &'a S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            today: Utc::now().date_naive(),
        }
    }

    /// Pins "today", which anchors the default year-to-date range.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> OffDayOracle<'a, S> {
        OffDayOracle::new(self.store, self.config.off_day_strategy)
    }

    pub fn is_off_day(&self, date_iso: &str) -> Result<bool> {
        let date = dates::parse_iso_date("date", date_iso)?;
        Ok(self.oracle().is_off_day(date))
    }

    /// Records for `student_id` in `[start, end]` that count toward
    /// statistics once off-days are applied.
    pub(crate) fn contributing_records(
        &self,
        student_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<&'a AttendanceRecord> {
        let oracle = self.oracle();
        let retain_excused = self.config.excused_on_off_days == ExcusedOnOffDays::Retain;
        let store: &'a S = self.store;
        store
            .find_by_student_and_date_range(student_id, start, end)
            .into_iter()
            .filter(|record| {
                !oracle.is_off_day(record.date)
                    || (retain_excused && record.status == AttendanceStatus::Excused)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayOffReason, DayOffScope, PlannedDayOff};
    use crate::store::Snapshot;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn snapshot() -> Snapshot {
        Snapshot::new()
            .with_days_off(vec![PlannedDayOff {
                date: date(2),
                reason: DayOffReason::Weather,
                scope: DayOffScope::AllStudents,
            }])
            .with_records(vec![
                AttendanceRecord::new("s1", date(1), AttendanceStatus::Present),
                AttendanceRecord::new("s1", date(2), AttendanceStatus::Excused),
                AttendanceRecord::new("s1", date(6), AttendanceStatus::Absent),
            ])
    }

    #[test]
    fn is_off_day_parses_and_rejects_bad_dates() {
        let snapshot = snapshot();
        let engine = AttendanceEngine::new(&snapshot, EngineConfig::default());
        assert!(engine.is_off_day("2025-09-02").unwrap());
        assert!(!engine.is_off_day("2025-09-03").unwrap());
        assert!(engine.is_off_day("2025-09-31").is_err());
    }

    #[test]
    fn excused_records_on_off_days_follow_policy() {
        let snapshot = snapshot();
        let engine = AttendanceEngine::new(&snapshot, EngineConfig::default());
        let kept = engine.contributing_records("s1", date(1), date(7));
        assert_eq!(kept.len(), 2);

        let strict = EngineConfig {
            excused_on_off_days: ExcusedOnOffDays::Drop,
            ..EngineConfig::default()
        };
        let engine = AttendanceEngine::new(&snapshot, strict);
        let kept = engine.contributing_records("s1", date(1), date(7));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, date(1));
    }
}
