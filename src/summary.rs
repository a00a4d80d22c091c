//! Year-to-date totals for one student.

use chrono::Datelike;
use tracing::debug;

use crate::dates;
use crate::engine::AttendanceEngine;
use crate::error::{AttendanceError, Result};
use crate::models::Summary;
use crate::store::{DayOffStore, RecordStore};

impl<'a, S> AttendanceEngine<'a, S>
where
    S: RecordStore + DayOffStore,
{
    /// Cumulative counters for `year` (defaults to the current year). The
    /// current year runs through today; any other year is taken whole.
    pub fn year_to_date_summary(&self, student_id: &str, year: Option<i32>) -> Result<Summary> {
        let year = year.unwrap_or_else(|| self.today.year());
        let (start, end) = dates::year_to_date_range(year, self.today).ok_or_else(|| {
            AttendanceError::invalid_argument("year", format!("year {year} is out of range"))
        })?;

        let mut summary = Summary::default();
        for record in self.contributing_records(student_id, start, end) {
            summary.add(record);
        }

        debug!(
            student_id,
            year,
            absent = summary.absent,
            late = summary.late,
            "computed year-to-date summary"
        );
        Ok(summary)
    }
}
