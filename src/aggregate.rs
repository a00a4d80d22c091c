//! Time-bucketing of attendance records into daily, weekly and monthly
//! windows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::dates;
use crate::engine::AttendanceEngine;
use crate::error::Result;
use crate::models::{AttendanceRecord, Bucket, Counts, Timeframe};
use crate::store::{DayOffStore, RecordStore};

/// Groups already-filtered records into sparse buckets sorted by key.
///
/// Buckets whose key precedes the canonical key of `start` are dropped, as
/// are buckets with every counter at zero.
pub fn bucket_records<'r, I>(
    records: I,
    timeframe: Timeframe,
    start: NaiveDate,
) -> Result<Vec<Bucket>>
where
    I: IntoIterator<Item = &'r AttendanceRecord>,
{
    let floor = dates::bucket_key("start", timeframe, start)?;
    let mut buckets: BTreeMap<NaiveDate, Counts> = BTreeMap::new();

    for record in records {
        let key = dates::bucket_key("date", timeframe, record.date)?;
        buckets.entry(key).or_default().add(record);
    }

    Ok(buckets
        .into_iter()
        .filter(|(key, counts)| *key >= floor && !counts.is_empty())
        .map(|(bucket_start, counts)| Bucket {
            bucket_start,
            counts,
        })
        .collect())
}

impl<'a, S> AttendanceEngine<'a, S>
where
    S: RecordStore + DayOffStore,
{
    /// Bucketed history for one student over `[start_iso, end_iso]`.
    ///
    /// Off-day records are excluded before bucketing. A reversed range
    /// yields no buckets.
    pub fn history_by_timeframe(
        &self,
        student_id: &str,
        timeframe: Timeframe,
        start_iso: &str,
        end_iso: &str,
    ) -> Result<Vec<Bucket>> {
        let start = dates::parse_iso_date("start", start_iso)?;
        let end = dates::parse_iso_date("end", end_iso)?;
        self.history_between(student_id, timeframe, start, end)
    }

    pub fn history_between(
        &self,
        student_id: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bucket>> {
        if start > end {
            return Ok(Vec::new());
        }
        let records = self.contributing_records(student_id, start, end);
        let buckets = bucket_records(records.iter().copied(), timeframe, start)?;
        debug!(
            student_id,
            timeframe = %timeframe,
            %start,
            %end,
            records = records.len(),
            buckets = buckets.len(),
            "bucketed attendance history"
        );
        Ok(buckets)
    }
}
