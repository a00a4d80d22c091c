//! ISO date parsing and bucket-key canonicalization.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{AttendanceError, Result};
use crate::models::Timeframe;

/// Parses a `YYYY-MM-DD` string, naming `field` in the error.
pub fn parse_iso_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AttendanceError::invalid_argument(field, format!("not a calendar date (YYYY-MM-DD): {value:?}"))
    })
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn out_of_range(field: &str, date: NaiveDate) -> AttendanceError {
    AttendanceError::invalid_argument(field, format!("date out of range: {date}"))
}

/// Monday on or before `date`. Fails for the first days chrono can
/// represent, whose Monday precedes `NaiveDate::MIN`.
pub fn week_start(field: &str, date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
        .ok_or_else(|| out_of_range(field, date))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn bucket_key(field: &str, timeframe: Timeframe, date: NaiveDate) -> Result<NaiveDate> {
    match timeframe {
        Timeframe::Daily => Ok(date),
        Timeframe::Weekly => week_start(field, date),
        Timeframe::Monthly => Ok(month_start(date)),
    }
}

/// Trailing window of `days` calendar days ending at `end`, inclusive.
pub fn rolling_window(field: &str, end: NaiveDate, days: i64) -> Result<(NaiveDate, NaiveDate)> {
    let start = Duration::try_days(days.max(1) - 1)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| out_of_range(field, end))?;
    Ok((start, end))
}

/// Year-to-date bounds: up to `today` for the current year, the whole
/// calendar year otherwise.
pub fn year_to_date_range(year: i32, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = if year == today.year() {
        today
    } else {
        NaiveDate::from_ymd_opt(year, 12, 31)?
    };
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_malformed_dates_with_field_name() {
        assert_eq!(parse_iso_date("start", "2024-02-29").unwrap(), date(2024, 2, 29));
        let err = parse_iso_date("end", "2023-02-29").unwrap_err();
        assert!(err.to_string().contains("`end`"));
        assert!(parse_iso_date("start", "09/01/2025").is_err());
    }

    #[test]
    fn weekends_are_saturday_and_sunday() {
        assert!(is_weekend(date(2025, 9, 6)));
        assert!(is_weekend(date(2025, 9, 7)));
        assert!(!is_weekend(date(2025, 9, 8)));
    }

    #[test]
    fn week_start_crosses_year_boundary() {
        // 2025-01-01 is a Wednesday; its week starts on Monday 2024-12-30.
        assert_eq!(week_start("date", date(2025, 1, 1)).unwrap(), date(2024, 12, 30));
        assert_eq!(week_start("date", date(2025, 9, 1)).unwrap(), date(2025, 9, 1));
        assert_eq!(week_start("date", date(2025, 9, 7)).unwrap(), date(2025, 9, 1));
    }

    #[test]
    fn month_start_handles_leap_february() {
        assert_eq!(month_start(date(2024, 2, 29)), date(2024, 2, 1));
        assert_eq!(
            bucket_key("date", Timeframe::Monthly, date(2025, 12, 31)).unwrap(),
            date(2025, 12, 1)
        );
    }

    #[test]
    fn thirty_day_window_is_inclusive() {
        let (start, end) = rolling_window("as_of", date(2025, 9, 30), 30).unwrap();
        assert_eq!(start, date(2025, 9, 1));
        assert_eq!(end, date(2025, 9, 30));
    }

    #[test]
    fn earliest_dates_fail_instead_of_overflowing() {
        // NaiveDate::MIN is not a Monday, so its week would start before it.
        let err = week_start("start", NaiveDate::MIN).unwrap_err();
        assert!(err.to_string().contains("`start`"));
        assert!(err.to_string().contains("out of range"));
        let err = rolling_window("as_of", NaiveDate::MIN, 30).unwrap_err();
        assert!(err.to_string().contains("`as_of`"));
        assert!(rolling_window("as_of", NaiveDate::MAX, 30).is_ok());
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let as_of = date(2025, 9, 30);
        let err = rolling_window("since_days", as_of, i64::MAX).unwrap_err();
        assert!(err.to_string().contains("`since_days`"));
        assert!(rolling_window("since_days", as_of, 1_000_000_000).is_err());
        // Zero and negative lengths collapse to the single day.
        assert_eq!(rolling_window("since_days", as_of, 0).unwrap(), (as_of, as_of));
        assert_eq!(rolling_window("since_days", as_of, -5).unwrap(), (as_of, as_of));
    }

    #[test]
    fn year_to_date_stops_at_today_only_for_current_year() {
        let today = date(2026, 3, 15);
        assert_eq!(year_to_date_range(2026, today), Some((date(2026, 1, 1), today)));
        assert_eq!(
            year_to_date_range(2025, today),
            Some((date(2025, 1, 1), date(2025, 12, 31)))
        );
    }
}
