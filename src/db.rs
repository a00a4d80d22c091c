//! Postgres storage: schema, seed data, CSV import, snapshot loading and
//! alert persistence. The engine never talks to the database; callers load
//! a [`Snapshot`] here and hand it over.

use std::io::Read;

use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::alerts::{Alert, AlertState};
use crate::models::{
    AttendanceRecord, AttendanceStatus, DayOffReason, DayOffScope, PlannedDayOff,
};
use crate::store::Snapshot;
use crate::thresholds::AlertKind;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("s-1001", "Avery Lee"),
        ("s-1002", "Jules Moreno"),
        ("s-1003", "Kiara Patel"),
    ];
    for (id, name) in &students {
        upsert_student(pool, id, name).await?;
    }

    let labor_day = NaiveDate::from_ymd_opt(2025, 9, 1).context("invalid date")?;
    save_day_off(
        pool,
        &PlannedDayOff {
            date: labor_day,
            reason: DayOffReason::Holiday,
            scope: DayOffScope::AllStudents,
        },
    )
    .await?;

    // Four school weeks from Tuesday 2025-09-02; Jules slips into chronic
    // absence, Kiara runs late on Fridays.
    let mut records = Vec::new();
    for (id, _) in &students {
        records.push(AttendanceRecord::new(*id, labor_day, AttendanceStatus::Excused));
    }
    for offset in 1..28 {
        let date = labor_day + Duration::days(offset);
        if crate::dates::is_weekend(date) {
            continue;
        }
        records.push(AttendanceRecord::new("s-1001", date, AttendanceStatus::Present));
        let jules = if offset % 3 == 0 {
            AttendanceStatus::Absent
        } else {
            AttendanceStatus::Present
        };
        records.push(AttendanceRecord::new("s-1002", date, jules));
        let kiara = if date.weekday() == chrono::Weekday::Fri {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };
        records.push(AttendanceRecord::new("s-1003", date, kiara));
    }

    for record in &records {
        save_attendance(pool, record).await?;
    }
    info!(records = records.len(), "seed data inserted");
    Ok(())
}

async fn upsert_student(pool: &PgPool, id: &str, full_name: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_early_warning.students (id, full_name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name
        "#,
    )
    .bind(id)
    .bind(full_name)
    .execute(pool)
    .await?;
    Ok(())
}

async fn save_attendance(pool: &PgPool, record: &AttendanceRecord) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_early_warning.attendance
        (student_id, attendance_date, status, early_dismissal)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, attendance_date) DO UPDATE
        SET status = EXCLUDED.status, early_dismissal = EXCLUDED.early_dismissal
        "#,
    )
    .bind(&record.student_id)
    .bind(record.date)
    .bind(record.status.as_str())
    .bind(record.early_dismissal)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn save_day_off(pool: &PgPool, day_off: &PlannedDayOff) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_early_warning.days_off (day_off_date, reason, scope)
        VALUES ($1, $2, 'ALL_STUDENTS')
        ON CONFLICT (day_off_date) DO UPDATE SET reason = EXCLUDED.reason
        "#,
    )
    .bind(day_off.date)
    .bind(day_off.reason.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Reads a consistent point-in-time view of enrolled students, their
/// attendance and planned days off.
pub async fn load_snapshot(pool: &PgPool) -> anyhow::Result<Snapshot> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;

    let roster: Vec<String> =
        sqlx::query("SELECT id FROM attendance_early_warning.students WHERE enrolled")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|row| row.get("id"))
            .collect();

    let rows = sqlx::query(
        "SELECT student_id, attendance_date, status, early_dismissal \
         FROM attendance_early_warning.attendance",
    )
    .fetch_all(&mut *tx)
    .await?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("status");
        records.push(AttendanceRecord {
            student_id: row.get("student_id"),
            date: row.get("attendance_date"),
            status: status.parse()?,
            early_dismissal: row.get("early_dismissal"),
        });
    }

    let rows = sqlx::query("SELECT day_off_date, reason FROM attendance_early_warning.days_off")
        .fetch_all(&mut *tx)
        .await?;
    let mut days_off = Vec::with_capacity(rows.len());
    for row in rows {
        let reason: String = row.get("reason");
        days_off.push(PlannedDayOff {
            date: row.get("day_off_date"),
            reason: reason.parse()?,
            scope: DayOffScope::AllStudents,
        });
    }

    tx.commit().await?;
    debug!(
        students = roster.len(),
        records = records.len(),
        days_off = days_off.len(),
        "loaded snapshot"
    );

    Ok(Snapshot::new()
        .with_roster(roster)
        .with_records(records)
        .with_days_off(days_off))
}

#[derive(serde::Deserialize)]
struct AttendanceCsvRow {
    student_id: String,
    full_name: Option<String>,
    date: NaiveDate,
    status: String,
    early_dismissal: Option<bool>,
}

/// Parsed attendance rows paired with the student's display name, if given.
pub fn parse_attendance_csv<R: Read>(
    input: R,
) -> anyhow::Result<Vec<(AttendanceRecord, Option<String>)>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<AttendanceCsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed attendance row {}", index + 1))?;
        let status: AttendanceStatus = row
            .status
            .parse()
            .with_context(|| format!("attendance row {}", index + 1))?;
        let record = AttendanceRecord {
            student_id: row.student_id,
            date: row.date,
            status,
            early_dismissal: row.early_dismissal.unwrap_or(false),
        };
        rows.push((record, row.full_name));
    }
    Ok(rows)
}

#[derive(serde::Deserialize)]
struct DayOffCsvRow {
    date: NaiveDate,
    reason: String,
}

pub fn parse_days_off_csv<R: Read>(input: R) -> anyhow::Result<Vec<PlannedDayOff>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut days_off = Vec::new();
    for (index, result) in reader.deserialize::<DayOffCsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed day-off row {}", index + 1))?;
        days_off.push(PlannedDayOff {
            date: row.date,
            reason: row
                .reason
                .parse()
                .with_context(|| format!("day-off row {}", index + 1))?,
            scope: DayOffScope::AllStudents,
        });
    }
    Ok(days_off)
}

pub async fn import_attendance_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = parse_attendance_csv(file)?;
    let mut written = 0usize;

    for (record, full_name) in rows {
        let name = full_name.unwrap_or_else(|| record.student_id.clone());
        upsert_student(pool, &record.student_id, &name).await?;
        if save_attendance(pool, &record).await? > 0 {
            written += 1;
        }
    }

    Ok(written)
}

pub async fn import_days_off_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;
    for day_off in parse_days_off_csv(file)? {
        if save_day_off(pool, &day_off).await? > 0 {
            written += 1;
        }
    }
    Ok(written)
}

const ALERT_COLUMNS: &str = "id, student_id, kind, threshold, count, state, notification_sent, \
     created_at, updated_at";

fn alert_from_row(row: &PgRow) -> anyhow::Result<Alert> {
    let kind: String = row.get("kind");
    let state: String = row.get("state");
    let threshold: i32 = row.get("threshold");
    let count: i32 = row.get("count");
    Ok(Alert {
        id: row.get("id"),
        student_id: row.get("student_id"),
        kind: kind.parse::<AlertKind>()?,
        threshold: u32::try_from(threshold).context("negative alert threshold")?,
        count: u32::try_from(count).context("negative alert count")?,
        state: state.parse::<AlertState>()?,
        notification_sent: row.get("notification_sent"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub async fn fetch_alerts(pool: &PgPool, student_id: &str) -> anyhow::Result<Vec<Alert>> {
    let query = format!(
        "SELECT {ALERT_COLUMNS} FROM attendance_early_warning.alerts \
         WHERE student_id = $1 ORDER BY created_at"
    );
    let rows = sqlx::query(&query).bind(student_id).fetch_all(pool).await?;
    rows.iter().map(alert_from_row).collect()
}

pub async fn fetch_alert(pool: &PgPool, id: Uuid) -> anyhow::Result<Alert> {
    let query = format!("SELECT {ALERT_COLUMNS} FROM attendance_early_warning.alerts WHERE id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no alert with id {id}"))?;
    alert_from_row(&row)
}

pub async fn save_alerts(pool: &PgPool, alerts: &[Alert]) -> anyhow::Result<()> {
    for alert in alerts {
        sqlx::query(
            r#"
            INSERT INTO attendance_early_warning.alerts
            (id, student_id, kind, threshold, count, state, notification_sent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET count = EXCLUDED.count,
                state = EXCLUDED.state,
                notification_sent = EXCLUDED.notification_sent,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(alert.id)
        .bind(&alert.student_id)
        .bind(alert.kind.as_str())
        .bind(i32::try_from(alert.threshold).context("alert threshold overflow")?)
        .bind(i32::try_from(alert.count).context("alert count overflow")?)
        .bind(alert.state.as_str())
        .bind(alert.notification_sent)
        .bind(alert.created_at)
        .bind(alert.updated_at)
        .execute(pool)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attendance_csv_with_optional_columns() {
        let input = "student_id,full_name,date,status,early_dismissal\n\
                     s-1,Avery Lee,2025-09-02,late,true\n\
                     s-2,,2025-09-02,PRESENT,\n";
        let rows = parse_attendance_csv(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0.status, AttendanceStatus::Late);
        assert!(rows[0].0.early_dismissal);
        assert_eq!(rows[0].1.as_deref(), Some("Avery Lee"));
        assert_eq!(rows[1].1, None);
        assert!(!rows[1].0.early_dismissal);
    }

    #[test]
    fn attendance_csv_rejects_unknown_status() {
        let input = "student_id,full_name,date,status,early_dismissal\n\
                     s-1,,2025-09-02,tardy,false\n";
        let err = parse_attendance_csv(input.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("tardy"));
    }

    #[test]
    fn attendance_csv_rejects_bad_dates() {
        let input = "student_id,full_name,date,status,early_dismissal\n\
                     s-1,,2025-02-30,PRESENT,false\n";
        assert!(parse_attendance_csv(input.as_bytes()).is_err());
    }

    #[test]
    fn parses_days_off_csv() {
        let input = "date,reason\n2025-11-27,holiday\n2025-10-10,staff_development\n";
        let days_off = parse_days_off_csv(input.as_bytes()).unwrap();
        assert_eq!(days_off.len(), 2);
        assert_eq!(days_off[1].reason, DayOffReason::StaffDevelopment);
        assert_eq!(days_off[0].scope, DayOffScope::AllStudents);
    }
}
