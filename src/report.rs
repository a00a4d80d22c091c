use std::fmt::Write;

use chrono::NaiveDate;

use crate::alerts::Alert;
use crate::models::{AlertResult, Bucket, Summary, Timeframe};

pub struct StudentReport<'a> {
    pub student_id: &'a str,
    pub as_of: NaiveDate,
    pub year: i32,
    pub summary: &'a Summary,
    pub timeframe: Timeframe,
    pub history: &'a [Bucket],
    pub result: &'a AlertResult,
    pub alerts: &'a [Alert],
}

/// Share of counted school days the student attended, late arrivals
/// included. `None` when nothing was counted.
pub fn attendance_rate(summary: &Summary) -> Option<f64> {
    let counted = summary.records();
    if counted == 0 {
        return None;
    }
    Some((summary.present + summary.late) as f64 / counted as f64 * 100.0)
}

pub fn build_report(report: &StudentReport<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report: {}", report.student_id);
    let _ = writeln!(output, "Generated as of {}", report.as_of);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Year to Date ({})", report.year);

    let summary = report.summary;
    if summary.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this year.");
    } else {
        let _ = writeln!(
            output,
            "- present {}, late {}, absent {}, excused {}, early dismissals {}",
            summary.present, summary.late, summary.absent, summary.excused, summary.early_dismissal
        );
        if let Some(rate) = attendance_rate(summary) {
            let _ = writeln!(output, "- attendance rate {rate:.1}%");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## {} History",
        match report.timeframe {
            Timeframe::Daily => "Daily",
            Timeframe::Weekly => "Weekly",
            Timeframe::Monthly => "Monthly",
        }
    );

    if report.history.is_empty() {
        let _ = writeln!(output, "No school days recorded for this window.");
    } else {
        let _ = writeln!(output, "| Starting | Present | Late | Absent | Excused | Early |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for bucket in report.history {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} |",
                bucket.bucket_start,
                bucket.present(),
                bucket.late(),
                bucket.absent(),
                bucket.excused(),
                bucket.early_dismissal()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Threshold Check");

    if report.result.should_alert {
        for reason in &report.result.reasons {
            let _ = writeln!(output, "- {reason}");
        }
    } else {
        let _ = writeln!(output, "No thresholds breached.");
    }

    let open: Vec<&Alert> = report
        .alerts
        .iter()
        .filter(|alert| alert.state.is_open())
        .collect();
    if !open.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Open Alerts");
        for alert in open {
            let _ = writeln!(
                output,
                "- [{}] {} (opened {})",
                alert.state,
                alert.reason(),
                alert.created_at.date_naive()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Counts;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[test]
    fn rate_counts_late_as_attended() {
        let summary = Counts {
            present: 3,
            late: 1,
            absent: 1,
            excused: 0,
            early_dismissal: 0,
        };
        let rate = attendance_rate(&summary).unwrap();
        assert!((rate - 80.0).abs() < 0.001);
        assert_eq!(attendance_rate(&Counts::default()), None);
    }

    #[test]
    fn report_lists_history_and_reasons() {
        let summary = Counts {
            present: 2,
            absent: 1,
            ..Counts::default()
        };
        let history = vec![Bucket {
            bucket_start: date(1),
            counts: summary,
        }];
        let result = AlertResult {
            should_alert: true,
            reasons: vec!["total absences (1) >= threshold (1)".to_string()],
        };
        let text = build_report(&StudentReport {
            student_id: "s-1",
            as_of: date(5),
            year: 2025,
            summary: &summary,
            timeframe: Timeframe::Weekly,
            history: &history,
            result: &result,
            alerts: &[],
        });

        assert!(text.contains("# Attendance Report: s-1"));
        assert!(text.contains("## Weekly History"));
        assert!(text.contains("| 2025-09-01 | 2 | 0 | 1 | 0 | 0 |"));
        assert!(text.contains("- total absences (1) >= threshold (1)"));
        assert!(!text.contains("Open Alerts"));
    }

    #[test]
    fn empty_report_says_so() {
        let summary = Counts::default();
        let text = build_report(&StudentReport {
            student_id: "s-2",
            as_of: date(5),
            year: 2025,
            summary: &summary,
            timeframe: Timeframe::Daily,
            history: &[],
            result: &AlertResult::default(),
            alerts: &[],
        });
        assert!(text.contains("No attendance recorded for this year."));
        assert!(text.contains("No thresholds breached."));
    }
}
