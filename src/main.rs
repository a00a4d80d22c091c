use std::path::PathBuf;

use anyhow::Context;
use attendance_early_warning::report::{self, StudentReport};
use attendance_early_warning::{
    dates, db, reconcile_alerts, telemetry, AlertRules, AttendanceEngine, EngineConfig, LogNotifier,
    Timeframe,
};
use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "attendance-early-warning")]
#[command(about = "Attendance analytics and chronic-absence alerts", long_about = None)]
struct Cli {
    /// JSON engine config (off-day strategy, alert rules)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct RuleArgs {
    #[arg(long)]
    absences_30: Option<u32>,
    #[arg(long)]
    lates_30: Option<u32>,
    #[arg(long)]
    absences_total: Option<u32>,
    #[arg(long)]
    lates_total: Option<u32>,
}

impl From<RuleArgs> for AlertRules {
    fn from(args: RuleArgs) -> Self {
        AlertRules {
            absences_30: args.absences_30,
            lates_30: args.lates_30,
            absences_total: args.absences_total,
            lates_total: args.lates_total,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AlertAction {
    Dismiss,
    ParentNotified,
    Resolve,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attendance records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import planned days off from a CSV file
    ImportDaysOff {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show bucketed attendance history for a student
    History {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "weekly")]
        timeframe: Timeframe,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Print buckets as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show year-to-date totals for a student
    Summary {
        #[arg(long)]
        student: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Evaluate alert thresholds for a student
    Check {
        #[arg(long)]
        student: String,
        /// Reference date, defaults to today
        #[arg(long)]
        as_of: Option<String>,
        #[command(flatten)]
        rules: RuleArgs,
        /// Notify and persist alerts when thresholds are breached
        #[arg(long)]
        notify: bool,
    },
    /// Move a stored alert through its lifecycle
    Alert {
        #[arg(long)]
        id: Uuid,
        #[arg(long, value_enum)]
        action: AlertAction,
    },
    /// Generate a markdown report for a student
    Report {
        #[arg(long)]
        student: String,
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long, default_value = "weekly")]
        timeframe: Timeframe,
        #[arg(long, default_value_t = 90)]
        since_days: i64,
        #[command(flatten)]
        rules: RuleArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json, tracing::Level::INFO);

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let written = db::import_attendance_csv(&pool, &csv).await?;
            println!("Wrote {written} attendance records from {}.", csv.display());
        }
        Commands::ImportDaysOff { csv } => {
            let written = db::import_days_off_csv(&pool, &csv).await?;
            println!("Wrote {written} planned days off from {}.", csv.display());
        }
        Commands::History {
            student,
            timeframe,
            start,
            end,
            json,
        } => {
            let snapshot = db::load_snapshot(&pool).await?;
            let engine = AttendanceEngine::new(&snapshot, config);
            let buckets = engine.history_by_timeframe(&student, timeframe, &start, &end)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
            } else if buckets.is_empty() {
                println!("No school days recorded for this window.");
            } else {
                println!("{timeframe} history for {student}:");
                for bucket in &buckets {
                    println!(
                        "- {} present {} late {} absent {} excused {} early {}",
                        bucket.bucket_start,
                        bucket.present(),
                        bucket.late(),
                        bucket.absent(),
                        bucket.excused(),
                        bucket.early_dismissal()
                    );
                }
            }
        }
        Commands::Summary { student, year } => {
            let snapshot = db::load_snapshot(&pool).await?;
            let engine = AttendanceEngine::new(&snapshot, config);
            let summary = engine.year_to_date_summary(&student, year)?;
            println!(
                "{} year to date: present {}, late {}, absent {}, excused {}, early dismissals {}",
                year.unwrap_or_else(|| today.year()),
                summary.present,
                summary.late,
                summary.absent,
                summary.excused,
                summary.early_dismissal
            );
        }
        Commands::Check {
            student,
            as_of,
            rules,
            notify,
        } => {
            config.override_rules(rules.into());
            let as_of = as_of.unwrap_or_else(|| today.to_string());
            let snapshot = db::load_snapshot(&pool).await?;
            let engine = AttendanceEngine::new(&snapshot, config);
            let rules = engine.config().rules;

            if rules.is_empty() {
                println!("No alert rules configured.");
                return Ok(());
            }

            let result = if notify {
                let result = engine.notify_if_breached(&student, &as_of, &rules, &LogNotifier)?;
                let breaches = engine.evaluate_breaches(&student, &as_of, &rules)?;
                let mut existing = db::fetch_alerts(&pool, &student).await?;
                let touched = reconcile_alerts(
                    &mut existing,
                    &student,
                    &rules,
                    &breaches,
                    Utc::now(),
                )?;
                db::save_alerts(&pool, &touched).await?;
                info!(student_id = %student, alerts = touched.len(), "alerts reconciled");
                result
            } else {
                engine.check_thresholds(&student, &as_of, &rules)?
            };

            if result.should_alert {
                println!("Thresholds breached for {student} as of {as_of}:");
                for reason in &result.reasons {
                    println!("- {reason}");
                }
            } else {
                println!("No thresholds breached for {student} as of {as_of}.");
            }
        }
        Commands::Alert { id, action } => {
            let mut alert = db::fetch_alert(&pool, id).await?;
            let now = Utc::now();
            match action {
                AlertAction::Dismiss => alert.dismiss(now)?,
                AlertAction::ParentNotified => alert.mark_parent_notified(now)?,
                AlertAction::Resolve => alert.resolve(now)?,
            }
            db::save_alerts(&pool, std::slice::from_ref(&alert)).await?;
            println!("Alert {} is now {}.", alert.id, alert.state);
        }
        Commands::Report {
            student,
            as_of,
            timeframe,
            since_days,
            rules,
            out,
        } => {
            config.override_rules(rules.into());
            let as_of_date = match as_of {
                Some(value) => dates::parse_iso_date("as_of", &value)?,
                None => today,
            };
            let (start, _) = dates::rolling_window("since_days", as_of_date, since_days)?;

            let snapshot = db::load_snapshot(&pool).await?;
            // Year to date runs up to the report date, matching the threshold check.
            let engine = AttendanceEngine::new(&snapshot, config).with_today(as_of_date);
            let rules = engine.config().rules;
            let summary = engine.year_to_date_summary(&student, None)?;
            let history = engine.history_between(&student, timeframe, start, as_of_date)?;
            let result = engine.check_thresholds(&student, &as_of_date.to_string(), &rules)?;
            let alerts = db::fetch_alerts(&pool, &student).await?;

            let text = report::build_report(&StudentReport {
                student_id: &student,
                as_of: as_of_date,
                year: as_of_date.year(),
                summary: &summary,
                timeframe,
                history: &history,
                result: &result,
                alerts: &alerts,
            });
            std::fs::write(&out, text)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
