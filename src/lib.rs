//! Attendance analytics and chronic-absence early warning.
//!
//! The engine is a pure function of an in-memory [`Snapshot`]: it buckets a
//! student's records into daily, weekly or monthly windows, folds them into
//! year-to-date totals, and evaluates alert rules over a rolling 30-day
//! window. Weekends and planned days off never count toward statistics.

pub mod aggregate;
pub mod alerts;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod report;
pub mod store;
pub mod summary;
pub mod telemetry;
pub mod thresholds;

pub use alerts::{reconcile_alerts, Alert, AlertState};
pub use calendar::OffDayOracle;
pub use config::{EngineConfig, ExcusedOnOffDays, OffDayStrategy};
pub use engine::AttendanceEngine;
pub use error::{AttendanceError, Result};
pub use models::{
    AlertNotification, AlertResult, AlertRules, AttendanceRecord, AttendanceStatus, Bucket, Counts,
    DayOffReason, DayOffScope, PlannedDayOff, Summary, Timeframe,
};
pub use store::{DayOffStore, RecordStore, Snapshot};
pub use thresholds::{AlertKind, Breach, LogNotifier, Measurements, Notifier};
