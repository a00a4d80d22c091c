//! Off-day oracle: decides which dates count toward attendance statistics.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::config::OffDayStrategy;
use crate::dates;
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::store::{DayOffStore, RecordStore};

pub struct OffDayOracle<'a, S> {
    store: &'a S,
    strategy: OffDayStrategy,
    roster_size: usize,
    excused_by_date: HashMap<NaiveDate, HashSet<&'a str>>,
}

impl<'a, S> OffDayOracle<'a, S>
where
    S: RecordStore + DayOffStore,
{
    /// The excused-roster strategy indexes the snapshot once here so each
    /// lookup is a single hash lookup.
    pub fn new(store: &'a S, strategy: OffDayStrategy) -> Self {
        let mut roster_size = 0;
        let mut excused_by_date: HashMap<NaiveDate, HashSet<&'a str>> = HashMap::new();

        if strategy == OffDayStrategy::ExcusedRoster {
            let roster: HashSet<String> = store.roster().into_iter().collect();
            roster_size = roster.len();
            let records: &'a [AttendanceRecord] = store.all_attendance();
            for record in records {
                if record.status == AttendanceStatus::Excused
                    && roster.contains(&record.student_id)
                {
                    excused_by_date
                        .entry(record.date)
                        .or_default()
                        .insert(record.student_id.as_str());
                }
            }
        }

        Self {
            store,
            strategy,
            roster_size,
            excused_by_date,
        }
    }

    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        dates::is_weekend(date)
    }

    pub fn is_planned_day_off(&self, date: NaiveDate) -> bool {
        self.store.has_day_off(date)
    }

    /// True when every rostered student is EXCUSED on `date`. An empty
    /// roster never qualifies.
    fn is_roster_excused(&self, date: NaiveDate) -> bool {
        self.roster_size > 0
            && self
                .excused_by_date
                .get(&date)
                .is_some_and(|students| students.len() == self.roster_size)
    }

    pub fn is_off_day(&self, date: NaiveDate) -> bool {
        if self.is_weekend(date) {
            return true;
        }
        match self.strategy {
            OffDayStrategy::Declarative => self.is_planned_day_off(date),
            OffDayStrategy::ExcusedRoster => self.is_roster_excused(date),
        }
    }
}
