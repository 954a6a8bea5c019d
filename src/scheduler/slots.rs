//! Best posting slots per weekday
//!
//! A [`SlotPlanner`] turns an analytics report into an [`OptimalTimeTable`].
//! The bundled [`StaticSlotPlanner`] ignores the report and returns a fixed
//! table; analytics-driven planners plug in through the same trait.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};

use crate::models::PerformanceReport;

/// Weekdays in table order
const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Preferred times of day, per weekday, in preference order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptimalTimeTable {
    slots: [Vec<NaiveTime>; 7],
}

impl OptimalTimeTable {
    /// Table with no slots on any day
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mon-Fri 09:00, 13:00, 19:00 and Sat-Sun 10:00, 14:00
    pub fn standard() -> Self {
        let weekday = [hm(9, 0), hm(13, 0), hm(19, 0)];
        let weekend = [hm(10, 0), hm(14, 0)];

        WEEK.iter().fold(Self::empty(), |table, day| match day {
            Weekday::Sat | Weekday::Sun => table.with_slots(*day, weekend),
            _ => table.with_slots(*day, weekday),
        })
    }

    /// Replace the slots of one weekday
    #[must_use]
    pub fn with_slots(mut self, day: Weekday, slots: impl IntoIterator<Item = NaiveTime>) -> Self {
        self.slots[day.num_days_from_monday() as usize] = slots.into_iter().collect();
        self
    }

    pub fn slots(&self, day: Weekday) -> &[NaiveTime] {
        &self.slots[day.num_days_from_monday() as usize]
    }

    /// Whether `at` falls on a best slot, compared at minute precision
    pub fn is_best(&self, at: DateTime<Utc>) -> bool {
        self.slots(at.weekday())
            .iter()
            .any(|slot| slot.hour() == at.hour() && slot.minute() == at.minute())
    }

    /// Where a post at `at` should move to, if anywhere
    ///
    /// `None` when `at` already sits on a best slot or its weekday has no
    /// slots. Otherwise the first slot on the same date, seconds zeroed.
    pub fn reschedule_target(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_best(at) {
            return None;
        }
        let first = self.slots(at.weekday()).first()?;
        Some(at.date_naive().and_time(*first).and_utc())
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Derives the best-slot table from recent performance
pub trait SlotPlanner: Send + Sync {
    fn plan(&self, report: &PerformanceReport) -> OptimalTimeTable;
}

/// Planner that always returns the same table
#[derive(Debug, Clone)]
pub struct StaticSlotPlanner {
    table: OptimalTimeTable,
}

impl StaticSlotPlanner {
    pub fn new(table: OptimalTimeTable) -> Self {
        Self { table }
    }
}

impl Default for StaticSlotPlanner {
    fn default() -> Self {
        Self::new(OptimalTimeTable::standard())
    }
}

impl SlotPlanner for StaticSlotPlanner {
    fn plan(&self, _report: &PerformanceReport) -> OptimalTimeTable {
        self.table.clone()
    }
}
