//! Hour-of-day / day-of-week activity density.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use serde::Serialize;

use crate::error::Result;
use crate::store::EventStore;

/// Weekday labels indexed by days-from-Monday.
pub const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub hour: u8,
    /// 0 = Monday … 6 = Sunday.
    pub weekday: u8,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u8,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub weekday: u8,
    pub name: &'static str,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePatterns {
    pub total_events: u64,
    /// Non-empty (hour, weekday) cells, ordered by weekday then hour.
    pub buckets: Vec<TimeBucket>,
    /// All 24 hours, zero-filled.
    pub hourly: Vec<HourCount>,
    /// All 7 weekdays, zero-filled.
    pub weekdays: Vec<WeekdayCount>,
    pub peak_hour: u8,
    pub peak_weekday: u8,
}

impl TimePatterns {
    pub fn peak_weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES[usize::from(self.peak_weekday)]
    }

    pub fn peak_hour_count(&self) -> u64 {
        self.hourly[usize::from(self.peak_hour)].event_count
    }

    pub fn peak_weekday_count(&self) -> u64 {
        self.weekdays[usize::from(self.peak_weekday)].event_count
    }
}

/// Bucket every event by the wall-clock hour and weekday of its timestamp.
pub fn analyze(store: &EventStore) -> Result<TimePatterns> {
    store.ensure_non_empty()?;

    let mut cells: BTreeMap<(u8, u8), u64> = BTreeMap::new();
    let mut hourly = [0u64; 24];
    let mut weekdays = [0u64; 7];

    for event in store.iter() {
        // hour() < 24 and num_days_from_monday() < 7, so both fit in u8.
        let hour = event.timestamp.hour() as u8;
        let weekday = event.timestamp.weekday().num_days_from_monday() as u8;
        *cells.entry((weekday, hour)).or_default() += 1;
        hourly[usize::from(hour)] += 1;
        weekdays[usize::from(weekday)] += 1;
    }

    let buckets = cells
        .into_iter()
        .map(|((weekday, hour), event_count)| TimeBucket {
            hour,
            weekday,
            event_count,
        })
        .collect();

    let peak_hour = earliest_max(&hourly);
    let peak_weekday = earliest_max(&weekdays);
    tracing::debug!(peak_hour, peak_weekday, "Time patterns computed");

    Ok(TimePatterns {
        total_events: store.len() as u64,
        buckets,
        hourly: hourly
            .iter()
            .zip(0u8..)
            .map(|(&event_count, hour)| HourCount { hour, event_count })
            .collect(),
        weekdays: weekdays
            .iter()
            .zip(0u8..)
            .map(|(&event_count, weekday)| WeekdayCount {
                weekday,
                name: WEEKDAY_NAMES[usize::from(weekday)],
                event_count,
            })
            .collect(),
        peak_hour,
        peak_weekday,
    })
}

/// Index of the largest count; ties go to the lowest index.
fn earliest_max(counts: &[u64]) -> u8 {
    let mut best = 0usize;
    for (idx, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = idx;
        }
    }
    best as u8
}
