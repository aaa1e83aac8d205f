//! In-memory event store for a single analysis run.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::event::{BehaviorType, Event, TimestampFormat};

/// Skipped rows kept verbatim in the load summary; the rest are only counted.
const MAX_SKIP_SAMPLES: usize = 20;
/// Skipped rows that get their own `warn` line.
const MAX_LOGGED_SKIPS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Abort on the first malformed row instead of skipping it.
    pub strict: bool,
    pub timestamp_format: TimestampFormat,
    /// Drop rows repeating an earlier (user, item, behavior, timestamp).
    pub dedupe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub field: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub events_loaded: usize,
    pub rows_skipped: usize,
    pub duplicates_removed: usize,
    /// First few skipped rows, in input order.
    pub skipped: Vec<SkippedRow>,
}

type DedupeKey = (u64, u64, BehaviorType, NaiveDateTime);

/// Ordered, immutable collection of parsed events.
///
/// The per-user index is built on first use and reused by every analyzer that
/// needs it.
#[derive(Debug)]
pub struct EventStore {
    events: Vec<Event>,
    summary: LoadSummary,
    user_index: OnceCell<BTreeMap<u64, Vec<usize>>>,
}

impl EventStore {
    /// Parse raw positional rows into a store.
    ///
    /// In lenient mode malformed rows are skipped and counted; in strict mode the
    /// first one aborts the load with [`CoreError::MalformedRow`].
    pub fn load<I, R, S>(rows: I, options: &LoadOptions) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        Self::load_numbered(rows.into_iter().enumerate(), options)
    }

    /// Like [`load`](Self::load), but each row carries its own index for error
    /// reporting. Used when the caller has already filtered the input, so that
    /// indices still point into the original source.
    pub fn load_numbered<I, R, S>(rows: I, options: &LoadOptions) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, R)>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut events = Vec::new();
        let mut summary = LoadSummary::default();
        let mut seen: HashSet<DedupeKey> = HashSet::new();

        for (row, fields) in rows {
            summary.rows_read += 1;
            let event = match Event::parse_row(row, fields.as_ref(), &options.timestamp_format) {
                Ok(event) => event,
                Err(err) if options.strict => {
                    tracing::warn!(row, error = %err, "Aborting load on malformed row");
                    return Err(err);
                }
                Err(err) => {
                    record_skip(&mut summary, err);
                    continue;
                }
            };

            if options.dedupe {
                let key = (
                    event.user_id,
                    event.item_id,
                    event.behavior_type,
                    event.timestamp,
                );
                if !seen.insert(key) {
                    summary.duplicates_removed += 1;
                    continue;
                }
            }
            events.push(event);
        }

        summary.events_loaded = events.len();
        tracing::info!(
            rows_read = summary.rows_read,
            events_loaded = summary.events_loaded,
            skipped = summary.rows_skipped,
            duplicates_removed = summary.duplicates_removed,
            "Event store loaded"
        );

        Ok(Self {
            events,
            summary,
            user_index: OnceCell::new(),
        })
    }

    /// Build a store from already-parsed events, keeping their order.
    pub fn from_events(events: Vec<Event>) -> Self {
        let summary = LoadSummary {
            rows_read: events.len(),
            events_loaded: events.len(),
            ..LoadSummary::default()
        };
        Self {
            events,
            summary,
            user_index: OnceCell::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    /// Fails with [`CoreError::EmptyDataset`] when there is nothing to analyze.
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.events.is_empty() {
            Err(CoreError::EmptyDataset)
        } else {
            Ok(())
        }
    }

    pub fn latest_timestamp(&self) -> Option<NaiveDateTime> {
        self.events.iter().map(|e| e.timestamp).max()
    }

    pub fn earliest_timestamp(&self) -> Option<NaiveDateTime> {
        self.events.iter().map(|e| e.timestamp).min()
    }

    /// `user_id → positions` of that user's events, in input order.
    pub fn user_index(&self) -> &BTreeMap<u64, Vec<usize>> {
        self.user_index.get_or_init(|| {
            let mut index: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
            for (pos, event) in self.events.iter().enumerate() {
                index.entry(event.user_id).or_default().push(pos);
            }
            tracing::debug!(users = index.len(), "Built per-user event index");
            index
        })
    }

    pub fn user_count(&self) -> usize {
        self.user_index().len()
    }

    /// One user's events in input order, or `None` for an unknown user.
    pub fn user_events(&self, user_id: u64) -> Option<UserEvents<'_>> {
        self.user_index()
            .get(&user_id)
            .map(|positions| UserEvents::new(&self.events, positions))
    }

    /// Every distinct user with their events, ascending by `user_id`.
    pub fn users(&self) -> impl Iterator<Item = (u64, UserEvents<'_>)> + '_ {
        self.user_index()
            .iter()
            .map(|(user_id, positions)| (*user_id, UserEvents::new(&self.events, positions)))
    }
}

fn record_skip(summary: &mut LoadSummary, err: CoreError) {
    summary.rows_skipped += 1;
    let CoreError::MalformedRow {
        row,
        field,
        value,
        reason,
    } = err
    else {
        return;
    };
    if summary.rows_skipped <= MAX_LOGGED_SKIPS {
        tracing::warn!(row, field, value = %value, reason = %reason, "Skipping malformed row");
    }
    if summary.skipped.len() < MAX_SKIP_SAMPLES {
        summary.skipped.push(SkippedRow {
            row,
            field: field.to_string(),
            value,
            reason,
        });
    }
}

/// Iterator over one user's slice of the store.
#[derive(Debug, Clone)]
pub struct UserEvents<'a> {
    events: &'a [Event],
    positions: std::slice::Iter<'a, usize>,
}

impl<'a> UserEvents<'a> {
    fn new(events: &'a [Event], positions: &'a [usize]) -> Self {
        Self {
            events,
            positions: positions.iter(),
        }
    }
}

impl<'a> Iterator for UserEvents<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        let events = self.events;
        self.positions.next().map(|&pos| &events[pos])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl ExactSizeIterator for UserEvents<'_> {}
