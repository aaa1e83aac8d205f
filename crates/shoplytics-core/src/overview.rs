//! Dataset-level totals, behavior mix, and most active items and categories.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::event::BehaviorType;
use crate::store::EventStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorShare {
    pub behavior_type: BehaviorType,
    pub label: &'static str,
    pub events: u64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedId {
    pub id: u64,
    pub events: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_events: u64,
    pub distinct_users: u64,
    pub distinct_items: u64,
    pub distinct_categories: u64,
    pub first_event_at: NaiveDateTime,
    pub last_event_at: NaiveDateTime,
    /// All four behaviors in funnel order, zero-filled.
    pub behaviors: Vec<BehaviorShare>,
    /// Purchase events per page-view event; 0 when there are no page views.
    pub view_to_purchase_rate: f64,
    pub top_items: Vec<RankedId>,
    pub top_categories: Vec<RankedId>,
}

impl Overview {
    pub fn behavior_events(&self, behavior: BehaviorType) -> u64 {
        self.behaviors
            .iter()
            .find(|b| b.behavior_type == behavior)
            .map_or(0, |b| b.events)
    }
}

pub fn overview(store: &EventStore, top_n: usize) -> Result<Overview> {
    store.ensure_non_empty()?;

    let mut behavior_counts = [0u64; BehaviorType::ALL.len()];
    let mut items: HashMap<u64, u64> = HashMap::new();
    let mut categories: HashMap<u64, u64> = HashMap::new();

    for event in store.iter() {
        behavior_counts[event.behavior_type.index()] += 1;
        *items.entry(event.item_id).or_default() += 1;
        *categories.entry(event.category_id).or_default() += 1;
    }

    let total_events = store.len() as u64;
    let behaviors = BehaviorType::ALL
        .iter()
        .map(|&behavior| {
            let events = behavior_counts[behavior.index()];
            BehaviorShare {
                behavior_type: behavior,
                label: behavior.label(),
                events,
                share: events as f64 / total_events as f64,
            }
        })
        .collect();

    let pv = behavior_counts[BehaviorType::Pv.index()];
    let buy = behavior_counts[BehaviorType::Buy.index()];
    let view_to_purchase_rate = if pv == 0 {
        0.0
    } else {
        buy as f64 / pv as f64
    };

    let first_event_at = store.earliest_timestamp().ok_or(CoreError::EmptyDataset)?;
    let last_event_at = store.latest_timestamp().ok_or(CoreError::EmptyDataset)?;

    Ok(Overview {
        total_events,
        distinct_users: store.user_count() as u64,
        distinct_items: items.len() as u64,
        distinct_categories: categories.len() as u64,
        first_event_at,
        last_event_at,
        behaviors,
        view_to_purchase_rate,
        top_items: top_n_by_count(items, top_n),
        top_categories: top_n_by_count(categories, top_n),
    })
}

/// Highest counts first; equal counts ordered by ascending id.
fn top_n_by_count(counts: HashMap<u64, u64>, n: usize) -> Vec<RankedId> {
    let mut ranked: Vec<RankedId> = counts
        .into_iter()
        .map(|(id, events)| RankedId { id, events })
        .collect();
    ranked.sort_by(|a, b| b.events.cmp(&a.events).then(a.id.cmp(&b.id)));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use chrono::DateTime;

    fn event(user_id: u64, item_id: u64, category_id: u64, behavior: BehaviorType) -> Event {
        Event {
            user_id,
            item_id,
            category_id,
            behavior_type: behavior,
            timestamp: DateTime::from_timestamp(1_511_544_070 + user_id as i64, 0)
                .map(|dt| dt.naive_utc())
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn totals_and_mix() {
        let store = EventStore::from_events(vec![
            event(1, 10, 5, BehaviorType::Pv),
            event(1, 10, 5, BehaviorType::Pv),
            event(2, 11, 5, BehaviorType::Pv),
            event(2, 11, 6, BehaviorType::Buy),
        ]);
        let result = overview(&store, 5).expect("overview");
        assert_eq!(result.total_events, 4);
        assert_eq!(result.distinct_users, 2);
        assert_eq!(result.distinct_items, 2);
        assert_eq!(result.distinct_categories, 2);
        assert_eq!(result.behavior_events(BehaviorType::Pv), 3);
        assert_eq!(result.behavior_events(BehaviorType::Fav), 0);
        assert!((result.view_to_purchase_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!(result.first_event_at < result.last_event_at);
    }

    #[test]
    fn top_lists_break_ties_by_id() {
        let store = EventStore::from_events(vec![
            event(1, 30, 7, BehaviorType::Pv),
            event(1, 20, 7, BehaviorType::Pv),
            event(1, 10, 8, BehaviorType::Pv),
            event(1, 10, 9, BehaviorType::Pv),
        ]);
        let result = overview(&store, 2).expect("overview");
        assert_eq!(
            result.top_items,
            vec![
                RankedId { id: 10, events: 2 },
                RankedId { id: 20, events: 1 }
            ]
        );
        assert_eq!(result.top_categories[0], RankedId { id: 7, events: 2 });
        assert_eq!(result.top_categories.len(), 2);
    }

    #[test]
    fn no_page_views_means_zero_event_rate() {
        let store = EventStore::from_events(vec![event(1, 10, 5, BehaviorType::Buy)]);
        let result = overview(&store, 5).expect("overview");
        assert_eq!(result.view_to_purchase_rate, 0.0);
    }
}
