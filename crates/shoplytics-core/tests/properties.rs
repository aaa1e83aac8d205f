use std::collections::HashSet;

use shoplytics_core::{
    analyze, compute_funnel, run_analysis, segment, CoreError, EngineConfig, EventStore,
    FunnelStageKind, InsightKind, LoadOptions, SegmentThresholds, Tier,
};

const T0: &str = "1511544070";
const T1: &str = "1511547670";

fn load(rows: &[[&str; 5]]) -> EventStore {
    let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
    EventStore::load(rows, &LoadOptions::default()).expect("lenient load")
}

/// Deterministic mixed dataset: 60 users with varied behavior over a week.
fn mixed_store() -> EventStore {
    let behaviors = ["pv", "pv", "fav", "pv", "cart", "buy", "pv"];
    let mut rows: Vec<Vec<String>> = Vec::new();
    for i in 0u64..600 {
        let user = (i * 7) % 60 + 1;
        let behavior = behaviors[((i * 13 + user) % behaviors.len() as u64) as usize];
        let ts = 1_511_544_070 + (i * 3_571) % (7 * 86_400);
        rows.push(vec![
            user.to_string(),
            (i % 97).to_string(),
            (i % 11).to_string(),
            behavior.to_string(),
            ts.to_string(),
        ]);
    }
    EventStore::load(rows, &LoadOptions::default()).expect("load")
}

#[test]
fn worked_example_funnel_and_tiers() {
    let store = load(&[
        ["1", "10", "5", "pv", T0],
        ["1", "10", "5", "buy", T1],
        ["2", "11", "6", "pv", T0],
    ]);

    let funnel = compute_funnel(&store).expect("funnel");
    assert_eq!(funnel.counts(), vec![2, 0, 1]);
    assert_eq!(funnel.stages[0].stage, FunnelStageKind::View);
    assert_eq!(funnel.stages[1].name, "interest");

    let seg = segment(&store, &SegmentThresholds::default()).expect("segment");
    assert_eq!(seg.profile(1).expect("user 1").tier, Tier::Converted);
    assert_eq!(seg.profile(2).expect("user 2").tier, Tier::Browsing);
}

#[test]
fn unrecognized_behavior_skipped_by_default_and_fatal_when_strict() {
    let rows = vec![
        vec!["1", "10", "5", "pv", T0],
        vec!["1", "10", "5", "click", T0],
    ];

    let store = EventStore::load(rows.clone(), &LoadOptions::default()).expect("lenient");
    assert_eq!(store.len(), 1);
    assert_eq!(store.summary().rows_skipped, 1);

    let strict = LoadOptions {
        strict: true,
        ..LoadOptions::default()
    };
    match EventStore::load(rows, &strict) {
        Err(CoreError::MalformedRow { row, field, .. }) => {
            assert_eq!(row, 1);
            assert_eq!(field, "behavior_type");
        }
        other => panic!("expected MalformedRow, got {other:?}"),
    }
}

#[test]
fn every_user_lands_in_exactly_one_tier() {
    let store = mixed_store();
    let seg = segment(&store, &SegmentThresholds::default()).expect("segment");

    let ids: Vec<u64> = seg.profiles.iter().map(|p| p.user_id).collect();
    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "no user profiled twice");
    assert_eq!(unique.len(), store.user_count());

    let tier_total: u64 = Tier::ALL.iter().map(|&t| seg.tier_count(t)).sum();
    assert_eq!(tier_total, seg.total_users);
    let share_total: f64 = seg.tiers.iter().map(|t| t.share).sum();
    assert!((share_total - 1.0).abs() < 1e-9);
}

#[test]
fn time_buckets_cover_every_event_once() {
    let store = mixed_store();
    let time = analyze(&store).expect("analyze");
    let bucket_total: u64 = time.buckets.iter().map(|b| b.event_count).sum();
    let hourly_total: u64 = time.hourly.iter().map(|h| h.event_count).sum();
    let weekday_total: u64 = time.weekdays.iter().map(|d| d.event_count).sum();
    assert_eq!(bucket_total, store.len() as u64);
    assert_eq!(hourly_total, store.len() as u64);
    assert_eq!(weekday_total, store.len() as u64);
    assert!(time.buckets.iter().all(|b| b.event_count > 0));
}

#[test]
fn funnel_reports_true_counts_when_buyers_skip_views() {
    let store = load(&[
        ["1", "10", "5", "buy", T0],
        ["2", "10", "5", "buy", T0],
        ["3", "10", "5", "buy", T0],
        ["4", "10", "5", "pv", T0],
    ]);
    let funnel = compute_funnel(&store).expect("funnel");
    assert_eq!(funnel.counts(), vec![1, 0, 3]);
    assert!(funnel.non_monotonic);
    let overall = funnel.final_conversion_rate.expect("defined");
    assert!((overall - 3.0).abs() < 1e-9, "ratio is not clamped");
}

#[test]
fn empty_store_refuses_every_analyzer() {
    let store = load(&[["1", "10", "5", "click", T0]]);
    assert!(store.is_empty());
    assert_eq!(compute_funnel(&store), Err(CoreError::EmptyDataset));
    assert_eq!(analyze(&store), Err(CoreError::EmptyDataset));
    assert_eq!(
        segment(&store, &SegmentThresholds::default()),
        Err(CoreError::EmptyDataset)
    );
    assert_eq!(
        run_analysis(&store, &EngineConfig::default()),
        Err(CoreError::EmptyDataset)
    );
}

#[test]
fn repeated_runs_are_byte_identical() {
    let store = mixed_store();
    let thresholds = SegmentThresholds::default();

    let first = (
        serde_json::to_string(&analyze(&store).expect("analyze")).expect("json"),
        serde_json::to_string(&segment(&store, &thresholds).expect("segment")).expect("json"),
        serde_json::to_string(&compute_funnel(&store).expect("funnel")).expect("json"),
    );
    let second = (
        serde_json::to_string(&analyze(&store).expect("analyze")).expect("json"),
        serde_json::to_string(&segment(&store, &thresholds).expect("segment")).expect("json"),
        serde_json::to_string(&compute_funnel(&store).expect("funnel")).expect("json"),
    );
    assert_eq!(first, second);
}

#[test]
fn full_report_serializes() {
    let store = mixed_store();
    let report = run_analysis(&store, &EngineConfig::default()).expect("report");
    assert_eq!(report.overview.total_events, 600);
    assert_eq!(report.load.events_loaded, 600);
    assert!(!report.insights.is_empty());
    let last = report.insights.last().expect("insights");
    assert_eq!(last.kind, InsightKind::Catalog);
    assert!(last.text.starts_with("Most popular category is"));

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["funnel"]["stages"][0]["stage"], "view");
    assert_eq!(json["segmentation"]["tiers"][0]["tier"], "core");
    assert_eq!(json["overview"]["behaviors"][3]["behavior_type"], "buy");
}
