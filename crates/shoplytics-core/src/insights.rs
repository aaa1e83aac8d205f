//! Threshold rules that turn analyzer output into short observations.

use std::fmt;

use serde::Serialize;

use crate::funnel::Funnel;
use crate::overview::Overview;
use crate::segmentation::{ActivityLevel, Segmentation, Tier};
use crate::time_patterns::TimePatterns;

/// A transition losing more than this fraction of users is flagged.
const DROP_ALERT: f64 = 0.5;
/// Share of users with intent but no purchase worth calling out.
const INTENT_ALERT: f64 = 0.2;
const BROWSE_MAJORITY: f64 = 0.5;
/// Ratio between weekend and weekday daily averages that counts as skewed.
const WEEK_SKEW: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Time,
    Segmentation,
    Funnel,
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub text: String,
}

impl Insight {
    fn new(kind: InsightKind, text: String) -> Self {
        Self { kind, text }
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Time insights first, then segmentation, then funnel.
pub fn generate(time: &TimePatterns, segmentation: &Segmentation, funnel: &Funnel) -> Vec<Insight> {
    let mut insights = time_insights(time);
    insights.extend(segmentation_insights(segmentation));
    insights.extend(funnel_insights(funnel));
    insights
}

/// Item and category observations drawn from the dataset overview.
pub fn catalog_insights(overview: &Overview) -> Vec<Insight> {
    let mut out = Vec::new();
    if let Some(item) = overview.top_items.first() {
        out.push(Insight::new(
            InsightKind::Catalog,
            format!(
                "Most popular item is {} with {} events ({} of all activity)",
                item.id,
                item.events,
                pct(share(item.events, overview.total_events)),
            ),
        ));
    }
    if let Some(category) = overview.top_categories.first() {
        out.push(Insight::new(
            InsightKind::Catalog,
            format!(
                "Most popular category is {} with {} events",
                category.id, category.events
            ),
        ));
    }
    out
}

fn pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn time_insights(time: &TimePatterns) -> Vec<Insight> {
    let mut out = Vec::new();
    let end_hour = (time.peak_hour + 2) % 24;
    out.push(Insight::new(
        InsightKind::Time,
        format!(
            "Peak activity window is {:02}:00-{:02}:00; the peak hour alone carries {} events ({} of all activity)",
            time.peak_hour,
            end_hour,
            time.peak_hour_count(),
            pct(share(time.peak_hour_count(), time.total_events)),
        ),
    ));
    out.push(Insight::new(
        InsightKind::Time,
        format!(
            "{} is the most active weekday with {} events",
            time.peak_weekday_name(),
            time.peak_weekday_count(),
        ),
    ));

    let weekday_total: u64 = time.weekdays[..5].iter().map(|d| d.event_count).sum();
    let weekend_total: u64 = time.weekdays[5..].iter().map(|d| d.event_count).sum();
    let weekday_avg = weekday_total as f64 / 5.0;
    let weekend_avg = weekend_total as f64 / 2.0;
    if weekday_total == 0 && weekend_total > 0 {
        out.push(Insight::new(
            InsightKind::Time,
            "All recorded activity falls on weekends".to_string(),
        ));
    } else if weekday_avg > 0.0 && weekend_avg >= weekday_avg * WEEK_SKEW {
        out.push(Insight::new(
            InsightKind::Time,
            format!(
                "Weekend days average {} more activity than weekdays",
                pct(weekend_avg / weekday_avg - 1.0)
            ),
        ));
    } else if weekend_avg > 0.0 && weekday_avg >= weekend_avg * WEEK_SKEW {
        out.push(Insight::new(
            InsightKind::Time,
            format!(
                "Weekdays average {} more activity than weekend days",
                pct(weekday_avg / weekend_avg - 1.0)
            ),
        ));
    }
    out
}

fn segmentation_insights(seg: &Segmentation) -> Vec<Insight> {
    let mut out = Vec::new();
    let buyers = seg.tier_share(Tier::Core) + seg.tier_share(Tier::Converted);
    out.push(Insight::new(
        InsightKind::Segmentation,
        format!(
            "{} of users purchased at least once; {} are core repeat buyers ({}+ purchases)",
            pct(buyers),
            pct(seg.tier_share(Tier::Core)),
            seg.thresholds.high_buy,
        ),
    ));

    let interested = seg.tier_share(Tier::Interested);
    if interested >= INTENT_ALERT {
        out.push(Insight::new(
            InsightKind::Segmentation,
            format!(
                "{} of users favorited or carted items without buying; they are the nearest conversion opportunity",
                pct(interested)
            ),
        ));
    }

    let low_intent = seg.tier_share(Tier::Browsing) + seg.tier_share(Tier::Passive);
    if low_intent > BROWSE_MAJORITY {
        out.push(Insight::new(
            InsightKind::Segmentation,
            format!(
                "Most users ({}) show no purchase intent beyond browsing",
                pct(low_intent)
            ),
        ));
    }

    let highly_active =
        seg.activity_share(ActivityLevel::High) + seg.activity_share(ActivityLevel::VeryHigh);
    if highly_active > 0.0 {
        out.push(Insight::new(
            InsightKind::Segmentation,
            format!(
                "{} of users are highly active (more than 20 events)",
                pct(highly_active)
            ),
        ));
    }
    out
}

fn funnel_insights(funnel: &Funnel) -> Vec<Insight> {
    let mut out = Vec::new();

    if let Some(drop) = funnel.largest_drop() {
        if drop.drop_rate > DROP_ALERT {
            out.push(Insight::new(
                InsightKind::Funnel,
                format!(
                    "Largest funnel drop is {} → {}: {} of users do not continue",
                    drop.from.name,
                    drop.to.name,
                    pct(drop.drop_rate)
                ),
            ));
        }
    }

    if funnel.non_monotonic {
        let grown: Vec<String> = funnel
            .stages
            .windows(2)
            .filter(|w| w[1].users > w[0].users)
            .map(|w| format!("{} → {}", w[0].name, w[1].name))
            .collect();
        out.push(Insight::new(
            InsightKind::Funnel,
            format!(
                "Stage counts grow at {}: some users reach later stages without recorded earlier-stage events",
                grown.join(", ")
            ),
        ));
    }

    match funnel.final_conversion_rate {
        Some(rate) => out.push(Insight::new(
            InsightKind::Funnel,
            format!("View → purchase user conversion is {}", pct(rate)),
        )),
        None => out.push(Insight::new(
            InsightKind::Funnel,
            "View → purchase conversion is undefined: no user has a page-view event".to_string(),
        )),
    }
    out
}
