//! One-shot analysis run combining every analyzer.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::funnel::{compute_funnel, Funnel};
use crate::insights::{catalog_insights, generate, Insight};
use crate::overview::{overview, Overview};
use crate::segmentation::{segment, Segmentation};
use crate::store::{EventStore, LoadSummary};
use crate::time_patterns::{analyze, TimePatterns};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub load: LoadSummary,
    pub overview: Overview,
    pub time_patterns: TimePatterns,
    pub segmentation: Segmentation,
    pub funnel: Funnel,
    pub insights: Vec<Insight>,
}

/// Run every analyzer over `store`. Any failure fails the whole run; no partial
/// report is produced.
pub fn run_analysis(store: &EventStore, config: &EngineConfig) -> Result<AnalysisReport> {
    let overview = overview(store, config.top_n)?;
    let time_patterns = analyze(store)?;
    let segmentation = segment(store, &config.thresholds)?;
    let funnel = compute_funnel(store)?;
    let mut insights = generate(&time_patterns, &segmentation, &funnel);
    insights.extend(catalog_insights(&overview));

    tracing::info!(
        events = overview.total_events,
        users = overview.distinct_users,
        insights = insights.len(),
        "Analysis complete"
    );

    Ok(AnalysisReport {
        load: store.summary().clone(),
        overview,
        time_patterns,
        segmentation,
        funnel,
        insights,
    })
}
