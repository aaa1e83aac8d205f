pub mod analytics;
pub mod config;
pub mod error;
pub mod event;
pub mod funnel;
pub mod insights;
pub mod overview;
pub mod segmentation;
pub mod store;
pub mod time_patterns;

pub use analytics::{run_analysis, AnalysisReport};
pub use config::EngineConfig;
pub use error::CoreError;
pub use event::{BehaviorType, Event, TimestampFormat};
pub use funnel::{compute_funnel, Funnel, FunnelStage, FunnelStageKind};
pub use insights::{catalog_insights, generate, Insight, InsightKind};
pub use overview::{overview, Overview};
pub use segmentation::{
    segment, SegmentThresholds, Segmentation, ThresholdOverrides, Tier, UserProfile,
};
pub use store::{EventStore, LoadOptions, LoadSummary};
pub use time_patterns::{analyze, TimeBucket, TimePatterns};
