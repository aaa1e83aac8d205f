//! Per-user engagement tiers.
//!
//! Each distinct user gets exactly one [`Tier`], chosen by walking [`TIER_RULES`]
//! top-down and stopping at the first predicate that holds. Users also get an
//! [`ActivityLevel`] from their raw event volume; the two labels are independent.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::event::BehaviorType;
use crate::store::{EventStore, UserEvents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentThresholds {
    /// Purchases needed for the `core` tier.
    pub high_buy: i64,
    /// Combined cart + favorite events needed for the `interested` tier.
    pub interest_min: i64,
    /// Page views needed for the `browsing` tier.
    pub browse_min: i64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            high_buy: 3,
            interest_min: 2,
            browse_min: 1,
        }
    }
}

/// Partial override of [`SegmentThresholds`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdOverrides {
    pub high_buy: Option<i64>,
    pub interest_min: Option<i64>,
    pub browse_min: Option<i64>,
}

impl SegmentThresholds {
    pub fn with_overrides(self, overrides: ThresholdOverrides) -> Self {
        Self {
            high_buy: overrides.high_buy.unwrap_or(self.high_buy),
            interest_min: overrides.interest_min.unwrap_or(self.interest_min),
            browse_min: overrides.browse_min.unwrap_or(self.browse_min),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("high_buy", self.high_buy),
            ("interest_min", self.interest_min),
            ("browse_min", self.browse_min),
        ] {
            if value <= 0 {
                return Err(CoreError::InvalidThreshold {
                    name,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Parse a textual threshold such as an environment variable or CLI value.
    pub fn parse_value(name: &'static str, raw: &str) -> Result<i64> {
        let invalid = || CoreError::InvalidThreshold {
            name,
            value: raw.to_string(),
        };
        let value: i64 = raw.trim().parse().map_err(|_| invalid())?;
        if value <= 0 {
            return Err(invalid());
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BehaviorCounts {
    pub pv: u64,
    pub fav: u64,
    pub cart: u64,
    pub buy: u64,
}

impl BehaviorCounts {
    pub fn get(&self, behavior: BehaviorType) -> u64 {
        match behavior {
            BehaviorType::Pv => self.pv,
            BehaviorType::Fav => self.fav,
            BehaviorType::Cart => self.cart,
            BehaviorType::Buy => self.buy,
        }
    }

    fn bump(&mut self, behavior: BehaviorType) {
        match behavior {
            BehaviorType::Pv => self.pv += 1,
            BehaviorType::Fav => self.fav += 1,
            BehaviorType::Cart => self.cart += 1,
            BehaviorType::Buy => self.buy += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.pv + self.fav + self.cart + self.buy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Core,
    Converted,
    Interested,
    Browsing,
    Passive,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Self::Core,
        Self::Converted,
        Self::Interested,
        Self::Browsing,
        Self::Passive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Converted => "converted",
            Self::Interested => "interested",
            Self::Browsing => "browsing",
            Self::Passive => "passive",
        }
    }
}

type TierRule = fn(&BehaviorCounts, &SegmentThresholds) -> bool;

/// Ordered decision list. Anything that matches none of these is [`Tier::Passive`].
pub const TIER_RULES: &[(Tier, TierRule)] = &[
    (Tier::Core, is_core),
    (Tier::Converted, is_converted),
    (Tier::Interested, is_interested),
    (Tier::Browsing, is_browsing),
];

fn is_core(c: &BehaviorCounts, t: &SegmentThresholds) -> bool {
    at_least(c.buy, t.high_buy)
}

fn is_converted(c: &BehaviorCounts, _: &SegmentThresholds) -> bool {
    c.buy >= 1
}

fn is_interested(c: &BehaviorCounts, t: &SegmentThresholds) -> bool {
    at_least(c.cart + c.fav, t.interest_min)
}

fn is_browsing(c: &BehaviorCounts, t: &SegmentThresholds) -> bool {
    at_least(c.pv, t.browse_min)
}

fn at_least(count: u64, threshold: i64) -> bool {
    i64::try_from(count).map_or(true, |count| count >= threshold)
}

pub fn classify(counts: &BehaviorCounts, thresholds: &SegmentThresholds) -> Tier {
    TIER_RULES
        .iter()
        .find(|(_, rule)| rule(counts, thresholds))
        .map_or(Tier::Passive, |(tier, _)| *tier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// 1-5 events.
    Low,
    /// 6-20 events.
    Medium,
    /// 21-100 events.
    High,
    /// More than 100 events.
    VeryHigh,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::VeryHigh];

    pub fn from_total(total: u64) -> Self {
        match total {
            0..=5 => Self::Low,
            6..=20 => Self::Medium,
            21..=100 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: u64,
    pub counts: BehaviorCounts,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    /// Whole days between `last_seen` and the newest event in the store.
    pub days_since_last_seen: i64,
    pub tier: Tier,
    pub activity: ActivityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierShare {
    pub tier: Tier,
    pub users: u64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityShare {
    pub level: ActivityLevel,
    pub users: u64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub total_users: u64,
    pub thresholds: SegmentThresholds,
    /// One per distinct user. Order is not significant.
    pub profiles: Vec<UserProfile>,
    /// Every tier in decision-list order, including empty ones.
    pub tiers: Vec<TierShare>,
    pub activity: Vec<ActivityShare>,
}

impl Segmentation {
    pub fn tier_count(&self, tier: Tier) -> u64 {
        self.tiers
            .iter()
            .find(|t| t.tier == tier)
            .map_or(0, |t| t.users)
    }

    pub fn tier_share(&self, tier: Tier) -> f64 {
        self.tiers
            .iter()
            .find(|t| t.tier == tier)
            .map_or(0.0, |t| t.share)
    }

    pub fn activity_share(&self, level: ActivityLevel) -> f64 {
        self.activity
            .iter()
            .find(|a| a.level == level)
            .map_or(0.0, |a| a.share)
    }

    pub fn profile(&self, user_id: u64) -> Option<&UserProfile> {
        self.profiles.iter().find(|p| p.user_id == user_id)
    }
}

/// Build one profile per distinct user and assign tiers.
pub fn segment(store: &EventStore, thresholds: &SegmentThresholds) -> Result<Segmentation> {
    thresholds.validate()?;
    store.ensure_non_empty()?;
    let reference = store.latest_timestamp().ok_or(CoreError::EmptyDataset)?;

    let profiles: Vec<UserProfile> = store
        .users()
        .filter_map(|(user_id, events)| build_profile(user_id, events, thresholds, reference))
        .collect();

    let total_users = profiles.len() as u64;
    let mut tier_counts = [0u64; Tier::ALL.len()];
    let mut activity_counts = [0u64; ActivityLevel::ALL.len()];
    for profile in &profiles {
        tier_counts[profile.tier as usize] += 1;
        activity_counts[profile.activity as usize] += 1;
    }

    let tiers = Tier::ALL
        .iter()
        .map(|&tier| {
            let users = tier_counts[tier as usize];
            TierShare {
                tier,
                users,
                share: ratio(users, total_users),
            }
        })
        .collect();
    let activity = ActivityLevel::ALL
        .iter()
        .map(|&level| {
            let users = activity_counts[level as usize];
            ActivityShare {
                level,
                users,
                share: ratio(users, total_users),
            }
        })
        .collect();

    tracing::debug!(users = total_users, "Users segmented");

    Ok(Segmentation {
        total_users,
        thresholds: *thresholds,
        profiles,
        tiers,
        activity,
    })
}

fn build_profile(
    user_id: u64,
    events: UserEvents<'_>,
    thresholds: &SegmentThresholds,
    reference: NaiveDateTime,
) -> Option<UserProfile> {
    let mut counts = BehaviorCounts::default();
    let mut span: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for event in events {
        counts.bump(event.behavior_type);
        span = Some(match span {
            None => (event.timestamp, event.timestamp),
            Some((first, last)) => (first.min(event.timestamp), last.max(event.timestamp)),
        });
    }
    // The index never holds a user without events.
    let (first_seen, last_seen) = span?;

    Some(UserProfile {
        user_id,
        counts,
        first_seen,
        last_seen,
        days_since_last_seen: (reference - last_seen).num_days(),
        tier: classify(&counts, thresholds),
        activity: ActivityLevel::from_total(counts.total()),
    })
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
