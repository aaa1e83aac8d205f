//! View → interest → purchase conversion funnel.
//!
//! Membership is per user and per stage: a user reaches a stage when they have at
//! least one event of that stage's behavior types. Earlier stages are never implied
//! by later ones, so a buyer with no recorded page view counts toward the purchase
//! stage but not the view stage. Later stages can therefore be larger than earlier
//! ones; those counts are reported as-is and flagged with [`Funnel::non_monotonic`].

use serde::Serialize;

use crate::error::Result;
use crate::event::BehaviorType;
use crate::store::EventStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStageKind {
    View,
    Interest,
    Purchase,
}

impl FunnelStageKind {
    pub const ORDER: [FunnelStageKind; 3] = [Self::View, Self::Interest, Self::Purchase];

    pub fn behaviors(self) -> &'static [BehaviorType] {
        match self {
            Self::View => &[BehaviorType::Pv],
            Self::Interest => &[BehaviorType::Fav, BehaviorType::Cart],
            Self::Purchase => &[BehaviorType::Buy],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::View => "pv",
            Self::Interest => "interest",
            Self::Purchase => "buy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Interest => "Favorite / Add to Cart",
            Self::Purchase => "Purchase",
        }
    }

    fn for_behavior(behavior: BehaviorType) -> Self {
        match behavior {
            BehaviorType::Pv => Self::View,
            BehaviorType::Fav | BehaviorType::Cart => Self::Interest,
            BehaviorType::Buy => Self::Purchase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub stage: FunnelStageKind,
    pub step_order: u32,
    pub name: &'static str,
    /// Distinct users with at least one event mapped to this stage.
    pub users: u64,
    /// `users / first stage users`. `None` when the first stage is empty but this one is not.
    pub conversion_rate_from_start: Option<f64>,
    /// `users / previous stage users`, same `None` rule as above. The first stage is 1.0
    /// when it has users.
    pub conversion_rate_from_previous: Option<f64>,
    /// This stage's user count minus the next stage's, floored at zero. Stages are not
    /// nested, so this is not the number of users who failed to continue.
    pub drop_off_count: u64,
    pub drop_off_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Funnel {
    /// Distinct users in the store, whatever stages they reached.
    pub total_users: u64,
    pub stages: Vec<FunnelStage>,
    /// Last stage over first stage; may exceed 1.0.
    pub final_conversion_rate: Option<f64>,
    /// Set when some stage has more users than the stage before it.
    pub non_monotonic: bool,
}

/// An adjacent pair of stages and the fraction of users lost between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageDrop<'a> {
    pub from: &'a FunnelStage,
    pub to: &'a FunnelStage,
    pub drop_rate: f64,
}

impl Funnel {
    pub fn stage(&self, kind: FunnelStageKind) -> Option<&FunnelStage> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    pub fn counts(&self) -> Vec<u64> {
        self.stages.iter().map(|s| s.users).collect()
    }

    /// The transition losing the largest fraction of users. Ties go to the earlier
    /// transition; transitions with an undefined or growing rate are ignored.
    pub fn largest_drop(&self) -> Option<StageDrop<'_>> {
        let mut best: Option<StageDrop<'_>> = None;
        for pair in self.stages.windows(2) {
            let Some(rate) = pair[1].conversion_rate_from_previous else {
                continue;
            };
            if pair[0].users == 0 || rate >= 1.0 {
                continue;
            }
            let drop_rate = 1.0 - rate;
            if best.map_or(true, |b| drop_rate > b.drop_rate) {
                best = Some(StageDrop {
                    from: &pair[0],
                    to: &pair[1],
                    drop_rate,
                });
            }
        }
        best
    }
}

/// Count distinct users per stage and derive stage-to-stage rates.
pub fn compute_funnel(store: &EventStore) -> Result<Funnel> {
    store.ensure_non_empty()?;

    let mut reached = [0u64; FunnelStageKind::ORDER.len()];
    for (_, events) in store.users() {
        let mut hit = [false; FunnelStageKind::ORDER.len()];
        for event in events {
            hit[FunnelStageKind::for_behavior(event.behavior_type) as usize] = true;
        }
        for (count, flag) in reached.iter_mut().zip(hit) {
            *count += u64::from(flag);
        }
    }

    let funnel = build_funnel(store.user_count() as u64, &reached);
    if funnel.non_monotonic {
        tracing::warn!(
            counts = ?funnel.counts(),
            "Funnel stage counts increase between stages; later-stage users lack earlier-stage events"
        );
    }
    Ok(funnel)
}

fn build_funnel(total_users: u64, reached: &[u64]) -> Funnel {
    let first = reached.first().copied().unwrap_or(0);
    let mut stages = Vec::with_capacity(reached.len());

    for (idx, (&kind, &users)) in FunnelStageKind::ORDER.iter().zip(reached).enumerate() {
        let next = reached.get(idx + 1).copied();
        let drop_off_count = next.map_or(0, |n| users.saturating_sub(n));
        let drop_off_rate = if next.is_some() && users > 0 {
            drop_off_count as f64 / users as f64
        } else {
            0.0
        };
        let conversion_rate_from_previous = if idx == 0 {
            Some(if users > 0 { 1.0 } else { 0.0 })
        } else {
            rate(users, reached[idx - 1])
        };

        stages.push(FunnelStage {
            stage: kind,
            step_order: idx as u32 + 1,
            name: kind.name(),
            users,
            conversion_rate_from_start: rate(users, first),
            conversion_rate_from_previous,
            drop_off_count,
            drop_off_rate,
        });
    }

    let last = reached.last().copied().unwrap_or(0);
    Funnel {
        total_users,
        stages,
        final_conversion_rate: rate(last, first),
        non_monotonic: reached.windows(2).any(|w| w[1] > w[0]),
    }
}

/// `0/0` is a zero rate; `n/0` for `n > 0` has no defined rate.
fn rate(numerator: u64, denominator: u64) -> Option<f64> {
    match (numerator, denominator) {
        (0, 0) => Some(0.0),
        (_, 0) => None,
        (n, d) => Some(n as f64 / d as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use chrono::NaiveDate;

    #[test]
    fn rates_and_drop_off() {
        let funnel = build_funnel(10, &[10, 4, 1]);
        assert_eq!(funnel.counts(), vec![10, 4, 1]);
        assert_eq!(funnel.stages[0].drop_off_count, 6);
        assert!((funnel.stages[0].drop_off_rate - 0.6).abs() < 1e-9);
        assert_eq!(funnel.stages[2].drop_off_count, 0);
        assert_eq!(funnel.stages[0].conversion_rate_from_previous, Some(1.0));
        let interest = funnel.stages[1].conversion_rate_from_previous.expect("defined");
        assert!((interest - 0.4).abs() < 1e-9);
        let purchase = funnel.stages[2].conversion_rate_from_previous.expect("defined");
        assert!((purchase - 0.25).abs() < 1e-9);
        let overall = funnel.final_conversion_rate.expect("defined");
        assert!((overall - 0.1).abs() < 1e-9);
        assert!(!funnel.non_monotonic);
    }

    #[test]
    fn zero_over_zero_is_zero_rate() {
        let funnel = build_funnel(1, &[0, 0, 0]);
        assert_eq!(funnel.stages[1].conversion_rate_from_previous, Some(0.0));
        assert_eq!(funnel.final_conversion_rate, Some(0.0));
    }

    #[test]
    fn growth_from_empty_stage_is_undefined_not_clamped() {
        let funnel = build_funnel(3, &[2, 0, 1]);
        assert_eq!(funnel.stages[2].conversion_rate_from_previous, None);
        let overall = funnel.final_conversion_rate.expect("defined");
        assert!((overall - 0.5).abs() < 1e-9);
        assert!(funnel.non_monotonic);
    }

    #[test]
    fn purchase_can_exceed_view() {
        let funnel = build_funnel(4, &[1, 1, 3]);
        let overall = funnel.final_conversion_rate.expect("defined");
        assert!((overall - 3.0).abs() < 1e-9);
        assert!(funnel.non_monotonic);
    }

    #[test]
    fn drop_off_is_a_count_difference() {
        let store = EventStore::from_events(vec![
            Event {
                user_id: 1,
                item_id: 1,
                category_id: 1,
                behavior_type: BehaviorType::Pv,
                timestamp: NaiveDate::from_ymd_opt(2017, 11, 25)
                    .and_then(|d| d.and_hms_opt(9, 0, 0))
                    .expect("valid datetime"),
            },
            Event {
                user_id: 2,
                item_id: 1,
                category_id: 1,
                behavior_type: BehaviorType::Cart,
                timestamp: NaiveDate::from_ymd_opt(2017, 11, 25)
                    .and_then(|d| d.and_hms_opt(9, 0, 0))
                    .expect("valid datetime"),
            },
        ]);
        let funnel = compute_funnel(&store).expect("funnel");
        assert_eq!(funnel.counts(), vec![1, 1, 0]);
        // The only viewer never shows interest, but the counts match.
        assert_eq!(funnel.stages[0].drop_off_count, 0);
        assert_eq!(funnel.stages[0].drop_off_rate, 0.0);
        assert_eq!(funnel.stages[1].drop_off_count, 1);
    }

    #[test]
    fn largest_drop_prefers_biggest_loss() {
        let funnel = build_funnel(10, &[10, 8, 1]);
        let drop = funnel.largest_drop().expect("has drop");
        assert_eq!(drop.from.stage, FunnelStageKind::Interest);
        assert_eq!(drop.to.stage, FunnelStageKind::Purchase);
        assert!((drop.drop_rate - 0.875).abs() < 1e-9);

        let flat = build_funnel(2, &[2, 2, 2]);
        assert!(flat.largest_drop().is_none());
    }
}
