//! Synthetic event logs for trying the analyzers without real data.

use std::io::Write;

use anyhow::{Context, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shoplytics_core::BehaviorType;

pub const DEFAULT_ROWS: usize = 50_000;

/// Behavior mix of the generated log, in [`BehaviorType::ALL`] order.
const BEHAVIOR_WEIGHTS: [f64; 4] = [0.70, 0.10, 0.15, 0.05];
const USER_IDS: std::ops::Range<u64> = 1..1_000;
const ITEM_IDS: std::ops::Range<u64> = 1..5_000;
const CATEGORY_IDS: std::ops::Range<u64> = 1..100;
/// 2020-01-01 00:00:00 to 2020-01-02 00:00:00, China Standard Time.
const TIMESTAMPS: std::ops::Range<i64> = 1_577_808_000..1_577_894_400;

/// Write `rows` random headerless event rows to `output`.
pub fn write_demo_csv<W: Write>(output: W, rows: usize, seed: u64) -> Result<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let behaviors = WeightedIndex::new(BEHAVIOR_WEIGHTS).context("invalid behavior weights")?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    for _ in 0..rows {
        let behavior = BehaviorType::ALL[behaviors.sample(&mut rng)];
        writer
            .write_record([
                rng.gen_range(USER_IDS).to_string(),
                rng.gen_range(ITEM_IDS).to_string(),
                rng.gen_range(CATEGORY_IDS).to_string(),
                behavior.as_str().to_string(),
                rng.gen_range(TIMESTAMPS).to_string(),
            ])
            .context("failed to write demo row")?;
    }
    writer.flush().context("failed to flush demo output")?;

    tracing::info!(rows, seed, "Demo data generated");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::load_store;
    use shoplytics_core::LoadOptions;

    #[test]
    fn generated_rows_load_cleanly() {
        let mut out = Vec::new();
        write_demo_csv(&mut out, 2_000, 42).expect("generate");
        let store = load_store(out.as_slice(), &LoadOptions::default(), None).expect("load");
        assert_eq!(store.len(), 2_000);
        assert_eq!(store.summary().rows_skipped, 0);
        assert!(store.iter().all(|e| (1..1_000).contains(&e.user_id)));
        let views = store
            .iter()
            .filter(|e| e.behavior_type == BehaviorType::Pv)
            .count();
        assert!(views > 1_000, "page views dominate the mix, got {views}");
    }

    #[test]
    fn seed_makes_output_reproducible() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_demo_csv(&mut a, 100, 9).expect("generate");
        write_demo_csv(&mut b, 100, 9).expect("generate");
        assert_eq!(a, b);
    }
}
