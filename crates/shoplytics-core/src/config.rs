use crate::error::{CoreError, Result};
use crate::event::TimestampFormat;
use crate::segmentation::SegmentThresholds;
use crate::store::LoadOptions;

/// Default length of the top items / categories lists.
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub load: LoadOptions,
    pub thresholds: SegmentThresholds,
    pub top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            thresholds: SegmentThresholds::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl EngineConfig {
    /// Read `SHOPLYTICS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SegmentThresholds::default();
        let threshold = |key: &str, name: &'static str, default: i64| -> Result<i64> {
            lookup(key).map_or(Ok(default), |raw| {
                SegmentThresholds::parse_value(name, &raw)
            })
        };

        Ok(Self {
            load: LoadOptions {
                strict: parse_flag(lookup("SHOPLYTICS_STRICT"), "SHOPLYTICS_STRICT")?,
                timestamp_format: lookup("SHOPLYTICS_TIMESTAMP_FORMAT")
                    .map_or(Ok(TimestampFormat::EpochSeconds), |raw| {
                        TimestampFormat::parse(&raw)
                    })?,
                dedupe: parse_flag(lookup("SHOPLYTICS_DEDUPE"), "SHOPLYTICS_DEDUPE")?,
            },
            thresholds: SegmentThresholds {
                high_buy: threshold("SHOPLYTICS_HIGH_BUY", "high_buy", defaults.high_buy)?,
                interest_min: threshold(
                    "SHOPLYTICS_INTEREST_MIN",
                    "interest_min",
                    defaults.interest_min,
                )?,
                browse_min: threshold("SHOPLYTICS_BROWSE_MIN", "browse_min", defaults.browse_min)?,
            },
            top_n: lookup("SHOPLYTICS_TOP_N")
                .map_or(Ok(DEFAULT_TOP_N), |raw| {
                    raw.trim().parse().map_err(|e| {
                        CoreError::InvalidConfig(format!("SHOPLYTICS_TOP_N={raw:?}: {e}"))
                    })
                })?,
        })
    }
}

fn parse_flag(raw: Option<String>, key: &str) -> Result<bool> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(CoreError::InvalidConfig(format!(
            "{key}={other:?}: expected true or false"
        ))),
    }
}
