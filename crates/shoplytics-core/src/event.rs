use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Number of positional columns in a raw event row.
pub const ROW_WIDTH: usize = 5;

/// The four recognized interaction kinds, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorType {
    Pv,
    Fav,
    Cart,
    Buy,
}

impl BehaviorType {
    pub const ALL: [BehaviorType; 4] = [Self::Pv, Self::Fav, Self::Cart, Self::Buy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pv => "pv",
            Self::Fav => "fav",
            Self::Cart => "cart",
            Self::Buy => "buy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pv => "View",
            Self::Fav => "Favorite",
            Self::Cart => "Add to Cart",
            Self::Buy => "Purchase",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviorType {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim() {
            "pv" => Ok(Self::Pv),
            "fav" => Ok(Self::Fav),
            "cart" => Ok(Self::Cart),
            "buy" => Ok(Self::Buy),
            other => Err(format!(
                "unrecognized behavior type {other:?} (expected pv, fav, cart or buy)"
            )),
        }
    }
}

/// How the timestamp column is encoded.
///
/// Timestamps are taken as wall-clock instants in whatever timezone the data was
/// recorded in; no conversion is applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// Integer seconds since the Unix epoch.
    #[default]
    EpochSeconds,
    /// A chrono strftime pattern such as `%Y-%m-%d %H:%M:%S`.
    Pattern(String),
}

impl TimestampFormat {
    /// `"epoch"` (or empty) selects epoch seconds; anything else must be a valid
    /// strftime pattern.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("epoch") {
            return Ok(Self::EpochSeconds);
        }
        if StrftimeItems::new(trimmed).any(|item| matches!(item, Item::Error)) {
            return Err(CoreError::InvalidConfig(format!(
                "invalid timestamp format pattern {trimmed:?}"
            )));
        }
        Ok(Self::Pattern(trimmed.to_string()))
    }

    pub fn parse_timestamp(&self, raw: &str) -> std::result::Result<NaiveDateTime, String> {
        let raw = raw.trim();
        match self {
            Self::EpochSeconds => {
                let secs: i64 = raw
                    .parse()
                    .map_err(|_| "not an integer epoch-seconds value".to_string())?;
                DateTime::from_timestamp(secs, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| "epoch seconds out of range".to_string())
            }
            Self::Pattern(pattern) => NaiveDateTime::parse_from_str(raw, pattern)
                .map_err(|e| format!("does not match {pattern:?}: {e}")),
        }
    }
}

/// A single parsed interaction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub user_id: u64,
    pub item_id: u64,
    pub category_id: u64,
    pub behavior_type: BehaviorType,
    pub timestamp: NaiveDateTime,
}

impl Event {
    /// Parse one positional row: `user_id, item_id, category_id, behavior_type, timestamp`.
    ///
    /// `row` is the row's zero-based input position and is carried into the error.
    pub fn parse_row<S: AsRef<str>>(
        row: usize,
        fields: &[S],
        format: &TimestampFormat,
    ) -> Result<Self> {
        if fields.len() != ROW_WIDTH {
            return Err(CoreError::MalformedRow {
                row,
                field: "row",
                value: fields
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(","),
                reason: format!("expected {ROW_WIDTH} columns, found {}", fields.len()),
            });
        }

        let user_id = parse_id(row, "user_id", fields[0].as_ref())?;
        let item_id = parse_id(row, "item_id", fields[1].as_ref())?;
        let category_id = parse_id(row, "category_id", fields[2].as_ref())?;

        let raw_behavior = fields[3].as_ref();
        let behavior_type = raw_behavior
            .parse::<BehaviorType>()
            .map_err(|reason| CoreError::MalformedRow {
                row,
                field: "behavior_type",
                value: raw_behavior.to_string(),
                reason,
            })?;

        let raw_timestamp = fields[4].as_ref();
        let timestamp =
            format
                .parse_timestamp(raw_timestamp)
                .map_err(|reason| CoreError::MalformedRow {
                    row,
                    field: "timestamp",
                    value: raw_timestamp.to_string(),
                    reason,
                })?;

        Ok(Self {
            user_id,
            item_id,
            category_id,
            behavior_type,
            timestamp,
        })
    }
}

fn parse_id(row: usize, field: &'static str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| CoreError::MalformedRow {
        row,
        field,
        value: raw.to_string(),
        reason: "not a non-negative integer identifier".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_epoch_row() {
        let event = Event::parse_row(
            0,
            &["1", "10", "5", "pv", "1511544070"],
            &TimestampFormat::EpochSeconds,
        )
        .expect("valid row");
        assert_eq!(event.user_id, 1);
        assert_eq!(event.item_id, 10);
        assert_eq!(event.category_id, 5);
        assert_eq!(event.behavior_type, BehaviorType::Pv);
        // 2017-11-24 17:21:10 UTC, a Friday.
        assert_eq!(event.timestamp.hour(), 17);
        assert_eq!(event.timestamp.weekday().num_days_from_monday(), 4);
    }

    #[test]
    fn unknown_behavior_names_row_and_field() {
        let err = Event::parse_row(
            7,
            &["1", "10", "5", "click", "1511544070"],
            &TimestampFormat::EpochSeconds,
        )
        .expect_err("click is not a behavior");
        match err {
            CoreError::MalformedRow {
                row, field, value, ..
            } => {
                assert_eq!(row, 7);
                assert_eq!(field, "behavior_type");
                assert_eq!(value, "click");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn behavior_tokens_are_case_sensitive() {
        assert!("PV".parse::<BehaviorType>().is_err());
        assert_eq!(" buy ".parse::<BehaviorType>(), Ok(BehaviorType::Buy));
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let err = Event::parse_row(
            2,
            &["1", "10", "5", "buy", "yesterday"],
            &TimestampFormat::EpochSeconds,
        )
        .expect_err("not a timestamp");
        assert!(matches!(
            err,
            CoreError::MalformedRow {
                row: 2,
                field: "timestamp",
                ..
            }
        ));
    }

    #[test]
    fn wrong_column_count_is_malformed() {
        let err = Event::parse_row(3, &["1", "10", "pv"], &TimestampFormat::EpochSeconds)
            .expect_err("short row");
        assert!(matches!(
            err,
            CoreError::MalformedRow {
                row: 3,
                field: "row",
                ..
            }
        ));
    }

    #[test]
    fn pattern_format_parses_datetime_strings() {
        let format = TimestampFormat::parse("%Y-%m-%d %H:%M:%S").expect("valid pattern");
        let event = Event::parse_row(0, &["4", "2", "9", "cart", "2026-03-01 08:15:00"], &format)
            .expect("valid row");
        assert_eq!(event.timestamp.hour(), 8);
        assert_eq!(event.timestamp.weekday().num_days_from_monday(), 6);
    }

    #[test]
    fn timestamp_format_parse_accepts_epoch_keyword() {
        assert_eq!(
            TimestampFormat::parse("epoch").expect("epoch"),
            TimestampFormat::EpochSeconds
        );
        assert_eq!(
            TimestampFormat::parse("").expect("empty"),
            TimestampFormat::EpochSeconds
        );
        assert!(TimestampFormat::parse("%Y-%Q").is_err());
    }
}
