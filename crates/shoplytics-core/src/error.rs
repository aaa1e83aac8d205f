use thiserror::Error;

/// Errors raised by the analytics engine.
///
/// Every variant is recoverable: callers are expected to report it and carry on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A raw row could not be turned into an [`Event`](crate::event::Event).
    /// `row` is the zero-based position of the row in the input.
    #[error("malformed row {row}: field `{field}` = {value:?}: {reason}")]
    MalformedRow {
        row: usize,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("dataset is empty: no valid events to analyze")]
    EmptyDataset,

    #[error("invalid threshold `{name}` = {value:?}: must be a positive integer")]
    InvalidThreshold { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
