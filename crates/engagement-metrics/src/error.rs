//! Error types for metric computations and stream loading.

use crate::record::StreamKind;
use chrono::NaiveDate;
use thiserror::Error;

/// Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors that can occur while loading streams or assembling a report.
///
/// Degenerate-but-valid input (zero impressions, disjoint date ranges, a single
/// month of data) never produces an error. Those cases resolve to explicit
/// fallback values inside the report.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A stream contained no records at all
    #[error("{0} stream is empty: no metric is definable")]
    EmptyStream(StreamKind),

    /// The same calendar date appeared twice in one stream
    #[error("{stream} stream has more than one record for {date}")]
    DuplicateDate {
        /// Stream holding the duplicate
        stream: StreamKind,
        /// The repeated date
        date: NaiveDate,
    },

    /// Missing required column in an input file
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A row could not be turned into a typed record
    #[error("Malformed value {value:?} in column {column:?} at row {row}: {reason}")]
    Malformed {
        /// Zero-based data row index
        row: usize,
        /// Column name
        column: String,
        /// Raw cell text
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
