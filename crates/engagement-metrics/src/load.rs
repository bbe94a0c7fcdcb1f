//! CSV boundary: turn export rows into typed records.
//!
//! Every column is read as text and parsed here, so a bad cell is reported
//! with its row and column instead of silently becoming a null. Malformed
//! rows never reach the metric stages.

use crate::{
    MetricsError, Result,
    record::{DailyRecord, FollowerRecord, SponsoredMetrics},
};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

/// Column headers of the content export.
pub mod content_columns {
    /// Calendar day
    pub const DATE: &str = "Date";
    /// Organic impressions
    pub const IMPRESSIONS_ORGANIC: &str = "Impressions (organic)";
    /// Sponsored impressions
    pub const IMPRESSIONS_SPONSORED: &str = "Impressions (sponsored)";
    /// Total impressions
    pub const IMPRESSIONS_TOTAL: &str = "Impressions (total)";
    /// Unique impressions
    pub const UNIQUE_IMPRESSIONS: &str = "Unique impressions (organic)";
    /// Total clicks
    pub const CLICKS: &str = "Clicks (total)";
    /// Total reactions
    pub const REACTIONS: &str = "Reactions (total)";
    /// Total comments
    pub const COMMENTS: &str = "Comments (total)";
    /// Total reposts
    pub const REPOSTS: &str = "Reposts (total)";
    /// Sponsored clicks
    pub const CLICKS_SPONSORED: &str = "Clicks (sponsored)";
    /// Sponsored reactions
    pub const REACTIONS_SPONSORED: &str = "Reactions (sponsored)";
    /// Sponsored comments
    pub const COMMENTS_SPONSORED: &str = "Comments (sponsored)";
    /// Sponsored reposts
    pub const REPOSTS_SPONSORED: &str = "Reposts (sponsored)";
}

/// Column headers of the follower export.
pub mod follower_columns {
    /// Calendar day
    pub const DATE: &str = "Date";
    /// Organic followers gained
    pub const ORGANIC: &str = "Organic followers";
    /// Sponsored followers gained
    pub const SPONSORED: &str = "Sponsored followers";
    /// Total followers gained
    pub const TOTAL: &str = "Total followers";
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// 2^63, the first float magnitude outside the i64 range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Read a CSV file with every column as text.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    tracing::debug!(path = %path.display(), rows = df.height(), "csv loaded");
    Ok(df)
}

/// Load a content export.
pub fn load_content_csv(path: impl AsRef<Path>) -> Result<Vec<DailyRecord>> {
    content_records(&read_csv(path)?)
}

/// Load a follower export.
pub fn load_follower_csv(path: impl AsRef<Path>) -> Result<Vec<FollowerRecord>> {
    follower_records(&read_csv(path)?)
}

struct Cells {
    name: &'static str,
    values: Vec<Option<String>>,
}

impl Cells {
    fn required(df: &DataFrame, name: &'static str) -> Result<Self> {
        Self::optional(df, name)?.ok_or_else(|| MetricsError::MissingColumn(name.to_string()))
    }

    fn optional(df: &DataFrame, name: &'static str) -> Result<Option<Self>> {
        let Ok(column) = df.column(name) else {
            return Ok(None);
        };
        let text = column.cast(&DataType::String)?;
        let values = text
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(Some(Self { name, values }))
    }

    fn raw(&self, row: usize) -> Result<&str> {
        match self.values.get(row).and_then(Option::as_deref) {
            Some(value) if !value.trim().is_empty() => Ok(value.trim()),
            _ => Err(self.malformed(row, "", "missing value")),
        }
    }

    fn date(&self, row: usize) -> Result<NaiveDate> {
        let value = self.raw(row)?;
        parse_date(value).ok_or_else(|| self.malformed(row, value, "unrecognised date format"))
    }

    fn int(&self, row: usize) -> Result<i64> {
        let value = self.raw(row)?;
        parse_count(value).ok_or_else(|| self.malformed(row, value, "not an integer count"))
    }

    fn malformed(&self, row: usize, value: &str, reason: &str) -> MetricsError {
        MetricsError::Malformed {
            row,
            column: self.name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn optional_int(cells: Option<&Cells>, row: usize) -> Result<Option<i64>> {
    match cells {
        Some(cells) if cells.values.get(row).is_some_and(Option::is_some) => {
            cells.int(row).map(Some)
        }
        _ => Ok(None),
    }
}

/// Parse a calendar date in one of the export formats.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    // Spreadsheet exports sometimes carry a time component.
    let value = value.split_once(' ').map_or(value, |(date, _)| date);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse a signed count. Thousands separators and integral floats are accepted.
pub fn parse_count(value: &str) -> Option<i64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    let float = cleaned.parse::<f64>().ok()?;
    // `as` saturates; anything outside the i64 range is not a count.
    let in_range = (-I64_BOUND..I64_BOUND).contains(&float);
    (in_range && float.fract() == 0.0).then_some(float as i64)
}

/// Convert a text frame of the content export into records.
pub fn content_records(df: &DataFrame) -> Result<Vec<DailyRecord>> {
    use crate::load::content_columns as c;

    let date = Cells::required(df, c::DATE)?;
    let total = Cells::required(df, c::IMPRESSIONS_TOTAL)?;
    let unique = Cells::required(df, c::UNIQUE_IMPRESSIONS)?;
    let clicks = Cells::required(df, c::CLICKS)?;
    let reactions = Cells::required(df, c::REACTIONS)?;
    let comments = Cells::required(df, c::COMMENTS)?;
    let reposts = Cells::required(df, c::REPOSTS)?;
    let organic = Cells::optional(df, c::IMPRESSIONS_ORGANIC)?;
    let sponsored = [
        Cells::optional(df, c::IMPRESSIONS_SPONSORED)?,
        Cells::optional(df, c::CLICKS_SPONSORED)?,
        Cells::optional(df, c::REACTIONS_SPONSORED)?,
        Cells::optional(df, c::COMMENTS_SPONSORED)?,
        Cells::optional(df, c::REPOSTS_SPONSORED)?,
    ];

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let impressions_total = total.int(row)?;
        let paid = |i: usize| -> Result<i64> {
            Ok(optional_int(sponsored[i].as_ref(), row)?.unwrap_or(0))
        };
        records.push(DailyRecord {
            date: date.date(row)?,
            impressions_organic: optional_int(organic.as_ref(), row)?
                .unwrap_or(impressions_total),
            impressions_total,
            impressions_unique: unique.int(row)?,
            clicks: clicks.int(row)?,
            reactions: reactions.int(row)?,
            comments: comments.int(row)?,
            reposts: reposts.int(row)?,
            sponsored: SponsoredMetrics {
                impressions: paid(0)?,
                clicks: paid(1)?,
                reactions: paid(2)?,
                comments: paid(3)?,
                reposts: paid(4)?,
            },
        });
    }
    Ok(records)
}

/// Convert a text frame of the follower export into records.
pub fn follower_records(df: &DataFrame) -> Result<Vec<FollowerRecord>> {
    use crate::load::follower_columns as f;

    let date = Cells::required(df, f::DATE)?;
    let total = Cells::required(df, f::TOTAL)?;
    let organic = Cells::optional(df, f::ORGANIC)?;
    let sponsored = Cells::optional(df, f::SPONSORED)?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let new_followers = total.int(row)?;
        records.push(FollowerRecord {
            date: date.date(row)?,
            organic_followers: optional_int(organic.as_ref(), row)?.unwrap_or(new_followers),
            sponsored_followers: optional_int(sponsored.as_ref(), row)?.unwrap_or(0),
            new_followers,
        });
    }
    Ok(records)
}
