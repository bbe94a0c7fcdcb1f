//! Conversion of typed streams into polars frames.
//!
//! Dates are stored as `YYYY-MM-DD` strings so lexicographic order matches
//! calendar order. Calendar keys are computed once here rather than with
//! string expressions inside every aggregation.

use crate::{
    Result,
    derived::DerivedDay,
    record::{DailyRecord, FollowerRecord, month_key, weekday_name},
};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Column names shared by the analyzers.
pub mod columns {
    /// Calendar day, `YYYY-MM-DD`
    pub const DATE: &str = "date";
    /// Calendar month, `YYYY-MM`
    pub const MONTH: &str = "month";
    /// Weekday name
    pub const WEEKDAY: &str = "weekday";
    /// Weekday index, Monday = 0
    pub const WEEKDAY_IDX: &str = "weekday_idx";
    /// Total impressions
    pub const IMPRESSIONS: &str = "impressions";
    /// Unique impressions
    pub const UNIQUE_IMPRESSIONS: &str = "unique_impressions";
    /// Total engagement
    pub const ENGAGEMENT: &str = "engagement";
    /// Engagement rate
    pub const ENGAGEMENT_RATE: &str = "engagement_rate";
    /// Reach ratio
    pub const REACH_RATIO: &str = "reach_ratio";
    /// Generic value column for single-series frames
    pub const VALUE: &str = "value";
}

/// Format a date the way frames store it.
pub fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Build the content frame from records and their derived values.
///
/// `days` must be index-aligned with `records`.
pub fn content_frame(records: &[DailyRecord], days: &[DerivedDay]) -> Result<DataFrame> {
    let dates: Vec<String> = records.iter().map(|r| date_string(r.date)).collect();
    let months: Vec<String> = records.iter().map(|r| month_key(r.date)).collect();
    let weekdays: Vec<&str> = records
        .iter()
        .map(|r| weekday_name(r.date.weekday()))
        .collect();
    let weekday_idx: Vec<i64> = records
        .iter()
        .map(|r| i64::from(r.date.weekday().num_days_from_monday()))
        .collect();
    let impressions: Vec<i64> = records.iter().map(|r| r.impressions_total).collect();
    let unique: Vec<i64> = records.iter().map(|r| r.impressions_unique).collect();
    let engagement: Vec<i64> = days.iter().map(|d| d.total_engagement).collect();
    let rates: Vec<f64> = days.iter().map(|d| d.engagement_rate).collect();
    let reach: Vec<f64> = days.iter().map(|d| d.reach_ratio).collect();

    let df = df! {
        columns::DATE => dates,
        columns::MONTH => months,
        columns::WEEKDAY => weekdays,
        columns::WEEKDAY_IDX => weekday_idx,
        columns::IMPRESSIONS => impressions,
        columns::UNIQUE_IMPRESSIONS => unique,
        columns::ENGAGEMENT => engagement,
        columns::ENGAGEMENT_RATE => rates,
        columns::REACH_RATIO => reach,
    }?;

    Ok(df)
}

/// Build a follower frame with `date`, `month` and `value` (new followers).
pub fn follower_frame(records: &[FollowerRecord]) -> Result<DataFrame> {
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let values: Vec<f64> = records.iter().map(|r| r.new_followers as f64).collect();
    series_frame(&dates, &values)
}

/// Build a generic dated frame with `date`, `month` and `value` columns.
pub fn series_frame(dates: &[NaiveDate], values: &[f64]) -> Result<DataFrame> {
    let df = df! {
        columns::DATE => dates.iter().map(|d| date_string(*d)).collect::<Vec<_>>(),
        columns::MONTH => dates.iter().map(|d| month_key(*d)).collect::<Vec<_>>(),
        columns::VALUE => values.to_vec(),
    }?;

    Ok(df)
}

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = df
        .column(name)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    Ok(values)
}

pub(crate) fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let values = df
        .column(name)?
        .cast(&DataType::Int64)?
        .i64()?
        .into_iter()
        .map(|v| v.unwrap_or(0))
        .collect();
    Ok(values)
}

pub(crate) fn bool_values(df: &DataFrame, name: &str) -> Result<Vec<bool>> {
    let values = df
        .column(name)?
        .bool()?
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect();
    Ok(values)
}

pub(crate) fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let values = df
        .column(name)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();
    Ok(values)
}
