//! Calendar aggregation: monthly and weekday rollups and the top-N ranking.

use crate::{
    ReportConfig, Result,
    derived::ratio,
    frame::{columns, f64_values, i64_values, series_frame, string_values},
    rolling::to_count,
};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const DAYS: &str = "days";
const MEAN_RATE: &str = "mean_engagement_rate";
const MEAN_IMPRESSIONS: &str = "mean_impressions";
const MEAN_ENGAGEMENT: &str = "mean_engagement";

/// Rollup of one calendar month of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    /// `YYYY-MM`
    pub month: String,
    /// Sum of total impressions
    pub impressions: i64,
    /// Sum of unique impressions
    pub unique_impressions: i64,
    /// Sum of total engagement
    pub engagement: i64,
    /// Mean of the daily engagement rates
    pub mean_engagement_rate: f64,
    /// Engagement sum divided by impression sum
    pub calculated_rate: f64,
    /// Unique impression sum divided by impression sum
    pub reach_ratio: f64,
    /// Days present in the month
    pub days: usize,
    /// Fewer than the configured minimum days were present
    pub partial: bool,
    /// Percent change of impressions against the previous month present
    pub impressions_change_pct: Option<f64>,
}

/// Rollup of one weekday across the whole range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayAggregate {
    /// Weekday name
    pub weekday: String,
    /// Days present with this weekday
    pub days: usize,
    /// Sum of total impressions
    pub impressions: i64,
    /// Sum of total engagement
    pub engagement: i64,
    /// Mean impressions per day
    pub mean_impressions: f64,
    /// Mean engagement per day
    pub mean_engagement: f64,
    /// Mean of the daily engagement rates
    pub mean_engagement_rate: f64,
}

/// One entry of the impressions ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDay {
    /// 1-based rank
    pub rank: usize,
    /// Calendar day
    pub date: String,
    /// Total impressions
    pub impressions: i64,
    /// Total engagement
    pub engagement: i64,
    /// Engagement rate
    pub engagement_rate: f64,
}

/// Monthly sum, mean and count of a generic dated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub month: String,
    /// Sum of values in the month
    pub sum: f64,
    /// Mean of values in the month
    pub mean: f64,
    /// Days present in the month
    pub days: usize,
}

/// All calendar rollups of a content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSummary {
    /// Monthly rollups in month order
    pub monthly: Vec<MonthlyAggregate>,
    /// Weekday rollups, Monday first, weekdays present only
    pub day_of_week: Vec<WeekdayAggregate>,
    /// Top days by impressions
    pub top_days: Vec<TopDay>,
    /// Months flagged as partial
    pub partial_months: Vec<String>,
    /// Weekdays with the highest mean impressions
    pub best_weekdays: Vec<String>,
}

/// Monthly rollup of a content frame.
pub fn monthly(frame: &DataFrame, config: &ReportConfig) -> Result<Vec<MonthlyAggregate>> {
    let grouped = frame
        .clone()
        .lazy()
        .group_by_stable([col(columns::MONTH)])
        .agg([
            col(columns::IMPRESSIONS).sum(),
            col(columns::UNIQUE_IMPRESSIONS).sum(),
            col(columns::ENGAGEMENT).sum(),
            col(columns::ENGAGEMENT_RATE).mean().alias(MEAN_RATE),
            col(columns::DATE).count().cast(DataType::Int64).alias(DAYS),
        ])
        .sort([columns::MONTH], SortMultipleOptions::default())
        .collect()?;

    let months = string_values(&grouped, columns::MONTH)?;
    let impressions = i64_values(&grouped, columns::IMPRESSIONS)?;
    let unique = i64_values(&grouped, columns::UNIQUE_IMPRESSIONS)?;
    let engagement = i64_values(&grouped, columns::ENGAGEMENT)?;
    let rates = f64_values(&grouped, MEAN_RATE)?;
    let days = i64_values(&grouped, DAYS)?;

    let mut out: Vec<MonthlyAggregate> = Vec::with_capacity(months.len());
    for (i, month) in months.into_iter().enumerate() {
        let days = to_count(days[i]);
        let impressions_change_pct = out.last().and_then(|prev| {
            (prev.impressions != 0).then(|| {
                (impressions[i] - prev.impressions) as f64 / prev.impressions as f64 * 100.0
            })
        });
        out.push(MonthlyAggregate {
            month,
            impressions: impressions[i],
            unique_impressions: unique[i],
            engagement: engagement[i],
            mean_engagement_rate: rates[i],
            calculated_rate: ratio(engagement[i], impressions[i]),
            reach_ratio: ratio(unique[i], impressions[i]),
            days,
            partial: days < config.min_days_per_month,
            impressions_change_pct,
        });
    }

    Ok(out)
}

/// Weekday rollup of a content frame, Monday first.
pub fn day_of_week(frame: &DataFrame) -> Result<Vec<WeekdayAggregate>> {
    let grouped = frame
        .clone()
        .lazy()
        .group_by_stable([col(columns::WEEKDAY_IDX), col(columns::WEEKDAY)])
        .agg([
            col(columns::IMPRESSIONS).sum(),
            col(columns::ENGAGEMENT).sum(),
            col(columns::IMPRESSIONS)
                .cast(DataType::Float64)
                .mean()
                .alias(MEAN_IMPRESSIONS),
            col(columns::ENGAGEMENT)
                .cast(DataType::Float64)
                .mean()
                .alias(MEAN_ENGAGEMENT),
            col(columns::ENGAGEMENT_RATE).mean().alias(MEAN_RATE),
            col(columns::DATE).count().cast(DataType::Int64).alias(DAYS),
        ])
        .sort([columns::WEEKDAY_IDX], SortMultipleOptions::default())
        .collect()?;

    let names = string_values(&grouped, columns::WEEKDAY)?;
    let impressions = i64_values(&grouped, columns::IMPRESSIONS)?;
    let engagement = i64_values(&grouped, columns::ENGAGEMENT)?;
    let mean_impressions = f64_values(&grouped, MEAN_IMPRESSIONS)?;
    let mean_engagement = f64_values(&grouped, MEAN_ENGAGEMENT)?;
    let rates = f64_values(&grouped, MEAN_RATE)?;
    let days = i64_values(&grouped, DAYS)?;

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, weekday)| WeekdayAggregate {
            weekday,
            days: to_count(days[i]),
            impressions: impressions[i],
            engagement: engagement[i],
            mean_impressions: mean_impressions[i],
            mean_engagement: mean_engagement[i],
            mean_engagement_rate: rates[i],
        })
        .collect())
}

/// The `n` days with the most impressions, earliest date first on ties.
pub fn top_days(frame: &DataFrame, n: usize) -> Result<Vec<TopDay>> {
    let ranked = frame
        .clone()
        .lazy()
        .sort(
            [columns::IMPRESSIONS, columns::DATE],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_maintain_order(true),
        )
        .collect()?
        .head(Some(n));

    let dates = string_values(&ranked, columns::DATE)?;
    let impressions = i64_values(&ranked, columns::IMPRESSIONS)?;
    let engagement = i64_values(&ranked, columns::ENGAGEMENT)?;
    let rates = f64_values(&ranked, columns::ENGAGEMENT_RATE)?;

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| TopDay {
            rank: i + 1,
            date,
            impressions: impressions[i],
            engagement: engagement[i],
            engagement_rate: rates[i],
        })
        .collect())
}

/// Monthly sum, mean and day count of a dated value sequence.
///
/// `dates` and `values` are parallel. Only months with at least one date
/// present appear in the output.
pub fn monthly_totals(dates: &[NaiveDate], values: &[f64]) -> Result<Vec<MonthTotal>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let grouped = series_frame(dates, values)?
        .lazy()
        .group_by_stable([col(columns::MONTH)])
        .agg([
            col(columns::VALUE).sum().alias("sum"),
            col(columns::VALUE).mean().alias("mean"),
            col(columns::DATE).count().cast(DataType::Int64).alias(DAYS),
        ])
        .sort([columns::MONTH], SortMultipleOptions::default())
        .collect()?;

    let months = string_values(&grouped, columns::MONTH)?;
    let sums = f64_values(&grouped, "sum")?;
    let means = f64_values(&grouped, "mean")?;
    let days = i64_values(&grouped, DAYS)?;

    Ok(months
        .into_iter()
        .enumerate()
        .map(|(i, month)| MonthTotal {
            month,
            sum: sums[i],
            mean: means[i],
            days: to_count(days[i]),
        })
        .collect())
}

/// Run every calendar rollup over a content frame.
pub fn summarize(frame: &DataFrame, config: &ReportConfig) -> Result<CalendarSummary> {
    let monthly = monthly(frame, config)?;
    let day_of_week = day_of_week(frame)?;
    let top_days = top_days(frame, config.top_n)?;

    let partial_months: Vec<String> = monthly
        .iter()
        .filter(|m| m.partial)
        .map(|m| m.month.clone())
        .collect();
    if !partial_months.is_empty() {
        tracing::debug!(months = ?partial_months, "partial months kept in monthly rollup");
    }

    let mut by_impressions: Vec<&WeekdayAggregate> = day_of_week.iter().collect();
    // Stable sort keeps Monday-first order among equal means.
    by_impressions.sort_by(|a, b| b.mean_impressions.total_cmp(&a.mean_impressions));
    let best_weekdays = by_impressions
        .into_iter()
        .take(config.best_weekdays)
        .map(|w| w.weekday.clone())
        .collect();

    Ok(CalendarSummary {
        monthly,
        day_of_week,
        top_days,
        partial_months,
        best_weekdays,
    })
}
