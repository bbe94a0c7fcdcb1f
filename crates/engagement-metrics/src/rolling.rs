//! Trailing-window statistics: rolling averages, spike and activity flags.
//!
//! Windows are counted in rows, i.e. dates actually present. A gap in the
//! input is not filled with synthetic zero days; it only means the window
//! reaches further back in calendar time.
//!
//! The first `W - 1` positions use a shrinking window, so the series is
//! defined from day 0. Early values are more sensitive to single days.

use crate::{
    ReportConfig, Result,
    frame::{bool_values, columns, f64_values, i64_values, string_values},
};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const ROLLING_AVG: &str = "rolling_avg";
const ROLLING_RATE: &str = "rolling_rate";
const IS_SPIKE: &str = "is_spike";
const ACTIVE: &str = "active";

/// Average days per month used to express spike frequency.
const DAYS_PER_MONTH: f64 = 30.0;

fn window_options(window_size: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size,
        min_periods: 1,
        ..Default::default()
    }
}

/// Trailing mean of `values` over `window_size` positions.
///
/// `out[i]` is the mean of `values[max(0, i - W + 1) ..= i]`.
pub fn trailing_mean(values: &[f64], window_size: usize) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let result = df! { columns::VALUE => values.to_vec() }?
        .lazy()
        .select([col(columns::VALUE)
            .rolling_mean(window_options(window_size))
            .alias(ROLLING_AVG)])
        .collect()?;

    f64_values(&result, ROLLING_AVG)
}

/// Rolling state of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    /// Calendar day
    pub date: NaiveDate,
    /// Total impressions that day
    pub impressions: i64,
    /// Trailing mean of impressions
    pub rolling_avg: f64,
    /// Trailing mean of the engagement rate
    pub rolling_rate: f64,
    /// Impressions exceeded the spike threshold
    pub is_spike: bool,
    /// Total engagement was positive
    pub active: bool,
}

/// Activity and spike counts for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    /// `YYYY-MM`
    pub month: String,
    /// Days present in the month
    pub days: usize,
    /// Days with positive engagement
    pub active_days: usize,
    /// Spike days
    pub spike_days: usize,
}

/// Output of the rolling window analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingAnalysis {
    /// Window length in rows
    pub window_size: usize,
    /// Spike threshold multiplier
    pub spike_multiplier: f64,
    /// One point per input day, index-aligned with the input
    pub points: Vec<RollingPoint>,
    /// Number of days analysed
    pub total_days: usize,
    /// Days with positive engagement
    pub active_days: usize,
    /// `active_days / total_days`
    pub activity_rate: f64,
    /// Number of spike days
    pub spike_days: usize,
    /// Spike days per 30 days of data
    pub avg_spikes_per_month: f64,
    /// Per-month activity
    pub monthly: Vec<MonthlyActivity>,
}

/// Run the rolling window analyzer over a content frame.
///
/// The frame must be sorted by date and `dates` must hold one entry per
/// frame row in the same order; see [`crate::frame::content_frame`].
pub fn analyze(
    frame: &DataFrame,
    dates: &[NaiveDate],
    config: &ReportConfig,
) -> Result<RollingAnalysis> {
    if dates.len() != frame.height() {
        return Err(PolarsError::ShapeMismatch(
            format!("{} dates for {} rows", dates.len(), frame.height()).into(),
        )
        .into());
    }
    let options = window_options(config.window_size);

    let flagged = frame
        .clone()
        .lazy()
        .with_column(
            col(columns::IMPRESSIONS)
                .cast(DataType::Float64)
                .rolling_mean(options.clone())
                .alias(ROLLING_AVG),
        )
        .with_column(
            col(columns::ENGAGEMENT_RATE)
                .rolling_mean(options)
                .alias(ROLLING_RATE),
        )
        .with_column(
            when(col(ROLLING_AVG).gt(lit(0.0)))
                .then(
                    col(columns::IMPRESSIONS)
                        .cast(DataType::Float64)
                        .gt(col(ROLLING_AVG) * lit(config.spike_multiplier)),
                )
                .otherwise(lit(false))
                .alias(IS_SPIKE),
        )
        .with_column(col(columns::ENGAGEMENT).gt(lit(0)).alias(ACTIVE))
        .collect()?;

    let impressions = i64_values(&flagged, columns::IMPRESSIONS)?;
    let rolling_avg = f64_values(&flagged, ROLLING_AVG)?;
    let rolling_rate = f64_values(&flagged, ROLLING_RATE)?;
    let spikes = bool_values(&flagged, IS_SPIKE)?;
    let active = bool_values(&flagged, ACTIVE)?;

    let points: Vec<RollingPoint> = dates
        .iter()
        .enumerate()
        .map(|(i, &date)| RollingPoint {
            date,
            impressions: impressions[i],
            rolling_avg: rolling_avg[i],
            rolling_rate: rolling_rate[i],
            is_spike: spikes[i],
            active: active[i],
        })
        .collect();

    let monthly = monthly_activity(&flagged)?;

    let total_days = points.len();
    let active_days = points.iter().filter(|p| p.active).count();
    let spike_days = points.iter().filter(|p| p.is_spike).count();
    let activity_rate = if total_days == 0 {
        0.0
    } else {
        active_days as f64 / total_days as f64
    };
    let avg_spikes_per_month = if total_days == 0 {
        0.0
    } else {
        spike_days as f64 / (total_days as f64 / DAYS_PER_MONTH)
    };

    tracing::debug!(
        total_days,
        active_days,
        spike_days,
        window = config.window_size,
        "rolling window analysis complete"
    );

    Ok(RollingAnalysis {
        window_size: config.window_size,
        spike_multiplier: config.spike_multiplier,
        points,
        total_days,
        active_days,
        activity_rate,
        spike_days,
        avg_spikes_per_month,
        monthly,
    })
}

fn monthly_activity(flagged: &DataFrame) -> Result<Vec<MonthlyActivity>> {
    let grouped = flagged
        .clone()
        .lazy()
        .group_by_stable([col(columns::MONTH)])
        .agg([
            col(columns::DATE).count().cast(DataType::Int64).alias("days"),
            col(ACTIVE).sum().cast(DataType::Int64).alias("active_days"),
            col(IS_SPIKE).sum().cast(DataType::Int64).alias("spike_days"),
        ])
        .sort([columns::MONTH], SortMultipleOptions::default())
        .collect()?;

    let months = string_values(&grouped, columns::MONTH)?;
    let days = i64_values(&grouped, "days")?;
    let active = i64_values(&grouped, "active_days")?;
    let spikes = i64_values(&grouped, "spike_days")?;

    Ok(months
        .into_iter()
        .enumerate()
        .map(|(i, month)| MonthlyActivity {
            month,
            days: to_count(days[i]),
            active_days: to_count(active[i]),
            spike_days: to_count(spikes[i]),
        })
        .collect())
}

pub(crate) fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        derived::derive_days,
        frame::content_frame,
        record::{DailyRecord, Stream, StreamKind},
    };
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn frame_from(impressions: &[i64], engagement: &[i64]) -> (DataFrame, Vec<NaiveDate>) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records: Vec<_> = impressions
            .iter()
            .zip(engagement)
            .enumerate()
            .map(|(i, (&imp, &eng))| {
                DailyRecord::new(start + chrono::Days::new(i as u64), imp, imp)
                    .with_engagement(eng, 0, 0, 0)
            })
            .collect();
        let stream = Stream::new(StreamKind::Content, records).unwrap();
        let dates = stream.records().iter().map(|r| r.date).collect();
        let frame = content_frame(stream.records(), &derive_days(&stream)).unwrap();
        (frame, dates)
    }

    #[test]
    fn test_trailing_mean_partial_then_full_window() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let out = trailing_mean(&values, 7).unwrap();

        assert_eq!(out.len(), 10);
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], 1.5);
        assert_relative_eq!(out[6], 4.0, epsilon = 1e-9);
        // Exactly seven values from index 7: 2..=8
        assert_relative_eq!(out[7], 5.0, epsilon = 1e-9);
        assert_relative_eq!(out[9], 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trailing_mean_empty() {
        assert!(trailing_mean(&[], 7).unwrap().is_empty());
    }

    #[test]
    fn test_spike_detection_example() {
        let impressions = [100, 100, 100, 100, 100, 100, 100, 300, 100, 100];
        let (frame, dates) = frame_from(&impressions, &[1; 10]);
        let analysis = analyze(&frame, &dates, &ReportConfig::default()).unwrap();

        let spikes: Vec<bool> = analysis.points.iter().map(|p| p.is_spike).collect();
        assert!(spikes[7], "300 should be flagged as a spike");
        assert!(!spikes[8], "100 after the spike must not be flagged");
        assert_eq!(analysis.spike_days, 1);
        assert_relative_eq!(analysis.points[0].rolling_avg, 100.0);
        assert_relative_eq!(analysis.points[7].rolling_avg, 900.0 / 7.0, epsilon = 1e-9);
    }

    #[rstest]
    #[case(&[0, 0, 0, 0])]
    #[case(&[0, -5, 0, 0])]
    fn test_no_spike_when_average_not_positive(#[case] impressions: &[i64]) {
        let (frame, dates) = frame_from(impressions, &vec![0; impressions.len()]);
        let analysis = analyze(&frame, &dates, &ReportConfig::default()).unwrap();
        assert!(analysis.points.iter().all(|p| !p.is_spike));
    }

    #[test]
    fn test_activity_rate_counts_positive_engagement_only() {
        let (frame, dates) = frame_from(&[10, 10, 10, 10], &[2, 0, -1, 5]);
        let analysis = analyze(&frame, &dates, &ReportConfig::default()).unwrap();

        assert_eq!(analysis.total_days, 4);
        assert_eq!(analysis.active_days, 2);
        assert_relative_eq!(analysis.activity_rate, 0.5);
        assert_eq!(analysis.monthly.len(), 1);
        assert_eq!(analysis.monthly[0].active_days, 2);
        assert_eq!(analysis.monthly[0].days, 4);
    }

    #[test]
    fn test_points_carry_record_dates() {
        let (frame, dates) = frame_from(&[5, 6, 7], &[1, 1, 1]);
        let analysis = analyze(&frame, &dates, &ReportConfig::default()).unwrap();
        let got: Vec<_> = analysis.points.iter().map(|p| p.date).collect();
        assert_eq!(got, dates);
    }

    #[test]
    fn test_date_count_must_match_rows() {
        let (frame, dates) = frame_from(&[5, 6, 7], &[1, 1, 1]);
        assert!(analyze(&frame, &dates[..2], &ReportConfig::default()).is_err());
    }

    #[test]
    fn test_custom_multiplier() {
        let (frame, dates) = frame_from(&[100, 100, 130], &[1, 1, 1]);
        let config = ReportConfig {
            spike_multiplier: 1.1,
            ..Default::default()
        };
        let analysis = analyze(&frame, &dates, &config).unwrap();
        // mean(100, 100, 130) = 110, threshold 121
        assert!(analysis.points[2].is_spike);
    }
}
