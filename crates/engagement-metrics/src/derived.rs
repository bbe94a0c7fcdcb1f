//! Per-day derived metrics.
//!
//! Every function here is pure and total: it looks at one record, never
//! raises on negative counts and resolves zero denominators to `0.0`.

use crate::record::{DailyRecord, Stream};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Clicks + reactions + comments + reposts, corrections included.
pub const fn total_engagement(record: &DailyRecord) -> i64 {
    record.clicks + record.reactions + record.comments + record.reposts
}

/// Engagement per impression.
///
/// A zero-impression day carries no rate signal and yields `0.0`.
pub fn engagement_rate(record: &DailyRecord) -> f64 {
    ratio(total_engagement(record), record.impressions_total)
}

/// Unique impressions per total impression.
///
/// Values above 1 are kept as computed; they flag a platform reporting quirk.
pub fn reach_ratio(record: &DailyRecord) -> f64 {
    ratio(record.impressions_unique, record.impressions_total)
}

/// New followers per thousand content impressions on the same day.
pub fn follower_efficiency(new_followers: i64, impressions_total: i64) -> f64 {
    if impressions_total == 0 {
        0.0
    } else {
        new_followers as f64 / (impressions_total as f64 / 1000.0)
    }
}

pub(crate) fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Derived values for one content day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedDay {
    /// Calendar day
    pub date: NaiveDate,
    /// Sum of the four engagement counters
    pub total_engagement: i64,
    /// Engagement per impression
    pub engagement_rate: f64,
    /// Unique per total impressions
    pub reach_ratio: f64,
}

impl DerivedDay {
    /// Derive all per-day values from one record.
    pub fn from_record(record: &DailyRecord) -> Self {
        Self {
            date: record.date,
            total_engagement: total_engagement(record),
            engagement_rate: engagement_rate(record),
            reach_ratio: reach_ratio(record),
        }
    }
}

/// Derive every day of a content stream, index-aligned with its records.
pub fn derive_days(stream: &Stream<DailyRecord>) -> Vec<DerivedDay> {
    stream.records().iter().map(DerivedDay::from_record).collect()
}

/// A single dated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Calendar day
    pub date: NaiveDate,
    /// Metric value
    pub value: f64,
}

/// An ordered per-day series of one derived metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// Metric name, e.g. `engagement_rate`
    pub name: String,
    /// Points in ascending date order
    pub points: Vec<MetricPoint>,
}

impl MetricSeries {
    /// Build a series from parallel date and value sequences.
    pub fn from_parts(
        name: impl Into<String>,
        dates: impl IntoIterator<Item = NaiveDate>,
        values: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self {
            name: name.into(),
            points: dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| MetricPoint { date, value })
                .collect(),
        }
    }

    /// Values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Arithmetic mean, `0.0` for an empty series.
    pub fn mean(&self) -> f64 {
        mean(&self.values())
    }

    /// Largest value, if any.
    pub fn max(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::max)
    }

    /// Smallest value, if any.
    pub fn min(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::min)
    }
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
