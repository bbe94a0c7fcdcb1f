//! Cross-series correlation between independently dated streams.
//!
//! Two series rarely cover the same dates. They are first cut down to their
//! overlap interval, then aggregated to monthly sums and joined on month, so
//! every statistic sees two equal-length, month-matched sequences.

use crate::{
    Result,
    calendar::monthly_totals,
    derived::{MetricSeries, follower_efficiency},
    record::{DailyRecord, Dated, FollowerRecord, Stream},
};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimum number of matched months for a coefficient.
pub const MIN_MONTHS: usize = 2;

/// Inclusive date range present in both of two streams.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[display("{start} to {end}")]
pub struct OverlapInterval {
    /// First shared date
    pub start: NaiveDate,
    /// Last shared date
    pub end: NaiveDate,
}

impl OverlapInterval {
    /// Intersect two inclusive ranges. `None` when they do not meet.
    pub fn intersect(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> Option<Self> {
        let start = a.0.max(b.0);
        let end = a.1.min(b.1);
        (start <= end).then_some(Self { start, end })
    }

    /// Whether `date` lies inside the interval.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Overlap interval of two streams.
pub fn overlap<A: Dated, B: Dated>(a: &Stream<A>, b: &Stream<B>) -> Option<OverlapInterval> {
    OverlapInterval::intersect((a.start(), a.end()), (b.start(), b.end()))
}

/// Outcome category of a correlation attempt.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStatus {
    /// A coefficient was computed
    #[display("computed")]
    Computed,
    /// The two date ranges do not intersect
    #[display("no_overlap")]
    NoOverlap,
    /// Fewer than two matched months
    #[display("insufficient_data")]
    InsufficientData,
    /// One of the monthly sequences is constant
    #[display("zero_variance")]
    ZeroVariance,
}

/// Monthly sums of both series for one shared month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedMonth {
    /// `YYYY-MM`
    pub month: String,
    /// Monthly sum of the first series
    pub a: f64,
    /// Monthly sum of the second series
    pub b: f64,
}

/// Correlation between two monthly-aggregated series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Name of the first series
    pub series_a: String,
    /// Name of the second series
    pub series_b: String,
    /// Outcome category
    pub status: CorrelationStatus,
    /// Pearson coefficient; present only when `status` is `computed`
    pub coefficient: Option<f64>,
    /// Matched months used
    pub months_used: usize,
    /// Shared date range, if any
    pub overlap: Option<OverlapInterval>,
    /// Why no coefficient was produced
    pub reason: Option<String>,
    /// The aligned monthly sequences
    pub months: Vec<AlignedMonth>,
}

/// Pearson correlation coefficient of two equal-length sequences.
///
/// `None` when fewer than two pairs exist, the lengths differ, or either
/// sequence has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < MIN_MONTHS {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Points of `series` inside `interval`.
pub fn restrict(series: &MetricSeries, interval: OverlapInterval) -> MetricSeries {
    MetricSeries {
        name: series.name.clone(),
        points: series
            .points
            .iter()
            .filter(|p| interval.contains(p.date))
            .copied()
            .collect(),
    }
}

/// Restrict both series to `interval`, aggregate to monthly sums and keep
/// the months present in both.
pub fn align_monthly(
    a: &MetricSeries,
    b: &MetricSeries,
    interval: OverlapInterval,
) -> Result<Vec<AlignedMonth>> {
    let a = restrict(a, interval);
    let b = restrict(b, interval);
    let a_months = monthly_totals(&a.dates(), &a.values())?;
    let b_months = monthly_totals(&b.dates(), &b.values())?;

    let mut aligned = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a_months.len() && j < b_months.len() {
        match a_months[i].month.cmp(&b_months[j].month) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                aligned.push(AlignedMonth {
                    month: a_months[i].month.clone(),
                    a: a_months[i].sum,
                    b: b_months[j].sum,
                });
                i += 1;
                j += 1;
            }
        }
    }
    Ok(aligned)
}

/// Correlate two dated series at monthly granularity.
///
/// Degenerate inputs resolve to a result with no coefficient and a reason:
/// disjoint ranges, fewer than two matched months, or a constant sequence.
pub fn correlate(a: &MetricSeries, b: &MetricSeries) -> Result<CorrelationResult> {
    let mut result = CorrelationResult {
        series_a: a.name.clone(),
        series_b: b.name.clone(),
        status: CorrelationStatus::NoOverlap,
        coefficient: None,
        months_used: 0,
        overlap: None,
        reason: None,
        months: Vec::new(),
    };

    let interval = match (span(a), span(b)) {
        (Some(sa), Some(sb)) => OverlapInterval::intersect(sa, sb),
        _ => None,
    };
    let Some(interval) = interval else {
        result.reason = Some(format!("{} and {} share no dates", a.name, b.name));
        tracing::warn!(a = %a.name, b = %b.name, "correlation skipped: no overlapping dates");
        return Ok(result);
    };
    result.overlap = Some(interval);

    let months = align_monthly(a, b, interval)?;
    result.months_used = months.len();

    if months.len() < MIN_MONTHS {
        result.status = CorrelationStatus::InsufficientData;
        result.reason = Some(format!(
            "{} overlapping month(s) in {interval}; at least {MIN_MONTHS} required",
            months.len()
        ));
        tracing::warn!(months = months.len(), "correlation skipped: insufficient data");
    } else {
        let xs: Vec<f64> = months.iter().map(|m| m.a).collect();
        let ys: Vec<f64> = months.iter().map(|m| m.b).collect();
        match pearson(&xs, &ys) {
            Some(r) => {
                result.status = CorrelationStatus::Computed;
                result.coefficient = Some(r);
            }
            None => {
                result.status = CorrelationStatus::ZeroVariance;
                result.reason =
                    Some("a monthly sequence is constant; the coefficient is undefined".to_string());
            }
        }
    }

    result.months = months;
    tracing::debug!(
        status = %result.status,
        months = result.months_used,
        a = %a.name,
        b = %b.name,
        "correlation complete"
    );
    Ok(result)
}

fn span(series: &MetricSeries) -> Option<(NaiveDate, NaiveDate)> {
    Some((series.points.first()?.date, series.points.last()?.date))
}

/// Content and follower records sharing an exact date.
pub fn align_daily<'a>(
    content: &'a [DailyRecord],
    followers: &'a [FollowerRecord],
) -> Vec<(&'a DailyRecord, &'a FollowerRecord)> {
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < content.len() && j < followers.len() {
        match content[i].date.cmp(&followers[j].date) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                pairs.push((&content[i], &followers[j]));
                i += 1;
                j += 1;
            }
        }
    }
    pairs
}

/// Follower efficiency on every date present in both streams.
pub fn efficiency_series(pairs: &[(&DailyRecord, &FollowerRecord)]) -> MetricSeries {
    MetricSeries::from_parts(
        "follower_efficiency",
        pairs.iter().map(|(c, _)| c.date),
        pairs
            .iter()
            .map(|(c, f)| follower_efficiency(f.new_followers, c.impressions_total)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StreamKind;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly_series(name: &str, start_month: u32, totals: &[f64]) -> MetricSeries {
        // Spread each monthly total over the 1st and 15th of the month.
        let mut dates = Vec::new();
        let mut values = Vec::new();
        for (i, total) in totals.iter().enumerate() {
            let month = start_month + i as u32;
            dates.push(d(2024, month, 1));
            values.push(total / 2.0);
            dates.push(d(2024, month, 15));
            values.push(total / 2.0);
        }
        MetricSeries::from_parts(name, dates, values)
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let content = monthly_series("impressions", 3, &[10.0, 20.0, 30.0]);
        let followers = monthly_series("new_followers", 3, &[1.0, 2.0, 3.0]);

        let result = correlate(&content, &followers).unwrap();
        assert_eq!(result.status, CorrelationStatus::Computed);
        assert_relative_eq!(result.coefficient.unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(result.months_used, 3);
        assert_eq!(
            result.overlap,
            Some(OverlapInterval {
                start: d(2024, 3, 1),
                end: d(2024, 5, 15)
            })
        );
    }

    #[test]
    fn test_only_overlapping_months_are_used() {
        // content Jan-Jun, followers Apr-Sep: overlap Apr 1 - Jun 15
        let content = monthly_series("impressions", 1, &[5.0, 5.0, 5.0, 10.0, 20.0, 30.0]);
        let followers = monthly_series("new_followers", 4, &[3.0, 2.0, 1.0, 9.0, 9.0, 9.0]);

        let result = correlate(&content, &followers).unwrap();
        assert_eq!(result.months_used, 3);
        let months: Vec<_> = result.months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-04", "2024-05", "2024-06"]);
        assert_relative_eq!(result.coefficient.unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_disjoint_ranges_report_no_overlap() {
        let content = monthly_series("impressions", 1, &[1.0, 2.0]);
        let followers = monthly_series("new_followers", 6, &[1.0, 2.0]);

        let result = correlate(&content, &followers).unwrap();
        assert_eq!(result.status, CorrelationStatus::NoOverlap);
        assert_eq!(result.coefficient, None);
        assert_eq!(result.overlap, None);
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_single_month_is_insufficient() {
        let content = monthly_series("impressions", 1, &[1.0, 2.0, 3.0]);
        let followers = monthly_series("new_followers", 3, &[4.0, 5.0]);

        let result = correlate(&content, &followers).unwrap();
        assert_eq!(result.status, CorrelationStatus::InsufficientData);
        assert_eq!(result.coefficient, None);
        assert_eq!(result.months_used, 1);
    }

    #[test]
    fn test_constant_sequence_has_no_coefficient() {
        let content = monthly_series("impressions", 1, &[7.0, 7.0, 7.0]);
        let followers = monthly_series("new_followers", 1, &[1.0, 2.0, 3.0]);

        let result = correlate(&content, &followers).unwrap();
        assert_eq!(result.status, CorrelationStatus::ZeroVariance);
        assert_eq!(result.coefficient, None);
    }

    #[rstest]
    #[case(&[1.0], &[2.0])]
    #[case(&[1.0, 2.0], &[1.0])]
    #[case(&[3.0, 3.0], &[1.0, 2.0])]
    fn test_pearson_undefined(#[case] x: &[f64], #[case] y: &[f64]) {
        assert_eq!(pearson(x, y), None);
    }

    #[test]
    fn test_overlap_of_streams() {
        let content = Stream::new(
            StreamKind::Content,
            vec![
                DailyRecord::new(d(2024, 1, 1), 10, 10),
                DailyRecord::new(d(2024, 3, 31), 10, 10),
            ],
        )
        .unwrap();
        let followers = Stream::new(
            StreamKind::Followers,
            vec![
                FollowerRecord::new(d(2024, 2, 10), 1),
                FollowerRecord::new(d(2024, 6, 1), 1),
            ],
        )
        .unwrap();

        let interval = overlap(&content, &followers).unwrap();
        assert_eq!(interval.start, d(2024, 2, 10));
        assert_eq!(interval.end, d(2024, 3, 31));
        assert_eq!(interval.to_string(), "2024-02-10 to 2024-03-31");
    }

    #[test]
    fn test_daily_alignment_and_efficiency() {
        let content = vec![
            DailyRecord::new(d(2024, 1, 1), 2_000, 1_000),
            DailyRecord::new(d(2024, 1, 2), 0, 0),
            DailyRecord::new(d(2024, 1, 4), 500, 400),
        ];
        let followers = vec![
            FollowerRecord::new(d(2024, 1, 2), 3),
            FollowerRecord::new(d(2024, 1, 3), 1),
            FollowerRecord::new(d(2024, 1, 4), -1),
        ];
        let pairs = align_daily(&content, &followers);
        assert_eq!(pairs.len(), 2);

        let series = efficiency_series(&pairs);
        assert_eq!(series.dates(), vec![d(2024, 1, 2), d(2024, 1, 4)]);
        assert_eq!(series.values(), vec![0.0, -2.0]);
    }
}
