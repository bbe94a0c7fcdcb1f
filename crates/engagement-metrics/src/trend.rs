//! Growth trend: first-K versus last-K month comparison.

use crate::{calendar::MonthTotal, derived::mean};
use serde::{Deserialize, Serialize};

/// Comparison of the first and last windows of monthly totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthTrend {
    /// What the monthly values measure, e.g. `new_followers`
    pub metric: String,
    /// Configured months per window
    pub window_months: usize,
    /// Months available in the input
    pub months_available: usize,
    /// Months in the first window
    pub first_window: Vec<String>,
    /// Months in the last window
    pub last_window: Vec<String>,
    /// Mean monthly total over the first window
    pub first_window_mean: f64,
    /// Mean monthly total over the last window
    pub last_window_mean: f64,
    /// `last_window_mean - first_window_mean`
    pub last_minus_first: f64,
    /// `last_window_mean / first_window_mean`; absent when the first mean is zero
    pub ratio: Option<f64>,
    /// Relative change in percent; absent when the first mean is zero
    pub pct_change: Option<f64>,
    /// The two windows share months because fewer than `2 * window_months` exist
    pub overlapping: bool,
}

/// Compare the mean monthly total of the first `k` months against the last `k`.
///
/// With fewer than `k` months both windows cover everything available. With
/// fewer than `2k` they overlap, which is flagged rather than rejected.
pub fn compare(metric: impl Into<String>, monthly: &[MonthTotal], k: usize) -> GrowthTrend {
    let metric = metric.into();
    let n = monthly.len();
    let width = k.min(n);

    let first = &monthly[..width];
    let last = &monthly[n - width..];

    let sums = |window: &[MonthTotal]| window.iter().map(|m| m.sum).collect::<Vec<_>>();
    let first_window_mean = mean(&sums(first));
    let last_window_mean = mean(&sums(last));
    let last_minus_first = last_window_mean - first_window_mean;

    let (ratio, pct_change) = if first_window_mean == 0.0 {
        (None, None)
    } else {
        (
            Some(last_window_mean / first_window_mean),
            Some(last_minus_first / first_window_mean * 100.0),
        )
    };

    let overlapping = n < 2 * k;
    if overlapping {
        tracing::debug!(metric = %metric, months = n, window = k, "trend windows overlap");
    }

    GrowthTrend {
        metric,
        window_months: k,
        months_available: n,
        first_window: first.iter().map(|m| m.month.clone()).collect(),
        last_window: last.iter().map(|m| m.month.clone()).collect(),
        first_window_mean,
        last_window_mean,
        last_minus_first,
        ratio,
        pct_change,
        overlapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn months(sums: &[f64]) -> Vec<MonthTotal> {
        sums.iter()
            .enumerate()
            .map(|(i, &sum)| MonthTotal {
                month: format!("2024-{:02}", i + 1),
                sum,
                mean: sum / 30.0,
                days: 30,
            })
            .collect()
    }

    #[test]
    fn test_disjoint_windows() {
        let trend = compare("new_followers", &months(&[10.0, 20.0, 30.0, 5.0, 40.0, 60.0, 80.0]), 3);

        assert_eq!(trend.first_window, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(trend.last_window, vec!["2024-05", "2024-06", "2024-07"]);
        assert_relative_eq!(trend.first_window_mean, 20.0);
        assert_relative_eq!(trend.last_window_mean, 60.0);
        assert_relative_eq!(trend.last_minus_first, 40.0);
        assert_relative_eq!(trend.ratio.unwrap(), 3.0);
        assert_relative_eq!(trend.pct_change.unwrap(), 200.0);
        assert!(!trend.overlapping);
    }

    #[test]
    fn test_short_span_overlaps() {
        let trend = compare("impressions", &months(&[10.0, 20.0, 30.0, 40.0]), 3);

        assert!(trend.overlapping);
        assert_eq!(trend.first_window, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(trend.last_window, vec!["2024-02", "2024-03", "2024-04"]);
        assert_relative_eq!(trend.last_minus_first, 10.0);
    }

    #[test]
    fn test_single_month() {
        let trend = compare("impressions", &months(&[42.0]), 3);

        assert!(trend.overlapping);
        assert_eq!(trend.months_available, 1);
        assert_relative_eq!(trend.last_minus_first, 0.0);
        assert_relative_eq!(trend.ratio.unwrap(), 1.0);
    }

    #[test]
    fn test_zero_first_window_drops_ratio() {
        let trend = compare("new_followers", &months(&[0.0, 0.0, 0.0, 3.0, 6.0, 9.0]), 3);

        assert_relative_eq!(trend.last_minus_first, 6.0);
        assert_eq!(trend.ratio, None);
        assert_eq!(trend.pct_change, None);
    }

    #[test]
    fn test_empty_input() {
        let trend = compare("impressions", &[], 3);
        assert_eq!(trend.months_available, 0);
        assert!(trend.first_window.is_empty());
        assert_relative_eq!(trend.last_minus_first, 0.0);
        assert_eq!(trend.ratio, None);
    }
}
