//! Data-quality checks re-derived from typed streams.
//!
//! Nothing here rejects input. Anomalies are counted and described so
//! consumers can decide what to trust; the metric stages run on the data
//! exactly as received.

use crate::{
    derived::engagement_rate,
    record::{DailyRecord, Dated, FollowerRecord, Stream},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observations about the input streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Calendar days inside the content range with no record
    pub content_missing_dates: usize,
    /// Calendar days inside the follower range with no record
    pub follower_missing_dates: Option<usize>,
    /// Days with a negative value, per field
    pub negative_values: BTreeMap<String, usize>,
    /// Days where unique impressions exceed total impressions
    pub unique_exceeds_total_days: usize,
    /// Days with an engagement rate outside `[0, 1]`
    pub rate_out_of_range_days: usize,
    /// Any sponsored counter is non-zero
    pub has_sponsored_data: bool,
    /// Human-readable summary of the findings
    pub warnings: Vec<String>,
}

fn missing_dates<R: Dated>(stream: &Stream<R>) -> usize {
    let span = (stream.end() - stream.start()).num_days() + 1;
    usize::try_from(span)
        .unwrap_or(0)
        .saturating_sub(stream.len())
}

/// Inspect the content stream and, when present, the follower stream.
pub fn assess(
    content: &Stream<DailyRecord>,
    followers: Option<&Stream<FollowerRecord>>,
) -> DataQuality {
    let mut quality = DataQuality {
        content_missing_dates: missing_dates(content),
        follower_missing_dates: followers.map(missing_dates),
        ..Default::default()
    };

    let content_fields: [(&str, fn(&DailyRecord) -> i64); 5] = [
        ("impressions_total", |r| r.impressions_total),
        ("clicks", |r| r.clicks),
        ("reactions", |r| r.reactions),
        ("comments", |r| r.comments),
        ("reposts", |r| r.reposts),
    ];
    for (name, field) in content_fields {
        let count = content.records().iter().filter(|r| field(r) < 0).count();
        if count > 0 {
            quality.negative_values.insert(name.to_string(), count);
        }
    }
    if let Some(followers) = followers {
        let count = followers
            .records()
            .iter()
            .filter(|r| r.new_followers < 0)
            .count();
        if count > 0 {
            quality.negative_values.insert("new_followers".to_string(), count);
        }
    }

    quality.unique_exceeds_total_days = content
        .records()
        .iter()
        .filter(|r| r.impressions_unique > r.impressions_total)
        .count();
    quality.rate_out_of_range_days = content
        .records()
        .iter()
        .map(engagement_rate)
        .filter(|rate| !(0.0..=1.0).contains(rate))
        .count();
    quality.has_sponsored_data = content.records().iter().any(|r| r.sponsored.is_active())
        || followers.is_some_and(|f| f.records().iter().any(|r| r.sponsored_followers != 0));

    quality.warnings = describe(&quality);
    for warning in &quality.warnings {
        tracing::warn!("{warning}");
    }
    quality
}

fn describe(quality: &DataQuality) -> Vec<String> {
    let mut warnings = Vec::new();
    if quality.content_missing_dates > 0 {
        warnings.push(format!(
            "Missing dates in content range: {}",
            quality.content_missing_dates
        ));
    }
    if let Some(missing) = quality.follower_missing_dates.filter(|m| *m > 0) {
        warnings.push(format!("Missing dates in follower range: {missing}"));
    }
    if !quality.negative_values.is_empty() {
        let detail: Vec<String> = quality
            .negative_values
            .iter()
            .map(|(field, count)| format!("{field}={count}"))
            .collect();
        warnings.push(format!(
            "Negative values kept as platform corrections: {}",
            detail.join(", ")
        ));
    }
    if quality.unique_exceeds_total_days > 0 {
        warnings.push(format!(
            "Unique impressions exceed total impressions on {} day(s)",
            quality.unique_exceeds_total_days
        ));
    }
    if quality.rate_out_of_range_days > 0 {
        warnings.push(format!(
            "Engagement rates outside [0, 1] on {} day(s)",
            quality.rate_out_of_range_days
        ));
    }
    warnings
}
