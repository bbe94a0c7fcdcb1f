//! Typed daily records and ordered streams.
//!
//! A [`Stream`] owns one source's records sorted by date with exactly one
//! record per date. Dates need not be contiguous.

use crate::{MetricsError, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Which export a stream came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Content performance export (impressions and engagement)
    #[display("content")]
    Content,
    /// Follower growth export
    #[display("followers")]
    Followers,
}

/// A record that belongs to a single calendar day.
pub trait Dated {
    /// The calendar day this record describes.
    fn date(&self) -> NaiveDate;
}

/// Paid-distribution counters carried alongside the organic totals.
///
/// Expected to be zero for fully organic pages, but never asserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsoredMetrics {
    /// Sponsored impressions
    pub impressions: i64,
    /// Sponsored clicks
    pub clicks: i64,
    /// Sponsored reactions
    pub reactions: i64,
    /// Sponsored comments
    pub comments: i64,
    /// Sponsored reposts
    pub reposts: i64,
}

impl SponsoredMetrics {
    /// Whether any sponsored counter is non-zero.
    pub const fn is_active(&self) -> bool {
        self.impressions != 0
            || self.clicks != 0
            || self.reactions != 0
            || self.comments != 0
            || self.reposts != 0
    }
}

/// One day of content performance.
///
/// Engagement counters may be negative: the platform reports undone actions
/// as negative corrections and those are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar day
    pub date: NaiveDate,
    /// Organic impressions
    pub impressions_organic: i64,
    /// All impressions, organic and sponsored
    pub impressions_total: i64,
    /// Unique (deduplicated) organic impressions
    pub impressions_unique: i64,
    /// Clicks, total
    pub clicks: i64,
    /// Reactions, total
    pub reactions: i64,
    /// Comments, total
    pub comments: i64,
    /// Reposts, total
    pub reposts: i64,
    /// Sponsored counters
    pub sponsored: SponsoredMetrics,
}

impl DailyRecord {
    /// A record with the given impression counts and no engagement.
    pub fn new(date: NaiveDate, impressions_total: i64, impressions_unique: i64) -> Self {
        Self {
            date,
            impressions_organic: impressions_total,
            impressions_total,
            impressions_unique,
            clicks: 0,
            reactions: 0,
            comments: 0,
            reposts: 0,
            sponsored: SponsoredMetrics::default(),
        }
    }

    /// Set the four engagement counters.
    pub const fn with_engagement(
        mut self,
        clicks: i64,
        reactions: i64,
        comments: i64,
        reposts: i64,
    ) -> Self {
        self.clicks = clicks;
        self.reactions = reactions;
        self.comments = comments;
        self.reposts = reposts;
        self
    }
}

impl Dated for DailyRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// One day of follower growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerRecord {
    /// Calendar day
    pub date: NaiveDate,
    /// Followers gained organically
    pub organic_followers: i64,
    /// Followers gained through sponsored content
    pub sponsored_followers: i64,
    /// Net new followers for the day; negative on net-unfollow days
    pub new_followers: i64,
}

impl FollowerRecord {
    /// An organic-only follower record.
    pub const fn new(date: NaiveDate, new_followers: i64) -> Self {
        Self {
            date,
            organic_followers: new_followers,
            sponsored_followers: 0,
            new_followers,
        }
    }
}

impl Dated for FollowerRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// An ordered, duplicate-free sequence of records from one source.
#[derive(Debug, Clone)]
pub struct Stream<R> {
    kind: StreamKind,
    records: Vec<R>,
}

impl<R: Dated> Stream<R> {
    /// Build a stream, sorting records by date.
    ///
    /// Fails when `records` is empty or when two records share a date.
    pub fn new(kind: StreamKind, mut records: Vec<R>) -> Result<Self> {
        if records.is_empty() {
            return Err(MetricsError::EmptyStream(kind));
        }
        records.sort_by_key(|r| r.date());
        if let Some(pair) = records.windows(2).find(|w| w[0].date() == w[1].date()) {
            return Err(MetricsError::DuplicateDate {
                stream: kind,
                date: pair[0].date(),
            });
        }
        Ok(Self { kind, records })
    }

    /// Source of this stream.
    pub const fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Records in ascending date order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: construction rejects empty streams.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First date present.
    pub fn start(&self) -> NaiveDate {
        self.records[0].date()
    }

    /// Last date present.
    pub fn end(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date()
    }

    /// Records whose date falls in the inclusive interval `[start, end]`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> &[R] {
        let lo = self.records.partition_point(|r| r.date() < start);
        let hi = self.records.partition_point(|r| r.date() <= end);
        if lo >= hi { &[] } else { &self.records[lo..hi] }
    }
}

/// Calendar month key in `YYYY-MM` form.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Full English weekday name, e.g. `Monday`.
pub const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_stream_sorts_records() {
        let stream = Stream::new(
            StreamKind::Content,
            vec![
                DailyRecord::new(day(3), 30, 20),
                DailyRecord::new(day(1), 10, 5),
                DailyRecord::new(day(2), 20, 10),
            ],
        )
        .unwrap();

        let dates: Vec<_> = stream.records().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(stream.start(), day(1));
        assert_eq!(stream.end(), day(3));
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn test_empty_stream_rejected() {
        let err = Stream::<FollowerRecord>::new(StreamKind::Followers, vec![]).unwrap_err();
        assert!(matches!(err, MetricsError::EmptyStream(StreamKind::Followers)));
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let err = Stream::new(
            StreamKind::Followers,
            vec![
                FollowerRecord::new(day(5), 1),
                FollowerRecord::new(day(4), 2),
                FollowerRecord::new(day(5), 3),
            ],
        )
        .unwrap_err();
        match err {
            MetricsError::DuplicateDate { stream, date } => {
                assert_eq!(stream, StreamKind::Followers);
                assert_eq!(date, day(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_within_handles_gaps_and_bounds() {
        let stream = Stream::new(
            StreamKind::Followers,
            vec![
                FollowerRecord::new(day(1), 1),
                FollowerRecord::new(day(4), 1),
                FollowerRecord::new(day(9), 1),
            ],
        )
        .unwrap();

        assert_eq!(stream.within(day(2), day(9)).len(), 2);
        assert_eq!(stream.within(day(1), day(1)).len(), 1);
        assert!(stream.within(day(5), day(8)).is_empty());
        assert!(stream.within(day(9), day(1)).is_empty());
    }

    #[test]
    fn test_month_key_and_weekday() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(month_key(date), "2024-01");
        assert_eq!(weekday_name(date.weekday()), "Monday");
        assert_eq!(StreamKind::Content.to_string(), "content");
    }
}
