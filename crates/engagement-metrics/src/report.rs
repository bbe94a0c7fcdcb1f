//! Report assembly.
//!
//! [`assemble`] runs every stage in a fixed order over immutable input and
//! collects the outputs into one [`AnalysisReport`]. Stages never share
//! mutable state, and the generation timestamp is an argument, so identical
//! inputs serialize to identical bytes.

use crate::{
    ReportConfig, Result,
    calendar::{self, CalendarSummary, MonthTotal},
    correlate::{self, CorrelationResult, OverlapInterval},
    derived::{self, MetricSeries, mean},
    frame::content_frame,
    quality::{self, DataQuality},
    record::{DailyRecord, FollowerRecord, Stream, StreamKind},
    rolling::{self, RollingAnalysis},
    trend::{self, GrowthTrend},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Row count and date range of one input stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    /// Stream source
    pub kind: StreamKind,
    /// Records in the stream
    pub rows: usize,
    /// First date present
    pub start: NaiveDate,
    /// Last date present
    pub end: NaiveDate,
}

impl StreamSummary {
    fn of<R: crate::record::Dated>(stream: &Stream<R>) -> Self {
        Self {
            kind: stream.kind(),
            rows: stream.len(),
            start: stream.start(),
            end: stream.end(),
        }
    }
}

/// Run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was generated, supplied by the caller
    pub generated_at: DateTime<Utc>,
    /// Library version that produced the report
    pub version: String,
    /// Content stream coverage
    pub content: StreamSummary,
    /// Follower stream coverage, when supplied
    pub followers: Option<StreamSummary>,
    /// Dates shared by both streams
    pub overlap: Option<OverlapInterval>,
    /// Parameters of this run
    pub config: ReportConfig,
}

/// Totals of the four engagement counters and their shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementComponents {
    /// Total clicks
    pub clicks: i64,
    /// Total reactions
    pub reactions: i64,
    /// Total comments
    pub comments: i64,
    /// Total reposts
    pub reposts: i64,
    /// Clicks as a percentage of total engagement
    pub clicks_pct: f64,
    /// Reactions as a percentage of total engagement
    pub reactions_pct: f64,
    /// Comments as a percentage of total engagement
    pub comments_pct: f64,
    /// Reposts as a percentage of total engagement
    pub reposts_pct: f64,
}

/// The `engagement` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementGroup {
    /// Sum of total engagement
    pub total_engagement: i64,
    /// Total engagement divided by total impressions
    pub overall_rate: f64,
    /// Mean of the daily rates
    pub daily_avg_rate: f64,
    /// Highest daily rate
    pub max_daily_rate: f64,
    /// Lowest daily rate
    pub min_daily_rate: f64,
    /// Counter breakdown
    pub components: EngagementComponents,
    /// Daily engagement rate
    pub rate_series: MetricSeries,
    /// Trailing mean of the daily engagement rate
    pub rolling_rate: MetricSeries,
}

/// The `reach` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachGroup {
    /// Sum of total impressions
    pub total_impressions: i64,
    /// Sum of unique impressions
    pub total_unique_impressions: i64,
    /// Mean daily impressions
    pub avg_daily_impressions: f64,
    /// Highest daily impressions
    pub max_daily_impressions: i64,
    /// Unique over total impressions across the range
    pub overall_reach_ratio: f64,
    /// Any sponsored counter is non-zero
    pub has_sponsored: bool,
    /// Days with a reach ratio above 1
    pub ratio_above_one_days: usize,
    /// Daily reach ratio
    pub ratio_series: MetricSeries,
    /// Trailing mean of daily impressions
    pub rolling_impressions: MetricSeries,
}

/// Follower efficiency over the dates shared with the content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerEfficiency {
    /// New followers per thousand impressions over all matched days
    pub overall: f64,
    /// Days present in both streams
    pub days_matched: usize,
    /// Daily efficiency
    pub series: MetricSeries,
}

/// The `follower_growth` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerGrowth {
    /// Sum of daily new followers
    pub total_new_followers: i64,
    /// Mean daily new followers
    pub avg_daily_new_followers: f64,
    /// Running total of new followers
    pub cumulative: MetricSeries,
    /// Trailing mean of daily new followers
    pub rolling_new_followers: MetricSeries,
    /// Monthly new follower totals
    pub monthly: Vec<MonthTotal>,
    /// New followers per thousand impressions
    pub efficiency: FollowerEfficiency,
}

/// The terminal value of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Run metadata
    pub metadata: ReportMetadata,
    /// Engagement metrics
    pub engagement: EngagementGroup,
    /// Reach metrics
    pub reach: ReachGroup,
    /// Rolling window activity and spikes
    pub activity: RollingAnalysis,
    /// Monthly and weekday rollups and the top days
    pub calendar: CalendarSummary,
    /// Primary growth trend: monthly new followers, or unique impressions
    /// when no follower stream was supplied
    pub trend: GrowthTrend,
    /// Growth trend of monthly unique impressions
    pub audience_trend: GrowthTrend,
    /// Follower metrics, when a follower stream was supplied
    pub follower_growth: Option<FollowerGrowth>,
    /// Monthly impressions against monthly new followers
    pub correlation: Option<CorrelationResult>,
    /// Monthly engagement against monthly new followers
    pub engagement_correlation: Option<CorrelationResult>,
    /// Input observations
    pub data_quality: DataQuality,
}

impl AnalysisReport {
    /// Pretty JSON form of the report.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the pretty JSON form to `path`.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        tracing::info!(path = %path.display(), "report written");
        Ok(())
    }

    /// Short console summary.
    pub fn summary_lines(&self) -> Vec<String> {
        let meta = &self.metadata;
        let mut lines = vec![
            format!("Date range:         {} to {}", meta.content.start, meta.content.end),
            format!("Total days:         {}", meta.content.rows),
            format!("Total impressions:  {}", self.reach.total_impressions),
            format!("Unique reach:       {}", self.reach.total_unique_impressions),
            format!("Total engagement:   {}", self.engagement.total_engagement),
            format!(
                "Avg engagement:     {:.2}%",
                self.engagement.daily_avg_rate * 100.0
            ),
            format!(
                "Active days:        {}/{}",
                self.activity.active_days, self.activity.total_days
            ),
            format!("Spike days:         {}", self.activity.spike_days),
            format!(
                "Best posting days:  {}",
                self.calendar.best_weekdays.join(", ")
            ),
            format!(
                "Audience growth:    {}",
                format_pct(self.audience_trend.pct_change)
            ),
        ];
        if let Some(growth) = &self.follower_growth {
            lines.push(format!(
                "New followers:      {}",
                growth.total_new_followers
            ));
            lines.push(format!("Follower trend:     {}", format_pct(self.trend.pct_change)));
        }
        if let Some(correlation) = &self.correlation {
            let value = correlation.coefficient.map_or_else(
                || correlation.status.to_string(),
                |r| format!("{r:.3}"),
            );
            lines.push(format!(
                "Impressions vs followers: {value} ({} months)",
                correlation.months_used
            ));
        }
        lines
    }
}

fn format_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.1}%"))
}

fn pct(part: i64, total: i64) -> f64 {
    derived::ratio(part, total) * 100.0
}

/// Build streams from raw records and assemble the report.
///
/// Fails fast when either stream is empty or holds a duplicate date.
pub fn assemble_records(
    content: Vec<DailyRecord>,
    followers: Option<Vec<FollowerRecord>>,
    config: &ReportConfig,
    generated_at: DateTime<Utc>,
) -> Result<AnalysisReport> {
    let content = Stream::new(StreamKind::Content, content)?;
    let followers = followers
        .map(|records| Stream::new(StreamKind::Followers, records))
        .transpose()?;
    assemble(&content, followers.as_ref(), config, generated_at)
}

/// Run every stage over the streams and assemble the report.
pub fn assemble(
    content: &Stream<DailyRecord>,
    followers: Option<&Stream<FollowerRecord>>,
    config: &ReportConfig,
    generated_at: DateTime<Utc>,
) -> Result<AnalysisReport> {
    config.validate()?;
    tracing::debug!(
        content_rows = content.len(),
        follower_rows = followers.map(Stream::len),
        "assembling report"
    );

    let records = content.records();
    let days = derived::derive_days(content);
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();

    let frame = content_frame(records, &days)?;
    let activity = rolling::analyze(&frame, &dates, config)?;
    let calendar = calendar::summarize(&frame, config)?;

    let engagement = engagement_group(records, &days, &activity);
    let reach = reach_group(records, &days, &activity);

    let unique: Vec<f64> = records.iter().map(|r| r.impressions_unique as f64).collect();
    let unique_monthly = calendar::monthly_totals(&dates, &unique)?;
    let audience_trend = trend::compare(
        "unique_impressions",
        &unique_monthly,
        config.trend_window_months,
    );

    let impressions_series = MetricSeries::from_parts(
        "impressions",
        dates.iter().copied(),
        records.iter().map(|r| r.impressions_total as f64),
    );
    let engagement_series = MetricSeries::from_parts(
        "engagement",
        days.iter().map(|d| d.date),
        days.iter().map(|d| d.total_engagement as f64),
    );

    let (trend, follower_growth, correlation, engagement_correlation, overlap) =
        if let Some(followers) = followers {
            let growth = follower_growth(content, followers, config)?;
            let trend = trend::compare(
                "new_followers",
                &growth.monthly,
                config.trend_window_months,
            );
            let follower_series = MetricSeries::from_parts(
                "new_followers",
                followers.records().iter().map(|r| r.date),
                followers.records().iter().map(|r| r.new_followers as f64),
            );
            let correlation = correlate::correlate(&impressions_series, &follower_series)?;
            let engagement_correlation =
                correlate::correlate(&engagement_series, &follower_series)?;
            (
                trend,
                Some(growth),
                Some(correlation),
                Some(engagement_correlation),
                correlate::overlap(content, followers),
            )
        } else {
            (audience_trend.clone(), None, None, None, None)
        };

    let data_quality = quality::assess(content, followers);

    let report = AnalysisReport {
        metadata: ReportMetadata {
            generated_at,
            version: crate::VERSION.to_string(),
            content: StreamSummary::of(content),
            followers: followers.map(StreamSummary::of),
            overlap,
            config: config.clone(),
        },
        engagement,
        reach,
        activity,
        calendar,
        trend,
        audience_trend,
        follower_growth,
        correlation,
        engagement_correlation,
        data_quality,
    };

    tracing::info!(
        days = report.metadata.content.rows,
        spikes = report.activity.spike_days,
        correlation = ?report.correlation.as_ref().and_then(|c| c.coefficient),
        "report assembled"
    );
    Ok(report)
}

fn engagement_group(
    records: &[DailyRecord],
    days: &[derived::DerivedDay],
    activity: &RollingAnalysis,
) -> EngagementGroup {
    let total_engagement: i64 = days.iter().map(|d| d.total_engagement).sum();
    let total_impressions: i64 = records.iter().map(|r| r.impressions_total).sum();

    let clicks: i64 = records.iter().map(|r| r.clicks).sum();
    let reactions: i64 = records.iter().map(|r| r.reactions).sum();
    let comments: i64 = records.iter().map(|r| r.comments).sum();
    let reposts: i64 = records.iter().map(|r| r.reposts).sum();

    let rate_series = MetricSeries::from_parts(
        "engagement_rate",
        days.iter().map(|d| d.date),
        days.iter().map(|d| d.engagement_rate),
    );
    let rolling_rate = MetricSeries::from_parts(
        "engagement_rate_rolling",
        activity.points.iter().map(|p| p.date),
        activity.points.iter().map(|p| p.rolling_rate),
    );

    EngagementGroup {
        total_engagement,
        overall_rate: derived::ratio(total_engagement, total_impressions),
        daily_avg_rate: rate_series.mean(),
        max_daily_rate: rate_series.max().unwrap_or(0.0),
        min_daily_rate: rate_series.min().unwrap_or(0.0),
        components: EngagementComponents {
            clicks,
            reactions,
            comments,
            reposts,
            clicks_pct: pct(clicks, total_engagement),
            reactions_pct: pct(reactions, total_engagement),
            comments_pct: pct(comments, total_engagement),
            reposts_pct: pct(reposts, total_engagement),
        },
        rate_series,
        rolling_rate,
    }
}

fn reach_group(
    records: &[DailyRecord],
    days: &[derived::DerivedDay],
    activity: &RollingAnalysis,
) -> ReachGroup {
    let total_impressions: i64 = records.iter().map(|r| r.impressions_total).sum();
    let total_unique_impressions: i64 = records.iter().map(|r| r.impressions_unique).sum();
    let impressions: Vec<f64> = records.iter().map(|r| r.impressions_total as f64).collect();

    let ratio_series = MetricSeries::from_parts(
        "reach_ratio",
        days.iter().map(|d| d.date),
        days.iter().map(|d| d.reach_ratio),
    );
    let ratio_above_one_days = ratio_series.points.iter().filter(|p| p.value > 1.0).count();

    ReachGroup {
        total_impressions,
        total_unique_impressions,
        avg_daily_impressions: mean(&impressions),
        max_daily_impressions: records
            .iter()
            .map(|r| r.impressions_total)
            .max()
            .unwrap_or(0),
        overall_reach_ratio: derived::ratio(total_unique_impressions, total_impressions),
        has_sponsored: records.iter().any(|r| r.sponsored.is_active()),
        ratio_above_one_days,
        ratio_series,
        rolling_impressions: MetricSeries::from_parts(
            "impressions_rolling",
            activity.points.iter().map(|p| p.date),
            activity.points.iter().map(|p| p.rolling_avg),
        ),
    }
}

fn follower_growth(
    content: &Stream<DailyRecord>,
    followers: &Stream<FollowerRecord>,
    config: &ReportConfig,
) -> Result<FollowerGrowth> {
    let records = followers.records();
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let daily: Vec<f64> = records.iter().map(|r| r.new_followers as f64).collect();

    let cumulative = MetricSeries::from_parts(
        "cumulative_followers",
        dates.iter().copied(),
        records.iter().scan(0_i64, |acc, r| {
            *acc += r.new_followers;
            Some(*acc as f64)
        }),
    );
    let rolling_new_followers = MetricSeries::from_parts(
        "new_followers_rolling",
        dates.iter().copied(),
        rolling::trailing_mean(&daily, config.window_size)?,
    );
    let monthly = calendar::monthly_totals(&dates, &daily)?;

    let (pairs, overall) = match correlate::overlap(content, followers) {
        Some(interval) => {
            let pairs = correlate::align_daily(
                content.within(interval.start, interval.end),
                followers.within(interval.start, interval.end),
            );
            let gained: i64 = pairs.iter().map(|(_, f)| f.new_followers).sum();
            let impressions: i64 = pairs.iter().map(|(c, _)| c.impressions_total).sum();
            (pairs, derived::follower_efficiency(gained, impressions))
        }
        None => (Vec::new(), 0.0),
    };

    Ok(FollowerGrowth {
        total_new_followers: records.iter().map(|r| r.new_followers).sum(),
        avg_daily_new_followers: mean(&daily),
        cumulative,
        rolling_new_followers,
        monthly,
        efficiency: FollowerEfficiency {
            overall,
            days_matched: pairs.len(),
            series: correlate::efficiency_series(&pairs),
        },
    })
}
