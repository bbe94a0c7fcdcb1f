//! End-to-end behaviour of the report pipeline.

use approx::assert_relative_eq;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use engagement_metrics::{
    CorrelationStatus, DailyRecord, FollowerRecord, ReportConfig, assemble_records,
};

fn generated_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-30T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[test]
fn spike_example_flags_only_the_outlier() {
    let impressions = [100, 100, 100, 100, 100, 100, 100, 300, 100, 100];
    let content: Vec<_> = impressions
        .iter()
        .enumerate()
        .map(|(i, &imp)| {
            DailyRecord::new(date(2024, 1, 1) + Days::new(i as u64), imp, imp)
                .with_engagement(1, 0, 0, 0)
        })
        .collect();

    let config = ReportConfig {
        window_size: 7,
        ..Default::default()
    };
    let report = assemble_records(content, None, &config, generated_at()).unwrap();
    let points = &report.activity.points;

    assert!(points[7].is_spike);
    assert!(!points[8].is_spike);
    assert_eq!(report.activity.spike_days, 1);
    assert_relative_eq!(points[0].rolling_avg, 100.0);
    assert_relative_eq!(points[6].rolling_avg, 100.0, epsilon = 1e-9);
}

#[test]
fn three_shared_months_correlate_perfectly() {
    let content: Vec<_> = days_between(date(2024, 1, 1), date(2024, 6, 30))
        .map(|d| {
            let imp = match (d.month(), d.day()) {
                (3, 10) => 10,
                (4, 10) => 20,
                (5, 10) => 30,
                (1 | 2 | 6, 10) => 500,
                _ => 0,
            };
            DailyRecord::new(d, imp, imp)
        })
        .collect();
    let followers: Vec<_> = days_between(date(2024, 3, 1), date(2024, 5, 31))
        .map(|d| {
            let gained = if d.day() == 5 { i64::from(d.month()) - 2 } else { 0 };
            FollowerRecord::new(d, gained)
        })
        .collect();

    let report =
        assemble_records(content, Some(followers), &ReportConfig::default(), generated_at())
            .unwrap();

    let correlation = report.correlation.unwrap();
    assert_eq!(correlation.status, CorrelationStatus::Computed);
    assert_eq!(correlation.months_used, 3);
    assert_relative_eq!(correlation.coefficient.unwrap(), 1.0, epsilon = 1e-12);
    let overlap = correlation.overlap.unwrap();
    assert_eq!(overlap.start, date(2024, 3, 1));
    assert_eq!(overlap.end, date(2024, 5, 31));
}

#[test]
fn disjoint_streams_report_no_overlap() {
    let content: Vec<_> = days_between(date(2024, 1, 1), date(2024, 2, 29))
        .map(|d| DailyRecord::new(d, 100, 90))
        .collect();
    let followers: Vec<_> = days_between(date(2024, 5, 1), date(2024, 6, 30))
        .map(|d| FollowerRecord::new(d, 1))
        .collect();

    let report =
        assemble_records(content, Some(followers), &ReportConfig::default(), generated_at())
            .unwrap();

    let correlation = report.correlation.as_ref().unwrap();
    assert_eq!(correlation.status, CorrelationStatus::NoOverlap);
    assert_eq!(correlation.coefficient, None);
    assert!(report.metadata.overlap.is_none());
    let growth = report.follower_growth.unwrap();
    assert_eq!(growth.efficiency.days_matched, 0);
    assert_eq!(growth.efficiency.overall, 0.0);

    let json = serde_json::to_value(correlation).unwrap();
    assert_eq!(json["status"], "no_overlap");
    assert!(json["coefficient"].is_null());
}

#[test]
fn identical_inputs_serialize_identically() {
    let build = || {
        let content: Vec<_> = days_between(date(2024, 1, 1), date(2024, 12, 31))
            .enumerate()
            .map(|(i, d)| {
                let imp = 200 + (i as i64 * 37) % 400;
                DailyRecord::new(d, imp, imp - (i as i64 % 30))
                    .with_engagement(i as i64 % 7, i as i64 % 11, (i as i64 % 5) - 1, i as i64 % 3)
            })
            .collect();
        let followers: Vec<_> = days_between(date(2024, 2, 15), date(2024, 11, 30))
            .enumerate()
            .map(|(i, d)| FollowerRecord::new(d, (i as i64 % 9) - 2))
            .collect();
        assemble_records(content, Some(followers), &ReportConfig::default(), generated_at())
            .unwrap()
            .to_json_pretty()
            .unwrap()
    };

    assert_eq!(build(), build());
}

#[test]
fn report_exposes_stable_keys() {
    let content: Vec<_> = days_between(date(2024, 1, 1), date(2024, 4, 30))
        .map(|d| DailyRecord::new(d, 100, 80).with_engagement(2, 2, 1, 0))
        .collect();
    let followers: Vec<_> = days_between(date(2024, 1, 1), date(2024, 4, 30))
        .map(|d| FollowerRecord::new(d, i64::from(d.month())))
        .collect();

    let report =
        assemble_records(content, Some(followers), &ReportConfig::default(), generated_at())
            .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["engagement"]["rate_series"]["points"].is_array());
    assert!(json["reach"]["ratio_series"]["points"].is_array());
    assert!(json["follower_growth"]["efficiency"]["overall"].is_number());
    assert!(json["correlation"]["months_used"].is_number());
    assert!(json["trend"]["last_minus_first"].is_number());
    assert_eq!(json["metadata"]["generated_at"], "2025-06-30T12:00:00Z");
    assert_eq!(json["metadata"]["content"]["start"], "2024-01-01");
    assert_eq!(json["metadata"]["config"]["window_size"], 7);
}

#[test]
fn gaps_do_not_break_rolling_or_monthly_stages() {
    // Every third day only.
    let content: Vec<_> = days_between(date(2024, 1, 1), date(2024, 3, 31))
        .step_by(3)
        .map(|d| DailyRecord::new(d, 100, 100))
        .collect();
    let rows = content.len();

    let report =
        assemble_records(content, None, &ReportConfig::default(), generated_at()).unwrap();

    assert_eq!(report.activity.points.len(), rows);
    assert!(report.calendar.monthly.iter().all(|m| m.partial));
    assert_eq!(report.calendar.partial_months.len(), 3);
    assert!(report.data_quality.content_missing_dates > 0);
}

#[test]
fn duplicate_dates_are_rejected() {
    let content = vec![
        DailyRecord::new(date(2024, 1, 1), 10, 10),
        DailyRecord::new(date(2024, 1, 1), 20, 10),
    ];
    assert!(assemble_records(content, None, &ReportConfig::default(), generated_at()).is_err());
}
