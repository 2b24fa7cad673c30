//! Time bucketing and activity histograms.
//!
//! Every histogram is materialised over the full bucket skeleton of its
//! resolution, so charts always receive a fixed number of points even when
//! nothing was detected. All bucketing happens in UTC.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The UTC calendar day containing `now`.
    pub fn day_of(now: DateTime<Utc>) -> Self {
        let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self::new(start, start + Duration::days(1))
    }

    /// The seven full UTC days preceding the day containing `now`.
    pub fn week_before(now: DateTime<Utc>) -> Self {
        let today = Self::day_of(now).start;
        Self::new(today - Duration::days(7), today)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 24 buckets keyed "00".."23".
    DailyHourly,
    /// 168 buckets keyed "DD-HH", DD being the calendar day of each of the
    /// seven days starting at the range start.
    WeeklyHourly,
}

impl Resolution {
    pub fn bucket_count(&self) -> usize {
        match self {
            Resolution::DailyHourly => 24,
            Resolution::WeeklyHourly => 7 * 24,
        }
    }

    /// Bucket key of a single timestamp.
    pub fn key(&self, ts: DateTime<Utc>) -> String {
        match self {
            Resolution::DailyHourly => ts.format("%H").to_string(),
            Resolution::WeeklyHourly => ts.format("%d-%H").to_string(),
        }
    }

    /// All bucket keys for a range starting at `start`, in chart order.
    pub fn skeleton(&self, start: DateTime<Utc>) -> Vec<String> {
        match self {
            Resolution::DailyHourly => (0..24).map(|hour| format!("{:02}", hour)).collect(),
            Resolution::WeeklyHourly => (0..7)
                .flat_map(|offset| {
                    let day = (start + Duration::days(offset)).day();
                    (0..24).map(move |hour| format!("{:02}-{:02}", day, hour))
                })
                .collect(),
        }
    }
}

/// One histogram point, serialised in the chart's `{h, a}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(rename = "h")]
    pub key: String,
    #[serde(rename = "a")]
    pub count: u64,
}

/// Count timestamps per bucket.
///
/// Timestamps outside `range` are ignored, so a record captured exactly at
/// `range.end` is never counted.
pub fn build_histogram<I>(resolution: Resolution, range: &TimeRange, timestamps: I) -> Vec<Bucket>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for ts in timestamps {
        if range.contains(ts) {
            *counts.entry(resolution.key(ts)).or_insert(0) += 1;
        }
    }

    resolution
        .skeleton(range.start)
        .into_iter()
        .map(|key| {
            let count = counts.get(&key).copied().unwrap_or(0);
            Bucket { key, count }
        })
        .collect()
}

/// Chart document consumed by the dashboard's line/bar charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityChart {
    pub data: Vec<Bucket>,
    pub xkey: &'static str,
    pub ykeys: [&'static str; 1],
    pub labels: [&'static str; 1],
}

impl ActivityChart {
    pub fn new(data: Vec<Bucket>) -> Self {
        Self {
            data,
            xkey: "h",
            ykeys: ["a"],
            labels: ["Activity"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_daily_skeleton_without_records() {
        let range = TimeRange::day_of(at(2024, 3, 10, 15, 0));
        let histogram = build_histogram(Resolution::DailyHourly, &range, Vec::new());

        assert_eq!(Resolution::DailyHourly.bucket_count(), 24);
        assert_eq!(histogram.len(), Resolution::DailyHourly.bucket_count());
        assert_eq!(histogram[0].key, "00");
        assert_eq!(histogram[23].key, "23");
        assert!(histogram.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_weekly_skeleton_without_records() {
        let range = TimeRange::week_before(at(2024, 3, 10, 15, 0));
        let histogram = build_histogram(Resolution::WeeklyHourly, &range, Vec::new());

        assert_eq!(Resolution::WeeklyHourly.bucket_count(), 168);
        assert_eq!(histogram.len(), Resolution::WeeklyHourly.bucket_count());
        assert_eq!(histogram[0].key, "03-00");
        assert_eq!(histogram[24].key, "04-00");
        assert_eq!(histogram[167].key, "09-23");
    }

    #[test]
    fn test_weekly_keys_across_month_boundary() {
        let range = TimeRange::week_before(at(2024, 3, 3, 8, 0));
        let keys = Resolution::WeeklyHourly.skeleton(range.start);

        // 2024 is a leap year: Feb 25 .. Mar 2
        assert_eq!(keys[0], "25-00");
        assert_eq!(keys[4 * 24], "29-00");
        assert_eq!(keys[5 * 24], "01-00");
        assert_eq!(keys[167], "02-23");
    }

    #[test]
    fn test_daily_counts_and_end_boundary() {
        let range = TimeRange::day_of(at(2024, 3, 10, 12, 0));
        let timestamps = vec![
            at(2024, 3, 10, 0, 0),
            at(2024, 3, 10, 9, 15),
            at(2024, 3, 10, 9, 45),
            at(2024, 3, 10, 23, 59),
            // exactly at `end`
            at(2024, 3, 11, 0, 0),
            // before `start`
            at(2024, 3, 9, 23, 59),
        ];

        let histogram = build_histogram(Resolution::DailyHourly, &range, timestamps);

        assert_eq!(histogram[0].count, 1);
        assert_eq!(histogram[9].count, 2);
        assert_eq!(histogram[23].count, 1);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<u64>(), 4);
    }

    #[test]
    fn test_weekly_counts_land_on_day_and_hour() {
        let range = TimeRange::week_before(at(2024, 3, 10, 12, 0));
        let timestamps = vec![
            at(2024, 3, 3, 0, 30),
            at(2024, 3, 5, 14, 0),
            at(2024, 3, 5, 14, 59),
            at(2024, 3, 9, 23, 0),
            // today is outside the weekly range
            at(2024, 3, 10, 1, 0),
        ];

        let histogram = build_histogram(Resolution::WeeklyHourly, &range, timestamps);

        let count_of = |key: &str| histogram.iter().find(|b| b.key == key).unwrap().count;
        assert_eq!(count_of("03-00"), 1);
        assert_eq!(count_of("05-14"), 2);
        assert_eq!(count_of("09-23"), 1);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<u64>(), 4);
    }

    #[test]
    fn test_chart_serialization_shape() {
        let chart = ActivityChart::new(vec![Bucket { key: "07".to_string(), count: 3 }]);
        let json = serde_json::to_value(&chart).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "data": [{"h": "07", "a": 3}],
                "xkey": "h",
                "ykeys": ["a"],
                "labels": ["Activity"],
            })
        );
    }
}
