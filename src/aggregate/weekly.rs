//! Weekly weighted metrics per weight range, for trend charts.
//!
//! Weeks start on Monday. A row belongs to the week containing its report date.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::aggregate::weighted::{WeightedMetrics, WeightedSums};
use crate::domain::{DatasetRow, Metric};

/// Trend charts ignore anything reported before this date.
pub const TREND_START: NaiveDate = match NaiveDate::from_ymd_opt(2024, 1, 1) {
    Some(date) => date,
    None => panic!("invalid trend start date"),
};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPoint {
    pub week_start: NaiveDate,
    pub weight_range: String,
    pub head_count: f64,
    #[serde(flatten)]
    pub metrics: WeightedMetrics,
}

/// Points sorted by (week, weight range).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub points: Vec<WeeklyPoint>,
}

impl WeeklyTrend {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn weeks(&self) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self.points.iter().map(|p| p.week_start).collect();
        set.into_iter().collect()
    }

    pub fn weight_ranges(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.points.iter().map(|p| p.weight_range.as_str()).collect();
        set.into_iter().collect()
    }

    /// `(week, value)` pairs of one metric for one weight range.
    pub fn series(&self, weight_range: &str, metric: Metric) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .filter(|p| p.weight_range == weight_range)
            .map(|p| (p.week_start, p.metrics.get(metric)))
            .collect()
    }

    pub fn value(&self, week: NaiveDate, weight_range: &str, metric: Metric) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.week_start == week && p.weight_range == weight_range)
            .map(|p| p.metrics.get(metric))
    }
}

/// Bucket rows on/after `since` by (week, weight range).
///
/// Rows without a weight range cannot be charted and are skipped.
pub fn weekly_trend(rows: &[&DatasetRow], since: NaiveDate) -> WeeklyTrend {
    let mut buckets: BTreeMap<(NaiveDate, &str), WeightedSums> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.report_date >= since) {
        let Some(range) = row.row.weight_range.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
            continue;
        };
        buckets
            .entry((week_start(row.report_date), range))
            .or_default()
            .add(row);
    }

    let points = buckets
        .into_iter()
        .map(|((week, range), sums)| WeeklyPoint {
            week_start: week,
            weight_range: range.to_string(),
            head_count: sums.head_total(),
            metrics: sums.metrics(),
        })
        .collect();

    WeeklyTrend { points }
}
