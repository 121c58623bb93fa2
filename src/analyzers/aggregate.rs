use chrono::NaiveDate;
use std::collections::HashMap;

use crate::analyzers::types::AggregatedPoint;
use crate::analyzers::utility::mean;
use crate::records::{DailySeries, WeekStart};

/// Number of trailing days in the rolling average, including the current day.
pub const ROLLING_WINDOW: usize = 7;

/// Aggregates a [`DailySeries`] into one [`AggregatedPoint`] per date.
///
/// * `daily_count` is the raw count.
/// * `rolling_avg7` is the mean of the 7 days ending at the date, and `None`
///   for the first 6 days of the series.
/// * `weekly_sum` is the sum over the calendar week (per `week_start`)
///   containing the date. Weeks cut by the start or end of the series are
///   summed over the days present and report `days_in_week < 7`.
///
/// Pure: the same series always yields the same points.
pub fn aggregate_series(series: &DailySeries, week_start: WeekStart) -> Vec<AggregatedPoint> {
    let records = series.records();

    let mut weeks: HashMap<NaiveDate, (u64, u8)> = HashMap::new();
    for record in records {
        let week = weeks.entry(week_start.week_of(record.date)).or_default();
        week.0 += record.new_cases as u64;
        week.1 += 1;
    }

    let counts: Vec<f64> = records.iter().map(|r| r.new_cases as f64).collect();

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let rolling_avg7 = if i + 1 >= ROLLING_WINDOW {
                Some(mean(&counts[i + 1 - ROLLING_WINDOW..=i]))
            } else {
                None
            };

            let week = week_start.week_of(record.date);
            let (weekly_sum, days_in_week) = weeks.get(&week).copied().unwrap_or_default();

            AggregatedPoint {
                date: record.date,
                region: record.region,
                daily_count: record.new_cases,
                rolling_avg7,
                week_start: week,
                weekly_sum,
                days_in_week,
            }
        })
        .collect()
}
