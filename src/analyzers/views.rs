//! Derives the two chart views from aggregated per-region points.
//!
//! Both views are computed independently from the same input; the
//! presentation layer picks whichever one it wants to show.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::analyzers::scale::{axis_scales, unscaled};
use crate::analyzers::types::{AggregatedPoint, ChartView, ViewKind};
use crate::analyzers::utility::max_or_zero;
use crate::error::{PipelineError, Result};
use crate::records::Region;

/// Aggregated points per region, each ordered by date.
pub type RegionPoints = BTreeMap<Region, Vec<AggregatedPoint>>;

/// One point per week per region across the full history.
///
/// A week is represented by the last of its days present in the series, so
/// the point carries that week's `weekly_sum`, `days_in_week`, and the
/// rolling average at the end of the week. Plotted value: `weekly_sum`.
pub fn weekly_whole_history(aggregated: &RegionPoints) -> Result<ChartView> {
    let mut points = Vec::new();
    let mut series_max = BTreeMap::new();

    for (&region, region_points) in non_empty(aggregated, ViewKind::WeeklyWholeHistory)? {
        let mut weekly: Vec<AggregatedPoint> = Vec::new();
        for point in region_points {
            match weekly.last_mut() {
                Some(last) if last.week_start == point.week_start => *last = point.clone(),
                _ => weekly.push(point.clone()),
            }
        }

        series_max.insert(region, max_or_zero(weekly.iter().map(|p| p.weekly_sum as f64)));
        points.extend(weekly);
    }

    let window_start = points.iter().map(|p| p.week_start).min();
    let window_end = points.iter().map(|p| p.date).max();
    let (Some(window_start), Some(window_end)) = (window_start, window_end) else {
        return Err(no_points(ViewKind::WeeklyWholeHistory));
    };

    finish(
        ViewKind::WeeklyWholeHistory,
        window_start,
        window_end,
        None,
        aggregated,
        points,
        series_max,
    )
}

/// One point per day per region for the last `window_days` days.
///
/// The window ends at the earliest of the regions' latest dates and never
/// starts before the latest of the regions' first dates, so every region has
/// a point on every day of the window. With less common history than
/// `window_days` the window is correspondingly shorter. Plotted values:
/// `daily_count` and `rolling_avg7`.
pub fn daily_last_n(aggregated: &RegionPoints, window_days: i64) -> Result<ChartView> {
    let regions = non_empty(aggregated, ViewKind::DailyLast90)?;

    let common_end = regions.iter().filter_map(|(_, p)| p.last().map(|p| p.date)).min();
    let common_start = regions.iter().filter_map(|(_, p)| p.first().map(|p| p.date)).max();
    let (Some(end), Some(first_common)) = (common_end, common_start) else {
        return Err(no_points(ViewKind::DailyLast90));
    };

    let lookback = Duration::try_days(window_days.max(1) - 1);
    let start = lookback
        .and_then(|lookback| end.checked_sub_signed(lookback))
        .map_or(first_common, |start| start.max(first_common));
    if start > end {
        return Err(PipelineError::DisjointSeries {
            start: first_common,
            end,
        });
    }

    let mut points = Vec::new();
    let mut series_max = BTreeMap::new();

    for (&region, region_points) in regions {
        let window: Vec<AggregatedPoint> = region_points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect();

        series_max.insert(
            region,
            max_or_zero(
                window
                    .iter()
                    .map(|p| (p.daily_count as f64).max(p.rolling_avg7.unwrap_or(0.0))),
            ),
        );
        points.extend(window);
    }

    finish(
        ViewKind::DailyLast90,
        start,
        end,
        Some(window_days),
        aggregated,
        points,
        series_max,
    )
}

fn finish(
    kind: ViewKind,
    window_start: NaiveDate,
    window_end: NaiveDate,
    window_days: Option<i64>,
    aggregated: &RegionPoints,
    mut points: Vec<AggregatedPoint>,
    series_max: BTreeMap<Region, f64>,
) -> Result<ChartView> {
    points.sort_by_key(|p| (p.date, p.region));

    let (axis_scale, degenerate) = match axis_scales(&series_max) {
        Ok(scales) => (scales, None),
        Err(PipelineError::DegenerateSeries { region }) => {
            warn!(
                view = kind.file_stem(),
                region = %region,
                "Series maximum is zero, falling back to unscaled axis"
            );
            (unscaled(&series_max), Some(region))
        }
        Err(e) => return Err(e),
    };

    let last_updated = aggregated
        .iter()
        .filter_map(|(&region, p)| p.last().map(|p| (region, p.date)))
        .collect();

    debug!(
        view = kind.file_stem(),
        %window_start,
        %window_end,
        points = points.len(),
        "View built"
    );

    Ok(ChartView {
        kind,
        window_start,
        window_end,
        window_days,
        last_updated,
        points,
        series_max,
        axis_scale,
        degenerate,
    })
}

fn non_empty(
    aggregated: &RegionPoints,
    kind: ViewKind,
) -> Result<Vec<(&Region, &Vec<AggregatedPoint>)>> {
    let regions: Vec<_> = aggregated.iter().filter(|(_, p)| !p.is_empty()).collect();
    if regions.is_empty() {
        return Err(no_points(kind));
    }
    Ok(regions)
}

fn no_points(view: ViewKind) -> PipelineError {
    PipelineError::EmptyView { view }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate_series;
    use crate::records::{DailySeries, WeekStart};

    // 2021-08-02 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 8, 2).unwrap()
    }

    fn points(region: Region, start: NaiveDate, counts: &[u32]) -> Vec<AggregatedPoint> {
        let series = DailySeries::from_counts(
            region,
            counts
                .iter()
                .enumerate()
                .map(|(i, &c)| (start + Duration::days(i as i64), c)),
            None,
        );
        aggregate_series(&series, WeekStart::Monday)
    }

    fn constant(region: Region, start: NaiveDate, days: usize, count: u32) -> Vec<AggregatedPoint> {
        points(region, start, &vec![count; days])
    }

    #[test]
    fn test_weekly_one_point_per_week_per_region() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 21, 1));
        aggregated.insert(Region::County, constant(Region::County, monday(), 21, 10));

        let view = weekly_whole_history(&aggregated).unwrap();

        assert_eq!(view.kind, ViewKind::WeeklyWholeHistory);
        assert_eq!(view.points_for(Region::Local).count(), 3);
        assert_eq!(view.points_for(Region::County).count(), 3);
        assert!(view.points_for(Region::Local).all(|p| p.weekly_sum == 7));
        assert_eq!(view.window_start, monday());
        assert_eq!(view.window_end, monday() + Duration::days(20));
    }

    #[test]
    fn test_weekly_axis_scale_matches_peaks() {
        // local peaks at 20 per week, county at 400 per week
        let mut local = vec![0; 7];
        local[3] = 20;
        let mut county = vec![0; 7];
        county[5] = 400;

        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, points(Region::Local, monday(), &local));
        aggregated.insert(Region::County, points(Region::County, monday(), &county));

        let view = weekly_whole_history(&aggregated).unwrap();

        assert_eq!(view.series_max[&Region::Local], 20.0);
        assert_eq!(view.series_max[&Region::County], 400.0);
        assert_eq!(view.scale_for(Region::Local), 1.0);
        assert!((view.scale_for(Region::County) - 0.05).abs() < 1e-12);
        assert_eq!(view.degenerate, None);
    }

    #[test]
    fn test_weekly_partial_week_keeps_present_day_total() {
        // Thursday start: first week has 4 days
        let mut aggregated = RegionPoints::new();
        aggregated.insert(
            Region::Local,
            constant(Region::Local, monday() + Duration::days(3), 11, 2),
        );

        let view = weekly_whole_history(&aggregated).unwrap();
        let weeks: Vec<_> = view.points_for(Region::Local).collect();

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].weekly_sum, 8);
        assert_eq!(weeks[0].days_in_week, 4);
        assert_eq!(weeks[1].weekly_sum, 14);
        assert_eq!(weeks[1].days_in_week, 7);
    }

    #[test]
    fn test_daily_window_is_ninety_consecutive_days() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 200, 1));
        aggregated.insert(Region::County, constant(Region::County, monday(), 200, 50));

        let view = daily_last_n(&aggregated, 90).unwrap();
        let dates: Vec<NaiveDate> = view.points_for(Region::Local).map(|p| p.date).collect();

        assert_eq!(dates.len(), 90);
        assert!(dates.windows(2).all(|w| w[1] - w[0] == Duration::days(1)));
        assert_eq!(view.window_end, monday() + Duration::days(199));
        assert_eq!(view.window_start, monday() + Duration::days(110));
        assert_eq!(view.points_for(Region::County).count(), 90);
    }

    #[test]
    fn test_daily_window_ends_at_earliest_latest_date() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 120, 1));
        aggregated.insert(Region::County, constant(Region::County, monday(), 100, 5));

        let view = daily_last_n(&aggregated, 90).unwrap();
        let county_end = monday() + Duration::days(99);

        assert_eq!(view.window_end, county_end);
        assert!(view.points.iter().all(|p| p.date <= county_end));
        assert_eq!(view.points_for(Region::Local).count(), 90);
        assert_eq!(view.last_updated[&Region::Local], monday() + Duration::days(119));
    }

    #[test]
    fn test_daily_window_shorter_than_ninety_with_short_history() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 30, 1));
        aggregated.insert(
            Region::County,
            constant(Region::County, monday() + Duration::days(10), 40, 5),
        );

        let view = daily_last_n(&aggregated, 90).unwrap();

        // common span is day 10 ..= day 29
        assert_eq!(view.window_start, monday() + Duration::days(10));
        assert_eq!(view.window_end, monday() + Duration::days(29));
        assert_eq!(view.points_for(Region::Local).count(), 20);
        assert_eq!(view.points_for(Region::County).count(), 20);
    }

    #[test]
    fn test_daily_rolling_average_carries_prior_history() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 100, 3));

        let view = daily_last_n(&aggregated, 90).unwrap();

        assert!(view.points.iter().all(|p| p.rolling_avg7 == Some(3.0)));
    }

    #[test]
    fn test_daily_zero_series_falls_back_to_unscaled() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 30, 2));
        aggregated.insert(Region::County, constant(Region::County, monday(), 30, 0));

        let view = daily_last_n(&aggregated, 90).unwrap();

        assert_eq!(view.degenerate, Some(Region::County));
        assert_eq!(view.scale_for(Region::Local), 1.0);
        assert_eq!(view.scale_for(Region::County), 1.0);
    }

    #[test]
    fn test_disjoint_regions_have_no_daily_window() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 10, 1));
        aggregated.insert(
            Region::County,
            constant(Region::County, monday() + Duration::days(20), 10, 1),
        );

        assert!(matches!(
            daily_last_n(&aggregated, 90),
            Err(PipelineError::DisjointSeries { .. })
        ));
    }

    #[test]
    fn test_points_sorted_by_date_then_region() {
        let mut aggregated = RegionPoints::new();
        aggregated.insert(Region::County, constant(Region::County, monday(), 3, 1));
        aggregated.insert(Region::Local, constant(Region::Local, monday(), 3, 1));

        let view = daily_last_n(&aggregated, 90).unwrap();
        let order: Vec<(NaiveDate, Region)> = view.points.iter().map(|p| (p.date, p.region)).collect();

        assert_eq!(order[0], (monday(), Region::Local));
        assert_eq!(order[1], (monday(), Region::County));
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn test_no_regions_is_an_error() {
        assert!(matches!(
            weekly_whole_history(&RegionPoints::new()),
            Err(PipelineError::EmptyView {
                view: ViewKind::WeeklyWholeHistory
            })
        ));
        assert!(matches!(
            daily_last_n(&RegionPoints::new(), 90),
            Err(PipelineError::EmptyView {
                view: ViewKind::DailyLast90
            })
        ));
    }

    #[test]
    fn test_daily_window_wider_than_calendar_covers_all_history() {
        let mut agg = RegionPoints::new();
        agg.insert(Region::Local, points(Region::Local, monday(), &[1, 2, 3]));
        agg.insert(Region::County, points(Region::County, monday(), &[10, 20, 30]));

        let view = daily_last_n(&agg, i64::MAX).unwrap();
        assert_eq!(view.window_start, monday());
        assert_eq!(view.points_for(Region::Local).count(), 3);
        assert_eq!(view.window_days, Some(i64::MAX));
    }

    #[test]
    fn test_daily_view_records_requested_window() {
        let mut agg = RegionPoints::new();
        agg.insert(Region::Local, points(Region::Local, monday(), &[1; 40]));

        let view = daily_last_n(&agg, 28).unwrap();
        assert_eq!(view.window_days, Some(28));
        assert_eq!(view.points.len(), 28);
        assert_eq!(weekly_whole_history(&agg).unwrap().window_days, None);
    }
}
