//! Data types produced by the aggregation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::records::Region;
use crate::sources::ReadSummary;

/// Daily count, trailing average and weekly total for one region on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPoint {
    pub date: NaiveDate,
    pub region: Region,
    pub daily_count: u32,
    /// Mean of the 7 days ending at `date`. `None` until 7 days of history exist.
    pub rolling_avg7: Option<f64>,
    /// First day of the calendar week containing `date`.
    pub week_start: NaiveDate,
    /// Sum of the daily counts of this week that are present in the series.
    pub weekly_sum: u64,
    /// How many days of this week are present in the series, 7 unless the
    /// week is cut by the start or end of history.
    pub days_in_week: u8,
}

impl AggregatedPoint {
    pub fn is_partial_week(&self) -> bool {
        self.days_in_week < 7
    }
}

/// Which of the two chart views a [`ChartView`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    WeeklyWholeHistory,
    DailyLast90,
}

impl ViewKind {
    /// Stable file stem for output artifacts.
    ///
    /// The daily stem stays `daily_last_90` whatever `daily_window_days` is;
    /// the actual length is [`ChartView::window_days`].
    pub fn file_stem(&self) -> &'static str {
        match self {
            ViewKind::WeeklyWholeHistory => "weekly_whole_history",
            ViewKind::DailyLast90 => "daily_last_90",
        }
    }
}

/// A windowed, overlay-scaled set of points ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub kind: ViewKind,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Requested length of a daily window; `None` for the weekly view.
    pub window_days: Option<i64>,
    /// Latest date of each region's series, shown as "data last updated".
    pub last_updated: BTreeMap<Region, NaiveDate>,
    /// Ordered by date, then region.
    pub points: Vec<AggregatedPoint>,
    /// Largest plotted value per region within the window.
    pub series_max: BTreeMap<Region, f64>,
    /// Display multiplier per region. Stored counts are never rescaled.
    pub axis_scale: BTreeMap<Region, f64>,
    /// Set when a zero maximum forced a 1:1 fallback for every region.
    pub degenerate: Option<Region>,
}

impl ChartView {
    pub fn regions(&self) -> Vec<Region> {
        self.axis_scale.keys().copied().collect()
    }

    pub fn points_for(&self, region: Region) -> impl Iterator<Item = &AggregatedPoint> {
        self.points.iter().filter(move |p| p.region == region)
    }

    /// Value plotted for `point` in this view, before axis scaling.
    pub fn plotted_value(&self, point: &AggregatedPoint) -> f64 {
        match self.kind {
            ViewKind::WeeklyWholeHistory => point.weekly_sum as f64,
            ViewKind::DailyLast90 => point.daily_count as f64,
        }
    }

    pub fn scale_for(&self, region: Region) -> f64 {
        self.axis_scale.get(&region).copied().unwrap_or(1.0)
    }
}

/// A region that could not contribute to the views, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFailure {
    pub region: Region,
    pub error: String,
}

/// A view that could not be built, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewFailure {
    pub kind: ViewKind,
    pub error: String,
}

/// Outcome of one pipeline run, written next to the views.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub exclusion_policy: String,
    pub sources: Vec<ReadSummary>,
    pub region_failures: Vec<RegionFailure>,
    pub view_failures: Vec<ViewFailure>,
    pub views: Vec<ViewKind>,
}

impl RunSummary {
    pub fn rows_skipped(&self) -> u64 {
        self.sources.iter().map(|s| s.rows_skipped).sum()
    }
}
