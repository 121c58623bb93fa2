//! Output formatting and persistence for chart views.
//!
//! Supports pretty-printing, JSON serialization, and flat CSV export.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::analyzer::PipelineOutput;
use crate::analyzers::types::{ChartView, RunSummary};
use crate::records::Region;
use crate::sources::local::AffiliationWeek;

pub const SUMMARY_FILE: &str = "run_summary.json";
pub const AFFILIATION_FILE: &str = "weekly_by_affiliation.csv";

/// Flat CSV row for one point of a view.
#[derive(Debug, Serialize)]
struct ViewRow {
    date: NaiveDate,
    region: Region,
    week_start: NaiveDate,
    daily_count: u32,
    rolling_avg7: Option<f64>,
    weekly_sum: u64,
    days_in_week: u8,
    axis_scale: f64,
    scaled_value: f64,
}

/// Logs a view using Rust's debug pretty-print format.
pub fn print_pretty(view: &ChartView) {
    debug!("{:#?}", view);
}

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Writes a view as pretty JSON to `<dir>/<kind>.json`.
pub fn write_view_json(dir: &Path, view: &ChartView) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", view.kind.file_stem()));
    write_json(&path, view)?;
    Ok(path)
}

/// Writes a view as one CSV row per point to `<dir>/<kind>.csv`.
///
/// `rolling_avg7` is left empty where it is undefined. `scaled_value` is the
/// view's plotted value multiplied by the region's axis scale.
pub fn write_view_csv(dir: &Path, view: &ChartView) -> Result<PathBuf> {
    let path = dir.join(format!("{}.csv", view.kind.file_stem()));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    for point in &view.points {
        let axis_scale = view.scale_for(point.region);
        writer.serialize(ViewRow {
            date: point.date,
            region: point.region,
            week_start: point.week_start,
            daily_count: point.daily_count,
            rolling_avg7: point.rolling_avg7,
            weekly_sum: point.weekly_sum,
            days_in_week: point.days_in_week,
            axis_scale,
            scaled_value: view.plotted_value(point) * axis_scale,
        })?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = view.points.len(), "View CSV written");
    Ok(path)
}

/// Writes the weekly local totals per affiliation.
pub fn write_affiliation_csv(dir: &Path, weeks: &[AffiliationWeek]) -> Result<PathBuf> {
    let path = dir.join(AFFILIATION_FILE);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    for week in weeks {
        writer.serialize(week)?;
    }
    writer.flush()?;

    Ok(path)
}

pub fn write_summary_json(dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    write_json(&path, summary)?;
    Ok(path)
}

/// Writes every artifact of a run into `dir`, creating it if needed.
pub fn write_all(dir: &Path, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::new();
    for view in &output.views {
        print_pretty(view);
        written.push(write_view_json(dir, view)?);
        written.push(write_view_csv(dir, view)?);
    }
    written.push(write_affiliation_csv(dir, &output.affiliation_weeks)?);
    written.push(write_summary_json(dir, &output.summary)?);

    info!(dir = %dir.display(), files = written.len(), "Artifacts written");
    Ok(written)
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
