use chrono::Utc;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::analyzers::aggregate::aggregate_series;
use crate::analyzers::types::{
    AggregatedPoint, ChartView, RegionFailure, RunSummary, ViewFailure, ViewKind,
};
use crate::analyzers::views::{RegionPoints, daily_last_n, weekly_whole_history};
use crate::config::{CountyTarget, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::records::{DailySeries, Region};
use crate::sources::county::{CountyRows, merge_county};
use crate::sources::local::{AffiliationWeek, LocalLog};

/// Paths to the two kinds of input.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub local_log: PathBuf,
    pub county_files: Vec<PathBuf>,
}

/// Everything one run produces, handed to the output writer.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub views: Vec<ChartView>,
    pub affiliation_weeks: Vec<AffiliationWeek>,
    pub summary: RunSummary,
}

impl PipelineOutput {
    pub fn view(&self, kind: ViewKind) -> Option<&ChartView> {
        self.views.iter().find(|v| v.kind == kind)
    }
}

/// Reads both sources from disk and builds every view.
///
/// County files are parsed concurrently on blocking tasks; their merge does
/// not depend on completion order.
#[tracing::instrument(skip_all, fields(local = %inputs.local_log.display(), county_files = inputs.county_files.len()))]
pub async fn run_pipeline(config: &PipelineConfig, inputs: &PipelineInputs) -> Result<PipelineOutput> {
    config.validate()?;

    let local = read_local_log(&inputs.local_log)?;
    let county = read_county_files(&inputs.county_files, &config.county).await?;

    build_views(config, local, county)
}

pub fn read_local_log(path: &Path) -> Result<LocalLog> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    LocalLog::read(BufReader::new(file), &path.display().to_string())
}

/// Parses each county file on its own blocking task.
pub async fn read_county_files(paths: &[PathBuf], target: &CountyTarget) -> Result<Vec<CountyRows>> {
    let mut tasks = vec![];

    for path in paths {
        let path = path.clone();
        let target = target.clone();
        tasks.push((
            path.clone(),
            tokio::task::spawn_blocking(move || CountyRows::read_path(&path, &target)),
        ));
    }

    let mut parts = Vec::with_capacity(tasks.len());
    for (path, task) in tasks {
        let rows = task
            .await
            .map_err(|e| PipelineError::io(&path, std::io::Error::other(e)))??;
        parts.push(rows);
    }

    Ok(parts)
}

/// Applies exclusion, normalizes, aggregates and windows already-parsed
/// sources.
///
/// A region with no usable records is recorded in the summary and left out
/// of the views; the run only fails if neither region has data. Duplicate
/// county dates abort the run.
pub fn build_views(
    config: &PipelineConfig,
    mut local: LocalLog,
    county: Vec<CountyRows>,
) -> Result<PipelineOutput> {
    let policy = config.exclusion.build();
    local.apply_exclusion(policy.as_ref());
    info!(
        policy = %policy.describe(),
        excluded = local.summary.rows_excluded,
        "Exclusion policy applied"
    );

    let mut sources = vec![local.summary.clone()];
    sources.extend(county.iter().map(|c| c.summary.clone()));

    let mut region_failures = Vec::new();
    let mut first_failure = None;
    let mut aggregated = RegionPoints::new();

    let series = [
        (Region::Local, local.to_series(config.history_start)),
        (Region::County, merge_county(&county)),
    ];

    for (region, result) in series {
        match result {
            Ok(series) => {
                aggregated.insert(region, aggregate(&series, config));
            }
            Err(e @ PipelineError::EmptySource { .. }) => {
                warn!(region = %region, error = %e, "Region has no usable records, leaving it out of the views");
                region_failures.push(RegionFailure {
                    region,
                    error: e.to_string(),
                });
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
            Err(e) => {
                error!(region = %region, error = %e, "Aborting run");
                return Err(e);
            }
        }
    }

    if aggregated.is_empty() {
        return Err(first_failure.unwrap_or(PipelineError::EmptySource {
            region: Region::Local,
        }));
    }

    let mut views = Vec::new();
    let mut view_failures = Vec::new();

    let built = [
        (
            ViewKind::WeeklyWholeHistory,
            weekly_whole_history(&aggregated),
        ),
        (
            ViewKind::DailyLast90,
            daily_last_n(&aggregated, config.daily_window_days),
        ),
    ];

    for (kind, result) in built {
        match result {
            Ok(view) => views.push(view),
            Err(e) => {
                error!(view = kind.file_stem(), error = %e, "View could not be built");
                view_failures.push(ViewFailure {
                    kind,
                    error: e.to_string(),
                });
            }
        }
    }

    let affiliation_weeks = local.weekly_by_affiliation(config.week_start);

    let summary = RunSummary {
        generated_at: Utc::now(),
        exclusion_policy: policy.describe(),
        sources,
        region_failures,
        view_failures,
        views: views.iter().map(|v| v.kind).collect(),
    };

    info!(
        views = summary.views.len(),
        rows_skipped = summary.rows_skipped(),
        "Pipeline finished"
    );

    Ok(PipelineOutput {
        views,
        affiliation_weeks,
        summary,
    })
}

fn aggregate(series: &DailySeries, config: &PipelineConfig) -> Vec<AggregatedPoint> {
    let points = aggregate_series(series, config.week_start);
    info!(
        region = %series.region(),
        days = points.len(),
        first = ?series.first_date(),
        last = ?series.last_date(),
        "Series aggregated"
    );
    points
}
