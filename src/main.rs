//! CLI entry point for the campus case charts pipeline.
//!
//! Provides subcommands for downloading the county reference data and for
//! building the weekly and 90-day chart views from the local case log.

use anyhow::{Context, Result};
use campus_case_charts::analyzers::analyzer::{PipelineInputs, run_pipeline};
use campus_case_charts::config::{ExclusionConfig, PipelineConfig};
use campus_case_charts::fetch::BasicClient;
use campus_case_charts::fetch::county::download_county;
use campus_case_charts::output::{print_json, write_all};
use campus_case_charts::records::WeekStart;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "campus_case_charts")]
#[command(about = "Builds chart-ready COVID-19 case views for a campus and its county", long_about = None)]
struct Cli {
    /// JSON config file (falls back to $CASE_CHARTS_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the case sources and write the weekly and daily chart views
    Build {
        /// Local case log CSV
        #[arg(short, long)]
        local: PathBuf,

        /// County CSV file(s), one per year is typical; `.gz` is accepted
        #[arg(long = "county", value_name = "FILE", num_args = 1..)]
        county: Vec<PathBuf>,

        /// Directory to write views and the run summary to
        #[arg(short, long, default_value = "charts")]
        output_dir: PathBuf,

        /// Exclude local cases not on campus within this many days
        #[arg(long)]
        exclusion_days: Option<i64>,

        /// Count every local case, ignoring campus presence
        #[arg(long, conflicts_with = "exclusion_days")]
        no_exclusion: bool,

        /// First day of the week for weekly totals
        #[arg(long, value_enum)]
        week_start: Option<WeekStart>,

        /// Length of the recent daily view, in days
        #[arg(long)]
        window_days: Option<i64>,

        /// Zero-fill the local series back to this date (YYYY-MM-DD)
        #[arg(long)]
        history_start: Option<NaiveDate>,
    },
    /// Download yearly county files and keep the configured county's rows
    FetchCounty {
        /// Years to download
        #[arg(short, long, value_delimiter = ',', default_values_t = [2020, 2021, 2022])]
        years: Vec<i32>,

        /// Combined county CSV to write
        #[arg(short, long, default_value = "data/county_cases.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            local,
            county,
            output_dir,
            exclusion_days,
            no_exclusion,
            week_start,
            window_days,
            history_start,
        } => {
            if let Some(window_days) = exclusion_days {
                config.exclusion = ExclusionConfig::NotRecentlyOnCampus { window_days };
            }
            if no_exclusion {
                config.exclusion = ExclusionConfig::None;
            }
            if let Some(week_start) = week_start {
                config.week_start = week_start;
            }
            if let Some(window_days) = window_days {
                config.daily_window_days = window_days;
            }
            if history_start.is_some() {
                config.history_start = history_start;
            }
            config.validate()?;

            if county.is_empty() {
                warn!("No county files given, views will only contain the local series");
            }

            let inputs = PipelineInputs {
                local_log: local,
                county_files: county,
            };
            let output = run_pipeline(&config, &inputs)
                .await
                .context("pipeline run failed")?;

            write_all(&output_dir, &output)?;
            print_json(&output.summary)?;
        }
        Commands::FetchCounty { years, output } => {
            let client = BasicClient::new()?;
            let downloads = download_county(
                &client,
                &years,
                &config.county_url_template,
                &config.county,
                &output,
            )
            .await?;

            let rows: u64 = downloads.iter().map(|d| d.rows).sum();
            info!(
                years = downloads.len(),
                rows,
                output = %output.display(),
                "County data saved"
            );
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_tracing() -> WorkerGuard {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/campus_case_charts.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("campus_case_charts.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("CASE_CHARTS_CONFIG").map(PathBuf::from));

    match path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}
