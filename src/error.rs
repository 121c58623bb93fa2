//! Error taxonomy for the case-count pipeline.
//!
//! Row-level problems ([`PipelineError::MalformedRecord`]) are recovered by the
//! source readers and only ever surface as counts and log lines. Region-level
//! and merge-level problems are returned to the caller by name.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::analyzers::types::ViewKind;
use crate::records::Region;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("malformed record in {source_name} at line {line}: {reason}")]
    MalformedRecord {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error("no usable {region} records after filtering")]
    EmptySource { region: Region },

    #[error("duplicate {region} record for {date}")]
    DuplicateRecord { date: NaiveDate, region: Region },

    #[error("{region} case total for {date} does not fit in a daily count")]
    CountOverflow { date: NaiveDate, region: Region },

    #[error("{region} series has a zero maximum, overlay scaling is undefined")]
    DegenerateSeries { region: Region },

    #[error("no region has points for the {} view", .view.file_stem())]
    EmptyView { view: ViewKind },

    #[error("regions share no dates: latest first date {start} is after earliest last date {end}")]
    DisjointSeries { start: NaiveDate, end: NaiveDate },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(source_name: &str, line: u64, reason: impl Into<String>) -> Self {
        PipelineError::MalformedRecord {
            source_name: source_name.to_string(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
