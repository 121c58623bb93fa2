//! Source readers: turn the local case log and the county CSV files into
//! normalized [`DailySeries`](crate::records::DailySeries).
//!
//! Rows that cannot be parsed are skipped, logged and counted in a
//! [`ReadSummary`]; they never abort a read.

pub mod county;
pub mod exclusion;
pub mod local;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::error::PipelineError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Row counters for one input source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadSummary {
    pub source: String,
    pub rows_read: u64,
    /// Malformed rows that were skipped.
    pub rows_skipped: u64,
    /// Rows dropped by the exclusion policy.
    pub rows_excluded: u64,
    /// Rows for a region other than the one being read.
    pub rows_filtered: u64,
}

impl ReadSummary {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn record_skip(&mut self, error: &PipelineError) {
        self.rows_skipped += 1;
        warn!(source = %self.source, error = %error, "Skipping malformed row");
    }

    pub fn rows_used(&self) -> u64 {
        self.rows_read - self.rows_skipped - self.rows_excluded - self.rows_filtered
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| format!("invalid date `{raw}`: {e}"))
}

/// Parses a non-negative whole count.
///
/// Whole floats such as `12.0` are accepted since some exports write counts
/// that way; negative, fractional and non-numeric values are rejected.
pub(crate) fn parse_count(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Ok(n);
    }

    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
            Ok(f as u32)
        }
        Ok(f) if f < 0.0 => Err(format!("negative count `{raw}`")),
        _ => Err(format!("invalid count `{raw}`")),
    }
}
