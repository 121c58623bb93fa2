//! Reader for yearly county case files in the public per-county-per-date
//! rolling-average schema:
//!
//! ```text
//! date,geoid,county,state,cases,cases_avg,cases_avg_per_100k,deaths,deaths_avg,deaths_avg_per_100k
//! ```
//!
//! Only `date`, `county`, `state` and `cases` are read. Files whose name ends
//! in `.gz` are gunzipped on the fly.

use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::config::CountyTarget;
use crate::error::{PipelineError, Result};
use crate::records::{DailySeries, Region};
use crate::sources::{ReadSummary, parse_count, parse_date};

#[derive(Debug, Deserialize)]
struct RawCountyRow {
    date: String,
    county: String,
    state: String,
    cases: String,
}

/// Target-county rows read from one file.
#[derive(Debug, Clone)]
pub struct CountyRows {
    pub counts: Vec<(NaiveDate, u32)>,
    pub summary: ReadSummary,
}

impl CountyRows {
    /// Parses one county file, keeping rows for `target` only.
    ///
    /// Rows for other counties are counted as filtered. Target rows whose
    /// date or count cannot be parsed are skipped and counted. A date seen
    /// twice within the file is a [`PipelineError::DuplicateRecord`].
    pub fn read<R: Read>(reader: R, source_name: &str, target: &CountyTarget) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut summary = ReadSummary::new(source_name);
        let mut seen: BTreeMap<NaiveDate, u32> = BTreeMap::new();

        for result in rdr.records() {
            summary.rows_read += 1;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    summary.record_skip(&PipelineError::malformed(
                        source_name,
                        summary.rows_read + 1,
                        e.to_string(),
                    ));
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(summary.rows_read + 1);

            let raw: RawCountyRow = match record.deserialize(Some(&headers)) {
                Ok(raw) => raw,
                Err(e) => {
                    summary.record_skip(&PipelineError::malformed(source_name, line, e.to_string()));
                    continue;
                }
            };

            if !target.matches(&raw.county, &raw.state) {
                summary.rows_filtered += 1;
                continue;
            }

            let parsed = parse_date(&raw.date).and_then(|date| Ok((date, parse_count(&raw.cases)?)));
            match parsed {
                Ok((date, cases)) => {
                    if seen.insert(date, cases).is_some() {
                        return Err(PipelineError::DuplicateRecord {
                            date,
                            region: Region::County,
                        });
                    }
                }
                Err(reason) => {
                    summary.record_skip(&PipelineError::malformed(source_name, line, reason));
                }
            }
        }

        debug!(
            source = source_name,
            rows = summary.rows_read,
            kept = seen.len(),
            filtered = summary.rows_filtered,
            skipped = summary.rows_skipped,
            "County file parsed"
        );

        Ok(Self {
            counts: seen.into_iter().collect(),
            summary,
        })
    }

    /// Opens and parses a county file from disk.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_path(path: impl AsRef<Path>, target: &CountyTarget) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let reader = BufReader::new(file);

        if is_gzip(path) {
            Self::read(MultiGzDecoder::new(reader), &source_name, target)
        } else {
            Self::read(reader, &source_name, target)
        }
    }
}

/// Unions per-file rows into one contiguous county series.
///
/// The merge is order-independent; a date present in more than one file is a
/// [`PipelineError::DuplicateRecord`]. With no rows at all the result is
/// [`PipelineError::EmptySource`].
pub fn merge_county(parts: &[CountyRows]) -> Result<DailySeries> {
    let mut merged: BTreeMap<NaiveDate, u32> = BTreeMap::new();

    for part in parts {
        for &(date, cases) in &part.counts {
            if merged.insert(date, cases).is_some() {
                return Err(PipelineError::DuplicateRecord {
                    date,
                    region: Region::County,
                });
            }
        }
    }

    if merged.is_empty() {
        return Err(PipelineError::EmptySource {
            region: Region::County,
        });
    }

    info!(
        files = parts.len(),
        days = merged.len(),
        "County rows merged"
    );

    Ok(DailySeries::from_counts(Region::County, merged, None))
}

/// Copies the header and the `target` rows of a county CSV to `writer`.
///
/// Used to cut the nationwide yearly files down to one county. When
/// `write_header` is false the input header is consumed but not copied, so
/// several years can be appended to one output. Returns the number of rows
/// written.
pub fn filter_county_csv<R: Read, W: Write>(
    reader: R,
    writer: W,
    target: &CountyTarget,
    write_header: bool,
) -> Result<u64> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();

    let county_idx = column_index(&headers, "county")?;
    let state_idx = column_index(&headers, "state")?;

    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    if write_header {
        wtr.write_record(&headers)?;
    }

    let mut written = 0;
    for result in rdr.records() {
        let record = result?;
        let county = record.get(county_idx).unwrap_or_default();
        let state = record.get(state_idx).unwrap_or_default();
        if target.matches(county, state) {
            wtr.write_record(&record)?;
            written += 1;
        }
    }
    wtr.flush().map_err(|e| PipelineError::io("<county output>", e))?;

    Ok(written)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| PipelineError::Config(format!("county CSV has no `{name}` column")))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}
