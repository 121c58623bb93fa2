//! Reader for the hand-maintained local case log.
//!
//! Expected columns (header row required, column order free):
//!
//! | column           | required | meaning                                         |
//! |------------------|----------|-------------------------------------------------|
//! | `date`           | yes      | date the case was posted, `YYYY-MM-DD`          |
//! | `cases`/`case`   | no       | number of cases in this row, defaults to 1      |
//! | `affiliation`    | no       | free-text affiliation (students, staff, ...)    |
//! | `last_on_campus` | no       | empty, `never`, or the last campus visit date   |

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::records::{DailySeries, Region, WeekStart};
use crate::sources::exclusion::ExclusionPolicy;
use crate::sources::{ReadSummary, parse_count, parse_date};

pub const UNSPECIFIED_AFFILIATION: &str = "unspecified";

/// What the log says about the person's recent campus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampusPresence {
    Unknown,
    Never,
    On(NaiveDate),
}

/// One parsed row of the local log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub date: NaiveDate,
    pub cases: u32,
    pub affiliation: Option<String>,
    pub last_on_campus: CampusPresence,
}

#[derive(Debug, Deserialize)]
struct RawLocalRow {
    date: String,
    #[serde(default, alias = "case")]
    cases: Option<String>,
    #[serde(default)]
    affiliation: Option<String>,
    #[serde(default)]
    last_on_campus: Option<String>,
}

/// Parsed local log, before any exclusion policy is applied.
#[derive(Debug, Clone)]
pub struct LocalLog {
    pub entries: Vec<LocalEntry>,
    pub summary: ReadSummary,
}

impl LocalLog {
    /// Parses a local log, skipping and counting rows that cannot be read.
    pub fn read<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut summary = ReadSummary::new(source_name);
        let mut entries = Vec::new();

        for result in rdr.records() {
            summary.rows_read += 1;

            let parsed = result
                .map_err(|e| PipelineError::malformed(source_name, summary.rows_read + 1, e.to_string()))
                .and_then(|record| {
                    let line = record
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(summary.rows_read + 1);
                    let raw: RawLocalRow = record
                        .deserialize(Some(&headers))
                        .map_err(|e| PipelineError::malformed(source_name, line, e.to_string()))?;
                    parse_entry(raw)
                        .map_err(|reason| PipelineError::malformed(source_name, line, reason))
                });

            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => summary.record_skip(&e),
            }
        }

        debug!(
            source = source_name,
            rows = summary.rows_read,
            skipped = summary.rows_skipped,
            "Local log parsed"
        );

        Ok(Self { entries, summary })
    }

    /// Drops every entry the policy excludes and counts them in the summary.
    pub fn apply_exclusion(&mut self, policy: &dyn ExclusionPolicy) {
        let before = self.entries.len();
        self.entries.retain(|entry| !policy.excludes(entry));
        self.summary.rows_excluded += (before - self.entries.len()) as u64;
    }

    /// Sums entries per date into a contiguous local series.
    ///
    /// Fails with [`PipelineError::EmptySource`] when no entries are left, and
    /// with [`PipelineError::CountOverflow`] when a day's total exceeds `u32`.
    pub fn to_series(&self, fill_from: Option<NaiveDate>) -> Result<DailySeries> {
        if self.entries.is_empty() {
            return Err(PipelineError::EmptySource {
                region: Region::Local,
            });
        }

        let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for entry in &self.entries {
            let total = per_day.entry(entry.date).or_default();
            *total = total
                .checked_add(entry.cases)
                .ok_or(PipelineError::CountOverflow {
                    date: entry.date,
                    region: Region::Local,
                })?;
        }

        Ok(DailySeries::from_counts(Region::Local, per_day, fill_from))
    }

    /// Weekly case totals per affiliation, ordered by week then affiliation.
    pub fn weekly_by_affiliation(&self, week_start: WeekStart) -> Vec<AffiliationWeek> {
        let mut totals: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();

        for entry in &self.entries {
            let affiliation = entry
                .affiliation
                .clone()
                .unwrap_or_else(|| UNSPECIFIED_AFFILIATION.to_string());
            *totals
                .entry((week_start.week_of(entry.date), affiliation))
                .or_default() += entry.cases as u64;
        }

        totals
            .into_iter()
            .map(|((week_start, affiliation), total_cases)| AffiliationWeek {
                week_start,
                affiliation,
                total_cases,
            })
            .collect()
    }
}

/// Weekly local total for one affiliation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AffiliationWeek {
    pub week_start: NaiveDate,
    pub affiliation: String,
    pub total_cases: u64,
}

fn parse_entry(raw: RawLocalRow) -> std::result::Result<LocalEntry, String> {
    let date = parse_date(&raw.date)?;

    let cases = match non_empty(raw.cases) {
        Some(value) => parse_count(&value)?,
        None => 1,
    };

    let last_on_campus = match non_empty(raw.last_on_campus) {
        None => CampusPresence::Unknown,
        Some(value) if value.eq_ignore_ascii_case("never") => CampusPresence::Never,
        Some(value) => CampusPresence::On(
            parse_date(&value).map_err(|e| format!("last_on_campus: {e}"))?,
        ),
    };

    Ok(LocalEntry {
        date,
        cases,
        affiliation: non_empty(raw.affiliation),
        last_on_campus,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
