//! Normalized per-date, per-region case records.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which case series a record belongs to.
///
/// Ordering matters: `Local` sorts first and is the primary series that
/// every other series is scaled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Local,
    County,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Local, Region::County];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Local => "local",
            Region::County => "county",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First day of the calendar week used for weekly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// ISO 8601 weeks.
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// Returns the first day of the week containing `date`.
    pub fn week_of(&self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Monday => date.weekday().num_days_from_monday(),
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        };
        date - Duration::days(offset as i64)
    }
}

/// One day's new cases for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub date: NaiveDate,
    pub region: Region,
    pub new_cases: u32,
}

/// Contiguous, ascending run of daily records for a single region.
///
/// Only [`DailySeries::from_counts`] builds one, which is what guarantees
/// there are no gaps and no duplicate dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySeries {
    region: Region,
    records: Vec<CaseRecord>,
}

impl DailySeries {
    /// Builds a gap-free series from sparse `(date, count)` pairs.
    ///
    /// `counts` must be sorted by date with unique keys (a `BTreeMap`
    /// iterator satisfies both). Days between the first and last date with no
    /// entry get a zero count. When `fill_from` is earlier than the first
    /// observed date the series is zero-filled back to it.
    pub fn from_counts<I>(region: Region, counts: I, fill_from: Option<NaiveDate>) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, u32)>,
    {
        let mut records: Vec<CaseRecord> = Vec::new();

        for (date, new_cases) in counts {
            let mut next = match records.last() {
                Some(last) => last.date + Duration::days(1),
                None => match fill_from {
                    Some(start) if start < date => start,
                    _ => date,
                },
            };

            while next < date {
                records.push(CaseRecord {
                    date: next,
                    region,
                    new_cases: 0,
                });
                next += Duration::days(1);
            }

            records.push(CaseRecord {
                date,
                region,
                new_cases,
            });
        }

        Self { region, records }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_from_counts_fills_gaps_with_zero() {
        let series = DailySeries::from_counts(
            Region::Local,
            vec![(d(2021, 1, 1), 2), (d(2021, 1, 4), 5)],
            None,
        );

        let counts: Vec<u32> = series.records().iter().map(|r| r.new_cases).collect();
        assert_eq!(counts, vec![2, 0, 0, 5]);
        assert_eq!(series.first_date(), Some(d(2021, 1, 1)));
        assert_eq!(series.last_date(), Some(d(2021, 1, 4)));
    }

    #[test]
    fn test_from_counts_fills_back_to_history_start() {
        let series =
            DailySeries::from_counts(Region::Local, vec![(d(2020, 3, 10), 1)], Some(d(2020, 3, 8)));

        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), Some(d(2020, 3, 8)));
        assert_eq!(series.records()[2].new_cases, 1);
    }

    #[test]
    fn test_history_start_after_first_date_is_ignored() {
        let series =
            DailySeries::from_counts(Region::County, vec![(d(2020, 3, 10), 1)], Some(d(2020, 4, 1)));

        assert_eq!(series.len(), 1);
        assert_eq!(series.first_date(), Some(d(2020, 3, 10)));
    }

    #[test]
    fn test_empty_counts_give_empty_series() {
        let empty = Vec::<(NaiveDate, u32)>::new();
        let series = DailySeries::from_counts(Region::County, empty, Some(d(2020, 3, 8)));
        assert!(series.is_empty());
        assert_eq!(series.last_date(), None);
    }

    #[test]
    fn test_week_of_monday_and_sunday() {
        // 2021-08-04 is a Wednesday
        let wed = d(2021, 8, 4);
        assert_eq!(WeekStart::Monday.week_of(wed), d(2021, 8, 2));
        assert_eq!(WeekStart::Sunday.week_of(wed), d(2021, 8, 1));

        let sun = d(2021, 8, 8);
        assert_eq!(WeekStart::Monday.week_of(sun), d(2021, 8, 2));
        assert_eq!(WeekStart::Sunday.week_of(sun), sun);
    }
}
