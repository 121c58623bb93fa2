//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every field is optional and falls back to
//! the defaults below:
//! ```json
//! {
//!   "exclusion": { "policy": "not_recently_on_campus", "window_days": 30 },
//!   "week_start": "monday",
//!   "daily_window_days": 90,
//!   "history_start": "2020-03-08",
//!   "county": { "county": "Los Angeles", "state": "California" }
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::records::WeekStart;
use crate::sources::exclusion::{ExclusionPolicy, NoExclusion, NotRecentlyOnCampus};

pub const DEFAULT_EXCLUSION_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_DAILY_WINDOW_DAYS: i64 = 90;
/// Upper bound for any configured window, in days (about 270 years).
pub const MAX_WINDOW_DAYS: i64 = 100_000;
pub const DEFAULT_COUNTY_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/rolling-averages/us-counties-{year}.csv";

/// Which local-log entries are dropped before counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ExclusionConfig {
    /// Drop entries whose person has not been on campus within `window_days`
    /// of the entry date, or never was.
    NotRecentlyOnCampus {
        #[serde(default = "default_exclusion_window")]
        window_days: i64,
    },
    /// Count every entry.
    None,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        ExclusionConfig::NotRecentlyOnCampus {
            window_days: DEFAULT_EXCLUSION_WINDOW_DAYS,
        }
    }
}

impl ExclusionConfig {
    pub fn build(&self) -> Box<dyn ExclusionPolicy> {
        match self {
            ExclusionConfig::NotRecentlyOnCampus { window_days } => {
                Box::new(NotRecentlyOnCampus::new(*window_days))
            }
            ExclusionConfig::None => Box::new(NoExclusion),
        }
    }
}

/// Selects the reference county out of a multi-county CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyTarget {
    pub county: String,
    pub state: String,
}

impl Default for CountyTarget {
    fn default() -> Self {
        Self {
            county: "Los Angeles".to_string(),
            state: "California".to_string(),
        }
    }
}

impl CountyTarget {
    pub fn matches(&self, county: &str, state: &str) -> bool {
        self.county.eq_ignore_ascii_case(county.trim()) && self.state.eq_ignore_ascii_case(state.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub exclusion: ExclusionConfig,
    pub week_start: WeekStart,
    pub daily_window_days: i64,
    /// Zero-fill the local series back to this date when it starts later.
    pub history_start: Option<NaiveDate>,
    pub county: CountyTarget,
    pub county_url_template: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            exclusion: ExclusionConfig::default(),
            week_start: WeekStart::default(),
            daily_window_days: DEFAULT_DAILY_WINDOW_DAYS,
            history_start: None,
            county: CountyTarget::default(),
            county_url_template: DEFAULT_COUNTY_URL_TEMPLATE.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.daily_window_days) {
            return Err(PipelineError::Config(format!(
                "daily_window_days must be between 1 and {MAX_WINDOW_DAYS}, got {}",
                self.daily_window_days
            )));
        }

        if let ExclusionConfig::NotRecentlyOnCampus { window_days } = self.exclusion {
            if !(0..=MAX_WINDOW_DAYS).contains(&window_days) {
                return Err(PipelineError::Config(format!(
                    "exclusion window_days must be between 0 and {MAX_WINDOW_DAYS}, got {window_days}"
                )));
            }
        }

        if !self.county_url_template.contains("{year}") {
            return Err(PipelineError::Config(
                "county_url_template must contain a {year} placeholder".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_exclusion_window() -> i64 {
    DEFAULT_EXCLUSION_WINDOW_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.daily_window_days, 90);
        assert_eq!(config.week_start, WeekStart::Monday);
        assert_eq!(
            config.exclusion,
            ExclusionConfig::NotRecentlyOnCampus { window_days: 30 }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "week_start": "sunday", "exclusion": { "policy": "not_recently_on_campus" } }"#,
        )
        .unwrap();

        assert_eq!(config.week_start, WeekStart::Sunday);
        assert_eq!(
            config.exclusion,
            ExclusionConfig::NotRecentlyOnCampus { window_days: 30 }
        );
        assert_eq!(config.daily_window_days, 90);
        assert_eq!(config.county, CountyTarget::default());
    }

    #[test]
    fn test_exclusion_none_policy() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "exclusion": { "policy": "none" } }"#).unwrap();
        assert_eq!(config.exclusion, ExclusionConfig::None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "daily_window_days": 28, "history_start": "2020-03-08" }}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.daily_window_days, 28);
        assert_eq!(config.history_start, NaiveDate::from_ymd_opt(2020, 3, 8));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = PipelineConfig {
            daily_window_days: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_windows() {
        let daily = PipelineConfig {
            daily_window_days: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(daily.validate(), Err(PipelineError::Config(_))));

        let exclusion = PipelineConfig {
            exclusion: ExclusionConfig::NotRecentlyOnCampus {
                window_days: i64::MAX,
            },
            ..Default::default()
        };
        assert!(matches!(exclusion.validate(), Err(PipelineError::Config(_))));

        let widest = PipelineConfig {
            daily_window_days: MAX_WINDOW_DAYS,
            exclusion: ExclusionConfig::NotRecentlyOnCampus {
                window_days: MAX_WINDOW_DAYS,
            },
            ..Default::default()
        };
        assert!(widest.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_template_without_year() {
        let config = PipelineConfig {
            county_url_template: "https://example.com/counties.csv".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_county_target_matching_is_case_insensitive() {
        let target = CountyTarget::default();
        assert!(target.matches("los angeles", "CALIFORNIA"));
        assert!(!target.matches("Orange", "California"));
    }
}
