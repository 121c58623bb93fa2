//! Exclusion predicates applied to local-log entries before counting.
//!
//! The rules for which local cases count have changed over time, so the
//! reader takes an [`ExclusionPolicy`] instead of hard-coding one.

use chrono::Duration;

use crate::sources::local::{CampusPresence, LocalEntry};

/// Decides whether a local-log entry is left out of every count and sum.
pub trait ExclusionPolicy: Send + Sync {
    fn excludes(&self, entry: &LocalEntry) -> bool;

    /// Short human-readable form used in logs and the run summary.
    fn describe(&self) -> String;
}

/// Excludes people who were never on campus, or whose last campus visit is
/// more than `window_days` before the entry date.
///
/// Entries with no presence information are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotRecentlyOnCampus {
    window: Duration,
}

impl NotRecentlyOnCampus {
    /// Windows too large to represent behave as unbounded.
    pub fn new(window_days: i64) -> Self {
        Self {
            window: Duration::try_days(window_days).unwrap_or(Duration::MAX),
        }
    }
}

impl ExclusionPolicy for NotRecentlyOnCampus {
    fn excludes(&self, entry: &LocalEntry) -> bool {
        match entry.last_on_campus {
            CampusPresence::Unknown => false,
            CampusPresence::Never => true,
            CampusPresence::On(last) => entry.date - last > self.window,
        }
    }

    fn describe(&self) -> String {
        format!(
            "not on campus within the trailing {} days",
            self.window.num_days()
        )
    }
}

/// Keeps every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusion;

impl ExclusionPolicy for NoExclusion {
    fn excludes(&self, _entry: &LocalEntry) -> bool {
        false
    }

    fn describe(&self) -> String {
        "no exclusion".to_string()
    }
}
