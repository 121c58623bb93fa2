//! Case-count aggregation and chart view derivation.
//!
//! This module turns normalized daily series into per-date aggregates
//! (daily count, 7-day trailing average, weekly total), cuts them into the
//! whole-history weekly view and the recent daily view, and computes the
//! multipliers that let both regions be overlaid at comparable height.

pub mod aggregate;
pub mod analyzer;
pub mod scale;
pub mod types;
pub mod utility;
pub mod views;
