//! Low-flow deficit analysis for daily catchment records.
//!
//! Smooths a cumulative water deficit series with a causal exponential filter
//! and scans the filter time constant for how well the smoothed deficit
//! explains low-flow extreme days under a logistic model.
//!
//! Modules:
//! - `model` — record types and error taxonomy.
//! - `series` — date-contiguous daily series and label derivation.
//! - `analysis` — low-pass filter, logistic fit and tau sweep.
//! - `config` — TOML/environment configuration.
//! - `report` — JSON artifacts for plotting.
//! - `logging` — stage-tagged console/file logging.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod model;
pub mod report;
pub mod series;
