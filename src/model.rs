//! Core data types for the low-flow deficit analysis.
//!
//! This module defines the shared domain model imported by all other modules:
//! the daily record read from a catchment dataset, the per-day labeled record
//! the logistic fit consumes, and the error taxonomy. It contains no numerical
//! logic and no I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of leading days replayed in front of a series to warm up the
/// low-pass filter before the values of interest.
pub const WARMUP_DAYS: usize = 365;

/// A day is a low-flow extreme when its flow ratio drops below this value.
pub const DEFAULT_FLOW_RATIO_THRESHOLD: f64 = 0.0;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One row of a catchment water-balance dataset.
///
/// `deficit` is the per-day cumulative water deficit produced by the external
/// CWD calculator; `flow_ratio` is the streamflow anomaly ratio used to derive
/// the extreme-flow label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub deficit: f64,
    pub flow_ratio: f64,
}

/// A day prepared for the logistic fit: the raw deficit, the binary
/// extreme-flow label, and the smoothed deficit used as predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledDay {
    pub date: NaiveDate,
    pub deficit: f64,
    pub label: bool,
    pub predictor: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Input problems that make the whole computation meaningless.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// No values were supplied.
    EmptySeries,
    /// The series is shorter than the filter warm-up window.
    TooShort { len: usize, required: usize },
    /// Smoothing time constant must be finite and strictly positive.
    NonPositiveTau(f64),
    /// A value in the series is NaN or infinite.
    NonFiniteValue { index: usize, value: f64 },
    /// Label and predictor series do not line up day for day.
    LengthMismatch { deficit: usize, labels: usize },
    /// Consecutive records are not one calendar day apart.
    DateGap { index: usize, previous: NaiveDate, found: NaiveDate },
    /// The tau grid contains no values.
    EmptyTauGrid,
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::EmptySeries => write!(f, "Invalid input: series is empty"),
            InputError::TooShort { len, required } => write!(
                f,
                "Invalid input: series has {} values, warm-up needs at least {}",
                len, required
            ),
            InputError::NonPositiveTau(tau) => {
                write!(f, "Invalid input: tau must be finite and > 0, got {}", tau)
            }
            InputError::NonFiniteValue { index, value } => {
                write!(f, "Invalid input: non-finite value {} at index {}", value, index)
            }
            InputError::LengthMismatch { deficit, labels } => write!(
                f,
                "Invalid input: deficit has {} values but labels has {}",
                deficit, labels
            ),
            InputError::DateGap { index, previous, found } => write!(
                f,
                "Invalid input: record {} dated {} does not follow {}",
                index, found, previous
            ),
            InputError::EmptyTauGrid => write!(f, "Invalid input: tau grid is empty"),
        }
    }
}

impl std::error::Error for InputError {}

/// Failures of the logistic fit for a single tau value.
///
/// These are local to one point of a sweep and never abort the rest of it.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Every label has the same value; the maximum-likelihood estimate sits
    /// at infinity.
    SingleClass { positives: usize, n: usize },
    /// The predictor completely or quasi-completely separates the classes.
    Separation,
    /// The predictor has zero variance, so the slope is not identifiable.
    ConstantPredictor,
    /// The solver hit its iteration cap before meeting its tolerances.
    NotConverged { iterations: u64 },
    /// The solver itself failed or produced non-finite parameters.
    Solver(String),
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::SingleClass { positives, n } => write!(
                f,
                "Fit error: labels contain a single class ({} of {} positive)",
                positives, n
            ),
            FitError::Separation => write!(f, "Fit error: predictor separates the labels"),
            FitError::ConstantPredictor => write!(f, "Fit error: predictor is constant"),
            FitError::NotConverged { iterations } => {
                write!(f, "Fit error: not converged after {} iterations", iterations)
            }
            FitError::Solver(msg) => write!(f, "Fit error: solver failed: {}", msg),
        }
    }
}

impl std::error::Error for FitError {}

/// Problems reading or validating the analysis configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config error: {}", e),
            ConfigError::Parse(e) => write!(f, "Config parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Umbrella error for pipeline entry points.
///
/// Fit failures are not part of it: they stay local to their tau inside
/// a sweep entry.
#[derive(Debug)]
pub enum AnalysisError {
    InvalidInput(InputError),
    Config(ConfigError),
    Report(String),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::InvalidInput(e) => write!(f, "{}", e),
            AnalysisError::Config(e) => write!(f, "{}", e),
            AnalysisError::Report(msg) => write!(f, "Report error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<InputError> for AnalysisError {
    fn from(e: InputError) -> Self {
        AnalysisError::InvalidInput(e)
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(e: ConfigError) -> Self {
        AnalysisError::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
