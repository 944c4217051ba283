//! Structured logging for the deficit analysis pipeline.
//!
//! Messages carry the pipeline stage and, where relevant, the tau value they
//! refer to. Output goes to the console and optionally to an append-only log
//! file. Nothing is emitted until `init_logger` has been called.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::FitError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Fit,
    Sweep,
    Config,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Filter => write!(f, "FILTER"),
            Stage::Fit => write!(f, "FIT"),
            Stage::Sweep => write!(f, "SWEEP"),
            Stage::Config => write!(f, "CONFIG"),
            Stage::Report => write!(f, "REPORT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// The data has no finite MLE at this tau (one class, separation,
    /// constant predictor). Part of the result, not a malfunction.
    Expected,
    /// The solver failed or ran out of iterations.
    Unexpected,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        // A poisoned lock only means another thread panicked mid-log; the
        // slot itself is still usable.
        let mut slot = LOGGER.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(logger);
    }

    fn log(&self, level: LogLevel, stage: Stage, tau: Option<f64>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let tau_part = tau.map(|t| format!(" [tau={}]", t)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, stage, tau_part, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, tau_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, tau_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {}
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, stage: Stage, tau: Option<f64>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, stage, tau, message);
        }
    }
}

pub fn info(stage: Stage, tau: Option<f64>, message: &str) {
    emit(LogLevel::Info, stage, tau, message);
}

pub fn warn(stage: Stage, tau: Option<f64>, message: &str) {
    emit(LogLevel::Warning, stage, tau, message);
}

pub fn error(stage: Stage, tau: Option<f64>, message: &str) {
    emit(LogLevel::Error, stage, tau, message);
}

pub fn debug(stage: Stage, tau: Option<f64>, message: &str) {
    emit(LogLevel::Debug, stage, tau, message);
}

// ---------------------------------------------------------------------------
// Fit Failure Logging
// ---------------------------------------------------------------------------

pub fn classify_fit_failure(err: &FitError) -> FailureType {
    match err {
        FitError::SingleClass { .. } | FitError::Separation | FitError::ConstantPredictor => {
            FailureType::Expected
        }
        FitError::NotConverged { .. } | FitError::Solver(_) => FailureType::Unexpected,
    }
}

/// Log a failed fit for one tau, warning for data-shape failures and
/// erroring for solver failures.
pub fn log_fit_failure(tau: f64, err: &FitError) {
    let failure_type = classify_fit_failure(err);
    let message = format!("fit failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Expected => warn(Stage::Fit, Some(tau), &message),
        FailureType::Unexpected => error(Stage::Fit, Some(tau), &message),
    }
}

// ---------------------------------------------------------------------------
// Sweep Summary Logging
// ---------------------------------------------------------------------------

pub fn log_sweep_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Sweep complete: {}/{} taus fitted, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(Stage::Sweep, None, &message);
    } else if successful == 0 {
        error(Stage::Sweep, None, &message);
    } else {
        warn(Stage::Sweep, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("Warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_fit_failure(&FitError::Separation), FailureType::Expected);
        assert_eq!(
            classify_fit_failure(&FitError::SingleClass { positives: 0, n: 10 }),
            FailureType::Expected
        );
        assert_eq!(
            classify_fit_failure(&FitError::NotConverged { iterations: 200 }),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_fit_failure(&FitError::Solver("line search".to_string())),
            FailureType::Unexpected
        );
    }

    #[test]
    fn test_file_logging_appends_entries() {
        let path = std::env::temp_dir().join(format!("lowflow_log_{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let logger = Logger {
            min_level: LogLevel::Info,
            log_file: Some(path.to_string_lossy().into_owned()),
            console_timestamps: false,
        };
        logger.log(LogLevel::Debug, Stage::Fit, Some(5.0), "filtered out");
        logger.log(LogLevel::Warning, Stage::Fit, Some(5.0), "fit failed");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("WARN FIT [tau=5]: fit failed"));
        let _ = std::fs::remove_file(&path);
    }
}
