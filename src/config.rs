//! Analysis configuration.
//!
//! Settings live in a TOML file; every field has a default so an empty file
//! (or no file at all) is a valid configuration:
//!
//! ```toml
//! [filter]
//! warmup_days = 365
//!
//! [labels]
//! flow_ratio_threshold = 0.0
//!
//! [sweep]
//! # either an explicit list ...
//! taus = [5.0, 10.0, 30.0, 60.0]
//! # ... or a linear grid (used when `taus` is absent)
//! tau_start = 5.0
//! tau_stop = 200.0
//! tau_step = 5.0
//!
//! [solver]
//! max_iter = 200
//! tol_grad = 1e-7
//! tol_cost = 1e-12
//! lbfgs_mem = 7
//!
//! [logging]
//! level = "info"
//! file = "lowflow.log"
//! console_timestamps = false
//! ```
//!
//! `AnalysisConfig::from_env` loads `.env` and then reads `LOWFLOW_CONFIG`
//! (path to the TOML file) and `LOWFLOW_LOG_LEVEL` (overrides
//! `[logging] level`).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::analysis::logistic::FitOptions;
use crate::analysis::sweep::linear_grid;
use crate::logging::{self, LogLevel, Stage};
use crate::model::{ConfigError, DEFAULT_FLOW_RATIO_THRESHOLD, WARMUP_DAYS};

pub const CONFIG_PATH_VAR: &str = "LOWFLOW_CONFIG";
pub const LOG_LEVEL_VAR: &str = "LOWFLOW_LOG_LEVEL";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub warmup_days: usize,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self { warmup_days: WARMUP_DAYS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSection {
    pub flow_ratio_threshold: f64,
}

impl Default for LabelSection {
    fn default() -> Self {
        Self { flow_ratio_threshold: DEFAULT_FLOW_RATIO_THRESHOLD }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    pub taus: Option<Vec<f64>>,
    pub tau_start: f64,
    pub tau_stop: f64,
    pub tau_step: f64,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            taus: None,
            tau_start: 5.0,
            tau_stop: 200.0,
            tau_step: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub max_iter: u64,
    pub tol_grad: f64,
    pub tol_cost: f64,
    pub lbfgs_mem: usize,
}

impl Default for SolverSection {
    fn default() -> Self {
        let opts = FitOptions::default();
        Self {
            max_iter: opts.max_iter,
            tol_grad: opts.tol_grad,
            tol_cost: opts.tol_cost,
            lbfgs_mem: opts.lbfgs_mem,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console_timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub filter: FilterSection,
    pub labels: LabelSection,
    pub sweep: SweepSection,
    pub solver: SolverSection,
    pub logging: LoggingSection,
}

impl AnalysisConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Builds the configuration from the environment.
    ///
    /// A `.env` file is loaded first if present. Without `LOWFLOW_CONFIG`
    /// the defaults are used.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                logging::debug(Stage::Config, None, &format!("loading {}", path));
                Self::load(&path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(level) = env::var(LOG_LEVEL_VAR) {
            config.logging.level = level;
            config.validate()?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.warmup_days == 0 {
            return Err(ConfigError::Invalid("filter.warmup_days must be > 0".to_string()));
        }
        if !self.labels.flow_ratio_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "labels.flow_ratio_threshold must be finite".to_string(),
            ));
        }
        self.tau_grid()?;

        let s = &self.solver;
        if s.max_iter == 0 {
            return Err(ConfigError::Invalid("solver.max_iter must be > 0".to_string()));
        }
        if s.lbfgs_mem == 0 {
            return Err(ConfigError::Invalid("solver.lbfgs_mem must be > 0".to_string()));
        }
        for (name, tol) in [("tol_grad", s.tol_grad), ("tol_cost", s.tol_cost)] {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "solver.{} must be finite and > 0, got {}",
                    name, tol
                )));
            }
        }

        self.log_level()?;
        Ok(())
    }

    /// The candidate tau values, from `taus` if given, else the linear grid.
    pub fn tau_grid(&self) -> Result<Vec<f64>, ConfigError> {
        let grid = match &self.sweep.taus {
            Some(taus) => {
                if taus.is_empty() {
                    return Err(ConfigError::Invalid("sweep.taus is empty".to_string()));
                }
                if let Some(bad) = taus.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
                    return Err(ConfigError::Invalid(format!(
                        "sweep.taus must be finite and > 0, got {}",
                        bad
                    )));
                }
                taus.clone()
            }
            None => linear_grid(self.sweep.tau_start, self.sweep.tau_stop, self.sweep.tau_step)
                .map_err(|e| ConfigError::Invalid(format!("sweep grid: {}", e)))?,
        };
        Ok(grid)
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_iter: self.solver.max_iter,
            tol_grad: self.solver.tol_grad,
            tol_cost: self.solver.tol_cost,
            lbfgs_mem: self.solver.lbfgs_mem,
        }
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.logging.level.parse().map_err(ConfigError::Invalid)
    }

    /// Initializes the global logger from the `[logging]` section.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        logging::init_logger(
            self.log_level()?,
            self.logging.file.as_deref(),
            self.logging.console_timestamps,
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.filter.warmup_days, 365);
        assert_eq!(config.labels.flow_ratio_threshold, 0.0);
        assert_eq!(config.fit_options(), FitOptions::default());
    }

    #[test]
    fn test_default_grid_is_linear() {
        let grid = AnalysisConfig::default().tau_grid().unwrap();
        assert_eq!(grid.len(), 40);
        assert_eq!(grid[0], 5.0);
        assert_eq!(grid[39], 200.0);
    }

    #[test]
    fn test_explicit_taus_override_linear_grid() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [sweep]
            taus = [1.0, 7.0, 30.0]
            tau_start = 100.0
            "#,
        )
        .unwrap();
        assert_eq!(config.tau_grid().unwrap(), vec![1.0, 7.0, 30.0]);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [solver]
            max_iter = 50

            [logging]
            level = "debug"
            file = "sweep.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.solver.max_iter, 50);
        assert_eq!(config.solver.lbfgs_mem, 7);
        assert_eq!(config.log_level().unwrap(), LogLevel::Debug);
        assert_eq!(config.logging.file.as_deref(), Some("sweep.log"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for doc in [
            "[filter]\nwarmup_days = 0",
            "[sweep]\ntaus = []",
            "[sweep]\ntaus = [5.0, -1.0]",
            "[sweep]\ntau_step = 0.0",
            "[solver]\nmax_iter = 0",
            "[solver]\ntol_grad = -1.0",
            "[logging]\nlevel = \"chatty\"",
        ] {
            assert!(
                matches!(AnalysisConfig::from_toml_str(doc), Err(ConfigError::Invalid(_))),
                "expected rejection for {:?}",
                doc
            );
        }
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("[filter\nwarmup_days = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            AnalysisConfig::load("/nonexistent/lowflow.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    // Only test touching the process environment; keep both cases in it so
    // parallel tests never race on the variables.
    #[test]
    fn test_log_level_env_var_overrides_config() {
        unsafe {
            env::remove_var(CONFIG_PATH_VAR);
            env::set_var(LOG_LEVEL_VAR, "debug");
        }
        let config = AnalysisConfig::from_env().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.log_level().unwrap(), LogLevel::Debug);
        assert_eq!(config.filter, AnalysisConfig::default().filter);

        unsafe { env::set_var(LOG_LEVEL_VAR, "chatty") };
        let rejected = AnalysisConfig::from_env();
        unsafe { env::remove_var(LOG_LEVEL_VAR) };
        assert!(matches!(rejected, Err(ConfigError::Invalid(_))));
    }
}
