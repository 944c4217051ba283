//! Sweep report artifacts.
//!
//! Serializes the tau -> RMSE mapping (and the configuration that produced
//! it) to JSON for plotting. Failed taus stay in the report with their error
//! message so the curve shows where fits were impossible.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::SmoothedSeries;
use crate::analysis::sweep::SweepResult;
use crate::config::AnalysisConfig;
use crate::logging::{self, Stage};
use crate::model::AnalysisError;

// ---------------------------------------------------------------------------
// Report Structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub timestamp: String,
    pub config: AnalysisConfig,
    pub entries: Vec<TauEntry>,
    pub summary: SweepSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TauEntry {
    pub tau: f64,
    pub rmse: Option<f64>,
    pub intercept: Option<f64>,
    pub slope: Option<f64>,
    pub iterations: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub total: usize,
    pub fitted: usize,
    pub failed: usize,
    pub observations: usize,
    pub positives: usize,
}

impl SweepReport {
    pub fn new(result: &SweepResult, config: &AnalysisConfig) -> Self {
        let entries: Vec<TauEntry> = result
            .entries
            .iter()
            .map(|e| match &e.outcome {
                Ok(s) => TauEntry {
                    tau: e.tau,
                    rmse: Some(s.rmse),
                    intercept: Some(s.fit.intercept),
                    slope: Some(s.fit.slope),
                    iterations: Some(s.fit.iterations),
                    error: None,
                },
                Err(err) => TauEntry {
                    tau: e.tau,
                    rmse: None,
                    intercept: None,
                    slope: None,
                    iterations: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();

        let fitted = entries.iter().filter(|e| e.rmse.is_some()).count();
        let (observations, positives) = result
            .entries
            .iter()
            .find_map(|e| e.outcome.as_ref().ok())
            .map(|s| (s.fit.n, s.fit.positives))
            .unwrap_or((0, 0));

        Self {
            timestamp: Utc::now().to_rfc3339(),
            config: config.clone(),
            summary: SweepSummary {
                total: entries.len(),
                fitted,
                failed: entries.len() - fitted,
                observations,
                positives,
            },
            entries,
        }
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        serde_json::to_string_pretty(self).map_err(|e| AnalysisError::Report(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AnalysisError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .map_err(|e| AnalysisError::Report(format!("{}: {}", path.display(), e)))?;
        logging::info(
            Stage::Report,
            None,
            &format!("wrote {} tau entries to {}", self.entries.len(), path.display()),
        );
        Ok(())
    }
}

/// Writes a smoothed series as pretty JSON.
pub fn save_smoothed(series: &SmoothedSeries, path: impl AsRef<Path>) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    let json =
        serde_json::to_string_pretty(series).map_err(|e| AnalysisError::Report(e.to_string()))?;
    std::fs::write(path, json)
        .map_err(|e| AnalysisError::Report(format!("{}: {}", path.display(), e)))?;
    logging::info(
        Stage::Report,
        Some(series.tau),
        &format!("wrote {} smoothed days to {}", series.points.len(), path.display()),
    );
    Ok(())
}

pub fn print_summary(report: &SweepReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("TAU SWEEP SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!(
        "Observations: {} ({} extreme days)",
        report.summary.observations, report.summary.positives
    );
    println!(
        "Taus: {}/{} fitted ({} failed)",
        report.summary.fitted, report.summary.total, report.summary.failed
    );
    println!();
    for entry in &report.entries {
        match (entry.rmse, &entry.error) {
            (Some(rmse), _) => println!("  tau {:>8.2}  rmse {:.6}", entry.tau, rmse),
            (None, Some(err)) => println!("  tau {:>8.2}  ✗ {}", entry.tau, err),
            (None, None) => println!("  tau {:>8.2}  -", entry.tau),
        }
    }
    println!("═══════════════════════════════════════════════════════════");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
