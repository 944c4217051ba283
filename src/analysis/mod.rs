//! Numerical core of the deficit analysis.
//!
//! Submodules:
//! - `filter` — causal exponential low-pass filter with warm-up.
//! - `logistic` — single-predictor logistic fit and deviance residuals.
//! - `sweep` — per-tau fit-quality sweep.
//!
//! The functions here connect those pieces to a validated `DailySeries`.

pub mod filter;
pub mod logistic;
pub mod sweep;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, InputError, LabeledDay};
use crate::series::DailySeries;
use sweep::SweepResult;

/// A smoothed deficit series, aligned with the dates of its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothedSeries {
    pub tau: f64,
    pub warmup_days: usize,
    pub points: Vec<(NaiveDate, f64)>,
}

impl SmoothedSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }
}

/// Warm-up filters the deficit column of `series`.
pub fn smooth_deficit(
    series: &DailySeries,
    tau: f64,
    warmup_days: usize,
) -> Result<SmoothedSeries, InputError> {
    let smoothed = filter::low_pass_warmed(&series.deficits(), tau, warmup_days)?;
    logging::debug(
        Stage::Filter,
        Some(tau),
        &format!("smoothed {} days with {}-day warm-up", smoothed.len(), warmup_days),
    );

    Ok(SmoothedSeries {
        tau,
        warmup_days,
        points: series.dates().into_iter().zip(smoothed).collect(),
    })
}

/// Joins each day's deficit, extreme-flow label and smoothed deficit.
pub fn label_days(
    series: &DailySeries,
    tau: f64,
    warmup_days: usize,
    flow_ratio_threshold: f64,
) -> Result<Vec<LabeledDay>, InputError> {
    let smoothed = filter::low_pass_warmed(&series.deficits(), tau, warmup_days)?;
    Ok(series
        .records()
        .iter()
        .zip(smoothed)
        .map(|(r, predictor)| LabeledDay {
            date: r.date,
            deficit: r.deficit,
            label: crate::series::is_low_flow_extreme(r.flow_ratio, flow_ratio_threshold),
            predictor,
        })
        .collect())
}

/// Runs the configured tau sweep over `series`.
pub fn run_sweep(series: &DailySeries, config: &AnalysisConfig) -> Result<SweepResult, AnalysisError> {
    let taus = config.tau_grid()?;
    let labels = series.extreme_labels(config.labels.flow_ratio_threshold);
    let positives = labels.iter().filter(|&&l| l).count();

    let (first, last) = series.date_range();
    logging::info(
        Stage::Sweep,
        None,
        &format!(
            "{} days ({} to {}), {} extreme, {} taus",
            series.len(),
            first,
            last,
            positives,
            taus.len()
        ),
    );

    let result = sweep::sweep(
        &series.deficits(),
        &labels,
        &taus,
        config.filter.warmup_days,
        config.fit_options(),
    )?;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DailyRecord;
    use chrono::Duration;

    fn series(days: usize) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let records = (0..days)
            .map(|d| DailyRecord {
                date: start + Duration::days(d as i64),
                deficit: (d % 10) as f64,
                flow_ratio: if d % 10 == 9 { -0.5 } else { 0.5 },
            })
            .collect();
        DailySeries::new(records).unwrap()
    }

    #[test]
    fn test_smoothed_points_keep_source_dates() {
        let s = series(400);
        let smoothed = smooth_deficit(&s, 3.0, 365).unwrap();
        assert_eq!(smoothed.points.len(), 400);
        assert_eq!(smoothed.points[0].0, s.records()[0].date);
        assert_eq!(smoothed.points[399].0, s.records()[399].date);
    }

    #[test]
    fn test_label_days_joins_columns() {
        let s = series(400);
        let days = label_days(&s, 1.0, 365, 0.0).unwrap();
        assert_eq!(days.len(), 400);
        assert!(days[9].label);
        assert!(!days[8].label);
        // tau = 1 leaves the deficit untouched
        assert!(days.iter().all(|d| d.predictor == d.deficit));
    }

    #[test]
    fn test_short_series_is_invalid_input() {
        let s = series(100);
        assert_eq!(
            smooth_deficit(&s, 3.0, 365),
            Err(InputError::TooShort { len: 100, required: 365 })
        );
    }

    #[test]
    fn test_run_sweep_uses_configured_grid() {
        let s = series(400);
        let config = AnalysisConfig::from_toml_str("[sweep]\ntaus = [1.0, 4.0]").unwrap();
        let result = run_sweep(&s, &config).unwrap();
        assert_eq!(result.len(), 2);
        // Raw deficit 9 is always the extreme day, so tau = 1 separates.
        assert!(result.entries[0].outcome.is_err());
    }
}
