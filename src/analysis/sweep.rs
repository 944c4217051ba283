//! Fit-quality sweep over the smoothing time constant.
//!
//! For each candidate `tau` the deficit series is warmed-up and low-pass
//! filtered, a logistic model of the extreme-flow label on the smoothed
//! deficit is fitted, and the RMSE of its deviance residuals is recorded.
//!
//! Every tau is evaluated independently. A fit failure is kept as that tau's
//! entry and the sweep moves on; only invalid input stops it, and that is
//! checked once up front in `TauSweep::new`.
//!
//! The result is the raw tau -> RMSE mapping. Picking a tau from it is left
//! to whoever reads the curve.

use serde::Serialize;

use crate::analysis::filter::{check_tau, check_warmup_len, warmed};
use crate::analysis::logistic::{FitOptions, LogisticFit, check_inputs, fit_checked, rmse};
use crate::logging::{self, Stage};
use crate::model::{FitError, InputError};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Fit statistics for one successful tau.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    /// Root mean square of the deviance residuals.
    pub rmse: f64,
    pub fit: LogisticFit,
}

/// Outcome for a single tau of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub tau: f64,
    pub outcome: Result<FitSummary, FitError>,
}

impl SweepEntry {
    pub fn rmse(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|s| s.rmse)
    }
}

/// All entries of a completed sweep, in grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub entries: Vec<SweepEntry>,
}

impl SweepResult {
    /// `(tau, rmse)` for every tau whose fit succeeded, in grid order.
    pub fn valid(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().filter_map(|e| e.rmse().map(|r| (e.tau, r)))
    }

    /// `(tau, error)` for every tau whose fit failed.
    pub fn failures(&self) -> impl Iterator<Item = (f64, &FitError)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().err().map(|err| (e.tau, err)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Lazy sweep
// ---------------------------------------------------------------------------

/// Iterator that evaluates one tau per call to `next`.
///
/// Dropping it between calls stops the sweep; no state outlives it.
pub struct TauSweep<'a> {
    deficit: &'a [f64],
    labels: &'a [bool],
    taus: std::slice::Iter<'a, f64>,
    warmup: usize,
    opts: FitOptions,
}

impl<'a> TauSweep<'a> {
    /// Validates the inputs for the whole grid.
    ///
    /// Fails when the series are misaligned or empty, the grid is empty or
    /// holds a non-positive tau, or the deficit is shorter than `warmup`.
    pub fn new(
        deficit: &'a [f64],
        labels: &'a [bool],
        taus: &'a [f64],
        warmup: usize,
        opts: FitOptions,
    ) -> Result<Self, InputError> {
        check_inputs(deficit, labels)?;
        if taus.is_empty() {
            return Err(InputError::EmptyTauGrid);
        }
        for &tau in taus {
            check_tau(tau)?;
        }
        check_warmup_len(deficit.len(), warmup)?;

        Ok(Self {
            deficit,
            labels,
            taus: taus.iter(),
            warmup,
            opts,
        })
    }

    fn evaluate(&self, tau: f64) -> Result<FitSummary, FitError> {
        let smoothed = warmed(self.deficit, tau, self.warmup);
        let fit = fit_checked(&smoothed, self.labels, &self.opts)?;
        let rmse = rmse(&fit.deviance_residuals(self.labels));
        Ok(FitSummary { rmse, fit })
    }
}

impl Iterator for TauSweep<'_> {
    type Item = SweepEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let tau = *self.taus.next()?;
        let outcome = self.evaluate(tau);

        match &outcome {
            Ok(summary) => logging::debug(
                Stage::Sweep,
                Some(tau),
                &format!(
                    "rmse {:.6} after {} iterations",
                    summary.rmse, summary.fit.iterations
                ),
            ),
            Err(err) => logging::log_fit_failure(tau, err),
        }

        Some(SweepEntry { tau, outcome })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.taus.size_hint()
    }
}

/// Runs the full sweep and collects every entry.
pub fn sweep(
    deficit: &[f64],
    labels: &[bool],
    taus: &[f64],
    warmup: usize,
    opts: FitOptions,
) -> Result<SweepResult, InputError> {
    let entries: Vec<SweepEntry> = TauSweep::new(deficit, labels, taus, warmup, opts)?.collect();

    let ok = entries.iter().filter(|e| e.outcome.is_ok()).count();
    logging::log_sweep_summary(entries.len(), ok, entries.len() - ok);

    Ok(SweepResult { entries })
}

/// Evenly spaced grid `start, start + step, ...` up to and including `stop`.
///
/// A value that lands on `stop` up to floating-point rounding is kept; no
/// value beyond `stop` is produced.
pub fn linear_grid(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, InputError> {
    check_tau(start)?;
    check_tau(step)?;
    if !stop.is_finite() || stop < start {
        return Err(InputError::EmptyTauGrid);
    }
    let count = ((stop - start) / step + 1e-9).floor() as usize + 1;
    Ok((0..count).map(|i| start + step * i as f64).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
