//! Causal exponential low-pass filter.
//!
//! ```text
//! y[0] = v[0]
//! y[i] = y[i-1] + (v[i] - y[i-1]) / tau
//! ```
//!
//! `tau` is the characteristic timescale in days. `tau = 1` passes the input
//! through unchanged; larger values respond more slowly.
//!
//! The first output equals the first input, so a series that starts far from
//! its typical level shows a cold-start transient. `low_pass_warmed` hides it
//! by replaying the series' own first `warmup` days in front of it and then
//! discarding those outputs.

use crate::model::InputError;

/// Applies the filter to `values`.
///
/// Returns an empty vector for empty input.
pub fn low_pass(values: &[f64], tau: f64) -> Result<Vec<f64>, InputError> {
    check_tau(tau)?;
    Ok(recurrence(values, tau))
}

/// Applies the filter after warming it up on a copy of the first `warmup`
/// values. The output is aligned 1:1 with `values`.
///
/// Fails with `InputError::TooShort` when `values` has fewer than `warmup`
/// elements.
pub fn low_pass_warmed(values: &[f64], tau: f64, warmup: usize) -> Result<Vec<f64>, InputError> {
    check_tau(tau)?;
    check_warmup_len(values.len(), warmup)?;
    Ok(warmed(values, tau, warmup))
}

pub(crate) fn check_tau(tau: f64) -> Result<(), InputError> {
    if tau.is_finite() && tau > 0.0 {
        Ok(())
    } else {
        Err(InputError::NonPositiveTau(tau))
    }
}

pub(crate) fn check_warmup_len(len: usize, warmup: usize) -> Result<(), InputError> {
    if len < warmup {
        return Err(InputError::TooShort { len, required: warmup });
    }
    Ok(())
}

/// Warm-up filter without argument checks; callers validate `tau` and the
/// length up front.
pub(crate) fn warmed(values: &[f64], tau: f64, warmup: usize) -> Vec<f64> {
    let mut padded = Vec::with_capacity(values.len() + warmup);
    padded.extend_from_slice(&values[..warmup]);
    padded.extend_from_slice(values);

    let mut smoothed = recurrence(&padded, tau);
    smoothed.drain(..warmup);
    smoothed
}

fn recurrence(values: &[f64], tau: f64) -> Vec<f64> {
    let gain = 1.0 / tau;
    let mut out = Vec::with_capacity(values.len());
    let mut iter = values.iter();

    if let Some(&first) = iter.next() {
        let mut y = first;
        out.push(y);
        for &v in iter {
            y += gain * (v - y);
            out.push(y);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
