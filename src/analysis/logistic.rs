//! Single-predictor logistic regression and deviance residuals.
//!
//! Model: `P(label = 1) = sigmoid(b0 + b1 * x)`, fitted by maximum likelihood.
//! The negative mean log-likelihood is minimized with L-BFGS and a
//! More–Thuente line search (argmin) on a z-scored copy of the predictor.
//! The coefficients are mapped back to the original scale afterwards.
//!
//! Cases where the maximum-likelihood estimate does not exist (all labels
//! identical, or a predictor that separates the classes) are detected before
//! the solver runs and reported as `FitError`, so the outcome never depends
//! on where an unbounded optimization happens to stop.

use argmin::core::{
    CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::{linesearch::MoreThuenteLineSearch, quasinewton::LBFGS};
use ndarray::{Array1, array};
use serde::Serialize;

use crate::model::{FitError, InputError};

type Theta = Array1<f64>;
type Lbfgs = LBFGS<MoreThuenteLineSearch<Theta, Theta, f64>, Theta, Theta, f64>;

/// Fitted probabilities are kept this far from 0 and 1 inside logarithms.
const PROB_EPS: f64 = 1e-15;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Solver settings for one logistic fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_iter: u64,
    /// Stop when the gradient norm of the mean negative log-likelihood
    /// drops below this value.
    pub tol_grad: f64,
    /// Stop when the cost changes by less than this between iterations.
    pub tol_cost: f64,
    /// L-BFGS history size.
    pub lbfgs_mem: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol_grad: 1e-7,
            tol_cost: 1e-12,
            lbfgs_mem: 7,
        }
    }
}

/// Result of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticFit {
    pub intercept: f64,
    pub slope: f64,
    /// Total log-likelihood at the estimate.
    pub log_likelihood: f64,
    pub iterations: u64,
    pub n: usize,
    pub positives: usize,
    /// Fitted probability for each observation, in input order.
    #[serde(skip)]
    pub probabilities: Vec<f64>,
}

impl LogisticFit {
    /// Deviance residual for every observation.
    pub fn deviance_residuals(&self, labels: &[bool]) -> Vec<f64> {
        labels
            .iter()
            .zip(&self.probabilities)
            .map(|(&y, &p)| deviance_residual(y, p))
            .collect()
    }

    pub fn mean_probability(&self) -> f64 {
        if self.probabilities.is_empty() {
            return 0.0;
        }
        self.probabilities.iter().sum::<f64>() / self.probabilities.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Residuals
// ---------------------------------------------------------------------------

/// `sign(y - p) * sqrt(-2 * [y ln p + (1 - y) ln(1 - p)])`
///
/// An observation fitted exactly (`p` equal to its label) has residual 0.
pub fn deviance_residual(label: bool, p: f64) -> f64 {
    if (label && p >= 1.0) || (!label && p <= 0.0) {
        return 0.0;
    }
    let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
    if label {
        (-2.0 * p.ln()).sqrt()
    } else {
        -(-2.0 * (1.0 - p).ln()).sqrt()
    }
}

/// Root mean square of `residuals`; zero for an empty slice.
pub fn rmse(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = residuals.iter().map(|r| r * r).sum();
    (sum_sq / residuals.len() as f64).sqrt()
}

// ---------------------------------------------------------------------------
// Fit
// ---------------------------------------------------------------------------

/// Fits `label ~ sigmoid(b0 + b1 * predictor)`.
///
/// Errors in the outer `Result` are input problems (length mismatch, empty or
/// non-finite data); the inner `FitError` reports why no estimate exists for
/// otherwise valid data.
pub fn fit(
    predictor: &[f64],
    labels: &[bool],
    opts: &FitOptions,
) -> Result<Result<LogisticFit, FitError>, InputError> {
    check_inputs(predictor, labels)?;
    Ok(fit_checked(predictor, labels, opts))
}

pub(crate) fn check_inputs(predictor: &[f64], labels: &[bool]) -> Result<(), InputError> {
    if predictor.len() != labels.len() {
        return Err(InputError::LengthMismatch {
            deficit: predictor.len(),
            labels: labels.len(),
        });
    }
    if predictor.is_empty() {
        return Err(InputError::EmptySeries);
    }
    if let Some((index, &value)) = predictor.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(InputError::NonFiniteValue { index, value });
    }
    Ok(())
}

/// Fit on inputs already validated by `check_inputs`.
pub(crate) fn fit_checked(
    predictor: &[f64],
    labels: &[bool],
    opts: &FitOptions,
) -> Result<LogisticFit, FitError> {
    let n = labels.len();
    let positives = labels.iter().filter(|&&y| y).count();
    if positives == 0 || positives == n {
        return Err(FitError::SingleClass { positives, n });
    }

    let mean = predictor.iter().sum::<f64>() / n as f64;
    let var = predictor.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let sd = var.sqrt();
    if sd <= 0.0 || !sd.is_finite() {
        return Err(FitError::ConstantPredictor);
    }

    if separates(predictor, labels) {
        return Err(FitError::Separation);
    }

    let problem = LogisticProblem {
        z: predictor.iter().map(|x| (x - mean) / sd).collect(),
        y: labels.iter().map(|&y| if y { 1.0 } else { 0.0 }).collect(),
    };

    // Intercept-only MLE as the starting point.
    let rate = positives as f64 / n as f64;
    let theta0: Theta = array![(rate / (1.0 - rate)).ln(), 0.0];

    let (theta, iterations) = minimize(&problem, theta0, opts)?;

    let (a, b) = (theta[0], theta[1]);
    if !a.is_finite() || !b.is_finite() {
        return Err(FitError::Solver(format!("non-finite coefficients ({}, {})", a, b)));
    }

    let probabilities: Vec<f64> = problem.z.iter().map(|z| sigmoid(a + b * z)).collect();
    let log_likelihood = -problem.mean_cost(a, b) * n as f64;

    Ok(LogisticFit {
        intercept: a - b * mean / sd,
        slope: b / sd,
        log_likelihood,
        iterations,
        n,
        positives,
        probabilities,
    })
}

/// True when every positive sits on one side of every negative (ties
/// included), which leaves the likelihood without a finite maximum.
fn separates(predictor: &[f64], labels: &[bool]) -> bool {
    let mut pos = (f64::INFINITY, f64::NEG_INFINITY);
    let mut neg = (f64::INFINITY, f64::NEG_INFINITY);
    for (&x, &y) in predictor.iter().zip(labels) {
        let bounds = if y { &mut pos } else { &mut neg };
        bounds.0 = bounds.0.min(x);
        bounds.1 = bounds.1.max(x);
    }
    neg.1 <= pos.0 || pos.1 <= neg.0
}

fn minimize(
    problem: &LogisticProblem,
    theta0: Theta,
    opts: &FitOptions,
) -> Result<(Theta, u64), FitError> {
    // L-BFGS cannot take a step from a stationary point; the line search
    // rejects a zero direction.
    let g0 = problem.grad_at(theta0[0], theta0[1]);
    if g0[0].hypot(g0[1]) < opts.tol_grad {
        return Ok((theta0, 0));
    }

    let solver: Lbfgs = LBFGS::new(MoreThuenteLineSearch::new(), opts.lbfgs_mem)
        .with_tolerance_grad(opts.tol_grad)
        .and_then(|s| s.with_tolerance_cost(opts.tol_cost))
        .map_err(|e| FitError::Solver(e.to_string()))?;

    let result = Executor::new(problem, solver)
        .configure(|state| state.param(theta0).max_iters(opts.max_iter))
        .run()
        .map_err(|e| FitError::Solver(e.to_string()))?;

    let state = result.state();
    let iterations = state.get_iter();
    if let TerminationStatus::Terminated(TerminationReason::MaxItersReached) =
        state.get_termination_status()
    {
        return Err(FitError::NotConverged { iterations });
    }

    let theta = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| FitError::Solver("solver returned no parameters".to_string()))?;
    Ok((theta, iterations))
}

// ---------------------------------------------------------------------------
// Objective
// ---------------------------------------------------------------------------

/// Mean negative log-likelihood over a standardized predictor.
struct LogisticProblem {
    z: Vec<f64>,
    y: Vec<f64>,
}

impl LogisticProblem {
    fn mean_cost(&self, a: f64, b: f64) -> f64 {
        let total: f64 = self
            .z
            .iter()
            .zip(&self.y)
            .map(|(z, y)| {
                let eta = a + b * z;
                softplus(eta) - y * eta
            })
            .sum();
        total / self.z.len() as f64
    }

    fn grad_at(&self, a: f64, b: f64) -> Theta {
        let mut g = Array1::<f64>::zeros(2);
        for (z, y) in self.z.iter().zip(&self.y) {
            let r = sigmoid(a + b * z) - y;
            g[0] += r;
            g[1] += r * z;
        }
        g / self.z.len() as f64
    }
}

impl CostFunction for &LogisticProblem {
    type Param = Theta;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.mean_cost(theta[0], theta[1]))
    }
}

impl Gradient for &LogisticProblem {
    type Param = Theta;
    type Gradient = Theta;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.grad_at(theta[0], theta[1]))
    }
}

fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^eta)` without overflow.
fn softplus(eta: f64) -> f64 {
    if eta > 0.0 {
        eta + (-eta).exp().ln_1p()
    } else {
        eta.exp().ln_1p()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
