//! Learning-curve fitting with Levenberg–Marquardt least squares.
//!
//! Four curve families are supported:
//! - linear `a·x + b`
//! - exponential decay `a·e^(-b·x) + c`
//! - sigmoid `a / (1 + e^(-b·(x - c)))`
//! - power law `a·x^(-b) + c`
//!
//! The solver is bounded by an evaluation budget; running out of budget is an
//! error ([`AnalysisError::FitDidNotConverge`]) instead of a silently
//! unconverged parameter vector.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::smoothing::moving_average;

/// Default residual-evaluation budget.
pub const DEFAULT_MAX_EVALUATIONS: usize = 10_000;

const FTOL: f64 = 1.49e-8;
const XTOL: f64 = 1.49e-8;
const GTOL: f64 = 1e-12;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e16;

/// Parametric learning-curve family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveShape {
    /// `a·x + b`
    Linear,
    /// `a·e^(-b·x) + c`
    Exponential,
    /// `a / (1 + e^(-b·(x - c)))`
    Sigmoid,
    /// `a·x^(-b) + c`
    PowerLaw,
}

impl CurveShape {
    /// All supported shapes.
    pub const ALL: [Self; 4] = [Self::Linear, Self::Exponential, Self::Sigmoid, Self::PowerLaw];

    /// Number of free parameters.
    #[must_use]
    pub const fn num_params(self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Exponential | Self::Sigmoid | Self::PowerLaw => 3,
        }
    }

    /// Starting point used when the caller supplies none.
    #[must_use]
    pub fn default_guess(self) -> Vec<f64> {
        match self {
            Self::Linear => vec![1.0, 0.0],
            Self::Exponential | Self::PowerLaw => vec![1.0, 1.0, 0.0],
            Self::Sigmoid => vec![1.0, 1.0, 1.0],
        }
    }

    /// Short name accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exp",
            Self::Sigmoid => "sigmoid",
            Self::PowerLaw => "power",
        }
    }

    /// Curve value at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DimensionMismatch`] if `p` does not hold
    /// exactly [`num_params`](Self::num_params) values.
    pub fn evaluate(self, x: f64, p: &[f64]) -> Result<f64> {
        if p.len() != self.num_params() {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.num_params(),
                actual: p.len(),
            });
        }
        Ok(self.value(x, p))
    }

    fn value(self, x: f64, p: &[f64]) -> f64 {
        match self {
            Self::Linear => p[0] * x + p[1],
            Self::Exponential => p[0] * (-p[1] * x).exp() + p[2],
            Self::Sigmoid => p[0] / (1.0 + (-p[1] * (x - p[2])).exp()),
            Self::PowerLaw => p[0] * x.powf(-p[1]) + p[2],
        }
    }

    /// Partial derivatives of the curve at `x` with respect to each parameter.
    fn gradient(self, x: f64, p: &[f64], out: &mut [f64]) {
        match self {
            Self::Linear => {
                out[0] = x;
                out[1] = 1.0;
            }
            Self::Exponential => {
                let e = (-p[1] * x).exp();
                out[0] = e;
                out[1] = -p[0] * x * e;
                out[2] = 1.0;
            }
            Self::Sigmoid => {
                let s = 1.0 / (1.0 + (-p[1] * (x - p[2])).exp());
                let ds = p[0] * s * (1.0 - s);
                out[0] = s;
                out[1] = ds * (x - p[2]);
                out[2] = -ds * p[1];
            }
            Self::PowerLaw => {
                let xp = x.powf(-p[1]);
                out[0] = xp;
                out[1] = -p[0] * xp * x.ln();
                out[2] = 1.0;
            }
        }
    }
}

impl fmt::Display for CurveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CurveShape {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "exp" | "exponential" => Ok(Self::Exponential),
            "sigmoid" => Ok(Self::Sigmoid),
            "power" | "power_law" => Ok(Self::PowerLaw),
            other => Err(AnalysisError::UnsupportedShape(other.to_string())),
        }
    }
}

/// Result of a converged fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFit {
    /// Fitted family.
    pub shape: CurveShape,
    /// Fitted parameters in the family's order.
    pub params: Vec<f64>,
    /// Sum of squared residuals at the solution.
    pub residual_sum_squares: f64,
    /// Residual evaluations spent.
    pub evaluations: usize,
}

impl CurveFit {
    /// Fitted curve value at `x`; NaN if `params` has the wrong length.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.shape.evaluate(x, &self.params).unwrap_or(f64::NAN)
    }

    /// Coefficient of determination on `(x, y)`; 0 when `y` is constant.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn r_squared(&self, x: &[f64], y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        let ss_res: f64 = x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| (yi - self.predict(xi)).powi(2))
            .sum();
        if ss_tot.abs() < 1e-12 {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        }
    }
}

fn residuals(shape: CurveShape, x: &[f64], y: &[f64], p: &[f64]) -> DVector<f64> {
    DVector::from_iterator(
        x.len(),
        x.iter().zip(y).map(|(&xi, &yi)| shape.value(xi, p) - yi),
    )
}

fn jacobian(shape: CurveShape, x: &[f64], p: &[f64]) -> DMatrix<f64> {
    let m = p.len();
    let mut jac = DMatrix::zeros(x.len(), m);
    let mut row = vec![0.0; m];
    for (i, &xi) in x.iter().enumerate() {
        shape.gradient(xi, p, &mut row);
        for (j, v) in row.iter().enumerate() {
            jac[(i, j)] = *v;
        }
    }
    jac
}

/// Fit `shape` to `(x, y)` with the default evaluation budget.
///
/// # Errors
///
/// See [`fit_model_with_budget`].
pub fn fit_model(
    x: &[f64],
    y: &[f64],
    shape: CurveShape,
    initial_guess: Option<&[f64]>,
) -> Result<CurveFit> {
    fit_model_with_budget(x, y, shape, initial_guess, DEFAULT_MAX_EVALUATIONS)
}

/// Fit a shape given by name (`"linear"`, `"exp"`, `"sigmoid"`, `"power"`).
///
/// # Errors
///
/// Returns [`AnalysisError::UnsupportedShape`] for an unknown name, otherwise
/// the errors of [`fit_model_with_budget`].
pub fn fit_model_named(
    x: &[f64],
    y: &[f64],
    shape: &str,
    initial_guess: Option<&[f64]>,
) -> Result<CurveFit> {
    fit_model(x, y, shape.parse()?, initial_guess)
}

/// Levenberg–Marquardt fit of `shape` to `(x, y)`.
///
/// Each residual evaluation over the whole sample counts against
/// `max_evaluations`. The iteration stops when the relative cost reduction or
/// the relative step falls below `1.49e-8`, or the gradient vanishes.
///
/// # Errors
///
/// - [`AnalysisError::DimensionMismatch`] if `x`, `y` or the guess have inconsistent lengths
/// - [`AnalysisError::InsufficientData`] if there are fewer samples than parameters
/// - [`AnalysisError::InvalidInput`] if the starting point gives non-finite residuals
/// - [`AnalysisError::FitDidNotConverge`] if the budget runs out, the
///   Jacobian is not finite, or no step away from the guess lowers the cost
pub fn fit_model_with_budget(
    x: &[f64],
    y: &[f64],
    shape: CurveShape,
    initial_guess: Option<&[f64]>,
    max_evaluations: usize,
) -> Result<CurveFit> {
    if x.len() != y.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let m = shape.num_params();
    if x.len() < m {
        return Err(AnalysisError::InsufficientData {
            required: m,
            actual: x.len(),
        });
    }
    let mut params = match initial_guess {
        Some(guess) if guess.len() != m => {
            return Err(AnalysisError::DimensionMismatch {
                expected: m,
                actual: guess.len(),
            })
        }
        Some(guess) => guess.to_vec(),
        None => shape.default_guess(),
    };

    let mut r = residuals(shape, x, y, &params);
    let mut cost = r.norm_squared();
    let mut evaluations = 1;
    if !cost.is_finite() {
        return Err(AnalysisError::InvalidInput(format!(
            "{shape} curve is not finite at the initial guess"
        )));
    }

    let mut lambda = LAMBDA_INIT;
    let mut steps_taken = 0usize;
    loop {
        let jac = jacobian(shape, x, &params);
        let gradient = jac.transpose() * &r;
        if gradient.iter().any(|g| !g.is_finite()) {
            debug!(%shape, evaluations, "curve fit gradient is not finite");
            return Err(AnalysisError::FitDidNotConverge { evaluations });
        }
        if gradient.amax() <= GTOL {
            break;
        }
        let jtj = jac.transpose() * &jac;

        let mut accepted = false;
        while !accepted {
            if evaluations >= max_evaluations {
                return Err(AnalysisError::FitDidNotConverge { evaluations });
            }
            let mut damped = jtj.clone();
            for j in 0..m {
                damped[(j, j)] += lambda * jtj[(j, j)].max(1e-12);
            }
            let Some(step) = damped.lu().solve(&(-&gradient)) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break;
                }
                continue;
            };

            let candidate: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
            let r_new = residuals(shape, x, y, &candidate);
            let cost_new = r_new.norm_squared();
            evaluations += 1;

            if cost_new.is_finite() && cost_new < cost {
                let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
                let small_step = step.norm() <= XTOL * (param_norm + XTOL);
                let small_gain = cost - cost_new <= FTOL * cost;
                // Heavily damped steps are short by construction; only trust the
                // tolerances on near Gauss-Newton steps.
                let near_gauss_newton = lambda <= 1.0;
                params = candidate;
                r = r_new;
                cost = cost_new;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;
                steps_taken += 1;
                if near_gauss_newton && (small_step || small_gain) {
                    debug!(%shape, evaluations, cost, "curve fit converged");
                    return Ok(CurveFit {
                        shape,
                        params,
                        residual_sum_squares: cost,
                        evaluations,
                    });
                }
            } else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break;
                }
            }
        }
        // No damping level improves the cost: the current point is a minimum
        // to working precision, unless the guess itself never moved.
        if !accepted {
            if steps_taken == 0 {
                return Err(AnalysisError::FitDidNotConverge { evaluations });
            }
            break;
        }
    }

    debug!(%shape, evaluations, cost, "curve fit reached stationary point");
    Ok(CurveFit {
        shape,
        params,
        residual_sum_squares: cost,
        evaluations,
    })
}

/// One family fitted to a learning curve, with its goodness of fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeFit {
    /// The converged fit.
    pub fit: CurveFit,
    /// R² on the smoothed curve.
    pub r_squared: f64,
}

/// Fit every curve family to a smoothed per-trial series.
///
/// The series is smoothed with `window`, trials are numbered from 1 so the
/// power law is defined everywhere, and families that fail to fit are
/// skipped. Results are ordered best R² first.
///
/// # Errors
///
/// Returns the smoothing errors of [`moving_average`].
#[allow(clippy::cast_precision_loss)]
pub fn characterize_curve(series: &[f64], window: usize) -> Result<Vec<ShapeFit>> {
    let smoothed = moving_average(series, window)?;
    let x: Vec<f64> = (1..=smoothed.len()).map(|i| i as f64).collect();

    let mut fits: Vec<ShapeFit> = CurveShape::ALL
        .iter()
        .filter_map(|&shape| match fit_model(&x, &smoothed, shape, None) {
            Ok(fit) => {
                let r_squared = fit.r_squared(&x, &smoothed);
                Some(ShapeFit { fit, r_squared })
            }
            Err(e) => {
                debug!(%shape, error = %e, "skipping curve family");
                None
            }
        })
        .collect();
    fits.sort_by(|a, b| b.r_squared.total_cmp(&a.r_squared));
    Ok(fits)
}
