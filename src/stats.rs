//! Summary statistics, Pearson correlation and simple linear regression.
//!
//! Standard deviations are population estimates (divide by `n`). Two-sided
//! p-values use the Student t distribution with `n - 2` degrees of freedom.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{AnalysisError, Result};

/// Arithmetic mean; `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

/// Population standard deviation; `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    Some(var.sqrt())
}

/// Pearson correlation with its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Correlation coefficient in `[-1, 1]`.
    pub r: f64,
    /// Two-sided p-value for the null hypothesis of no correlation.
    pub p_value: f64,
}

fn is_constant(data: &[f64]) -> bool {
    data.iter().all(|&v| v == data[0])
}

fn check_paired(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            actual: x.len(),
        });
    }
    Ok(())
}

/// Centered sums `(Sxx, Syy, Sxy)` and means.
#[allow(clippy::cast_precision_loss)]
fn centered_sums(x: &[f64], y: &[f64]) -> (f64, f64, f64, f64, f64) {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    (sxx, syy, sxy, mx, my)
}

/// Two-sided p-value of a t statistic.
fn t_two_sided(t: f64, df: f64) -> Result<f64> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::InvalidInput(format!("t distribution: {e}")))?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Pearson correlation between two paired samples.
///
/// Returns `Ok(None)` when either sample is constant, where the coefficient
/// is undefined.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] for unequal lengths and
/// [`AnalysisError::InsufficientData`] for fewer than two pairs.
#[allow(clippy::cast_precision_loss)]
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Option<Correlation>> {
    check_paired(x, y)?;
    if is_constant(x) || is_constant(y) {
        return Ok(None);
    }
    let (sxx, syy, sxy, _, _) = centered_sums(x, y);
    if sxx == 0.0 || syy == 0.0 {
        return Ok(None);
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    let n = x.len();
    let p_value = if n == 2 {
        1.0
    } else {
        let df = (n - 2) as f64;
        let t = r * (df / ((1.0 - r) * (1.0 + r))).sqrt();
        t_two_sided(t, df)?
    };
    Ok(Some(Correlation { r, p_value }))
}

/// Ordinary least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    /// Fitted slope.
    pub slope: f64,
    /// Fitted intercept.
    pub intercept: f64,
    /// Correlation coefficient (0 when `y` is constant).
    pub r_value: f64,
    /// Two-sided p-value for a zero slope.
    pub p_value: f64,
    /// Standard error of the slope.
    pub std_err: f64,
}

impl Regression {
    /// Predicted value at `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares linear regression of `y` on `x`.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidInput`] if all `x` are identical, plus the
/// pairing errors of [`pearson`].
#[allow(clippy::cast_precision_loss)]
pub fn linregress(x: &[f64], y: &[f64]) -> Result<Regression> {
    check_paired(x, y)?;
    if is_constant(x) {
        return Err(AnalysisError::InvalidInput(
            "cannot regress on a constant x".into(),
        ));
    }
    let (sxx, syy, sxy, mx, my) = centered_sums(x, y);
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r_value = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let n = x.len();
    let (p_value, std_err) = if n == 2 {
        (if is_constant(y) { 1.0 } else { 0.0 }, 0.0)
    } else {
        let df = (n - 2) as f64;
        let residual = ((1.0 - r_value) * (1.0 + r_value)).max(0.0);
        let t = r_value * (df / residual).sqrt();
        let std_err = (residual * syy / sxx / df).sqrt();
        let p = if r_value == 0.0 { 1.0 } else { t_two_sided(t, df)? };
        (p, std_err)
    };

    Ok(Regression {
        slope,
        intercept,
        r_value,
        p_value,
        std_err,
    })
}
