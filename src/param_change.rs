//! Parameter trajectories across a trial range and per-field drift relative
//! to the first trial of the range.

use nalgebra::{DMatrix, DVector, Matrix2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::stats::std_dev;
use crate::types::{Point2, RunLog};

/// Parameters of trials `[start, end)` stacked along the trial axis.
///
/// Outer index is the trial offset from `start`, inner index the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDelta {
    /// First trial of the range.
    pub start: usize,
    /// Field centers.
    pub lambdas: Vec<Vec<Point2>>,
    /// Field widths.
    pub sigmas: Vec<Vec<Matrix2<f64>>>,
    /// Amplitudes as a trials x fields matrix.
    pub alphas: DMatrix<f64>,
    /// Policy readouts.
    pub policies: Vec<DMatrix<f64>>,
    /// Value readouts.
    pub values: Vec<DVector<f64>>,
}

impl ParamDelta {
    /// Number of stacked trials.
    #[must_use]
    pub fn num_trials(&self) -> usize {
        self.lambdas.len()
    }

    /// Number of fields.
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.alphas.ncols()
    }
}

/// Stack the parameters of trials `[start, end)`.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] for an empty range,
/// [`AnalysisError::IndexOutOfRange`] if `end` exceeds the recorded trials and
/// [`AnalysisError::DimensionMismatch`] if a trial's parameter families disagree
/// on the field count.
pub fn get_param_changes(run: &RunLog, start: usize, end: usize) -> Result<ParamDelta> {
    if end <= start {
        return Err(AnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    if end > run.total_trials() {
        return Err(AnalysisError::out_of_range(end - 1, run.total_trials()));
    }
    let slice = &run.trials[start..end];
    let fields = slice[0].num_fields();
    for t in slice {
        t.validate()?;
        if t.num_fields() != fields {
            return Err(AnalysisError::DimensionMismatch {
                expected: fields,
                actual: t.num_fields(),
            });
        }
    }

    let alphas = DMatrix::from_fn(slice.len(), fields, |r, c| slice[r].amplitudes[c]);
    debug!(start, end, fields, "stacked parameter range");
    Ok(ParamDelta {
        start,
        lambdas: slice.iter().map(|t| t.centers.clone()).collect(),
        sigmas: slice.iter().map(|t| t.widths.clone()).collect(),
        alphas,
        policies: slice.iter().map(|t| t.policy_weights.clone()).collect(),
        values: slice.iter().map(|t| t.value_weights.clone()).collect(),
    })
}

/// Per-field change of each parameter family relative to the first trial,
/// each a trials x fields matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamVariance {
    /// Center norm minus its first-trial value.
    pub center_shift: DMatrix<f64>,
    /// Width trace minus its first-trial value.
    pub width_shift: DMatrix<f64>,
    /// Amplitude minus its first-trial value.
    pub amplitude_shift: DMatrix<f64>,
}

impl ParamVariance {
    /// The three delta series in `(centers, widths, amplitudes)` order.
    #[must_use]
    pub fn series(&self) -> [&DMatrix<f64>; 3] {
        [&self.center_shift, &self.width_shift, &self.amplitude_shift]
    }
}

fn baseline_subtract(m: DMatrix<f64>) -> DMatrix<f64> {
    if m.nrows() == 0 {
        return m;
    }
    let base = m.row(0).clone_owned();
    let mut out = m;
    for mut row in out.row_iter_mut() {
        row -= &base;
    }
    out
}

/// Reduce stacked parameters to per-field drift series.
#[must_use]
pub fn get_param_variance(delta: &ParamDelta) -> ParamVariance {
    let (trials, fields) = (delta.num_trials(), delta.num_fields());
    let norms = DMatrix::from_fn(trials, fields, |r, c| delta.lambdas[r][c].norm());
    let traces = DMatrix::from_fn(trials, fields, |r, c| delta.sigmas[r][c].trace());
    ParamVariance {
        center_shift: baseline_subtract(norms),
        width_shift: baseline_subtract(traces),
        amplitude_shift: baseline_subtract(delta.alphas.clone()),
    }
}

/// A field ranked by how much its delta series moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldVariance {
    /// Field index.
    pub field: usize,
    /// Standard deviation of its delta series over trials.
    pub std_dev: f64,
}

/// The `k` fields with the largest standard deviation over trials, descending.
#[must_use]
pub fn top_variance_fields(series: &DMatrix<f64>, k: usize) -> Vec<FieldVariance> {
    let mut ranked: Vec<FieldVariance> = series
        .column_iter()
        .enumerate()
        .map(|(field, col)| {
            let values: Vec<f64> = col.iter().copied().collect();
            FieldVariance {
                field,
                std_dev: std_dev(&values).unwrap_or(0.0),
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.std_dev.total_cmp(&a.std_dev).then(a.field.cmp(&b.field)));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrialLog;

    fn run(alphas: &[[f64; 2]], centers: &[[f64; 2]], sigmas: &[[f64; 2]]) -> RunLog {
        let trials: Vec<TrialLog> = alphas
            .iter()
            .zip(centers)
            .zip(sigmas)
            .map(|((a, c), s)| {
                TrialLog::isotropic(
                    vec![Point2::new(c[0], 0.0), Point2::new(0.0, c[1])],
                    s,
                    a.to_vec(),
                    DMatrix::zeros(2, 4),
                    DVector::zeros(2),
                )
            })
            .collect();
        let n = trials.len();
        RunLog {
            trials,
            coords: vec![Vec::new(); n],
            latencies: vec![0.0; n],
            rewards: Vec::new(),
        }
    }

    #[test]
    fn test_amplitude_shift_is_raw_delta() {
        let alphas = [[1.0, 2.0], [1.5, 1.0], [0.5, 4.0]];
        let r = run(&alphas, &[[0.0, 0.0]; 3], &[[0.1, 0.1]; 3]);
        let delta = get_param_changes(&r, 0, 3).unwrap();
        let var = get_param_variance(&delta);
        for t in 0..3 {
            for f in 0..2 {
                assert_eq!(var.amplitude_shift[(t, f)], alphas[t][f] - alphas[0][f]);
            }
        }
    }

    #[test]
    fn test_center_and_width_shifts() {
        let r = run(
            &[[1.0, 1.0]; 3],
            &[[0.2, -0.5], [-0.4, 0.5], [0.6, 0.1]],
            &[[0.1, 0.2], [0.2, 0.2], [0.3, 0.1]],
        );
        let var = get_param_variance(&get_param_changes(&r, 0, 3).unwrap());
        assert!((var.center_shift[(1, 0)] - 0.2).abs() < 1e-12);
        assert!((var.center_shift[(2, 1)] - (0.1 - 0.5)).abs() < 1e-12);
        // Trace of sigma² I is 2 sigma²
        assert!((var.width_shift[(2, 0)] - 2.0 * (0.09 - 0.01)).abs() < 1e-12);
        assert!(var.width_shift.row(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_range_is_half_open() {
        let r = run(&[[1.0, 1.0]; 4], &[[0.0, 0.0]; 4], &[[0.1, 0.1]; 4]);
        let delta = get_param_changes(&r, 1, 3).unwrap();
        assert_eq!(delta.start, 1);
        assert_eq!(delta.num_trials(), 2);
        assert!(get_param_changes(&r, 2, 2).is_err());
        assert!(matches!(
            get_param_changes(&r, 0, 5),
            Err(AnalysisError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_short_width_list_rejected() {
        let mut r = run(&[[1.0, 1.0]; 2], &[[0.0, 0.0]; 2], &[[0.1, 0.1]; 2]);
        r.trials[1].widths = vec![Matrix2::identity()];
        assert!(matches!(
            get_param_changes(&r, 0, 2),
            Err(AnalysisError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(get_param_changes(&r, 0, 1).is_ok());
    }

    #[test]
    fn test_top_variance_ranking() {
        let series = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 1.0, 0.1, -3.0, 2.0, 0.2, 3.0]);
        let top = top_variance_fields(&series, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].field, 2);
        assert_eq!(top[1].field, 0);
        assert!(top[0].std_dev > top[1].std_dev);
        assert_eq!(top_variance_fields(&series, 10).len(), 3);
    }
}
