//! Per-field tracking over sampled trials: field area, center displacement,
//! amplitude movement and the fraction of fields still active.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::grid::StateSpaceGrid;
use crate::model::PlaceCellPredictor;
use crate::param_change::{ParamDelta, ParamVariance};
use crate::stats::{linregress, mean, std_dev, Regression};
use crate::types::RunLog;

/// Mean and standard error across fields at each sampled trial.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldTracking {
    /// Sampled trial indices.
    pub trials: Vec<usize>,
    /// Mean over fields.
    pub mean: Vec<f64>,
    /// Standard error of the mean over fields.
    pub sem: Vec<f64>,
}

impl FieldTracking {
    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, trial: usize, per_field: &[f64]) {
        let m = mean(per_field).unwrap_or(0.0);
        let sd = std_dev(per_field).unwrap_or(0.0);
        self.trials.push(trial);
        self.mean.push(m);
        self.sem.push(sd / (per_field.len().max(1) as f64).sqrt());
    }
}

/// Trapezoidal integral of each column with unit spacing.
fn column_areas(acts: &DMatrix<f64>) -> Vec<f64> {
    acts.column_iter()
        .map(|col| {
            col.iter()
                .zip(col.iter().skip(1))
                .map(|(a, b)| 0.5 * (a + b))
                .sum()
        })
        .collect()
}

/// Each field's activation area over the grid, relative to the first sampled trial.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptySeries`] for no sampled trials,
/// [`AnalysisError::InvalidInput`] if a field has zero area at the reference
/// trial, and propagates trial lookup and predictor errors.
pub fn field_area_change<P: PlaceCellPredictor>(
    run: &RunLog,
    predictor: &P,
    grid: &StateSpaceGrid,
    trials: &[usize],
) -> Result<FieldTracking> {
    let Some(&first) = trials.first() else {
        return Err(AnalysisError::EmptySeries("sampled trials".into()));
    };
    let reference = column_areas(&predictor.predict_batch(run.trial(first)?, grid.points())?);
    if let Some(field) = reference.iter().position(|&a| a == 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "field {field} has zero area at reference trial {first}"
        )));
    }

    let mut tracking = FieldTracking::default();
    for &t in trials {
        let areas = column_areas(&predictor.predict_batch(run.trial(t)?, grid.points())?);
        let ratios: Vec<f64> = areas.iter().zip(&reference).map(|(a, r)| a / r).collect();
        tracking.push(t, &ratios);
    }
    debug!(samples = trials.len(), "tracked field areas");
    Ok(tracking)
}

/// Each field's center norm relative to the first sampled trial.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptySeries`] for no sampled trials and
/// [`AnalysisError::IndexOutOfRange`] for a bad index.
pub fn field_center_change(run: &RunLog, trials: &[usize]) -> Result<FieldTracking> {
    let Some(&first) = trials.first() else {
        return Err(AnalysisError::EmptySeries("sampled trials".into()));
    };
    let reference: Vec<f64> = run.trial(first)?.centers.iter().map(|c| c.norm()).collect();
    let mut tracking = FieldTracking::default();
    for &t in trials {
        let shifts: Vec<f64> = run
            .trial(t)?
            .centers
            .iter()
            .zip(&reference)
            .map(|(c, r)| c.norm() - r)
            .collect();
        tracking.push(t, &shifts);
    }
    Ok(tracking)
}

/// L1 norm of the amplitude vector at every trial of the range.
#[must_use]
pub fn amplitude_l1_norm(delta: &ParamDelta) -> Vec<f64> {
    delta
        .alphas
        .row_iter()
        .map(|row| row.iter().map(|v| v.abs()).sum())
        .collect()
}

/// Relation between how strong a field is and how much it moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmplitudeDrift {
    /// Mean squared amplitude per field over the range.
    pub mean_sq_amplitude: Vec<f64>,
    /// Summed standard deviation of the center, width and amplitude deltas per field.
    pub drift: Vec<f64>,
    /// Regression of drift on mean squared amplitude; `None` when all
    /// fields share the same mean squared amplitude.
    pub regression: Option<Regression>,
}

fn column_std(m: &DMatrix<f64>) -> Vec<f64> {
    m.column_iter()
        .map(|c| {
            let values: Vec<f64> = c.iter().copied().collect();
            std_dev(&values).unwrap_or(0.0)
        })
        .collect()
}

/// Regress per-field drift on per-field mean squared amplitude.
///
/// # Errors
///
/// Propagates regression input errors (fewer than two fields).
pub fn amplitude_drift(delta: &ParamDelta, variance: &ParamVariance) -> Result<AmplitudeDrift> {
    let mean_sq_amplitude: Vec<f64> = delta
        .alphas
        .column_iter()
        .map(|c| {
            let sq: Vec<f64> = c.iter().map(|a| a * a).collect();
            mean(&sq).unwrap_or(0.0)
        })
        .collect();

    let mut drift = vec![0.0; delta.num_fields()];
    for series in variance.series() {
        for (d, s) in drift.iter_mut().zip(column_std(series)) {
            *d += s;
        }
    }

    let spread = std_dev(&mean_sq_amplitude).unwrap_or(0.0);
    let regression = if spread == 0.0 {
        None
    } else {
        Some(linregress(&mean_sq_amplitude, &drift)?)
    };
    Ok(AmplitudeDrift {
        mean_sq_amplitude,
        drift,
        regression,
    })
}

/// Fraction of fields whose squared amplitude is at least `threshold`, per sampled trial.
///
/// # Errors
///
/// Returns [`AnalysisError::IndexOutOfRange`] for a bad index.
#[allow(clippy::cast_precision_loss)]
pub fn active_fraction(run: &RunLog, trials: &[usize], threshold: f64) -> Result<Vec<f64>> {
    trials
        .iter()
        .map(|&t| -> Result<f64> {
            let amps = &run.trial(t)?.amplitudes;
            if amps.is_empty() {
                return Ok(0.0);
            }
            let active = amps.iter().filter(|a| *a * *a >= threshold).count();
            Ok(active as f64 / amps.len() as f64)
        })
        .collect()
}
