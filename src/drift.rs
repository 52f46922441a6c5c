//! Representational drift: how much the population code over a fixed grid
//! changes across training, relative to how much behaviour still changes.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::grid::{sample_trials, StateSpaceGrid};
use crate::model::PlaceCellPredictor;
use crate::stats::{pearson, std_dev};
use crate::types::RunLog;

/// Correlation of sampled trials against a reference trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationDrift {
    /// Sampled trial indices.
    pub trials: Vec<usize>,
    /// Population-vector correlation with the reference per sample.
    pub pv_corr: Vec<f64>,
    /// Representational-similarity correlation with the reference per sample.
    pub rep_corr: Vec<f64>,
    /// Self-similarity matrix at the reference trial.
    #[serde(skip)]
    pub start_similarity: DMatrix<f64>,
    /// Self-similarity matrix at the last sampled trial.
    #[serde(skip)]
    pub end_similarity: DMatrix<f64>,
}

/// Point-by-point similarity `A Aᵀ` of an activation matrix.
#[must_use]
pub fn self_similarity(acts: &DMatrix<f64>) -> DMatrix<f64> {
    acts * acts.transpose()
}

fn correlate(a: &DMatrix<f64>, b: &DMatrix<f64>, what: &str, trial: usize) -> Result<f64> {
    pearson(a.as_slice(), b.as_slice())?
        .map(|c| c.r)
        .ok_or_else(|| AnalysisError::InvalidInput(format!("{what} is constant at trial {trial}")))
}

/// Compare the code at `start` with `num_samples` trials spread over
/// `[start, end - 1]` on a shared grid.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] for an empty range or zero
/// samples, [`AnalysisError::IndexOutOfRange`] if `end` exceeds the run,
/// [`AnalysisError::InvalidInput`] when an activation map is constant, and
/// propagates predictor errors.
pub fn get_pvcorr<P: PlaceCellPredictor>(
    run: &RunLog,
    predictor: &P,
    start: usize,
    end: usize,
    num_samples: usize,
    grid: &StateSpaceGrid,
) -> Result<PopulationDrift> {
    if end <= start || num_samples == 0 {
        return Err(AnalysisError::InsufficientData {
            required: 1,
            actual: if end <= start { 0 } else { num_samples },
        });
    }
    if end > run.total_trials() {
        return Err(AnalysisError::out_of_range(end - 1, run.total_trials()));
    }

    let reference = predictor.predict_batch(run.trial(start)?, grid.points())?;
    let start_similarity = self_similarity(&reference);

    let trials = sample_trials(start, end - 1, num_samples);
    let mut pv_corr = Vec::with_capacity(trials.len());
    let mut rep_corr = Vec::with_capacity(trials.len());
    let mut end_similarity = start_similarity.clone();
    for &t in &trials {
        let acts = predictor.predict_batch(run.trial(t)?, grid.points())?;
        if acts.shape() != reference.shape() {
            return Err(AnalysisError::DimensionMismatch {
                expected: reference.ncols(),
                actual: acts.ncols(),
            });
        }
        let sim = self_similarity(&acts);
        pv_corr.push(correlate(&reference, &acts, "activation map", t)?);
        rep_corr.push(correlate(&start_similarity, &sim, "similarity matrix", t)?);
        end_similarity = sim;
    }
    debug!(start, end, samples = trials.len(), "population-vector correlations");

    Ok(PopulationDrift {
        trials,
        pv_corr,
        rep_corr,
        start_similarity,
        end_similarity,
    })
}

/// Spread of the population-vector correlation over the spread of latencies
/// sampled from `stable_perf` to the last trial.
///
/// Returns `Ok(None)` when the sampled latencies do not vary.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptySeries`] for empty inputs and
/// [`AnalysisError::IndexOutOfRange`] if `stable_perf` is past the last trial.
pub fn drift_score(
    pv_corr: &[f64],
    latencies: &[f64],
    stable_perf: usize,
    latency_samples: usize,
) -> Result<Option<f64>> {
    let pv_std = std_dev(pv_corr).ok_or_else(|| AnalysisError::EmptySeries("pv correlations".into()))?;
    if latencies.is_empty() {
        return Err(AnalysisError::EmptySeries("latency series".into()));
    }
    if stable_perf >= latencies.len() {
        return Err(AnalysisError::out_of_range(stable_perf, latencies.len()));
    }
    let sampled: Vec<f64> = sample_trials(stable_perf, latencies.len() - 1, latency_samples)
        .into_iter()
        .map(|i| latencies[i])
        .collect();
    let Some(lat_std) = std_dev(&sampled).filter(|s| *s > 0.0) else {
        return Ok(None);
    };
    let score = pv_std / lat_std;
    info!(pv_std, lat_std, score, "representational drift");
    Ok(Some(score))
}
