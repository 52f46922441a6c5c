//! Readouts of a trial's place-field code: value map, policy flow field,
//! goal reward and field lookup.

use nalgebra::{DMatrix, Matrix4x2};

use crate::config::ArenaConfig;
use crate::error::{AnalysisError, Result};
use crate::model::PlaceCellPredictor;
use crate::types::{Point2, RunLog};

/// Step length of one action.
pub const ACTION_STEP: f64 = 0.1;

/// Cutoff below which the goal reward is zero.
pub const REWARD_THRESHOLD: f64 = 1e-2;

/// Unit directions of the four actions: up, right, down, left.
fn action_directions() -> Matrix4x2<f64> {
    Matrix4x2::new(0.0, 1.0, 1.0, 0.0, 0.0, -1.0, -1.0, 0.0)
}

/// Predicted state value at each point for one trial.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] if the value readout does not
/// match the field count, plus trial lookup and predictor errors.
pub fn value_map<P: PlaceCellPredictor>(
    run: &RunLog,
    predictor: &P,
    trial: usize,
    points: &[Point2],
) -> Result<Vec<f64>> {
    let log = run.trial(trial)?;
    let acts = predictor.predict_batch(log, points)?;
    if acts.ncols() != log.value_weights.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: acts.ncols(),
            actual: log.value_weights.len(),
        });
    }
    Ok((acts * &log.value_weights).iter().copied().collect())
}

fn softmax_rows(mut logits: DMatrix<f64>) -> DMatrix<f64> {
    for mut row in logits.row_iter_mut() {
        let max = row.max();
        row.apply(|v| *v = (*v - max).exp());
        let total = row.sum();
        row /= total;
    }
    logits
}

/// Expected displacement under the policy at each point.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] unless the policy readout
/// has one row per field and four action columns.
pub fn policy_velocity<P: PlaceCellPredictor>(
    run: &RunLog,
    predictor: &P,
    trial: usize,
    points: &[Point2],
) -> Result<Vec<Point2>> {
    let log = run.trial(trial)?;
    if log.num_actions() != 4 {
        return Err(AnalysisError::DimensionMismatch {
            expected: 4,
            actual: log.num_actions(),
        });
    }
    let acts = predictor.predict_batch(log, points)?;
    if acts.ncols() != log.policy_weights.nrows() {
        return Err(AnalysisError::DimensionMismatch {
            expected: acts.ncols(),
            actual: log.policy_weights.nrows(),
        });
    }
    let probs = softmax_rows(acts * &log.policy_weights);
    let vel = probs * (action_directions() * ACTION_STEP);
    Ok(vel.row_iter().map(|r| Point2::new(r[0], r[1])).collect())
}

/// Gaussian goal reward at each point, zeroed below [`REWARD_THRESHOLD`].
#[must_use]
pub fn reward_field(points: &[Point2], arena: &ArenaConfig) -> Vec<f64> {
    let goal = Point2::new(arena.goal[0], arena.goal[1]);
    points
        .iter()
        .map(|p| {
            let r = (-0.5 * ((p - goal) / arena.goal_size).norm_squared()).exp();
            if r > REWARD_THRESHOLD {
                r
            } else {
                0.0
            }
        })
        .collect()
}

/// Index of the field center nearest `target`; `None` with no fields.
#[must_use]
pub fn closest_field(centers: &[Point2], target: &Point2) -> Option<usize> {
    centers
        .iter()
        .map(|c| (c - target).norm())
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
